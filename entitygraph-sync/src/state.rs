//! Load state of lazily fetched remote data.

/// What is known about a piece of remote state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState<T> {
    /// Never fetched.
    NotLoaded,
    /// Fetched and current.
    Loaded(T),
    /// Fetched once, but must be fetched again before use.
    Stale(T),
}

impl<T> Default for LoadState<T> {
    fn default() -> Self {
        LoadState::NotLoaded
    }
}

impl<T> LoadState<T> {
    /// True unless the state is [`LoadState::Loaded`].
    pub fn needs_fetch(&self) -> bool {
        !matches!(self, LoadState::Loaded(_))
    }

    /// The current value, only when loaded.
    pub fn loaded(&self) -> Option<&T> {
        match self {
            LoadState::Loaded(v) => Some(v),
            _ => None,
        }
    }

    /// The most recent value, loaded or stale.
    pub fn last_known(&self) -> Option<&T> {
        match self {
            LoadState::Loaded(v) | LoadState::Stale(v) => Some(v),
            LoadState::NotLoaded => None,
        }
    }

    /// Demotes `Loaded` to `Stale`; other states are unchanged.
    pub fn mark_stale(&mut self) {
        *self = match std::mem::replace(self, LoadState::NotLoaded) {
            LoadState::Loaded(v) => LoadState::Stale(v),
            other => other,
        };
    }

    /// Stores a freshly fetched value.
    pub fn set(&mut self, value: T) {
        *self = LoadState::Loaded(value);
    }

    /// Forgets everything, as if never fetched.
    pub fn reset(&mut self) {
        *self = LoadState::NotLoaded;
    }
}
