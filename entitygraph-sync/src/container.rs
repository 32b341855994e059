//! Staged values and relations of one predicate.
//!
//! A [`PredicateContainer`] holds three things: the remote snapshot (loaded
//! lazily), pending additions and pending removals. The working view is
//!
//! ```text
//! W = (snapshot − removals) ++ additions
//! ```
//!
//! and saving sends exactly `S − W` as removals followed by `W − S` as
//! additions. Additions never overlap the snapshot and removals are always a
//! subset of it, so the two diffs are simply the pending sets.

use crate::context::StoreContext;
use crate::detail::{find_record, DetailContainer};
use crate::entity::SaveReport;
use crate::error::{SyncError, SyncResult};
use crate::registry::ContainerRegistry;
use crate::state::LoadState;
use entitygraph_types::{Content, ContentKind, DetailContent, PredicateKey};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// What a container holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateKind {
    /// Literal values.
    Value,
    /// Links to other entities.
    Relation,
}

impl PredicateKind {
    fn accepts(&self, kind: ContentKind) -> bool {
        match self {
            PredicateKind::Value => kind == ContentKind::Literal,
            PredicateKind::Relation => true,
        }
    }

    fn expected(&self) -> &'static str {
        match self {
            PredicateKind::Value => "literal",
            PredicateKind::Relation => "literal or reference",
        }
    }
}

/// The staged values or relations of one predicate on one entity.
///
/// Holds each value at most once, compared as exact strings.
pub struct PredicateContainer {
    ctx: StoreContext,
    entity_id: Option<String>,
    predicate: PredicateKey,
    kind: PredicateKind,
    snapshot: LoadState<Vec<String>>,
    additions: Vec<String>,
    added: HashSet<String>,
    removals: HashSet<String>,
    dirty: bool,
    details: BTreeMap<String, ContainerRegistry<DetailContainer>>,
}

impl PredicateContainer {
    /// An empty container. Without an `entity_id` nothing is ever fetched.
    pub fn new(
        ctx: StoreContext,
        entity_id: Option<String>,
        predicate: PredicateKey,
        kind: PredicateKind,
    ) -> Self {
        Self {
            ctx,
            entity_id,
            predicate,
            kind,
            snapshot: LoadState::NotLoaded,
            additions: Vec::new(),
            added: HashSet::new(),
            removals: HashSet::new(),
            dirty: false,
            details: BTreeMap::new(),
        }
    }

    pub fn predicate(&self) -> &PredicateKey {
        &self.predicate
    }

    pub fn kind(&self) -> PredicateKind {
        self.kind
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// True after any edit since the last save, even one that cancelled out.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// True when saving would issue at least one value or link call.
    pub fn has_changes(&self) -> bool {
        !self.additions.is_empty() || !self.removals.is_empty()
    }

    /// True when any detail of any value has unsaved changes.
    pub fn has_detail_changes(&self) -> bool {
        self.details
            .values()
            .flat_map(|registry| registry.iter())
            .any(|(_, d)| d.has_changes())
    }

    // ── Reading ──────────────────────────────────────────────────

    /// The stored values, fetched once and cached.
    pub async fn snapshot(&mut self) -> SyncResult<Vec<String>> {
        self.ensure_snapshot().await?;
        Ok(self.snapshot.last_known().cloned().unwrap_or_default())
    }

    /// The working view: stored values minus pending removals, then pending
    /// additions in insertion order.
    pub async fn content(&mut self) -> SyncResult<Vec<String>> {
        self.ensure_snapshot().await?;
        Ok(self.working_view())
    }

    /// Values in the working view that are not stored yet.
    pub async fn new_content(&mut self) -> SyncResult<Vec<String>> {
        self.ensure_snapshot().await?;
        Ok(self.additions.clone())
    }

    /// Stored values that the working view no longer contains.
    pub async fn removed_content(&mut self) -> SyncResult<Vec<String>> {
        self.ensure_snapshot().await?;
        Ok(self.pending_removals())
    }

    // ── Editing ──────────────────────────────────────────────────

    /// Adds values. Fails without changing anything if an item has the
    /// wrong kind, is already present or is repeated in the batch.
    pub async fn add<I, C>(&mut self, items: I) -> SyncResult<()>
    where
        I: IntoIterator<Item = C>,
        C: Into<Content>,
    {
        let items: Vec<Content> = items.into_iter().map(Into::into).collect();
        self.ensure_snapshot().await?;

        let view: HashSet<String> = self.working_view().into_iter().collect();
        let mut batch = HashSet::new();
        for item in &items {
            if !self.kind.accepts(item.kind()) {
                return Err(entitygraph_types::Error::InvalidContentType {
                    expected: self.kind.expected().to_string(),
                    actual: item.kind().to_string(),
                }
                .into());
            }
            if view.contains(item.as_str()) || !batch.insert(item.as_str()) {
                return Err(SyncError::DuplicateContent {
                    predicate: self.predicate.prefixed().to_string(),
                    value: item.as_str().to_string(),
                });
            }
        }

        for item in items {
            let value = item.into_string();
            if !self.removals.remove(&value) {
                self.added.insert(value.clone());
                self.additions.push(value);
            }
        }
        self.dirty = true;
        Ok(())
    }

    /// Removes values. Every item must be in the working view; details
    /// attached to a removed value are discarded.
    pub async fn remove<I, C>(&mut self, items: I) -> SyncResult<()>
    where
        I: IntoIterator<Item = C>,
        C: Into<Content>,
    {
        let items: Vec<String> = items
            .into_iter()
            .map(|c| c.into().into_string())
            .collect();
        self.ensure_snapshot().await?;

        let view: HashSet<String> = self.working_view().into_iter().collect();
        let mut batch = HashSet::new();
        for item in &items {
            if !view.contains(item) || !batch.insert(item.as_str()) {
                return Err(SyncError::ContentNotFound {
                    predicate: self.predicate.prefixed().to_string(),
                    value: item.clone(),
                });
            }
        }

        for value in items {
            if self.added.remove(&value) {
                self.additions.retain(|a| a != &value);
            } else {
                self.removals.insert(value.clone());
            }
            self.details.remove(&value);
        }
        self.dirty = true;
        Ok(())
    }

    /// Removes every value in the working view.
    pub async fn remove_all(&mut self) -> SyncResult<()> {
        let view = self.content().await?;
        if view.is_empty() {
            return Ok(());
        }
        self.remove(view).await
    }

    /// Makes `item` the only value.
    pub async fn replace(&mut self, item: impl Into<Content>) -> SyncResult<()> {
        let item = item.into();
        if !self.kind.accepts(item.kind()) {
            return Err(entitygraph_types::Error::InvalidContentType {
                expected: self.kind.expected().to_string(),
                actual: item.kind().to_string(),
            }
            .into());
        }
        self.remove_all().await?;
        self.add([item]).await
    }

    // ── Details ──────────────────────────────────────────────────

    /// The detail container for `key` on `value`, created on first access.
    ///
    /// `key` may be a bare local name (`confidence`), a prefixed key or a
    /// URI; it must be one of the allowed detail keys.
    pub async fn detail(&mut self, value: &str, key: &str) -> SyncResult<&mut DetailContainer> {
        let key = self.ctx.detail_key(key)?;
        self.require_present(value).await?;

        let ctx = self.ctx.clone();
        let entity_id = self.entity_id.clone();
        let predicate = self.predicate.clone();
        let registry = self.details.entry(value.to_string()).or_default();
        Ok(registry.get_or_insert_with(key.prefixed(), || {
            DetailContainer::new(ctx, entity_id, predicate, value, key.clone())
        }))
    }

    /// Instantiates a detail container for every allowed detail stored on
    /// `value`, and returns their keys.
    pub async fn load_details(&mut self, value: &str) -> SyncResult<Vec<PredicateKey>> {
        self.require_present(value).await?;
        let Some(id) = self.entity_id.clone() else {
            return Ok(Vec::new());
        };

        let records = self
            .ctx
            .api()
            .list_values(self.ctx.scope(), &id, self.predicate.prefixed())
            .await?;
        let identifier = self.ctx.value_identifier(&self.predicate, value);
        let Some(record) = find_record(&records, identifier.as_str(), value) else {
            return Ok(Vec::new());
        };

        let mut keys = Vec::new();
        for (local, raw) in &record.details {
            let Ok(key) = self.ctx.detail_key(local) else {
                debug!("Skipping unknown detail {} on {}", local, self.predicate);
                continue;
            };
            let registry = self.details.entry(value.to_string()).or_default();
            if !registry.contains(key.prefixed()) {
                let container = DetailContainer::new(
                    self.ctx.clone(),
                    Some(id.clone()),
                    self.predicate.clone(),
                    value,
                    key.clone(),
                )
                .with_remote(DetailContent::from_wire(raw));
                registry.get_or_insert_with(key.prefixed(), || container);
            }
            keys.push(key);
        }
        Ok(keys)
    }

    /// Detail keys instantiated for `value`.
    pub fn detail_keys(&self, value: &str) -> Vec<&str> {
        self.details
            .get(value)
            .map(|registry| registry.keys().collect())
            .unwrap_or_default()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Drops pending edits, details and the cached snapshot.
    pub fn reset(&mut self) {
        self.snapshot.reset();
        self.additions.clear();
        self.added.clear();
        self.removals.clear();
        self.details.clear();
        self.dirty = false;
    }

    /// Re-fetch on next access; pending edits are rebased onto the fresh
    /// snapshot.
    pub fn mark_stale(&mut self) {
        self.snapshot.mark_stale();
        for registry in self.details.values_mut() {
            for detail in registry.values_mut() {
                detail.mark_stale();
            }
        }
    }

    /// Adopts the working view as the new baseline.
    pub fn mark_saved(&mut self) {
        let view = self.working_view();
        self.snapshot.set(view);
        self.additions.clear();
        self.added.clear();
        self.removals.clear();
        self.dirty = false;
    }

    /// Attaches the container and its details to a created entity.
    pub fn bind(&mut self, entity_id: &str) {
        self.entity_id = Some(entity_id.to_string());
        for registry in self.details.values_mut() {
            for detail in registry.values_mut() {
                detail.bind(entity_id);
            }
        }
    }

    // ── Saving ───────────────────────────────────────────────────

    /// Sends removals, then additions, and adopts the result as baseline.
    pub(crate) async fn save(&mut self, report: &mut SaveReport) -> SyncResult<()> {
        if !self.dirty {
            return Ok(());
        }
        let Some(id) = self.entity_id.clone() else {
            return Err(SyncError::EntityNotPersisted);
        };
        self.ensure_snapshot().await?;
        if !self.has_changes() {
            self.dirty = false;
            return Ok(());
        }

        let removed = self.pending_removals();
        let added = self.additions.clone();
        let api = self.ctx.api();
        let scope = self.ctx.scope();
        let prefixed = self.predicate.prefixed();
        debug!(
            "Saving {} on {}: -{} +{}",
            prefixed,
            id,
            removed.len(),
            added.len()
        );

        match self.kind {
            PredicateKind::Value => {
                let language = self.ctx.language();
                for value in &removed {
                    let identifier = self.ctx.value_identifier(&self.predicate, value);
                    api.remove_value(scope, &id, prefixed, identifier.as_str(), language)
                        .await?;
                    report.values_removed += 1;
                }
                for value in &added {
                    api.add_value(scope, &id, prefixed, value, language).await?;
                    report.values_added += 1;
                }
            }
            PredicateKind::Relation => {
                for target in &removed {
                    api.delete_link(scope, &id, prefixed, target_id(target))
                        .await?;
                    report.links_deleted += 1;
                }
                for target in &added {
                    api.create_link(scope, &id, prefixed, target_id(target))
                        .await?;
                    report.links_created += 1;
                }
            }
        }

        self.mark_saved();
        Ok(())
    }

    /// Saves every changed detail of every value.
    pub(crate) async fn save_details(&mut self, report: &mut SaveReport) -> SyncResult<()> {
        for registry in self.details.values_mut() {
            for detail in registry.values_mut() {
                detail.save(report).await?;
            }
        }
        Ok(())
    }

    // ── Internals ────────────────────────────────────────────────

    async fn ensure_snapshot(&mut self) -> SyncResult<()> {
        if !self.snapshot.needs_fetch() {
            return Ok(());
        }
        let fresh = match &self.entity_id {
            Some(id) => self.fetch(id).await?,
            None => Vec::new(),
        };
        self.snapshot.set(fresh);
        self.rebase();
        Ok(())
    }

    async fn fetch(&self, id: &str) -> SyncResult<Vec<String>> {
        let api = self.ctx.api();
        let scope = self.ctx.scope();
        let prefixed = self.predicate.prefixed();
        debug!("Loading {} of {}", prefixed, id);
        let items: Vec<String> = match self.kind {
            PredicateKind::Value => api
                .list_values(scope, id, prefixed)
                .await?
                .into_iter()
                .map(|r| r.value)
                .collect(),
            PredicateKind::Relation => api.list_links(scope, id, prefixed).await?,
        };
        // Same literal in several languages collapses to one entry.
        let mut seen = HashSet::new();
        Ok(items
            .into_iter()
            .filter(|item| seen.insert(item.clone()))
            .collect())
    }

    /// Drops pending edits that the snapshot already reflects.
    fn rebase(&mut self) {
        let stored: HashSet<&String> = self
            .snapshot
            .last_known()
            .map(|s| s.iter().collect())
            .unwrap_or_default();
        self.additions.retain(|a| !stored.contains(a));
        self.removals.retain(|r| stored.contains(r));
        self.added = self.additions.iter().cloned().collect();
    }

    fn working_view(&self) -> Vec<String> {
        let stored = self.snapshot.last_known().map(Vec::as_slice).unwrap_or(&[]);
        stored
            .iter()
            .filter(|v| !self.removals.contains(*v))
            .chain(self.additions.iter())
            .cloned()
            .collect()
    }

    fn pending_removals(&self) -> Vec<String> {
        let stored = self.snapshot.last_known().map(Vec::as_slice).unwrap_or(&[]);
        stored
            .iter()
            .filter(|v| self.removals.contains(*v))
            .cloned()
            .collect()
    }

    async fn require_present(&mut self, value: &str) -> SyncResult<()> {
        if self.content().await?.iter().any(|v| v == value) {
            Ok(())
        } else {
            Err(SyncError::ContentNotFound {
                predicate: self.predicate.prefixed().to_string(),
                value: value.to_string(),
            })
        }
    }
}

/// The entity id a relation target points at: the part after the last `/`,
/// `#` or `:` of a reference, or the string itself.
pub fn target_id(target: &str) -> &str {
    target
        .rsplit(|c| matches!(c, '/' | '#' | ':'))
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(target)
}
