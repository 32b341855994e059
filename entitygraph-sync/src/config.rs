//! Sync layer configuration.

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};

/// Detail keys the store accepts on values.
pub const DEFAULT_DETAIL_KEYS: [&str; 9] = [
    "confidence",
    "explanation",
    "model",
    "created",
    "status",
    "updated",
    "cosSimilarity",
    "method",
    "script",
];

/// Settings shared by every entity opened through one context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Application scope sent with every call.
    pub scope: String,
    /// Language tag attached to value writes. `None` sends no tag.
    pub language: Option<String>,
    /// Local names accepted as detail keys.
    pub allowed_details: Vec<String>,
    /// Namespace prefix detail keys live under.
    pub detail_prefix: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            scope: "default".to_string(),
            language: Some("en".to_string()),
            allowed_details: DEFAULT_DETAIL_KEYS.iter().map(|k| k.to_string()).collect(),
            detail_prefix: "eav".to_string(),
        }
    }
}

impl SyncConfig {
    pub fn with_scope(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            ..Default::default()
        }
    }

    pub fn is_allowed_detail(&self, local_name: &str) -> bool {
        self.allowed_details.iter().any(|k| k == local_name)
    }

    pub fn validate(&self) -> SyncResult<()> {
        match &self.language {
            Some(tag) if !is_valid_language_tag(tag) => {
                Err(SyncError::InvalidLanguageTag(tag.clone()))
            }
            _ => Ok(()),
        }
    }
}

/// Loose BCP 47 check: a 2-3 letter primary subtag followed by
/// alphanumeric subtags, at most 35 characters overall.
pub fn is_valid_language_tag(tag: &str) -> bool {
    if tag.is_empty() || tag.len() > 35 {
        return false;
    }
    let mut parts = tag.split('-');
    let primary_ok = parts
        .next()
        .is_some_and(|p| (2..=3).contains(&p.len()) && p.chars().all(|c| c.is_ascii_alphabetic()));
    primary_ok && parts.all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_alphanumeric()))
}
