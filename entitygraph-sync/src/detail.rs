//! Annotations on a single value.

use crate::context::StoreContext;
use crate::entity::SaveReport;
use crate::error::{SyncError, SyncResult};
use crate::state::LoadState;
use entitygraph_client::{DetailAddress, ValueRecord};
use entitygraph_types::{ContentIdentifier, DetailContent, PredicateKey};
use serde_json::Value;
use tracing::debug;

/// One detail (`eav.confidence`, `eav.model`, ...) of one value.
///
/// The remote annotation is fetched on first access. Writes are staged in
/// `current` until the owning entity saves.
pub struct DetailContainer {
    ctx: StoreContext,
    entity_id: Option<String>,
    predicate: PredicateKey,
    value: String,
    value_identifier: ContentIdentifier,
    key: PredicateKey,
    remote: LoadState<DetailContent>,
    current: Option<DetailContent>,
    dirty: bool,
    supersede: bool,
}

impl DetailContainer {
    pub fn new(
        ctx: StoreContext,
        entity_id: Option<String>,
        predicate: PredicateKey,
        value: impl Into<String>,
        key: PredicateKey,
    ) -> Self {
        let value = value.into();
        let value_identifier = ctx.value_identifier(&predicate, &value);
        Self {
            ctx,
            entity_id,
            predicate,
            value,
            value_identifier,
            key,
            remote: LoadState::NotLoaded,
            current: None,
            dirty: false,
            supersede: false,
        }
    }

    /// A container whose remote state is already known, e.g. from a value
    /// listing that carried the details inline.
    pub(crate) fn with_remote(mut self, remote: DetailContent) -> Self {
        self.remote = LoadState::Loaded(remote);
        self
    }

    pub fn key(&self) -> &PredicateKey {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn value_identifier(&self) -> &ContentIdentifier {
        &self.value_identifier
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether saving must delete the stored annotation first.
    pub fn supersede(&self) -> bool {
        self.supersede
    }

    /// The staged content, if it has been read or written.
    pub fn current(&self) -> Option<&DetailContent> {
        self.current.as_ref()
    }

    /// The stored annotation, fetching it if needed.
    pub async fn remote(&mut self) -> SyncResult<&DetailContent> {
        if self.remote.needs_fetch() {
            let fetched = self.fetch().await?;
            self.remote.set(fetched);
        }
        match &self.remote {
            LoadState::Loaded(content) => Ok(content),
            _ => Err(SyncError::Protocol("detail state not loaded".into())),
        }
    }

    /// The working content: staged if written, otherwise the stored one.
    pub async fn content(&mut self) -> SyncResult<DetailContent> {
        if self.current.is_none() {
            let remote = self.remote().await?.clone();
            self.current = Some(remote);
        }
        Ok(self.current.clone().unwrap_or_default())
    }

    /// Stages new content.
    pub async fn set_content(&mut self, content: DetailContent) -> SyncResult<()> {
        let remote_present = !self.remote().await?.is_empty();
        self.supersede = remote_present;
        self.current = Some(content);
        self.dirty = true;
        Ok(())
    }

    /// Stages content given as JSON; booleans, arrays and null are rejected.
    pub async fn set_json(&mut self, content: Value) -> SyncResult<()> {
        let content = DetailContent::try_from(content)?;
        self.set_content(content).await
    }

    /// Stages removal of the annotation.
    pub async fn remove_content(&mut self, require_existing: bool) -> SyncResult<()> {
        if !self.content().await?.is_empty() {
            let remote_present = !self.remote().await?.is_empty();
            self.current = Some(DetailContent::Empty);
            self.dirty = true;
            self.supersede = remote_present;
            return Ok(());
        }
        if require_existing {
            return Err(SyncError::DetailNotFound {
                detail: self.key.prefixed().to_string(),
                value: self.value.clone(),
            });
        }
        Ok(())
    }

    /// True when saving would issue at least one call. For an entity not
    /// yet created, only non-empty content counts.
    pub fn has_changes(&self) -> bool {
        if !self.dirty {
            return false;
        }
        let current = self.current.as_ref();
        if self.entity_id.is_none() {
            return current.is_some_and(|c| !c.is_empty());
        }
        let empty = DetailContent::Empty;
        let remote = self.remote.last_known().unwrap_or(&empty);
        current.unwrap_or(&empty) != remote
    }

    /// Adopts the staged content as the stored annotation.
    pub fn mark_saved(&mut self) {
        let saved = self.current.clone().unwrap_or_default();
        self.remote.set(saved);
        self.dirty = false;
        self.supersede = false;
    }

    /// Forces a re-fetch on next access. Staged edits are kept.
    pub fn mark_stale(&mut self) {
        self.remote.mark_stale();
        if !self.dirty {
            self.current = None;
        }
    }

    /// Attaches the container to a created entity.
    pub fn bind(&mut self, entity_id: &str) {
        self.entity_id = Some(entity_id.to_string());
    }

    /// Writes staged content to the store: delete the stored annotation when
    /// superseding, then create the new one unless it is empty.
    ///
    /// A stale remote annotation is re-read first, so an annotation stored by
    /// another writer since the edit is still deleted before the write.
    pub(crate) async fn save(&mut self, report: &mut SaveReport) -> SyncResult<()> {
        if self.dirty && self.entity_id.is_some() && self.remote.needs_fetch() {
            self.supersede = !self.remote().await?.is_empty();
        }
        if !self.has_changes() {
            self.dirty = false;
            return Ok(());
        }
        let Some(id) = self.entity_id.clone() else {
            return Err(SyncError::EntityNotPersisted);
        };
        let api = self.ctx.api();
        let scope = self.ctx.scope();
        let address = DetailAddress {
            predicate: self.predicate.prefixed(),
            detail: self.key.prefixed(),
            value_identifier: self.value_identifier.as_str(),
        };

        if self.supersede {
            api.delete_detail(scope, &id, &address).await?;
            report.details_deleted += 1;
        }

        let content = self.current.clone().unwrap_or_default();
        if !content.is_empty() {
            api.create_detail(scope, &id, &address, &content.to_wire(), content.media_type())
                .await?;
            report.details_created += 1;
        }

        self.mark_saved();
        Ok(())
    }

    async fn fetch(&self) -> SyncResult<DetailContent> {
        let Some(id) = &self.entity_id else {
            return Ok(DetailContent::Empty);
        };
        let records = match self
            .ctx
            .api()
            .list_values(self.ctx.scope(), id, self.predicate.prefixed())
            .await
        {
            Ok(records) => records,
            Err(e) if matches!(e.status(), Some(400) | Some(404)) => {
                debug!(
                    "No values for {} on {}, treating {} as empty",
                    self.predicate, id, self.key
                );
                return Ok(DetailContent::Empty);
            }
            Err(e) => return Err(e.into()),
        };
        Ok(find_record(&records, self.value_identifier.as_str(), &self.value)
            .and_then(|r| r.details.get(self.key.local_name()))
            .map(DetailContent::from_wire)
            .unwrap_or_default())
    }
}

/// The record for a value: matched by hash, or by value when the store sent
/// no hash.
pub(crate) fn find_record<'a>(
    records: &'a [ValueRecord],
    identifier: &str,
    value: &str,
) -> Option<&'a ValueRecord> {
    records.iter().find(|r| match &r.metadata.hash {
        Some(hash) => hash == identifier,
        None => r.value == value,
    })
}
