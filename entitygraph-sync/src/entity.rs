//! Entities and the create/save/delete protocol.

use crate::container::{target_id, PredicateContainer, PredicateKind};
use crate::context::StoreContext;
use crate::error::{SyncError, SyncResult};
use crate::registry::ContainerRegistry;
use entitygraph_types::PredicateKey;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

/// Lifecycle of an [`Entity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// Local only; types may still be added.
    Building,
    /// Known to the store.
    Persisted,
    /// Deleted from the store; no further operations are allowed.
    Deleted,
}

/// Remote calls issued by one [`Entity::create`] or [`Entity::save`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    pub entities_created: usize,
    pub values_added: usize,
    pub values_removed: usize,
    pub links_created: usize,
    pub links_deleted: usize,
    pub details_created: usize,
    pub details_deleted: usize,
}

impl SaveReport {
    /// Number of write calls.
    pub fn total(&self) -> usize {
        self.entities_created
            + self.values_added
            + self.values_removed
            + self.links_created
            + self.links_deleted
            + self.details_created
            + self.details_deleted
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// A node in the store together with its staged edits.
///
/// ```no_run
/// # use entitygraph_sync::{DetailContent, Entity, StoreContext, SyncResult};
/// # async fn run(ctx: StoreContext) -> SyncResult<()> {
/// let mut person = Entity::new(ctx);
/// person.add_type("sdo.Person")?;
/// person.values("sdo.name")?.add(["Ada"]).await?;
/// person.create().await?;
///
/// person.values("sdo.name")?.detail("Ada", "confidence").await?
///     .set_content(DetailContent::try_from(0.95)?).await?;
/// person.save().await?;
/// # Ok(())
/// # }
/// ```
pub struct Entity {
    ctx: StoreContext,
    id: Option<String>,
    types: Vec<String>,
    state: EntityState,
    values: ContainerRegistry<PredicateContainer>,
    relations: ContainerRegistry<PredicateContainer>,
}

impl Entity {
    /// A new, unsaved entity.
    pub fn new(ctx: StoreContext) -> Self {
        debug!("New entity in scope {}", ctx.scope());
        Self {
            ctx,
            id: None,
            types: Vec::new(),
            state: EntityState::Building,
            values: ContainerRegistry::new(),
            relations: ContainerRegistry::new(),
        }
    }

    /// Opens a stored entity, reading its types from the store.
    pub async fn load(ctx: StoreContext, id: &str) -> SyncResult<Self> {
        let doc = ctx.api().read_entity(ctx.scope(), id).await?;
        let types = entity_types(&doc);
        debug!("Loaded entity {} with {} types", id, types.len());
        Ok(Self::attach(ctx, id, types))
    }

    /// Opens a stored entity whose types the caller already knows.
    pub fn persisted<I, S>(ctx: StoreContext, id: &str, types: I) -> SyncResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut resolved = Vec::new();
        for t in types {
            let uri = ctx.namespaces().canonical_uri(t.as_ref())?;
            if !resolved.contains(&uri) {
                resolved.push(uri);
            }
        }
        Ok(Self::attach(ctx, id, resolved))
    }

    /// Identifiers of one page of the entities in the context's scope.
    pub async fn list_ids(
        ctx: &StoreContext,
        limit: usize,
        offset: usize,
    ) -> SyncResult<Vec<String>> {
        let doc = ctx.api().list_entities(ctx.scope(), limit, offset).await?;
        let mut ids: Vec<String> = Vec::new();
        for node in nodes(&doc) {
            let Some(raw) = node.get("@id").and_then(Value::as_str) else {
                continue;
            };
            let id = target_id(raw);
            if !ids.iter().any(|known| known == id) {
                ids.push(id.to_string());
            }
        }
        debug!("Listed {} entities in scope {}", ids.len(), ctx.scope());
        Ok(ids)
    }

    /// Loads one page of entities. With a `property`, that value container
    /// is opened on every entity and its stored values are read.
    pub async fn list(
        ctx: StoreContext,
        limit: usize,
        offset: usize,
        property: Option<&str>,
    ) -> SyncResult<Vec<Self>> {
        let ids = Self::list_ids(&ctx, limit, offset).await?;
        let mut entities = Vec::with_capacity(ids.len());
        for id in ids {
            let mut entity = Self::load(ctx.clone(), &id).await?;
            if let Some(property) = property {
                entity.values(property)?.snapshot().await?;
            }
            entities.push(entity);
        }
        Ok(entities)
    }

    fn attach(ctx: StoreContext, id: &str, types: Vec<String>) -> Self {
        Self {
            ctx,
            id: Some(id.to_string()),
            types,
            state: EntityState::Persisted,
            values: ContainerRegistry::new(),
            relations: ContainerRegistry::new(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The id without any scope qualifier: the part after the last `.`.
    pub fn key(&self) -> Option<&str> {
        self.id
            .as_deref()
            .map(|id| id.rsplit('.').next().unwrap_or(id))
    }

    pub fn state(&self) -> EntityState {
        self.state
    }

    /// Asserted types as full URIs.
    pub fn types(&self) -> &[String] {
        &self.types
    }

    pub fn scope(&self) -> &str {
        self.ctx.scope()
    }

    pub fn context(&self) -> &StoreContext {
        &self.ctx
    }

    /// Asserts a type, given as URI or prefixed key. Only new entities can
    /// gain types.
    pub fn add_type(&mut self, type_: &str) -> SyncResult<()> {
        match self.state {
            EntityState::Building => {}
            EntityState::Persisted => {
                return Err(SyncError::EntityAlreadyPersisted(self.id_string()));
            }
            EntityState::Deleted => return Err(SyncError::EntityDeleted(self.id_string())),
        }
        let uri = self.ctx.namespaces().canonical_uri(type_)?;
        if !self.types.contains(&uri) {
            self.types.push(uri);
        }
        Ok(())
    }

    /// The value container for a predicate, created on first access.
    pub fn values(&mut self, predicate: &str) -> SyncResult<&mut PredicateContainer> {
        self.container(predicate, PredicateKind::Value)
    }

    /// The relation container for a predicate, created on first access.
    pub fn relations(&mut self, predicate: &str) -> SyncResult<&mut PredicateContainer> {
        self.container(predicate, PredicateKind::Relation)
    }

    /// Prefixed keys of the value containers opened so far.
    pub fn value_predicates(&self) -> Vec<&str> {
        self.values.keys().collect()
    }

    pub fn relation_predicates(&self) -> Vec<&str> {
        self.relations.keys().collect()
    }

    fn container(
        &mut self,
        predicate: &str,
        kind: PredicateKind,
    ) -> SyncResult<&mut PredicateContainer> {
        if self.state == EntityState::Deleted {
            return Err(SyncError::EntityDeleted(self.id_string()));
        }
        let key = self.ctx.resolve(predicate)?;
        let registry = match kind {
            PredicateKind::Value => &mut self.values,
            PredicateKind::Relation => &mut self.relations,
        };
        let ctx = &self.ctx;
        let id = &self.id;
        Ok(registry.get_or_insert_with(key.prefixed(), || {
            PredicateContainer::new(ctx.clone(), id.clone(), key.clone(), kind)
        }))
    }

    /// Opens a value container for every predicate the store lists for this
    /// entity, and returns their keys.
    pub async fn load_value_predicates(&mut self) -> SyncResult<Vec<PredicateKey>> {
        let id = self.require_persisted()?;
        let properties = self
            .ctx
            .api()
            .list_value_properties(self.ctx.scope(), &id)
            .await?;

        let mut keys: Vec<PredicateKey> = Vec::new();
        for record in properties {
            let key = match self.ctx.resolve(&record.property) {
                Ok(key) => key,
                Err(e) => {
                    warn!("Skipping property {} of {}: {}", record.property, id, e);
                    continue;
                }
            };
            if keys.contains(&key) {
                continue;
            }
            self.values.get_or_insert_with(key.prefixed(), || {
                PredicateContainer::new(
                    self.ctx.clone(),
                    Some(id.clone()),
                    key.clone(),
                    PredicateKind::Value,
                )
            });
            keys.push(key);
        }
        Ok(keys)
    }

    // ── Create ───────────────────────────────────────────────────

    /// Creates the entity with its types, values and relations in one call,
    /// then writes any staged details.
    pub async fn create(&mut self) -> SyncResult<SaveReport> {
        match self.state {
            EntityState::Building => {}
            EntityState::Persisted => {
                return Err(SyncError::EntityAlreadyPersisted(self.id_string()));
            }
            EntityState::Deleted => return Err(SyncError::EntityDeleted(self.id_string())),
        }
        if self.types.is_empty() {
            return Err(SyncError::MissingTypes);
        }

        let mut value_items = Vec::new();
        for container in self.values.values_mut() {
            let added = container.new_content().await?;
            if !added.is_empty() {
                value_items.push((container.predicate().uri().to_string(), added));
            }
        }
        if value_items.is_empty() {
            return Err(SyncError::MissingValues);
        }
        let mut relation_items = Vec::new();
        for container in self.relations.values_mut() {
            let added = container.new_content().await?;
            if !added.is_empty() {
                relation_items.push((container.predicate().uri().to_string(), added));
            }
        }

        let payload = create_payload(
            &self.types,
            &value_items,
            &relation_items,
            self.ctx.language(),
        );
        let answer = self.ctx.api().create_entity(self.ctx.scope(), &payload).await?;
        let id = created_id(&answer, &self.types, self.ctx.namespaces())?;
        info!("Created entity {} in scope {}", id, self.ctx.scope());

        let mut report = SaveReport {
            entities_created: 1,
            ..Default::default()
        };
        for container in self
            .values
            .values_mut()
            .chain(self.relations.values_mut())
        {
            container.bind(&id);
            container.mark_saved();
        }
        self.id = Some(id);
        self.state = EntityState::Persisted;

        self.save_details(&mut report).await?;
        Ok(report)
    }

    // ── Save ─────────────────────────────────────────────────────

    /// Sends every staged change of a persisted entity: value removals and
    /// additions, then link deletions and creations, then details.
    ///
    /// Containers are marked saved as soon as their own calls succeed, so a
    /// failure part-way leaves the earlier containers clean and the rest
    /// pending.
    pub async fn save(&mut self) -> SyncResult<SaveReport> {
        self.require_persisted()?;
        let mut report = SaveReport::default();

        for container in self.values.values_mut() {
            container.save(&mut report).await?;
        }
        for container in self.relations.values_mut() {
            container.save(&mut report).await?;
        }
        self.save_details(&mut report).await?;

        if report.is_empty() {
            debug!("Nothing to save for {}", self.id_string());
        } else {
            info!(
                "Saved {}: +{} -{} values, +{} -{} links, +{} -{} details",
                self.id_string(),
                report.values_added,
                report.values_removed,
                report.links_created,
                report.links_deleted,
                report.details_created,
                report.details_deleted
            );
        }
        Ok(report)
    }

    async fn save_details(&mut self, report: &mut SaveReport) -> SyncResult<()> {
        for container in self
            .values
            .values_mut()
            .chain(self.relations.values_mut())
        {
            container.save_details(report).await?;
        }
        Ok(())
    }

    /// True when a save would issue at least one call.
    pub fn has_changes(&self) -> bool {
        self.values
            .iter()
            .chain(self.relations.iter())
            .any(|(_, c)| c.has_changes() || c.has_detail_changes())
    }

    /// Forces every container to re-read the store on next access.
    pub fn refresh(&mut self) {
        for container in self
            .values
            .values_mut()
            .chain(self.relations.values_mut())
        {
            container.mark_stale();
        }
    }

    /// Deletes the entity from the store.
    pub async fn delete(&mut self) -> SyncResult<()> {
        let id = self.require_persisted()?;
        self.ctx.api().delete_entity(self.ctx.scope(), &id).await?;
        self.state = EntityState::Deleted;
        info!("Deleted entity {} from scope {}", id, self.ctx.scope());
        Ok(())
    }

    fn require_persisted(&self) -> SyncResult<String> {
        match (self.state, &self.id) {
            (EntityState::Persisted, Some(id)) => Ok(id.clone()),
            (EntityState::Deleted, _) => Err(SyncError::EntityDeleted(self.id_string())),
            _ => Err(SyncError::EntityNotPersisted),
        }
    }

    fn id_string(&self) -> String {
        self.id.clone().unwrap_or_default()
    }
}

// ── JSON-LD ──────────────────────────────────────────────────────

/// The document sent to create an entity: types, literal values with their
/// language, and links as `@id` references.
pub fn create_payload(
    types: &[String],
    values: &[(String, Vec<String>)],
    relations: &[(String, Vec<String>)],
    language: Option<&str>,
) -> Value {
    let mut node = Map::new();
    node.insert("@type".to_string(), json!(types));
    for (uri, items) in values {
        let literals: Vec<Value> = items
            .iter()
            .map(|v| match language {
                Some(lang) => json!({"@value": v, "@language": lang}),
                None => json!({"@value": v}),
            })
            .collect();
        node.insert(uri.clone(), Value::Array(literals));
    }
    for (uri, targets) in relations {
        let links: Vec<Value> = targets.iter().map(|t| json!({"@id": t})).collect();
        node.insert(uri.clone(), Value::Array(links));
    }
    Value::Object(node)
}

/// Every node object in a JSON-LD document, depth first, following nested
/// `@graph` arrays.
fn nodes(doc: &Value) -> Vec<&Map<String, Value>> {
    let mut out = Vec::new();
    let mut stack = vec![doc];
    while let Some(v) = stack.pop() {
        match v {
            Value::Array(items) => stack.extend(items.iter().rev()),
            Value::Object(map) => {
                out.push(map);
                if let Some(graph) = map.get("@graph") {
                    stack.push(graph);
                }
            }
            _ => {}
        }
    }
    out
}

fn type_strings(node: &Map<String, Value>) -> Vec<&str> {
    match node.get("@type").or_else(|| node.get("type")) {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

/// Types of a stored entity as absolute URIs.
fn entity_types(doc: &Value) -> Vec<String> {
    let mut types: Vec<String> = Vec::new();
    for node in nodes(doc) {
        for t in type_strings(node) {
            if t.starts_with("http") && !types.iter().any(|known| known == t) {
                types.push(t.to_string());
            }
        }
    }
    types
}

/// Expands a compact IRI (`sdo:Person`) against the registered prefixes.
fn expand_type(namespaces: &entitygraph_types::NamespaceResolver, t: &str) -> String {
    if t.contains("://") {
        return t.to_string();
    }
    if let Some((prefix, local)) = t.split_once(':') {
        if let Some(base) = namespaces.base_uri(prefix) {
            return format!("{base}{local}");
        }
    }
    namespaces
        .canonical_uri(t)
        .unwrap_or_else(|_| t.to_string())
}

/// The identifier the store assigned: the local name of the first node that
/// carries one of the asserted types, or of the first identified node.
pub fn created_id(
    answer: &Value,
    types: &[String],
    namespaces: &entitygraph_types::NamespaceResolver,
) -> SyncResult<String> {
    let all = nodes(answer);
    let typed = all.iter().find(|node| {
        node.contains_key("@id")
            && type_strings(node)
                .iter()
                .any(|t| types.contains(&expand_type(namespaces, t)))
    });
    let node = match typed {
        Some(node) => node,
        None => {
            let fallback = all
                .iter()
                .find(|node| node.get("@id").and_then(Value::as_str).is_some())
                .ok_or_else(|| SyncError::Protocol("create response has no @id".into()))?;
            warn!("No node in create response carries an asserted type, using first @id");
            fallback
        }
    };
    let raw = node
        .get("@id")
        .and_then(Value::as_str)
        .ok_or_else(|| SyncError::Protocol("create response @id is not a string".into()))?;
    let local = raw
        .rsplit(|c| matches!(c, '/' | '#' | ':'))
        .next()
        .unwrap_or(raw);
    if local.is_empty() {
        return Err(SyncError::Protocol(format!("empty identifier in {raw}")));
    }
    Ok(local.to_string())
}
