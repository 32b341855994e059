//! Shared handle to the store.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use entitygraph_client::{EntitiesApi, Transport};
use entitygraph_types::{ContentIdentifier, NamespaceResolver, PredicateKey, PREFIX_SEPARATOR};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Everything an entity and its containers need to talk to the store:
/// the API wrapper, the namespace table and the sync settings.
///
/// Cheap to clone; every clone shares the same transport and resolver.
#[derive(Clone)]
pub struct StoreContext {
    api: EntitiesApi,
    namespaces: Arc<NamespaceResolver>,
    config: Arc<SyncConfig>,
}

impl StoreContext {
    pub fn new(
        transport: Arc<dyn Transport>,
        namespaces: NamespaceResolver,
        config: SyncConfig,
    ) -> SyncResult<Self> {
        config.validate()?;
        Ok(Self {
            api: EntitiesApi::new(transport),
            namespaces: Arc::new(namespaces),
            config: Arc::new(config),
        })
    }

    /// Default namespaces and settings over the given transport.
    pub fn with_defaults(transport: Arc<dyn Transport>) -> Self {
        Self {
            api: EntitiesApi::new(transport),
            namespaces: Arc::new(NamespaceResolver::with_defaults()),
            config: Arc::new(SyncConfig::default()),
        }
    }

    pub fn api(&self) -> &EntitiesApi {
        &self.api
    }

    pub fn namespaces(&self) -> &NamespaceResolver {
        &self.namespaces
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn scope(&self) -> &str {
        &self.config.scope
    }

    pub fn language(&self) -> Option<&str> {
        self.config.language.as_deref()
    }

    /// Resolves a predicate given as URI or prefixed key.
    pub fn resolve(&self, predicate: &str) -> SyncResult<PredicateKey> {
        Ok(self.namespaces.resolve(predicate)?)
    }

    /// Resolves a detail key. A bare local name (`confidence`) is taken to
    /// live under the configured detail prefix.
    pub fn detail_key(&self, key: &str) -> SyncResult<PredicateKey> {
        let qualified = if key.contains(PREFIX_SEPARATOR) || key.contains(':') {
            key.to_string()
        } else {
            format!("{}{}{}", self.config.detail_prefix, PREFIX_SEPARATOR, key)
        };
        let resolved = self
            .namespaces
            .resolve(&qualified)
            .map_err(|_| SyncError::InvalidDetailKey(key.to_string()))?;
        if resolved.prefix() != self.config.detail_prefix
            || !self.config.is_allowed_detail(resolved.local_name())
        {
            return Err(SyncError::InvalidDetailKey(key.to_string()));
        }
        Ok(resolved)
    }

    /// Identifier the store uses for one value of a predicate.
    pub fn value_identifier(&self, predicate: &PredicateKey, value: &str) -> ContentIdentifier {
        ContentIdentifier::from_canonical(predicate.uri(), value)
    }

    /// Runs a SPARQL select in this scope.
    pub async fn query(&self, sparql: &str) -> SyncResult<Vec<BTreeMap<String, String>>> {
        debug!("Running select in scope {}", self.scope());
        Ok(self.api.query_select(self.scope(), sparql).await?)
    }

    /// Reads one transaction of the store as JSON-LD.
    pub async fn transaction(&self, id: &str) -> SyncResult<Value> {
        Ok(self.api.read_transaction(id).await?)
    }

    /// One page of the store's transactions as JSON-LD.
    pub async fn transactions(&self, limit: usize, offset: usize) -> SyncResult<Value> {
        Ok(self.api.list_transactions(limit, offset).await?)
    }

    /// Lists the application scopes known to the store.
    pub async fn applications(&self, tag: Option<&str>) -> SyncResult<Vec<String>> {
        Ok(self.api.list_applications(tag).await?)
    }
}
