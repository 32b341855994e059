//! Staged editing of entitygraph entities.
//!
//! An [`Entity`] owns one [`PredicateContainer`] per predicate it touches.
//! Containers load the stored values lazily, stage additions and removals
//! locally, and send only the difference when the entity saves. Each value
//! can carry annotations through a [`DetailContainer`].
//!
//! All remote access goes through the [`StoreContext`], which wraps an
//! injected [`entitygraph_client::Transport`]:
//!
//! ```no_run
//! use entitygraph_client::{ClientConfig, HttpTransport};
//! use entitygraph_sync::{Entity, StoreContext, SyncConfig};
//! use entitygraph_types::NamespaceResolver;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::new(ClientConfig::default())?;
//! let ctx = StoreContext::new(
//!     Arc::new(transport),
//!     NamespaceResolver::with_defaults(),
//!     SyncConfig::with_scope("papers"),
//! )?;
//!
//! let mut paper = Entity::load(ctx, "a1b2c3").await?;
//! let keywords = paper.values("sdo.keywords")?;
//! keywords.remove(["physics"]).await?;
//! keywords.add(["math"]).await?;
//! let report = paper.save().await?;
//! println!("{} calls", report.total());
//! # Ok(())
//! # }
//! ```

mod config;
mod container;
mod context;
mod detail;
mod entity;
mod error;
mod registry;
mod state;

pub use config::{is_valid_language_tag, SyncConfig, DEFAULT_DETAIL_KEYS};
pub use container::{target_id, PredicateContainer, PredicateKind};
pub use context::StoreContext;
pub use detail::DetailContainer;
pub use entity::{create_payload, created_id, Entity, EntityState, SaveReport};
pub use error::{ErrorKind, SyncError, SyncResult};
pub use registry::ContainerRegistry;
pub use state::LoadState;

pub use entitygraph_types::{Content, DetailContent, NamespaceResolver, PredicateKey};
