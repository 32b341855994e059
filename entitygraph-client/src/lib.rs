//! Transport layer for the entitygraph API.
//!
//! The sync layer never talks HTTP directly. It issues [`Request`]s through
//! the [`Transport`] trait, which lets tests swap in
//! [`mock::MockTransport`] and production code use [`HttpTransport`].
//!
//! [`EntitiesApi`] is the thin wrapper that knows the endpoint paths, the
//! `X-Application` scope header and the media types of every call the sync
//! layer needs.
//!
//! # Example
//!
//! ```no_run
//! use entitygraph_client::{ClientConfig, EntitiesApi, HttpTransport};
//! use std::sync::Arc;
//!
//! # async fn run() -> entitygraph_client::ClientResult<()> {
//! let transport = HttpTransport::new(ClientConfig {
//!     api_key: "secret".to_string(),
//!     ..Default::default()
//! })?;
//! let api = EntitiesApi::new(Arc::new(transport));
//! let entity = api.read_entity("default", "abc123").await?;
//! println!("{entity}");
//! # Ok(())
//! # }
//! ```

mod api;
mod error;
mod http;
mod transport;

pub use api::{
    media, DetailAddress, EntitiesApi, PropertyRecord, ValueMetadata, ValueRecord, SCOPE_HEADER,
};
pub use error::{ClientError, ClientResult};
pub use http::{ClientConfig, HttpTransport, API_KEY_HEADER};
pub use transport::{mock, Method, Request, Response, Transport};
