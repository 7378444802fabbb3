//! `anigate` - HTTP gateway over Russian-language anime catalogs
//!
//! # Features
//!
//! - **Source registry**: AnimeGO, AniLibria and AnimeVost backends, probed at startup
//! - **Extraction pipeline**: search → title → episodes → playable streams
//! - **Stateless API**: every call re-derives its position from `(query, indices)`
//! - **Browser fingerprinting**: realistic Chrome/Firefox headers for upstream requests
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use anigate::{Config, SourceRegistry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let registry = SourceRegistry::with_builtin(&config);
//!     anigate::server::serve(config.port(None), Arc::new(registry)).await
//! }
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod http_client;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod registry;
pub mod server;

pub use adapter::{BackendAdapter, STREAM_SOURCE_LIMIT};
pub use config::{BrowserKind, Config, HttpSettings, SourceSettings, DEFAULT_PORT};
pub use error::{GatewayError, Result};
pub use fingerprint::{chrome_profile, firefox_profile, BrowserProfile};
pub use http_client::CatalogClient;
pub use model::{Episode, SearchResult, Stream, Title};
pub use pipeline::{Pipeline, SEARCH_RESULT_LIMIT};
pub use provider::{EpisodeHandle, Provider, RawStream, SearchItem, StreamSource, TitleHandle};
pub use registry::{ProviderFactory, SourceRegistry};
pub use server::router;

/// Version of anigate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
