//! Catalog provider capability contract.
//!
//! A [`Provider`] knows how to walk one upstream catalog (AnimeGO,
//! AniLibria, AnimeVost) from a free-text query down to playable stream
//! descriptors. Every stage hands back opaque handles that know how to
//! continue the walk; nothing here is cached between requests.
//!
//! ```text
//! Provider::search ─► SearchItem::resolve_title ─► TitleHandle::episodes
//!     ─► EpisodeHandle::stream_sources ─► StreamSource::streams ─► RawStream
//! ```

#[cfg(feature = "animego")]
pub mod animego;
#[cfg(feature = "anilibria")]
pub mod anilibria;
#[cfg(feature = "animevost")]
pub mod animevost;

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

/// Stream descriptor as reported by a backend.
///
/// Every attribute is optional; the adapter fills in defaults when it
/// normalizes into [`Stream`](crate::model::Stream).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawStream {
    /// Container or protocol (e.g., `"m3u8"`, `"mp4"`).
    pub kind: Option<String>,
    /// Quality label (e.g., `"1080"`, `"720"`).
    pub quality: Option<String>,
    /// Playback URL.
    pub url: Option<String>,
    /// HTTP headers a player must send to fetch the media.
    pub headers: Option<HashMap<String, String>>,
}

impl RawStream {
    pub fn new(kind: impl Into<String>, quality: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            quality: Some(quality.into()),
            url: Some(url.into()),
            headers: None,
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), value.into());
        self
    }
}

/// Entry point of a catalog backend.
///
/// One instance is created per inbound request and dropped afterwards, so
/// implementors may hold session state (cookies, tokens) without worrying
/// about sharing it across requests.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short lowercase source name (e.g., `"animego"`).
    fn name(&self) -> &'static str;

    /// Search the catalog. Order is the upstream's native ranking.
    async fn search(&self, query: &str) -> Result<Vec<Box<dyn SearchItem>>>;
}

/// One candidate in a search response.
#[async_trait]
pub trait SearchItem: Send + Sync {
    /// Display label for the candidate.
    fn label(&self) -> String;

    /// Resolve the full title. `Ok(None)` means the upstream answered but
    /// had nothing to show for this candidate.
    async fn resolve_title(&self) -> Result<Option<Box<dyn TitleHandle>>>;
}

/// A resolved title whose episodes can be listed.
#[async_trait]
pub trait TitleHandle: Send + Sync {
    fn label(&self) -> String;

    /// Episodes in the upstream's order.
    async fn episodes(&self) -> Result<Vec<Box<dyn EpisodeHandle>>>;
}

/// One episode of a title.
#[async_trait]
pub trait EpisodeHandle: Send + Sync {
    fn label(&self) -> String;

    /// Redundant players/mirrors that can serve this episode.
    async fn stream_sources(&self) -> Result<Vec<Box<dyn StreamSource>>>;
}

/// A single player or mirror for an episode.
#[async_trait]
pub trait StreamSource: Send + Sync {
    /// Player name (e.g., dubbing studio or mirror host).
    fn label(&self) -> String;

    async fn streams(&self) -> Result<Vec<RawStream>>;
}
