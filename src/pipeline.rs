//! The four-stage extraction pipeline.
//!
//! ```text
//! Idle ─search─► Searched ─anime_index─► TitleResolved ─► EpisodesListed
//!                                   ─episode_index─► StreamsResolved
//! ```
//!
//! Nothing survives between calls. Every operation constructs a fresh
//! backend, re-runs the search with the caller's query and re-applies the
//! caller's indices, so the same indices may land on different items if
//! the upstream ranking changed in between.

use tracing::{debug, instrument};

use crate::adapter::BackendAdapter;
use crate::error::{GatewayError, Result};
use crate::model::{Episode, SearchResult, Stream, Title};
use crate::registry::SourceRegistry;

/// Search results surfaced directly to a caller are capped to this many.
pub const SEARCH_RESULT_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy)]
pub struct Pipeline<'a> {
    registry: &'a SourceRegistry,
}

impl<'a> Pipeline<'a> {
    pub fn new(registry: &'a SourceRegistry) -> Self {
        Self { registry }
    }

    fn adapter(&self, source: &str) -> Result<BackendAdapter> {
        let provider = self.registry.instantiate(source)?;
        Ok(BackendAdapter::new(source, provider))
    }

    /// Search `source` for `query`, returning at most [`SEARCH_RESULT_LIMIT`] results.
    #[instrument(skip(self))]
    pub async fn search(&self, source: &str, query: &str) -> Result<Vec<SearchResult>> {
        if query.is_empty() {
            return Err(GatewayError::invalid_input("Query parameter q is required"));
        }
        let adapter = self.adapter(source)?;
        let mut results = adapter.search(query).await?;
        results.truncate(SEARCH_RESULT_LIMIT);
        Ok(results)
    }

    /// Resolve the title at `anime_index` of the search for `query`.
    #[instrument(skip(self))]
    pub async fn anime(&self, source: &str, query: &str, anime_index: i64) -> Result<Title> {
        let adapter = self.adapter(source)?;
        let anime_index = position(anime_index, "anime_index")?;
        self.title_at(&adapter, query, anime_index).await
    }

    /// List the episodes of the title at `anime_index`.
    #[instrument(skip(self))]
    pub async fn episodes(&self, source: &str, query: &str, anime_index: i64) -> Result<Vec<Episode>> {
        let adapter = self.adapter(source)?;
        let anime_index = position(anime_index, "anime_index")?;
        let title = self.title_at(&adapter, query, anime_index).await?;
        adapter.list_episodes(&title).await
    }

    /// Resolve playable streams of episode `episode_index` of the title at `anime_index`.
    #[instrument(skip(self))]
    pub async fn video(
        &self,
        source: &str,
        query: &str,
        anime_index: i64,
        episode_index: i64,
    ) -> Result<Vec<Stream>> {
        let adapter = self.adapter(source)?;
        let anime_index = position(anime_index, "anime_index")?;
        let episode_index = position(episode_index, "episode_index")?;
        let title = self.title_at(&adapter, query, anime_index).await?;
        let episodes = adapter.list_episodes(&title).await?;
        let episode = select(&episodes, episode_index, "episode_index")?;
        debug!(number = episode.number, label = %episode.label, "Episode selected");
        adapter.resolve_streams(episode).await
    }

    async fn title_at(&self, adapter: &BackendAdapter, query: &str, anime_index: usize) -> Result<Title> {
        if query.is_empty() {
            debug!(source = adapter.source(), "Empty query passed through to backend");
        }
        // Deeper stages index into the full, untruncated result set.
        let results = adapter.search(query).await?;
        let result = select(&results, anime_index, "anime_index")?;
        adapter.resolve_title(result).await
    }
}

/// Positions are non-negative; there is no indexing from the end.
fn position(index: i64, field: &'static str) -> Result<usize> {
    usize::try_from(index)
        .map_err(|_| GatewayError::invalid_input(format!("{field} must be non-negative")))
}

fn select<'i, T>(items: &'i [T], index: usize, field: &'static str) -> Result<&'i T> {
    items.get(index).ok_or(GatewayError::IndexOutOfRange {
        field,
        index,
        len: items.len(),
    })
}
