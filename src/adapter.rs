//! Per-request wrapper around one backend instance.
//!
//! The adapter owns the backend for the duration of a single request and
//! translates its handles into the positional model of [`crate::model`].

use futures::future::join_all;
use tracing::{debug, warn};

use crate::error::{GatewayError, Result};
use crate::model::{Episode, SearchResult, Stream, Title};
use crate::provider::{Provider, StreamSource};

/// At most this many stream sources are queried per episode.
pub const STREAM_SOURCE_LIMIT: usize = 5;

pub struct BackendAdapter {
    source: String,
    provider: Box<dyn Provider>,
}

impl BackendAdapter {
    pub fn new(source: impl Into<String>, provider: Box<dyn Provider>) -> Self {
        Self {
            source: source.into(),
            provider,
        }
    }

    /// Registry name of the source this adapter talks to.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Run the backend search and number the results in response order.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let items = self.provider.search(query).await?;
        debug!(source = %self.source, count = items.len(), "Search returned");
        Ok(items
            .into_iter()
            .enumerate()
            .map(|(position, item)| SearchResult::new(position, item))
            .collect())
    }

    pub async fn resolve_title(&self, result: &SearchResult) -> Result<Title> {
        let handle = result.handle.resolve_title().await?;
        if handle.is_none() {
            debug!(source = %self.source, position = result.position, "Backend returned no title");
        }
        Ok(Title::new(handle))
    }

    pub async fn list_episodes(&self, title: &Title) -> Result<Vec<Episode>> {
        let handle = title.handle.as_ref().ok_or_else(|| {
            GatewayError::Backend(anyhow::anyhow!(
                "{} returned no title to list episodes for",
                self.source
            ))
        })?;
        let episodes = handle.episodes().await?;
        debug!(source = %self.source, count = episodes.len(), "Episodes listed");
        Ok(episodes
            .into_iter()
            .enumerate()
            .map(|(position, handle)| Episode::new(position, handle))
            .collect())
    }

    /// Collect streams from the first [`STREAM_SOURCE_LIMIT`] stream sources.
    ///
    /// Sources are queried concurrently. A source that fails is dropped and
    /// the rest still contribute, in source order. Only a failure to
    /// enumerate the sources themselves is an error.
    pub async fn resolve_streams(&self, episode: &Episode) -> Result<Vec<Stream>> {
        let mut sources = episode.handle.stream_sources().await?;
        sources.truncate(STREAM_SOURCE_LIMIT);
        debug!(source = %self.source, players = sources.len(), "Resolving stream sources");

        let lookups = sources.iter().map(|s| s.streams());
        let results = join_all(lookups).await;

        let mut streams = Vec::new();
        for (player, result) in sources.iter().zip(results) {
            match result {
                Ok(found) => streams.extend(found.into_iter().map(Stream::from)),
                Err(e) => skip_player(&self.source, player.as_ref(), &e),
            }
        }
        Ok(streams)
    }
}

fn skip_player(source: &str, player: &dyn StreamSource, error: &anyhow::Error) {
    warn!(
        source,
        player = %player.label(),
        error = %format!("{error:#}"),
        "Stream source failed, skipping"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{EpisodeHandle, RawStream, SearchItem, TitleHandle};
    use anyhow::anyhow;
    use async_trait::async_trait;

    /// Scripted player: `None` fails, `Some(n)` yields `n` streams.
    struct Player(&'static str, Option<usize>);

    #[async_trait]
    impl StreamSource for Player {
        fn label(&self) -> String {
            self.0.to_string()
        }

        async fn streams(&self) -> anyhow::Result<Vec<RawStream>> {
            let count = self.1.ok_or_else(|| anyhow!("player {} is down", self.0))?;
            Ok((0..count)
                .map(|i| RawStream::new("m3u8", format!("{i}"), format!("https://{}/{i}", self.0)))
                .collect())
        }
    }

    struct Ep(Vec<(&'static str, Option<usize>)>);

    #[async_trait]
    impl EpisodeHandle for Ep {
        fn label(&self) -> String {
            "Episode".into()
        }

        async fn stream_sources(&self) -> anyhow::Result<Vec<Box<dyn StreamSource>>> {
            Ok(self
                .0
                .iter()
                .map(|&(name, n)| Box::new(Player(name, n)) as Box<dyn StreamSource>)
                .collect())
        }
    }

    struct Show(Option<&'static str>);

    #[async_trait]
    impl TitleHandle for Show {
        fn label(&self) -> String {
            self.0.unwrap_or_default().to_string()
        }

        async fn episodes(&self) -> anyhow::Result<Vec<Box<dyn EpisodeHandle>>> {
            Ok(vec![Box::new(Ep(vec![])), Box::new(Ep(vec![]))])
        }
    }

    struct Hit(&'static str, bool);

    #[async_trait]
    impl SearchItem for Hit {
        fn label(&self) -> String {
            self.0.to_string()
        }

        async fn resolve_title(&self) -> anyhow::Result<Option<Box<dyn TitleHandle>>> {
            Ok(self.1.then(|| Box::new(Show(Some(self.0))) as Box<dyn TitleHandle>))
        }
    }

    struct Catalog;

    #[async_trait]
    impl Provider for Catalog {
        fn name(&self) -> &'static str {
            "catalog"
        }

        async fn search(&self, _query: &str) -> anyhow::Result<Vec<Box<dyn SearchItem>>> {
            Ok(vec![
                Box::new(Hit("Naruto", true)),
                Box::new(Hit("Boruto", false)),
            ])
        }
    }

    fn adapter() -> BackendAdapter {
        BackendAdapter::new("animego", Box::new(Catalog))
    }

    fn episode(players: Vec<(&'static str, Option<usize>)>) -> Episode {
        Episode::new(0, Box::new(Ep(players)))
    }

    #[tokio::test]
    async fn search_numbers_results_densely() {
        let results = adapter().search("naruto").await.unwrap();
        let positions: Vec<_> = results.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![0, 1]);
        assert_eq!(results[1].title, "Boruto");
    }

    #[tokio::test]
    async fn missing_title_renders_unknown_and_cannot_list() {
        let adapter = adapter();
        let results = adapter.search("x").await.unwrap();
        let title = adapter.resolve_title(&results[1]).await.unwrap();
        assert_eq!(title.name, "Unknown");
        let err = adapter.list_episodes(&title).await.unwrap_err();
        assert!(matches!(err, GatewayError::Backend(_)));
    }

    #[tokio::test]
    async fn episodes_are_numbered_from_one() {
        let adapter = adapter();
        let results = adapter.search("x").await.unwrap();
        let title = adapter.resolve_title(&results[0]).await.unwrap();
        assert_eq!(title.name, "Naruto");
        let episodes = adapter.list_episodes(&title).await.unwrap();
        let numbers: Vec<_> = episodes.iter().map(|e| e.number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[tokio::test]
    async fn failing_sources_are_skipped_in_order() {
        let ep = episode(vec![("a", Some(1)), ("b", None), ("c", Some(2))]);
        let streams = adapter().resolve_streams(&ep).await.unwrap();
        let urls: Vec<_> = streams.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a/0", "https://c/0", "https://c/1"]);
    }

    #[tokio::test]
    async fn all_sources_failing_is_empty_not_error() {
        let ep = episode(vec![("a", None), ("b", None)]);
        let streams = adapter().resolve_streams(&ep).await.unwrap();
        assert!(streams.is_empty());
    }

    #[tokio::test]
    async fn only_first_five_sources_are_queried() {
        let players = vec![
            ("p1", Some(1)),
            ("p2", Some(1)),
            ("p3", Some(1)),
            ("p4", Some(1)),
            ("p5", Some(1)),
            ("p6", Some(1)),
            ("p7", Some(1)),
        ];
        let streams = adapter().resolve_streams(&episode(players)).await.unwrap();
        assert_eq!(streams.len(), STREAM_SOURCE_LIMIT);
        assert_eq!(streams.last().unwrap().url, "https://p5/0");
    }
}
