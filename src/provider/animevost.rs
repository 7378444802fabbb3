//! AnimeVost catalog provider (JSON API v1)

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::HttpSettings;
use crate::http_client::CatalogClient;
use crate::provider::{EpisodeHandle, Provider, RawStream, SearchItem, StreamSource, TitleHandle};

pub const NAME: &str = "animevost";
pub const DEFAULT_BASE_URL: &str = "https://api.animevost.org";

pub struct AnimevostProvider {
    client: CatalogClient,
}

impl AnimevostProvider {
    pub fn new(http: &HttpSettings, base_url: Option<&str>) -> Result<Self> {
        let client = CatalogClient::new(base_url.unwrap_or(DEFAULT_BASE_URL), http)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Provider for AnimevostProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn search(&self, query: &str) -> Result<Vec<Box<dyn SearchItem>>> {
        let request = self.client.post("/v1/search")?.form(&[("name", query)]);
        let response: Envelope = self.client.json(request, "AnimeVost search").await?;

        Ok(response
            .data
            .into_iter()
            .map(|entry| {
                Box::new(AnimevostHit {
                    client: self.client.clone(),
                    entry,
                }) as Box<dyn SearchItem>
            })
            .collect())
    }
}

struct AnimevostHit {
    client: CatalogClient,
    entry: Entry,
}

#[async_trait]
impl SearchItem for AnimevostHit {
    fn label(&self) -> String {
        self.entry.title.clone()
    }

    async fn resolve_title(&self) -> Result<Option<Box<dyn TitleHandle>>> {
        let request = self
            .client
            .post("/v1/info")?
            .form(&[("id", self.entry.id.to_string())]);
        let response: Envelope = self.client.json(request, "AnimeVost info").await?;

        Ok(response.data.into_iter().next().map(|entry| {
            Box::new(AnimevostTitle {
                client: self.client.clone(),
                entry,
            }) as Box<dyn TitleHandle>
        }))
    }
}

struct AnimevostTitle {
    client: CatalogClient,
    entry: Entry,
}

#[async_trait]
impl TitleHandle for AnimevostTitle {
    fn label(&self) -> String {
        self.entry.title.clone()
    }

    async fn episodes(&self) -> Result<Vec<Box<dyn EpisodeHandle>>> {
        let request = self
            .client
            .post("/v1/playlist")?
            .form(&[("id", self.entry.id.to_string())]);
        let mut playlist: Vec<PlaylistItem> = self.client.json(request, "AnimeVost playlist").await?;

        // The playlist comes back in arbitrary order; "12 серия" sorts by its number.
        playlist.sort_by_key(|item| leading_number(&item.name).unwrap_or(u32::MAX));

        Ok(playlist
            .into_iter()
            .map(|item| Box::new(AnimevostEpisode { item }) as Box<dyn EpisodeHandle>)
            .collect())
    }
}

struct AnimevostEpisode {
    item: PlaylistItem,
}

#[async_trait]
impl EpisodeHandle for AnimevostEpisode {
    fn label(&self) -> String {
        self.item.name.clone()
    }

    async fn stream_sources(&self) -> Result<Vec<Box<dyn StreamSource>>> {
        Ok(vec![Box::new(AnimevostPlayer {
            item: self.item.clone(),
        })])
    }
}

struct AnimevostPlayer {
    item: PlaylistItem,
}

#[async_trait]
impl StreamSource for AnimevostPlayer {
    fn label(&self) -> String {
        "AnimeVost".to_string()
    }

    async fn streams(&self) -> Result<Vec<RawStream>> {
        let variants = [("720", &self.item.hd), ("480", &self.item.std)];
        Ok(variants
            .into_iter()
            .filter_map(|(quality, url)| {
                let url = url.as_deref().filter(|u| !u.is_empty())?;
                Some(RawStream::new("mp4", quality, url))
            })
            .collect())
    }
}

fn leading_number(name: &str) -> Option<u32> {
    let digits: String = name.trim().chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

// ── API payloads ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Vec<Entry>,
}

#[derive(Debug, Clone, Deserialize)]
struct Entry {
    id: u64,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Clone, Deserialize)]
struct PlaylistItem {
    #[serde(default)]
    name: String,
    std: Option<String>,
    hd: Option<String>,
}
