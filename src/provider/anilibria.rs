//! AniLibria catalog provider (public JSON API v3)

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::HttpSettings;
use crate::http_client::CatalogClient;
use crate::provider::{EpisodeHandle, Provider, RawStream, SearchItem, StreamSource, TitleHandle};

pub const NAME: &str = "anilibria";
pub const DEFAULT_BASE_URL: &str = "https://api.anilibria.tv";

/// HLS variants in the order they are reported, with their quality label.
const HLS_VARIANTS: &[(&str, &str)] = &[("fhd", "1080"), ("hd", "720"), ("sd", "480")];

pub struct AnilibriaProvider {
    client: CatalogClient,
}

impl AnilibriaProvider {
    pub fn new(http: &HttpSettings, base_url: Option<&str>) -> Result<Self> {
        let client = CatalogClient::new(base_url.unwrap_or(DEFAULT_BASE_URL), http)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Provider for AnilibriaProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn search(&self, query: &str) -> Result<Vec<Box<dyn SearchItem>>> {
        let request = self
            .client
            .get("/v3/title/search")?
            .query(&[("search", query), ("filter", "id,names")]);
        let response: SearchResponse = self.client.json(request, "AniLibria search").await?;

        Ok(response
            .list
            .into_iter()
            .map(|title| {
                Box::new(AnilibriaHit {
                    client: self.client.clone(),
                    id: title.id,
                    label: title.names.display(),
                }) as Box<dyn SearchItem>
            })
            .collect())
    }
}

struct AnilibriaHit {
    client: CatalogClient,
    id: u64,
    label: String,
}

#[async_trait]
impl SearchItem for AnilibriaHit {
    fn label(&self) -> String {
        self.label.clone()
    }

    async fn resolve_title(&self) -> Result<Option<Box<dyn TitleHandle>>> {
        let request = self
            .client
            .get("/v3/title")?
            .query(&[("id", self.id.to_string())]);
        let title: Option<TitleData> = self.client.json(request, "AniLibria title").await?;
        Ok(title.map(|data| Box::new(AnilibriaTitle { data }) as Box<dyn TitleHandle>))
    }
}

struct AnilibriaTitle {
    data: TitleData,
}

#[async_trait]
impl TitleHandle for AnilibriaTitle {
    fn label(&self) -> String {
        self.data.names.display()
    }

    async fn episodes(&self) -> Result<Vec<Box<dyn EpisodeHandle>>> {
        let Some(player) = &self.data.player else {
            return Ok(Vec::new());
        };
        let host = player
            .host
            .clone()
            .with_context(|| format!("AniLibria title {} has no player host", self.data.id))?;

        Ok(player
            .list
            .ordered()
            .into_iter()
            .map(|episode| {
                Box::new(AnilibriaEpisode {
                    host: host.clone(),
                    episode,
                }) as Box<dyn EpisodeHandle>
            })
            .collect())
    }
}

struct AnilibriaEpisode {
    host: String,
    episode: PlayerEpisode,
}

#[async_trait]
impl EpisodeHandle for AnilibriaEpisode {
    fn label(&self) -> String {
        match (&self.episode.name, self.episode.episode) {
            (Some(name), _) if !name.trim().is_empty() => name.clone(),
            (_, Some(number)) => format!("Episode {number}"),
            _ => "Episode".to_string(),
        }
    }

    async fn stream_sources(&self) -> Result<Vec<Box<dyn StreamSource>>> {
        Ok(vec![Box::new(AnilibriaPlayer {
            host: self.host.clone(),
            hls: self.episode.hls.clone(),
        })])
    }
}

struct AnilibriaPlayer {
    host: String,
    hls: BTreeMap<String, Option<String>>,
}

#[async_trait]
impl StreamSource for AnilibriaPlayer {
    fn label(&self) -> String {
        "AniLibria".to_string()
    }

    async fn streams(&self) -> Result<Vec<RawStream>> {
        let streams: Vec<RawStream> = HLS_VARIANTS
            .iter()
            .filter_map(|(key, quality)| {
                let path = self.hls.get(*key)?.as_deref()?;
                Some(RawStream::new("m3u8", *quality, media_url(&self.host, path)))
            })
            .collect();
        Ok(streams)
    }
}

/// Player paths are host-relative; some mirrors already return full URLs.
fn media_url(host: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        format!("https://{}/{}", host.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

// ── API payloads ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    list: Vec<TitleData>,
}

#[derive(Debug, Clone, Deserialize)]
struct TitleData {
    id: u64,
    #[serde(default)]
    names: Names,
    #[serde(default)]
    player: Option<Player>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Names {
    ru: Option<String>,
    en: Option<String>,
}

impl Names {
    fn display(&self) -> String {
        self.ru
            .as_deref()
            .or(self.en.as_deref())
            .unwrap_or_default()
            .to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Player {
    host: Option<String>,
    #[serde(default)]
    list: EpisodeList,
}

/// The API returns episodes keyed by number, or an array for older titles.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum EpisodeList {
    Keyed(BTreeMap<String, PlayerEpisode>),
    Sequence(Vec<PlayerEpisode>),
}

impl Default for EpisodeList {
    fn default() -> Self {
        Self::Sequence(Vec::new())
    }
}

impl EpisodeList {
    /// Episodes by ascending episode number. Keyed maps sort as strings,
    /// so "10" would come before "2" without this.
    fn ordered(&self) -> Vec<PlayerEpisode> {
        let mut episodes: Vec<PlayerEpisode> = match self {
            Self::Keyed(map) => map.values().cloned().collect(),
            Self::Sequence(list) => list.clone(),
        };
        episodes.sort_by(|a, b| {
            let a = a.episode.unwrap_or(f64::MAX);
            let b = b.episode.unwrap_or(f64::MAX);
            a.total_cmp(&b)
        });
        episodes
    }
}

#[derive(Debug, Clone, Deserialize)]
struct PlayerEpisode {
    episode: Option<f64>,
    name: Option<String>,
    #[serde(default)]
    hls: BTreeMap<String, Option<String>>,
}
