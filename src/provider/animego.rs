//! AnimeGO catalog provider (HTML scraping)
//!
//! AnimeGO has no public API. The walk goes through four pages:
//!
//! 1. `/search/anime?q=`: result cards
//! 2. the title page: display name and numeric id (`…/naruto-102`)
//! 3. `/anime/{id}/player?_allow=true` (XHR): episode bar
//! 4. `/anime/series?id={episode}` (XHR): one player embed per dubbing
//!
//! Each embed page is then searched for direct HLS/MP4 URLs.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;

use crate::config::HttpSettings;
use crate::http_client::CatalogClient;
use crate::provider::{EpisodeHandle, Provider, RawStream, SearchItem, StreamSource, TitleHandle};

pub const NAME: &str = "animego";
pub const DEFAULT_BASE_URL: &str = "https://animego.org";

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

static RESULT_CARD: Lazy<Selector> = Lazy::new(|| selector("div.animes-list-item"));
static RESULT_LINK: Lazy<Selector> = Lazy::new(|| selector("div.h5 a[href]"));
static TITLE_HEADING: Lazy<Selector> = Lazy::new(|| selector("div.anime-title h1"));
static EPISODE_ITEM: Lazy<Selector> = Lazy::new(|| selector("div.video-player-bar-series-item"));
static PLAYER_ITEM: Lazy<Selector> = Lazy::new(|| selector("span.video-player-toggle-item[data-player]"));

static TITLE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"-(\d+)/?$").expect("static regex"));
static MEDIA_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:https?:)?//[^\s"'<>\\]+?\.(m3u8|mp4)(?:\?[^\s"'<>\\]*)?"#).expect("static regex")
});
static QUALITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{3,4})p?\.(?:m3u8|mp4)").expect("static regex"));

pub struct AnimeGoProvider {
    client: CatalogClient,
}

impl AnimeGoProvider {
    pub fn new(http: &HttpSettings, base_url: Option<&str>) -> Result<Self> {
        let client = CatalogClient::new(base_url.unwrap_or(DEFAULT_BASE_URL), http)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Provider for AnimeGoProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn search(&self, query: &str) -> Result<Vec<Box<dyn SearchItem>>> {
        let request = self.client.get("/search/anime")?.query(&[("q", query)]);
        let html = self.client.text(request, "AnimeGO search").await?;

        Ok(parse_search(&html)
            .into_iter()
            .map(|(label, href)| {
                Box::new(AnimeGoHit {
                    client: self.client.clone(),
                    label,
                    href,
                }) as Box<dyn SearchItem>
            })
            .collect())
    }
}

struct AnimeGoHit {
    client: CatalogClient,
    label: String,
    href: String,
}

#[async_trait]
impl SearchItem for AnimeGoHit {
    fn label(&self) -> String {
        self.label.clone()
    }

    async fn resolve_title(&self) -> Result<Option<Box<dyn TitleHandle>>> {
        let id = title_id(&self.href)
            .with_context(|| format!("AnimeGO link without title id: {}", self.href))?;
        let html = self
            .client
            .text(self.client.get(&self.href)?, "AnimeGO title page")
            .await?;

        Ok(parse_title(&html).map(|name| {
            Box::new(AnimeGoTitle {
                client: self.client.clone(),
                id,
                name,
            }) as Box<dyn TitleHandle>
        }))
    }
}

struct AnimeGoTitle {
    client: CatalogClient,
    id: String,
    name: String,
}

#[async_trait]
impl TitleHandle for AnimeGoTitle {
    fn label(&self) -> String {
        self.name.clone()
    }

    async fn episodes(&self) -> Result<Vec<Box<dyn EpisodeHandle>>> {
        let request = self
            .client
            .get(&format!("/anime/{}/player", self.id))?
            .query(&[("_allow", "true")])
            .headers(self.client.xhr_headers());
        let fragment: Fragment = self.client.json(request, "AnimeGO episode list").await?;

        Ok(parse_episodes(&fragment.content)
            .into_iter()
            .map(|entry| {
                Box::new(AnimeGoEpisode {
                    client: self.client.clone(),
                    entry,
                }) as Box<dyn EpisodeHandle>
            })
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct EpisodeEntry {
    id: String,
    number: String,
    title: String,
}

struct AnimeGoEpisode {
    client: CatalogClient,
    entry: EpisodeEntry,
}

#[async_trait]
impl EpisodeHandle for AnimeGoEpisode {
    fn label(&self) -> String {
        if self.entry.title.is_empty() {
            format!("Episode {}", self.entry.number)
        } else {
            self.entry.title.clone()
        }
    }

    async fn stream_sources(&self) -> Result<Vec<Box<dyn StreamSource>>> {
        let request = self
            .client
            .get("/anime/series")?
            .query(&[("id", self.entry.id.as_str())])
            .headers(self.client.xhr_headers());
        let fragment: Fragment = self.client.json(request, "AnimeGO player list").await?;

        Ok(parse_players(&fragment.content)
            .into_iter()
            .map(|(label, embed)| {
                Box::new(AnimeGoPlayer {
                    client: self.client.clone(),
                    label,
                    embed,
                }) as Box<dyn StreamSource>
            })
            .collect())
    }
}

struct AnimeGoPlayer {
    client: CatalogClient,
    label: String,
    embed: String,
}

#[async_trait]
impl StreamSource for AnimeGoPlayer {
    fn label(&self) -> String {
        self.label.clone()
    }

    async fn streams(&self) -> Result<Vec<RawStream>> {
        let embed = self.client.url(&self.embed)?;
        let request = self
            .client
            .get(embed.as_str())?
            .header(reqwest::header::REFERER, self.client.base().as_str());
        let page = self.client.text(request, "AnimeGO player embed").await?;

        let streams = extract_media(&page, embed.as_str());
        if streams.is_empty() {
            return Err(anyhow!("no playable media in {} player", self.label));
        }
        Ok(streams)
    }
}

/// XHR responses wrap an HTML fragment.
#[derive(Debug, Deserialize)]
struct Fragment {
    #[serde(default)]
    content: String,
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// `(title, href)` for every result card, in page order.
fn parse_search(html: &str) -> Vec<(String, String)> {
    let document = Html::parse_document(html);
    document
        .select(&RESULT_CARD)
        .filter_map(|card| {
            let link = card.select(&RESULT_LINK).next()?;
            let href = link.value().attr("href")?.to_string();
            let title = link
                .value()
                .attr("title")
                .map(str::to_string)
                .unwrap_or_else(|| text_of(link));
            Some((title, href))
        })
        .collect()
}

fn parse_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document.select(&TITLE_HEADING).next().map(text_of)
}

fn title_id(href: &str) -> Option<String> {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    TITLE_ID.captures(path).map(|c| c[1].to_string())
}

fn parse_episodes(fragment: &str) -> Vec<EpisodeEntry> {
    let document = Html::parse_fragment(fragment);
    document
        .select(&EPISODE_ITEM)
        .filter_map(|item| {
            let attrs = item.value();
            Some(EpisodeEntry {
                id: attrs.attr("data-id")?.to_string(),
                number: attrs.attr("data-episode").unwrap_or_default().to_string(),
                title: attrs
                    .attr("data-episode-title")
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
            })
        })
        .collect()
}

/// `(label, embed URL)` for every player toggle.
fn parse_players(fragment: &str) -> Vec<(String, String)> {
    let document = Html::parse_fragment(fragment);
    document
        .select(&PLAYER_ITEM)
        .filter_map(|item| {
            let embed = item.value().attr("data-player")?.trim();
            if embed.is_empty() {
                return None;
            }
            let label = text_of(item);
            let label = if label.is_empty() { "player".to_string() } else { label };
            Some((label, embed.to_string()))
        })
        .collect()
}

/// Direct media URLs in an embed page, in page order, without repeats.
fn extract_media(page: &str, referer: &str) -> Vec<RawStream> {
    let page = page.replace("\\/", "/");
    let mut seen = Vec::new();
    let mut streams = Vec::new();

    for found in MEDIA_URL.captures_iter(&page) {
        let raw = &found[0];
        let url = if raw.starts_with("//") {
            format!("https:{raw}")
        } else {
            raw.to_string()
        };
        if seen.contains(&url) {
            continue;
        }
        seen.push(url.clone());

        let quality = QUALITY.captures(&url).map(|c| c[1].to_string());
        streams.push(RawStream {
            kind: Some(found[1].to_string()),
            quality,
            url: Some(url),
            headers: None,
        }
        .with_header("Referer", referer));
    }
    streams
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SEARCH_PAGE: &str = r#"
<html><body>
<div class="animes-list">
  <div class="animes-list-item media">
    <div class="media-body">
      <div class="h5 font-weight-normal mb-1">
        <a href="/anime/naruto-102" title="Наруто">Наруто</a>
      </div>
    </div>
  </div>
  <div class="animes-list-item media">
    <div class="h5 font-weight-normal mb-1"><a href="/anime/naruto-uragannye-hroniki-103">Наруто: Ураганные хроники</a></div>
  </div>
  <div class="animes-list-item media"><div class="h5">no link</div></div>
</div>
</body></html>"#;

    const TITLE_PAGE: &str = r#"<html><body><div class="anime-title"><div><h1> Наруто </h1></div></div></body></html>"#;

    const EPISODE_BAR: &str = r#"
<div class="video-player-bar">
  <div class="video-player-bar-series-item" data-episode="1" data-id="5001" data-episode-title="Узумаки Наруто"></div>
  <div class="video-player-bar-series-item" data-episode="2" data-id="5002" data-episode-title=""></div>
  <div class="video-player-bar-series-item" data-episode="3"></div>
</div>"#;

    fn players(server: &str) -> String {
        format!(
            r#"<div id="video-players">
  <span class="video-player-toggle-item" data-player="{server}/embed/broken"><span>Kodik</span></span>
  <span class="video-player-toggle-item" data-player="{server}/embed/ok"><span>AniBoom</span></span>
  <span class="video-player-toggle-item" data-player=""><span>Empty</span></span>
</div>"#
        )
    }

    const EMBED_PAGE: &str = r#"
<script>
var config = {"hls":"https:\/\/cdn.example\/video\/720.m3u8","fallback":"//cdn.example/video/480p.mp4"};
var again = "https://cdn.example/video/720.m3u8";
</script>"#;

    #[test]
    fn search_cards_in_page_order() {
        let results = parse_search(SEARCH_PAGE);
        assert_eq!(
            results,
            vec![
                ("Наруто".to_string(), "/anime/naruto-102".to_string()),
                (
                    "Наруто: Ураганные хроники".to_string(),
                    "/anime/naruto-uragannye-hroniki-103".to_string()
                ),
            ]
        );
    }

    #[test]
    fn title_id_from_link() {
        assert_eq!(title_id("https://animego.org/anime/naruto-102").as_deref(), Some("102"));
        assert_eq!(title_id("/anime/naruto-102/?tab=1").as_deref(), Some("102"));
        assert_eq!(title_id("/anime/naruto"), None);
    }

    #[test]
    fn episode_bar_entries() {
        let episodes = parse_episodes(EPISODE_BAR);
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].title, "Узумаки Наруто");
        assert_eq!(episodes[1].id, "5002");
        assert_eq!(episodes[1].number, "2");
    }

    #[test]
    fn media_urls_are_unescaped_and_deduplicated() {
        let streams = extract_media(EMBED_PAGE, "https://aniboom.one/embed/1");
        let urls: Vec<_> = streams.iter().map(|s| s.url.clone().unwrap()).collect();
        assert_eq!(
            urls,
            vec![
                "https://cdn.example/video/720.m3u8",
                "https://cdn.example/video/480p.mp4"
            ]
        );
        assert_eq!(streams[0].kind.as_deref(), Some("m3u8"));
        assert_eq!(streams[0].quality.as_deref(), Some("720"));
        assert_eq!(streams[1].quality.as_deref(), Some("480"));
        assert_eq!(
            streams[1].headers.as_ref().unwrap()["Referer"],
            "https://aniboom.one/embed/1"
        );
    }

    #[tokio::test]
    async fn full_walk_against_mock_site() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/anime"))
            .and(query_param("q", "naruto"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SEARCH_PAGE))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/anime/naruto-102"))
            .respond_with(ResponseTemplate::new(200).set_body_string(TITLE_PAGE))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/anime/102/player"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "status": "success", "content": EPISODE_BAR })),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/anime/series"))
            .and(query_param("id", "5001"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "status": "success", "content": players(&server.uri()) }),
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/embed/ok"))
            .respond_with(ResponseTemplate::new(200).set_body_string(EMBED_PAGE))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/embed/broken"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>captcha</html>"))
            .mount(&server)
            .await;

        let provider = AnimeGoProvider::new(&HttpSettings::default(), Some(&server.uri())).unwrap();
        let results = provider.search("naruto").await.unwrap();
        assert_eq!(results.len(), 2);

        let title = results[0].resolve_title().await.unwrap().unwrap();
        assert_eq!(title.label(), "Наруто");

        let episodes = title.episodes().await.unwrap();
        let labels: Vec<_> = episodes.iter().map(|e| e.label()).collect();
        assert_eq!(labels, vec!["Узумаки Наруто", "Episode 2"]);

        let sources = episodes[0].stream_sources().await.unwrap();
        let names: Vec<_> = sources.iter().map(|s| s.label()).collect();
        assert_eq!(names, vec!["Kodik", "AniBoom"]);

        assert!(sources[0].streams().await.is_err());
        assert_eq!(sources[1].streams().await.unwrap().len(), 2);
    }
}
