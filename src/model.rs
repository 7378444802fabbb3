//! Normalized, request-scoped data model of the extraction pipeline.
//!
//! Backend handles are carried along so a later stage can continue the
//! walk, but they never leave the crate: callers only ever see positions
//! and display strings.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::provider::{EpisodeHandle, RawStream, SearchItem, TitleHandle};

/// Label rendered for a title the backend could not name.
pub const UNKNOWN_TITLE: &str = "Unknown";

/// Default for a missing stream `type` or `quality`.
pub const UNKNOWN_ATTRIBUTE: &str = "unknown";

/// One search candidate, addressed only by its position.
pub struct SearchResult {
    /// Zero-based position in the backend's response.
    pub position: usize,
    pub title: String,
    pub(crate) handle: Box<dyn SearchItem>,
}

/// A title resolved from a [`SearchResult`].
pub struct Title {
    pub name: String,
    pub(crate) handle: Option<Box<dyn TitleHandle>>,
}

/// One entry of a title's episode list.
pub struct Episode {
    /// Zero-based position in the episode list.
    pub position: usize,
    /// Always `position + 1`.
    pub number: usize,
    pub label: String,
    pub(crate) handle: Box<dyn EpisodeHandle>,
}

/// Playable stream descriptor returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stream {
    #[serde(rename = "type")]
    pub kind: String,
    pub quality: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
}

impl SearchResult {
    pub(crate) fn new(position: usize, handle: Box<dyn SearchItem>) -> Self {
        Self {
            position,
            title: handle.label(),
            handle,
        }
    }
}

impl Title {
    /// Build a title, falling back to [`UNKNOWN_TITLE`] when the backend
    /// returned nothing or an empty label.
    pub(crate) fn new(handle: Option<Box<dyn TitleHandle>>) -> Self {
        let name = handle
            .as_ref()
            .map(|h| h.label())
            .filter(|label| !label.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());
        Self { name, handle }
    }
}

impl Episode {
    pub(crate) fn new(position: usize, handle: Box<dyn EpisodeHandle>) -> Self {
        Self {
            position,
            number: position + 1,
            label: handle.label(),
            handle,
        }
    }
}

impl From<RawStream> for Stream {
    fn from(raw: RawStream) -> Self {
        Self {
            kind: raw.kind.unwrap_or_else(|| UNKNOWN_ATTRIBUTE.to_string()),
            quality: raw.quality.unwrap_or_else(|| UNKNOWN_ATTRIBUTE.to_string()),
            url: raw.url.unwrap_or_default(),
            headers: raw
                .headers
                .map(|h| h.into_iter().collect())
                .unwrap_or_default(),
        }
    }
}

impl fmt::Debug for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchResult")
            .field("position", &self.position)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Title")
            .field("name", &self.name)
            .field("resolved", &self.handle.is_some())
            .finish()
    }
}

impl fmt::Debug for Episode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Episode")
            .field("position", &self.position)
            .field("number", &self.number)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_defaults_missing_attributes() {
        let stream = Stream::from(RawStream::default());
        assert_eq!(stream.kind, "unknown");
        assert_eq!(stream.quality, "unknown");
        assert_eq!(stream.url, "");
        assert!(stream.headers.is_empty());
    }

    #[test]
    fn stream_serializes_kind_as_type() {
        let stream = Stream::from(
            RawStream::new("mp4", "720", "https://cdn.example/1.mp4")
                .with_header("Referer", "https://example.org/"),
        );
        let json = serde_json::to_value(&stream).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "mp4",
                "quality": "720",
                "url": "https://cdn.example/1.mp4",
                "headers": { "Referer": "https://example.org/" }
            })
        );
    }

    #[test]
    fn missing_title_is_unknown() {
        let title = Title::new(None);
        assert_eq!(title.name, UNKNOWN_TITLE);
        assert!(title.handle.is_none());
    }
}
