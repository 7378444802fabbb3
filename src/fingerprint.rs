//! Browser-like request headers for upstream catalogs.
//!
//! Several catalogs serve a stripped page (or a bot challenge) to clients
//! that do not look like a desktop browser. A [`BrowserProfile`] carries
//! the handful of headers that matter for that check.

use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, InvalidHeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};

use crate::config::BrowserKind;

/// Browser profile with realistic fingerprint
#[derive(Debug, Clone)]
pub struct BrowserProfile {
    pub user_agent: String,
    pub accept: String,
    pub accept_language: String,
    /// Empty for browsers that do not send client hints.
    pub sec_ch_ua: String,
    pub sec_ch_ua_platform: String,
}

/// Chrome versions with high market share (major, full)
const CHROME_VERSIONS: &[(&str, &str)] = &[
    ("131", "131.0.0.0"),
    ("130", "130.0.0.0"),
    ("129", "129.0.0.0"),
    ("128", "128.0.0.0"),
];

const FIREFOX_VERSIONS: &[&str] = &["133.0", "132.0", "131.0"];

/// The built-in catalogs are Russian-language sites.
const ACCEPT_LANGUAGES: &[&str] = &[
    "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7",
    "ru,en;q=0.9",
    "ru-RU,ru;q=0.9",
    "en-US,en;q=0.9,ru;q=0.8",
];

#[derive(Debug, Clone, Copy)]
enum Platform {
    MacOS,
    Windows,
    Linux,
}

impl Platform {
    fn random() -> Self {
        // Windows 65%, macOS 20%, Linux 15%
        let roll: f32 = rand::thread_rng().gen();
        if roll < 0.65 {
            Platform::Windows
        } else if roll < 0.85 {
            Platform::MacOS
        } else {
            Platform::Linux
        }
    }

    fn os_string(self) -> &'static str {
        match self {
            Platform::MacOS => "Macintosh; Intel Mac OS X 10_15_7",
            Platform::Windows => "Windows NT 10.0; Win64; x64",
            Platform::Linux => "X11; Linux x86_64",
        }
    }

    fn sec_ch_platform(self) -> &'static str {
        match self {
            Platform::MacOS => "\"macOS\"",
            Platform::Windows => "\"Windows\"",
            Platform::Linux => "\"Linux\"",
        }
    }
}

fn pick<'a>(items: &[&'a str]) -> &'a str {
    items.choose(&mut rand::thread_rng()).copied().unwrap_or(items[0])
}

/// Generate a Chrome profile.
#[must_use]
pub fn chrome_profile() -> BrowserProfile {
    let platform = Platform::random();
    let (major, full) = CHROME_VERSIONS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(CHROME_VERSIONS[0]);

    BrowserProfile {
        user_agent: format!(
            "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{full} Safari/537.36",
            platform.os_string()
        ),
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8".to_string(),
        accept_language: pick(ACCEPT_LANGUAGES).to_string(),
        sec_ch_ua: format!(
            "\"Google Chrome\";v=\"{major}\", \"Chromium\";v=\"{major}\", \"Not_A Brand\";v=\"24\""
        ),
        sec_ch_ua_platform: platform.sec_ch_platform().to_string(),
    }
}

/// Generate a Firefox profile. Firefox sends no client hints.
#[must_use]
pub fn firefox_profile() -> BrowserProfile {
    let platform = Platform::random();
    let version = pick(FIREFOX_VERSIONS);

    BrowserProfile {
        user_agent: format!(
            "Mozilla/5.0 ({}; rv:{version}) Gecko/20100101 Firefox/{version}",
            platform.os_string()
        ),
        accept: "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".to_string(),
        accept_language: pick(ACCEPT_LANGUAGES).to_string(),
        sec_ch_ua: String::new(),
        sec_ch_ua_platform: String::new(),
    }
}

/// Profile for the configured browser kind.
#[must_use]
pub fn profile_for(kind: BrowserKind) -> BrowserProfile {
    match kind {
        BrowserKind::Chrome => chrome_profile(),
        BrowserKind::Firefox => firefox_profile(),
        BrowserKind::Random => {
            // Chrome dominates desktop share
            if rand::thread_rng().gen_bool(0.8) {
                chrome_profile()
            } else {
                firefox_profile()
            }
        }
    }
}

impl BrowserProfile {
    /// Convert profile to reqwest `HeaderMap`.
    ///
    /// `Accept-Encoding` is left to reqwest so it matches the decoders
    /// actually compiled in.
    pub fn to_headers(&self) -> Result<HeaderMap, InvalidHeaderValue> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_str(&self.user_agent)?);
        headers.insert(ACCEPT, HeaderValue::from_str(&self.accept)?);
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_str(&self.accept_language)?);

        if !self.sec_ch_ua.is_empty() {
            headers.insert("Sec-CH-UA", HeaderValue::from_str(&self.sec_ch_ua)?);
            headers.insert("Sec-CH-UA-Mobile", HeaderValue::from_static("?0"));
            headers.insert(
                "Sec-CH-UA-Platform",
                HeaderValue::from_str(&self.sec_ch_ua_platform)?,
            );
        }

        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chrome_profile() {
        let profile = chrome_profile();
        assert!(profile.user_agent.contains("Chrome"));
        assert!(!profile.sec_ch_ua.is_empty());
    }

    #[test]
    fn test_firefox_profile() {
        let profile = firefox_profile();
        assert!(profile.user_agent.contains("Firefox"));
        assert!(profile.sec_ch_ua.is_empty());
    }

    #[test]
    fn test_headers_conversion() {
        let headers = chrome_profile().to_headers().unwrap();
        assert!(headers.contains_key(USER_AGENT));
        assert!(headers.contains_key(ACCEPT_LANGUAGE));
        assert!(headers.contains_key("Sec-CH-UA"));

        let headers = firefox_profile().to_headers().unwrap();
        assert!(!headers.contains_key("Sec-CH-UA"));
    }

    #[test]
    fn test_profile_for_kind() {
        assert!(profile_for(BrowserKind::Firefox).user_agent.contains("Firefox"));
        assert!(profile_for(BrowserKind::Chrome).user_agent.contains("Chrome"));
        assert!(profile_for(BrowserKind::Random).user_agent.starts_with("Mozilla/5.0"));
    }
}
