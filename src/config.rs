//! Gateway configuration loaded from `~/.config/anigate/config.toml`.
//!
//! Every key is optional:
//!
//! ```toml
//! port = 5001
//!
//! [http]
//! timeout_secs = 30
//! connect_timeout_secs = 10
//! browser = "chrome"
//!
//! [sources.animego]
//! enabled = true
//! base_url = "https://animego.org"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Port used when neither the command line nor the config file names one.
pub const DEFAULT_PORT: u16 = 5001;

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Listen port. The bind address is always all interfaces.
    pub port: Option<u16>,
    pub http: HttpSettings,
    /// Per-source overrides keyed by source name.
    pub sources: HashMap<String, SourceSettings>,
}

/// Settings for the HTTP client each backend talks to its upstream with.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Browser whose request headers upstream requests imitate.
    pub browser: BrowserKind,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            browser: BrowserKind::Chrome,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chrome,
    Firefox,
    Random,
}

/// Per-source overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceSettings {
    /// A disabled source is never registered.
    pub enabled: bool,
    /// Replaces the backend's upstream origin.
    pub base_url: Option<String>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
        }
    }
}

impl Config {
    /// Load the configuration.
    ///
    /// With an explicit `path` the file must exist. Without one the default
    /// location is tried and a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let path = default_path();
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("invalid TOML in {}", path.display()))
    }

    /// Settings for `name`, or the defaults if the file does not mention it.
    pub fn source(&self, name: &str) -> SourceSettings {
        self.sources.get(name).cloned().unwrap_or_default()
    }

    /// Resolve the listen port: command line first, then file, then default.
    pub fn port(&self, cli_port: Option<u16>) -> u16 {
        cli_port.or(self.port).unwrap_or(DEFAULT_PORT)
    }
}

/// Return the path to the default config file.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("anigate")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.port.is_none());
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.http.browser, BrowserKind::Chrome);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn parse_source_overrides() {
        let config: Config = toml::from_str(
            r#"
port = 8080

[http]
browser = "firefox"

[sources.animevost]
enabled = false

[sources.animego]
base_url = "http://127.0.0.1:9000"
"#,
        )
        .unwrap();
        assert_eq!(config.port, Some(8080));
        assert_eq!(config.http.browser, BrowserKind::Firefox);
        assert_eq!(config.http.connect_timeout_secs, 10);
        assert!(!config.source("animevost").enabled);
        let animego = config.source("animego");
        assert!(animego.enabled);
        assert_eq!(animego.base_url.as_deref(), Some("http://127.0.0.1:9000"));
        assert!(config.source("anilibria").enabled);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str("prot = 1");
        assert!(result.is_err());
    }

    #[test]
    fn port_precedence() {
        let mut config = Config::default();
        assert_eq!(config.port(None), DEFAULT_PORT);
        config.port = Some(7000);
        assert_eq!(config.port(None), 7000);
        assert_eq!(config.port(Some(9000)), 9000);
    }

    #[test]
    fn load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 6001").unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.port, Some(6001));
    }

    #[test]
    fn load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(Some(&dir.path().join("absent.toml")));
        assert!(result.is_err());
    }
}
