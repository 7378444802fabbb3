//! Process-wide table of catalog sources.
//!
//! The registry is built once at startup and only read afterwards, so it
//! is shared behind an `Arc` without any locking. Registration probes each
//! backend by constructing it once; a backend that cannot be constructed
//! (bad configuration, missing TLS roots, compiled-out feature) is logged
//! and left out instead of failing the whole build.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::{Config, HttpSettings};
use crate::error::GatewayError;
use crate::provider::Provider;

/// Constructs a fresh backend instance. Called once per request.
pub type ProviderFactory = Arc<dyn Fn() -> Result<Box<dyn Provider>> + Send + Sync>;

struct SourceEntry {
    name: String,
    factory: ProviderFactory,
}

/// Registered sources in registration order.
#[derive(Default)]
pub struct SourceRegistry {
    sources: Vec<SourceEntry>,
}

impl SourceRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every compiled-in backend that the
    /// configuration does not disable and that constructs successfully.
    #[must_use]
    pub fn with_builtin(config: &Config) -> Self {
        let mut registry = Self::new();

        #[cfg(feature = "animego")]
        registry.register_builtin(crate::provider::animego::NAME, config, |http, base| {
            crate::provider::animego::AnimeGoProvider::new(http, base)
        });

        #[cfg(feature = "anilibria")]
        registry.register_builtin(crate::provider::anilibria::NAME, config, |http, base| {
            crate::provider::anilibria::AnilibriaProvider::new(http, base)
        });

        #[cfg(feature = "animevost")]
        registry.register_builtin(crate::provider::animevost::NAME, config, |http, base| {
            crate::provider::animevost::AnimevostProvider::new(http, base)
        });

        info!(sources = ?registry.names(), "Source registry ready");
        registry
    }

    /// Register `name` if its factory can produce a backend right now.
    ///
    /// Returns whether the source was added. A failing probe or a duplicate
    /// name is logged and otherwise ignored.
    pub fn register_if_available<F>(&mut self, name: &str, factory: F) -> bool
    where
        F: Fn() -> Result<Box<dyn Provider>> + Send + Sync + 'static,
    {
        if self.contains(name) {
            warn!(source = name, "Source already registered, ignoring duplicate");
            return false;
        }

        match factory() {
            Ok(probe) => {
                debug!(source = name, backend = probe.name(), "Source available");
            }
            Err(e) => {
                warn!(source = name, error = %format!("{e:#}"), "Source unavailable, skipping");
                return false;
            }
        }

        self.sources.push(SourceEntry {
            name: name.to_string(),
            factory: Arc::new(factory),
        });
        true
    }

    #[cfg_attr(
        not(any(feature = "animego", feature = "anilibria", feature = "animevost")),
        allow(dead_code)
    )]
    fn register_builtin<P, C>(&mut self, name: &'static str, config: &Config, construct: C)
    where
        P: Provider + 'static,
        C: Fn(&HttpSettings, Option<&str>) -> Result<P> + Send + Sync + 'static,
    {
        let settings = config.source(name);
        if !settings.enabled {
            info!(source = name, "Source disabled by configuration");
            return;
        }

        let http = config.http.clone();
        let base_url = settings.base_url;
        self.register_if_available(name, move || {
            let provider = construct(&http, base_url.as_deref())?;
            Ok(Box::new(provider) as Box<dyn Provider>)
        });
    }

    /// Names of all registered sources, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.iter().any(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Look up the factory for `name`.
    pub fn factory(&self, name: &str) -> Result<&ProviderFactory, GatewayError> {
        self.sources
            .iter()
            .find(|s| s.name == name)
            .map(|s| &s.factory)
            .ok_or_else(|| GatewayError::InvalidSource {
                name: name.to_string(),
                available: self.names(),
            })
    }

    /// Construct a fresh backend for `name`.
    pub fn instantiate(&self, name: &str) -> Result<Box<dyn Provider>, GatewayError> {
        let factory = self.factory(name)?;
        Ok(factory()?)
    }
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.names())
            .finish()
    }
}
