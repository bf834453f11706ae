//! News provider adapters and the registry the fetcher iterates.
//!
//! A provider takes a query (the stock symbol), a country, a result limit and
//! an optional lower bound on publish time, and returns normalized
//! [`ArticleCandidate`]s. "No results" is an empty list, never an error.

pub mod marketaux;

pub use marketaux::MarketauxProvider;

use crate::config::NewsConfig;
use crate::error::ProviderError;
use crate::models::ArticleCandidate;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// External news source
#[async_trait]
pub trait NewsProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        country: &str,
        limit: usize,
        published_after: Option<DateTime<Utc>>,
    ) -> Result<Vec<ArticleCandidate>, ProviderError>;
}

/// One registered provider
#[derive(Clone)]
pub struct ProviderEntry {
    pub name: String,
    pub enabled: bool,
    pub provider: Arc<dyn NewsProvider>,
}

impl fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderEntry")
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Declarative description of a built-in provider
struct ProviderDescriptor {
    name: &'static str,
    /// Returns the credential when configured; presence enables the provider
    credential: fn(&NewsConfig) -> Option<&str>,
    build: fn(&NewsConfig) -> Result<Arc<dyn NewsProvider>, ProviderError>,
}

fn marketaux_credential(config: &NewsConfig) -> Option<&str> {
    config.marketaux_api_key.as_deref()
}

fn build_marketaux(config: &NewsConfig) -> Result<Arc<dyn NewsProvider>, ProviderError> {
    let provider = MarketauxProvider::new(
        config.marketaux_api_key.clone(),
        config.marketaux_base_url.clone(),
        config.provider_timeout(),
    )?;
    Ok(Arc::new(provider))
}

/// Built-in providers, in the order they are consulted
const BUILT_IN_PROVIDERS: &[ProviderDescriptor] = &[ProviderDescriptor {
    name: marketaux::PROVIDER_NAME,
    credential: marketaux_credential,
    build: build_marketaux,
}];

/// Ordered list of providers with their enabled flags
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    entries: Vec<ProviderEntry>,
}

impl ProviderRegistry {
    /// Empty registry; tests register fakes on it
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the built-in providers from configuration
    pub fn from_config(config: &NewsConfig) -> Result<Self, ProviderError> {
        let mut registry = Self::new();
        for descriptor in BUILT_IN_PROVIDERS {
            let enabled = (descriptor.credential)(config).is_some();
            let provider = (descriptor.build)(config)?;
            info!(
                provider = descriptor.name,
                enabled,
                "Registered news provider"
            );
            registry = registry.register(descriptor.name, provider, enabled);
        }
        Ok(registry)
    }

    /// Append a provider; registration order is consultation order
    pub fn register(
        mut self,
        name: impl Into<String>,
        provider: Arc<dyn NewsProvider>,
        enabled: bool,
    ) -> Self {
        self.entries.push(ProviderEntry {
            name: name.into(),
            enabled,
            provider,
        });
        self
    }

    pub fn entries(&self) -> &[ProviderEntry] {
        &self.entries
    }

    /// Enabled providers in registration order
    pub fn enabled(&self) -> impl Iterator<Item = &ProviderEntry> {
        self.entries.iter().filter(|entry| entry.enabled)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Silent;

    #[async_trait]
    impl NewsProvider for Silent {
        async fn search(
            &self,
            _query: &str,
            _country: &str,
            _limit: usize,
            _published_after: Option<DateTime<Utc>>,
        ) -> Result<Vec<ArticleCandidate>, ProviderError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_marketaux_disabled_without_key() {
        let registry = ProviderRegistry::from_config(&NewsConfig::default()).unwrap();
        assert_eq!(registry.entries().len(), 1);
        assert_eq!(registry.entries()[0].name, "marketaux");
        assert_eq!(registry.enabled().count(), 0);
    }

    #[test]
    fn test_marketaux_enabled_with_key() {
        let config = NewsConfig {
            marketaux_api_key: Some("token".into()),
            ..NewsConfig::default()
        };
        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert_eq!(registry.enabled().count(), 1);
    }

    #[test]
    fn test_registration_order_is_preserved() {
        let registry = ProviderRegistry::new()
            .register("first", Arc::new(Silent), true)
            .register("off", Arc::new(Silent), false)
            .register("second", Arc::new(Silent), true);

        let names: Vec<&str> = registry.enabled().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }
}
