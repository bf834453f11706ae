//! Stock News Backend Library
//!
//! Portfolio-driven news ingestion: holdings are grouped by symbol and
//! country, news providers are queried per group, results are deduplicated
//! and upserted, and only the newest articles per symbol are retained.

pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod providers;
pub mod repositories;
pub mod services;

// Re-export commonly used types
pub use config::{AppConfig, NewsConfig};
pub use error::{AppError, AppResult};

use providers::ProviderRegistry;
use repositories::{
    ArticleRepository, ArticleStore, HoldingRepository, HoldingStore, MemoryArticleStore,
    MemoryHoldingStore,
};
use services::{NewsFetcher, NewsScheduler, NewsService, PortfolioService};
use std::sync::Arc;

/// Application state containing stores and services
pub struct AppState {
    pub holding_store: Arc<dyn HoldingStore>,
    pub article_store: Arc<dyn ArticleStore>,
    pub news_fetcher: Arc<NewsFetcher>,
    pub news_service: Arc<NewsService>,
    pub portfolio_service: Arc<PortfolioService>,
    pub scheduler: Arc<NewsScheduler>,
}

impl AppState {
    /// Create a new AppState backed by Postgres
    pub fn new(pool: sqlx::PgPool, config: &NewsConfig) -> AppResult<Self> {
        let registry = ProviderRegistry::from_config(config)
            .map_err(|e| AppError::Config(format!("Failed to build news providers: {}", e)))?;

        Ok(Self::from_stores(
            Arc::new(HoldingRepository::new(pool.clone())),
            Arc::new(ArticleRepository::new(pool)),
            registry,
            config,
        ))
    }

    /// Create an AppState on in-memory stores
    pub fn in_memory(registry: ProviderRegistry, config: &NewsConfig) -> Self {
        Self::from_stores(
            Arc::new(MemoryHoldingStore::new()),
            Arc::new(MemoryArticleStore::new()),
            registry,
            config,
        )
    }

    /// Wire services over the given stores
    pub fn from_stores(
        holding_store: Arc<dyn HoldingStore>,
        article_store: Arc<dyn ArticleStore>,
        registry: ProviderRegistry,
        config: &NewsConfig,
    ) -> Self {
        let news_fetcher = Arc::new(NewsFetcher::new(
            holding_store.clone(),
            article_store.clone(),
            registry,
            config,
        ));

        Self {
            holding_store: holding_store.clone(),
            article_store: article_store.clone(),
            news_service: Arc::new(NewsService::new(article_store, news_fetcher.clone())),
            portfolio_service: Arc::new(PortfolioService::new(holding_store)),
            scheduler: Arc::new(NewsScheduler::new(news_fetcher.clone(), &config.cron_schedule)),
            news_fetcher,
        }
    }
}
