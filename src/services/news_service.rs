use crate::error::{AppError, AppResult};
use crate::models::{normalize_symbol, ArticleHeadline};
use crate::repositories::ArticleStore;
use crate::services::news_fetcher::{FetchOptions, NewsFetcher, RunStats};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_LIST_LIMIT: usize = 10;
pub const MAX_LIST_LIMIT: usize = 50;

/// Result of a manually triggered fetch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchNowResponse {
    pub ok: bool,
    pub message: String,
    pub stats: RunStats,
}

/// Read side for stored news plus the manual trigger
pub struct NewsService {
    articles: Arc<dyn ArticleStore>,
    fetcher: Arc<NewsFetcher>,
}

impl NewsService {
    pub fn new(articles: Arc<dyn ArticleStore>, fetcher: Arc<NewsFetcher>) -> Self {
        Self { articles, fetcher }
    }

    /// Latest headlines for a symbol, newest first
    pub async fn list_for_symbol(
        &self,
        symbol: &str,
        limit: Option<usize>,
    ) -> AppResult<Vec<ArticleHeadline>> {
        let symbol = normalize_symbol(symbol);
        if symbol.is_empty() {
            return Err(AppError::Validation("symbol is required".to_string()));
        }

        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);
        let articles = self.articles.list_by_symbol(&symbol, limit).await?;

        Ok(articles.iter().map(|a| a.headline()).collect())
    }

    /// Run the pipeline now and report its stats
    pub async fn fetch_now(&self, options: FetchOptions) -> FetchNowResponse {
        info!(limit = ?options.limit_per_symbol, "Manual news fetch requested");
        let stats = self.fetcher.run(options).await;

        FetchNowResponse {
            ok: true,
            message: "News fetch started/completed".to_string(),
            stats,
        }
    }
}
