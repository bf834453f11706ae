#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use stocknews_backend::config::NewsConfig;
use stocknews_backend::error::{ProviderError, RepositoryError};
use stocknews_backend::models::*;
use stocknews_backend::providers::{NewsProvider, ProviderRegistry};
use stocknews_backend::repositories::*;
use stocknews_backend::services::NewsFetcher;
use uuid::Uuid;

// ============================================================================
// Fixtures
// ============================================================================

/// A timestamp `days` days before now, inside the default recency window
pub fn days_ago(days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(days)
}

/// Candidate as a provider adapter would return it
pub fn candidate(
    provider: &str,
    provider_id: Option<&str>,
    url: Option<&str>,
    title: &str,
    published_at: Option<DateTime<Utc>>,
) -> ArticleCandidate {
    ArticleCandidate {
        title: title.to_string(),
        url: url.map(str::to_string),
        source: "wire".to_string(),
        provider: provider.to_string(),
        provider_id: provider_id.map(str::to_string),
        published_at,
        raw_text: format!("{} snippet", title),
        entities: Vec::new(),
        raw_payload: serde_json::json!({ "title": title }),
        country: "IN".to_string(),
        language: "en".to_string(),
    }
}

/// Holding store with one holding per (symbol, country) pair
pub fn holdings(pairs: &[(&str, Option<&str>)]) -> Arc<MemoryHoldingStore> {
    let user_id = Uuid::new_v4();
    let rows = pairs
        .iter()
        .map(|(symbol, country)| Holding::new(user_id, symbol, Decimal::ONE, None, *country))
        .collect();
    Arc::new(MemoryHoldingStore::with_holdings(rows))
}

/// News config with defaults and no provider credentials
pub fn news_config() -> NewsConfig {
    NewsConfig::default()
}

pub fn fetcher(
    holdings: Arc<dyn HoldingStore>,
    articles: Arc<dyn ArticleStore>,
    registry: ProviderRegistry,
) -> NewsFetcher {
    NewsFetcher::new(holdings, articles, registry, &news_config())
}

// ============================================================================
// Fake providers
// ============================================================================

/// Arguments a provider was called with
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCall {
    pub query: String,
    pub country: String,
    pub limit: usize,
    pub published_after: Option<DateTime<Utc>>,
}

/// Returns the same candidates on every call and records its calls
pub struct StaticProvider {
    results: Vec<ArticleCandidate>,
    pub calls: Mutex<Vec<SearchCall>>,
}

impl StaticProvider {
    pub fn new(results: Vec<ArticleCandidate>) -> Arc<Self> {
        Arc::new(Self {
            results,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl NewsProvider for StaticProvider {
    async fn search(
        &self,
        query: &str,
        country: &str,
        limit: usize,
        published_after: Option<DateTime<Utc>>,
    ) -> Result<Vec<ArticleCandidate>, ProviderError> {
        self.calls.lock().unwrap().push(SearchCall {
            query: query.to_string(),
            country: country.to_string(),
            limit,
            published_after,
        });
        Ok(self.results.clone())
    }
}

/// Fails for every query, or only for the listed symbols
pub struct FailingProvider {
    symbols: Option<HashSet<String>>,
    fallback: Vec<ArticleCandidate>,
    pub calls: AtomicUsize,
}

impl FailingProvider {
    pub fn always() -> Arc<Self> {
        Arc::new(Self {
            symbols: None,
            fallback: Vec::new(),
            calls: AtomicUsize::new(0),
        })
    }

    /// Fail for `symbols`, return `otherwise` for everything else
    pub fn for_symbols(symbols: &[&str], otherwise: Vec<ArticleCandidate>) -> Arc<Self> {
        Arc::new(Self {
            symbols: Some(symbols.iter().map(|s| s.to_string()).collect()),
            fallback: otherwise,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl NewsProvider for FailingProvider {
    async fn search(
        &self,
        query: &str,
        _country: &str,
        _limit: usize,
        _published_after: Option<DateTime<Utc>>,
    ) -> Result<Vec<ArticleCandidate>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let fails = self.symbols.as_ref().map_or(true, |s| s.contains(query));
        if fails {
            return Err(ProviderError::Status {
                status: 503,
                body: "upstream unavailable".to_string(),
            });
        }
        Ok(self.fallback.clone())
    }
}

/// Never answers within any reasonable timeout
pub struct HangingProvider;

#[async_trait]
impl NewsProvider for HangingProvider {
    async fn search(
        &self,
        _query: &str,
        _country: &str,
        _limit: usize,
        _published_after: Option<DateTime<Utc>>,
    ) -> Result<Vec<ArticleCandidate>, ProviderError> {
        tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }
}

// ============================================================================
// Fake stores
// ============================================================================

/// Holding store returning fixed symbol/country pairs as-is
pub struct RawHoldingStore {
    pub refs: Vec<HoldingRef>,
}

#[async_trait]
impl HoldingStore for RawHoldingStore {
    async fn list_symbol_country(&self) -> RepositoryResult<Vec<HoldingRef>> {
        Ok(self.refs.clone())
    }

    async fn find_by_user(&self, _user_id: Uuid) -> RepositoryResult<Vec<Holding>> {
        Ok(Vec::new())
    }

    async fn insert(&self, holding: &Holding) -> RepositoryResult<Holding> {
        Ok(holding.clone())
    }

    async fn update(
        &self,
        _user_id: Uuid,
        _symbol: &str,
        _country: &str,
        _quantity: Option<Decimal>,
        _avg_price: Option<Decimal>,
    ) -> RepositoryResult<Option<Holding>> {
        Ok(None)
    }

    async fn delete_by_symbol(&self, _user_id: Uuid, _symbol: &str) -> RepositoryResult<u64> {
        Ok(0)
    }
}

/// Holding store whose reads always fail
pub struct UnavailableHoldingStore;

#[async_trait]
impl HoldingStore for UnavailableHoldingStore {
    async fn list_symbol_country(&self) -> RepositoryResult<Vec<HoldingRef>> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }

    async fn find_by_user(&self, _user_id: Uuid) -> RepositoryResult<Vec<Holding>> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }

    async fn insert(&self, _holding: &Holding) -> RepositoryResult<Holding> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }

    async fn update(
        &self,
        _user_id: Uuid,
        _symbol: &str,
        _country: &str,
        _quantity: Option<Decimal>,
        _avg_price: Option<Decimal>,
    ) -> RepositoryResult<Option<Holding>> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }

    async fn delete_by_symbol(&self, _user_id: Uuid, _symbol: &str) -> RepositoryResult<u64> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }
}

/// Memory article store that can be told to fail inserts or pruning
#[derive(Default)]
pub struct FlakyArticleStore {
    pub inner: MemoryArticleStore,
    pub fail_insert_for: Mutex<HashSet<String>>,
    pub failing_inserts_left: Mutex<usize>,
    pub fail_prune: Mutex<bool>,
}

impl FlakyArticleStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_inserts_for(&self, symbol: &str) {
        self.fail_insert_for.lock().unwrap().insert(symbol.to_string());
    }

    pub fn fail_next_inserts(&self, count: usize) {
        *self.failing_inserts_left.lock().unwrap() = count;
    }

    pub fn fail_pruning(&self) {
        *self.fail_prune.lock().unwrap() = true;
    }
}

#[async_trait]
impl ArticleStore for FlakyArticleStore {
    async fn find_by_identity(&self, identity: &ArticleIdentity) -> RepositoryResult<Option<Article>> {
        self.inner.find_by_identity(identity).await
    }

    async fn insert_if_absent(&self, article: &NewArticle) -> RepositoryResult<Option<Uuid>> {
        let fail = self.fail_insert_for.lock().unwrap().contains(&article.symbol) || {
            let mut left = self.failing_inserts_left.lock().unwrap();
            let fail_once = *left > 0;
            if fail_once {
                *left -= 1;
            }
            fail_once
        };
        if fail {
            return Err(RepositoryError::Unavailable("disk full".to_string()));
        }
        self.inner.insert_if_absent(article).await
    }

    async fn refresh_if_newer(&self, id: Uuid, refresh: &ArticleRefresh) -> RepositoryResult<bool> {
        self.inner.refresh_if_newer(id, refresh).await
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Article>> {
        self.inner.find_by_id(id).await
    }

    async fn list_by_symbol(&self, symbol: &str, limit: usize) -> RepositoryResult<Vec<Article>> {
        self.inner.list_by_symbol(symbol, limit).await
    }

    async fn ids_beyond_retention(&self, symbol: &str, keep: usize) -> RepositoryResult<Vec<Uuid>> {
        let fail = *self.fail_prune.lock().unwrap();
        if fail {
            return Err(RepositoryError::Unavailable("lock timeout".to_string()));
        }
        self.inner.ids_beyond_retention(symbol, keep).await
    }

    async fn delete_by_ids(&self, ids: &[Uuid]) -> RepositoryResult<u64> {
        self.inner.delete_by_ids(ids).await
    }

    async fn count_by_symbol(&self, symbol: &str) -> RepositoryResult<u64> {
        self.inner.count_by_symbol(symbol).await
    }

    async fn save_summary(
        &self,
        id: Uuid,
        summary: &str,
        rationale: &str,
        fetched_at: DateTime<Utc>,
    ) -> RepositoryResult<Option<Article>> {
        self.inner.save_summary(id, summary, rationale, fetched_at).await
    }

    async fn save_analysis(
        &self,
        id: Uuid,
        impact_label: Option<ImpactLabel>,
        impact_confidence: i32,
        rationale: &str,
    ) -> RepositoryResult<Option<Article>> {
        self.inner
            .save_analysis(id, impact_label, impact_confidence, rationale)
            .await
    }
}

// ============================================================================
// Postgres
// ============================================================================

/// Repositories over a `#[sqlx::test]` pool
pub struct TestDatabase {
    pub pool: PgPool,
    pub holding_repo: Arc<HoldingRepository>,
    pub article_repo: Arc<ArticleRepository>,
}

impl TestDatabase {
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool: pool.clone(),
            holding_repo: Arc::new(HoldingRepository::new(pool.clone())),
            article_repo: Arc::new(ArticleRepository::new(pool)),
        }
    }
}
