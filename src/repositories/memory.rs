//! In-memory stores honoring the same uniqueness rules as the Postgres schema.

use crate::error::RepositoryError;
use crate::models::{Article, ArticleIdentity, ArticleRefresh, Holding, HoldingRef, ImpactLabel, NewArticle};
use crate::repositories::{ArticleStore, HoldingStore, RepositoryResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Retention order: publish time desc (absent last), then id desc
fn retention_order(a: &Article, b: &Article) -> Ordering {
    match (a.published_at, b.published_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| b.id.cmp(&a.id))
}

/// Whether `existing` would violate a unique index if `candidate` were inserted
fn conflicts(existing: &Article, candidate: &NewArticle) -> bool {
    if let Some(provider_id) = &candidate.provider_id {
        if existing.provider == candidate.provider && existing.provider_id.as_ref() == Some(provider_id) {
            return true;
        }
    }

    if let Some(url) = &candidate.url {
        if existing.url.as_ref() == Some(url) {
            return true;
        }
    }

    candidate.provider_id.is_none()
        && candidate.url.is_none()
        && existing.provider_id.is_none()
        && existing.url.is_none()
        && existing.symbol == candidate.symbol
        && existing.title == candidate.title
        && existing.published_at == candidate.published_at
}

/// Article store kept in process memory
#[derive(Default)]
pub struct MemoryArticleStore {
    articles: RwLock<Vec<Article>>,
}

impl MemoryArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put an article in place as-is, bypassing identity checks
    pub async fn seed(&self, article: Article) {
        self.articles.write().await.push(article);
    }

    /// Snapshot of every stored article
    pub async fn all(&self) -> Vec<Article> {
        self.articles.read().await.clone()
    }

    /// Snapshot of a symbol's articles in retention order
    pub async fn for_symbol(&self, symbol: &str) -> Vec<Article> {
        let mut rows: Vec<Article> = self
            .articles
            .read()
            .await
            .iter()
            .filter(|a| a.symbol == symbol)
            .cloned()
            .collect();
        rows.sort_by(retention_order);
        rows
    }
}

#[async_trait]
impl ArticleStore for MemoryArticleStore {
    async fn find_by_identity(&self, identity: &ArticleIdentity) -> RepositoryResult<Option<Article>> {
        let articles = self.articles.read().await;
        Ok(articles.iter().find(|a| identity.matches(a)).cloned())
    }

    async fn insert_if_absent(&self, article: &NewArticle) -> RepositoryResult<Option<Uuid>> {
        let mut articles = self.articles.write().await;
        if articles.iter().any(|existing| conflicts(existing, article)) {
            return Ok(None);
        }

        let stored = Article::from_new(article.clone());
        let id = stored.id;
        articles.push(stored);
        Ok(Some(id))
    }

    async fn refresh_if_newer(&self, id: Uuid, refresh: &ArticleRefresh) -> RepositoryResult<bool> {
        let mut articles = self.articles.write().await;
        let Some(article) = articles.iter_mut().find(|a| a.id == id) else {
            return Ok(false);
        };

        let newer = match (article.published_at, refresh.published_at) {
            (None, _) => true,
            (Some(current), Some(incoming)) => incoming > current,
            (Some(_), None) => false,
        };

        if newer {
            article.apply_refresh(refresh);
        }
        Ok(newer)
    }

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Article>> {
        let articles = self.articles.read().await;
        Ok(articles.iter().find(|a| a.id == id).cloned())
    }

    async fn list_by_symbol(&self, symbol: &str, limit: usize) -> RepositoryResult<Vec<Article>> {
        let mut rows = self.for_symbol(symbol).await;
        rows.truncate(limit);
        Ok(rows)
    }

    async fn ids_beyond_retention(&self, symbol: &str, keep: usize) -> RepositoryResult<Vec<Uuid>> {
        Ok(self
            .for_symbol(symbol)
            .await
            .into_iter()
            .skip(keep)
            .map(|a| a.id)
            .collect())
    }

    async fn delete_by_ids(&self, ids: &[Uuid]) -> RepositoryResult<u64> {
        let mut articles = self.articles.write().await;
        let before = articles.len();
        articles.retain(|a| !ids.contains(&a.id));
        Ok((before - articles.len()) as u64)
    }

    async fn count_by_symbol(&self, symbol: &str) -> RepositoryResult<u64> {
        let articles = self.articles.read().await;
        Ok(articles.iter().filter(|a| a.symbol == symbol).count() as u64)
    }

    async fn save_summary(
        &self,
        id: Uuid,
        summary: &str,
        rationale: &str,
        fetched_at: DateTime<Utc>,
    ) -> RepositoryResult<Option<Article>> {
        let mut articles = self.articles.write().await;
        Ok(articles.iter_mut().find(|a| a.id == id).map(|article| {
            article.summary = summary.to_string();
            article.rationale = rationale.to_string();
            article.fetched_at = fetched_at;
            article.clone()
        }))
    }

    async fn save_analysis(
        &self,
        id: Uuid,
        impact_label: Option<ImpactLabel>,
        impact_confidence: i32,
        rationale: &str,
    ) -> RepositoryResult<Option<Article>> {
        if !(0..=100).contains(&impact_confidence) {
            return Err(RepositoryError::ConstraintViolation(format!(
                "impact_confidence out of range: {}",
                impact_confidence
            )));
        }

        let mut articles = self.articles.write().await;
        Ok(articles.iter_mut().find(|a| a.id == id).map(|article| {
            article.impact_label = impact_label.map(String::from);
            article.impact_confidence = impact_confidence;
            article.rationale = rationale.to_string();
            article.clone()
        }))
    }
}

/// Holding store kept in process memory
#[derive(Default)]
pub struct MemoryHoldingStore {
    holdings: RwLock<Vec<Holding>>,
}

impl MemoryHoldingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from existing holdings, skipping uniqueness checks
    pub fn with_holdings(holdings: Vec<Holding>) -> Self {
        Self {
            holdings: RwLock::new(holdings),
        }
    }
}

#[async_trait]
impl HoldingStore for MemoryHoldingStore {
    async fn list_symbol_country(&self) -> RepositoryResult<Vec<HoldingRef>> {
        let holdings = self.holdings.read().await;
        Ok(holdings.iter().map(Holding::as_ref_pair).collect())
    }

    async fn find_by_user(&self, user_id: Uuid) -> RepositoryResult<Vec<Holding>> {
        let holdings = self.holdings.read().await;
        Ok(holdings.iter().filter(|h| h.user_id == user_id).cloned().collect())
    }

    async fn insert(&self, holding: &Holding) -> RepositoryResult<Holding> {
        let mut holdings = self.holdings.write().await;
        let duplicate = holdings.iter().any(|h| {
            h.user_id == holding.user_id && h.symbol == holding.symbol && h.country == holding.country
        });
        if duplicate {
            return Err(RepositoryError::Duplicate(format!(
                "{} ({}) already in portfolio",
                holding.symbol, holding.country
            )));
        }

        holdings.push(holding.clone());
        Ok(holding.clone())
    }

    async fn update(
        &self,
        user_id: Uuid,
        symbol: &str,
        country: &str,
        quantity: Option<Decimal>,
        avg_price: Option<Decimal>,
    ) -> RepositoryResult<Option<Holding>> {
        let mut holdings = self.holdings.write().await;
        Ok(holdings
            .iter_mut()
            .find(|h| h.user_id == user_id && h.symbol == symbol && h.country == country)
            .map(|holding| {
                if let Some(quantity) = quantity {
                    holding.quantity = quantity;
                }
                if avg_price.is_some() {
                    holding.avg_price = avg_price;
                }
                holding.updated_at = Utc::now();
                holding.clone()
            }))
    }

    async fn delete_by_symbol(&self, user_id: Uuid, symbol: &str) -> RepositoryResult<u64> {
        let mut holdings = self.holdings.write().await;
        let before = holdings.len();
        holdings.retain(|h| !(h.user_id == user_id && h.symbol == symbol));
        Ok((before - holdings.len()) as u64)
    }
}
