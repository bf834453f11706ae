//! Storage access for holdings and articles.
//!
//! Services talk to the [`HoldingStore`] and [`ArticleStore`] traits; the
//! Postgres repositories back production, the in-memory stores back tests
//! and local runs without a database.

pub mod article_repository;
pub mod holding_repository;
pub mod memory;

// Re-export all repositories for convenient access
pub use article_repository::ArticleRepository;
pub use holding_repository::HoldingRepository;
pub use memory::{MemoryArticleStore, MemoryHoldingStore};

use crate::error::RepositoryError;
use crate::models::{Article, ArticleIdentity, ArticleRefresh, Holding, HoldingRef, ImpactLabel, NewArticle};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Portfolio holdings storage
#[async_trait]
pub trait HoldingStore: Send + Sync {
    /// Symbol + country of every holding across all users
    async fn list_symbol_country(&self) -> RepositoryResult<Vec<HoldingRef>>;

    /// Holdings of one user, oldest first
    async fn find_by_user(&self, user_id: Uuid) -> RepositoryResult<Vec<Holding>>;

    /// Insert a holding; a second row for the same (user, symbol, country) is a duplicate
    async fn insert(&self, holding: &Holding) -> RepositoryResult<Holding>;

    /// Update quantity and/or average price; `None` when no such holding
    async fn update(
        &self,
        user_id: Uuid,
        symbol: &str,
        country: &str,
        quantity: Option<Decimal>,
        avg_price: Option<Decimal>,
    ) -> RepositoryResult<Option<Holding>>;

    /// Delete every holding of `symbol` for the user, returning the count
    async fn delete_by_symbol(&self, user_id: Uuid, symbol: &str) -> RepositoryResult<u64>;
}

/// Article storage with the primitives the ingestion pipeline relies on
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Look up the article matching an identity filter
    async fn find_by_identity(&self, identity: &ArticleIdentity) -> RepositoryResult<Option<Article>>;

    /// Insert unless a row with a conflicting identity exists.
    /// Returns the new id, or `None` when the insert was skipped.
    async fn insert_if_absent(&self, article: &NewArticle) -> RepositoryResult<Option<Uuid>>;

    /// Write refreshed metadata if the stored publish time is absent or older.
    /// Returns whether a row changed.
    async fn refresh_if_newer(&self, id: Uuid, refresh: &ArticleRefresh) -> RepositoryResult<bool>;

    async fn find_by_id(&self, id: Uuid) -> RepositoryResult<Option<Article>>;

    /// Most recently published articles of a symbol
    async fn list_by_symbol(&self, symbol: &str, limit: usize) -> RepositoryResult<Vec<Article>>;

    /// Ids ranked after the first `keep` by publish time desc, then id desc
    async fn ids_beyond_retention(&self, symbol: &str, keep: usize) -> RepositoryResult<Vec<Uuid>>;

    async fn delete_by_ids(&self, ids: &[Uuid]) -> RepositoryResult<u64>;

    async fn count_by_symbol(&self, symbol: &str) -> RepositoryResult<u64>;

    /// Persist summarization output
    async fn save_summary(
        &self,
        id: Uuid,
        summary: &str,
        rationale: &str,
        fetched_at: DateTime<Utc>,
    ) -> RepositoryResult<Option<Article>>;

    /// Persist impact analysis output
    async fn save_analysis(
        &self,
        id: Uuid,
        impact_label: Option<ImpactLabel>,
        impact_confidence: i32,
        rationale: &str,
    ) -> RepositoryResult<Option<Article>>;
}
