//! Domain models for the stock news backend.
//!
//! Holdings describe what users own; articles are the persisted news
//! records attached to a symbol, and candidates are normalized provider
//! records that have not been persisted yet.

pub mod article;
pub mod holding;

// Re-export all models for convenient access
pub use article::{
    Article, ArticleCandidate, ArticleHeadline, ArticleIdentity, ArticleRefresh, ImpactLabel,
    NewArticle, TradeAction, ACTION_CONFIDENCE_THRESHOLD, DEFAULT_PROVIDER, UNTITLED,
};
pub use holding::{
    normalize_country, normalize_symbol, validate_country, Holding, HoldingRef, DEFAULT_COUNTRY,
};
