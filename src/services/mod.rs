pub mod analysis_service;
pub mod dedup;
pub mod news_fetcher;
pub mod news_service;
pub mod portfolio_service;
pub mod pruner;
pub mod scheduler;
pub mod upsert;

pub use analysis_service::{
    AnalysisInput, AnalysisOutput, AnalysisResult, ArticleAnalysisService, ImpactAnalyzer,
    SummaryInput, SummaryOutput, SummaryResult, SummarySource, Summarizer,
};
pub use dedup::IntraRunDeduplicator;
pub use news_fetcher::{FetchGroup, FetchOptions, NewsFetcher, RunError, RunStats};
pub use news_service::{FetchNowResponse, NewsService};
pub use portfolio_service::PortfolioService;
pub use pruner::RetentionPruner;
pub use scheduler::NewsScheduler;
pub use upsert::{UpsertOutcome, UpsertPolicy};
