//! News ingestion run.
//!
//! One run reads every holding, collapses them into unique (symbol, country)
//! groups and, group by group, consults the enabled providers in
//! registration order until the group's quota is met. Each provider batch is
//! cutoff-filtered, deduplicated within the group, then upserted. The group
//! ends with a retention prune. Recoverable failures are collected in
//! [`RunStats::errors`]; only failing to read holdings or to compute the
//! recency cutoff ends the run early.

use crate::config::NewsConfig;
use crate::error::ProviderError;
use crate::models::{normalize_country, ArticleCandidate, HoldingRef};
use crate::providers::{ProviderEntry, ProviderRegistry};
use crate::repositories::{ArticleStore, HoldingStore};
use crate::services::dedup::IntraRunDeduplicator;
use crate::services::pruner::RetentionPruner;
use crate::services::upsert::UpsertPolicy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

pub const READ_HOLDINGS_STAGE: &str = "read_holdings";
pub const CUTOFF_STAGE: &str = "cutoff";

/// Options accepted by a run
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FetchOptions {
    /// Per-group quota; falls back to the configured default
    pub limit_per_symbol: Option<usize>,
}

/// One recoverable failure seen during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    pub message: String,
}

impl RunError {
    pub fn stage(stage: &str, message: impl Into<String>) -> Self {
        Self {
            stage: Some(stage.to_string()),
            provider: None,
            symbol: None,
            message: message.into(),
        }
    }

    pub fn provider(provider: &str, symbol: &str, message: impl Into<String>) -> Self {
        Self {
            stage: None,
            provider: Some(provider.to_string()),
            symbol: Some(symbol.to_string()),
            message: message.into(),
        }
    }
}

/// Aggregate result of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub holdings_checked: usize,
    pub groups_checked: usize,
    /// Candidates returned by providers after the recency cutoff, before dedup
    pub total_fetched: usize,
    /// Newly inserted articles
    pub total_saved: usize,
    /// Existing articles refreshed with newer metadata
    pub total_updated: usize,
    pub total_pruned: u64,
    pub errors: Vec<RunError>,
}

/// Unique (symbol, country) pair fetched as a unit
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchGroup {
    pub symbol: String,
    pub country: String,
}

/// Collapse holdings into unique groups in first-seen order.
/// Symbols are trimmed, countries upper-cased with `IN` as default, and
/// blank symbols dropped.
pub fn group_holdings(holdings: &[HoldingRef]) -> Vec<FetchGroup> {
    let mut seen = HashSet::new();
    let mut groups = Vec::new();

    for holding in holdings {
        let symbol = holding.symbol.trim();
        if symbol.is_empty() {
            continue;
        }

        let group = FetchGroup {
            symbol: symbol.to_string(),
            country: normalize_country(holding.country.as_deref()),
        };
        if seen.insert(group.clone()) {
            groups.push(group);
        }
    }

    groups
}

/// Drop candidates with a missing publish time or one older than the cutoff
pub fn apply_cutoff(
    candidates: Vec<ArticleCandidate>,
    cutoff: Option<DateTime<Utc>>,
) -> Vec<ArticleCandidate> {
    let Some(cutoff) = cutoff else {
        return candidates;
    };

    candidates
        .into_iter()
        .filter(|c| c.published_at.is_some_and(|published| published >= cutoff))
        .collect()
}

/// Orchestrates a full ingestion run
pub struct NewsFetcher {
    holdings: Arc<dyn HoldingStore>,
    registry: ProviderRegistry,
    upsert: UpsertPolicy,
    pruner: RetentionPruner,
    default_limit: usize,
    keep_per_symbol: usize,
    lookback: Option<chrono::Duration>,
    provider_timeout: Duration,
    // Serializes runs inside one process
    run_lock: Mutex<()>,
}

impl NewsFetcher {
    pub fn new(
        holdings: Arc<dyn HoldingStore>,
        articles: Arc<dyn ArticleStore>,
        registry: ProviderRegistry,
        config: &NewsConfig,
    ) -> Self {
        Self {
            holdings,
            registry,
            upsert: UpsertPolicy::new(articles.clone()),
            pruner: RetentionPruner::new(articles),
            default_limit: config.fetch_limit_per_symbol,
            keep_per_symbol: config.keep_per_symbol,
            lookback: config.lookback(),
            provider_timeout: config.provider_timeout(),
            run_lock: Mutex::new(()),
        }
    }

    /// Set retention keep count
    pub fn with_keep_per_symbol(mut self, keep: usize) -> Self {
        self.keep_per_symbol = keep;
        self
    }

    /// Set recency window; `None` disables the cutoff
    pub fn with_lookback(mut self, lookback: Option<chrono::Duration>) -> Self {
        self.lookback = lookback;
        self
    }

    /// Set per provider call timeout
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn default_limit(&self) -> usize {
        self.default_limit
    }

    /// Run the pipeline once. Never fails; problems are reported in the stats.
    pub async fn run(&self, options: FetchOptions) -> RunStats {
        let _guard = self.run_lock.lock().await;
        let limit = options.limit_per_symbol.unwrap_or(self.default_limit).max(1);
        let mut stats = RunStats::default();

        let holdings = match self.holdings.list_symbol_country().await {
            Ok(holdings) => holdings,
            Err(e) => {
                let message = format!("Failed to read holdings: {}", e);
                error!("{}", message);
                stats.errors.push(RunError::stage(READ_HOLDINGS_STAGE, message));
                return stats;
            }
        };

        if holdings.is_empty() {
            info!("No holdings found, nothing to fetch");
            return stats;
        }
        stats.holdings_checked = holdings.len();

        let groups = group_holdings(&holdings);
        stats.groups_checked = groups.len();
        info!(
            holdings = stats.holdings_checked,
            groups = stats.groups_checked,
            limit,
            "Starting news fetch"
        );

        let cutoff = match self.lookback {
            None => None,
            Some(window) => match Utc::now().checked_sub_signed(window) {
                Some(cutoff) => Some(cutoff),
                None => {
                    let message = format!("Recency window of {} days is out of range", window.num_days());
                    error!("{}", message);
                    stats.errors.push(RunError::stage(CUTOFF_STAGE, message));
                    return stats;
                }
            },
        };

        let mut dedup = IntraRunDeduplicator::new();
        for group in &groups {
            dedup.reset();
            self.fetch_group(group, limit, cutoff, &mut dedup, &mut stats).await;

            match self.pruner.prune(&group.symbol, self.keep_per_symbol).await {
                Ok(deleted) => stats.total_pruned += deleted,
                Err(e) => error!(symbol = %group.symbol, error = %e, "Pruning failed"),
            }
        }

        info!(
            fetched = stats.total_fetched,
            saved = stats.total_saved,
            updated = stats.total_updated,
            pruned = stats.total_pruned,
            errors = stats.errors.len(),
            "News fetch finished"
        );
        stats
    }

    async fn fetch_group(
        &self,
        group: &FetchGroup,
        limit: usize,
        cutoff: Option<DateTime<Utc>>,
        dedup: &mut IntraRunDeduplicator,
        stats: &mut RunStats,
    ) {
        let mut accepted = 0usize;

        for entry in self.registry.enabled() {
            if accepted >= limit {
                break;
            }

            let candidates = match self.call_provider(entry, group, limit, cutoff).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!(provider = %entry.name, symbol = %group.symbol, error = %e, "Provider failed");
                    stats
                        .errors
                        .push(RunError::provider(&entry.name, &group.symbol, e.to_string()));
                    continue;
                }
            };

            let returned = candidates.len();
            let candidates = apply_cutoff(candidates, cutoff);
            if returned != candidates.len() {
                debug!(
                    provider = %entry.name,
                    symbol = %group.symbol,
                    dropped = returned - candidates.len(),
                    "Dropped candidates outside the recency window"
                );
            }
            stats.total_fetched += candidates.len();

            let mut fresh = dedup.preview(candidates);
            fresh.truncate(limit - accepted);

            for candidate in &fresh {
                // Only candidates handed to upsert are marked as seen
                dedup.accept(candidate);

                match self.upsert.upsert(&group.symbol, candidate).await {
                    Ok(outcome) => {
                        accepted += 1;
                        if outcome.inserted() {
                            stats.total_saved += 1;
                        }
                        if outcome.updated() {
                            stats.total_updated += 1;
                        }
                    }
                    Err(e) => {
                        warn!(provider = %entry.name, symbol = %group.symbol, error = %e, "Saving article failed");
                        stats.errors.push(RunError::provider(
                            &entry.name,
                            &group.symbol,
                            format!("persist failed: {}", e),
                        ));
                        break;
                    }
                }
            }

            debug!(provider = %entry.name, symbol = %group.symbol, accepted, "Provider pass complete");
        }
    }

    async fn call_provider(
        &self,
        entry: &ProviderEntry,
        group: &FetchGroup,
        limit: usize,
        cutoff: Option<DateTime<Utc>>,
    ) -> Result<Vec<ArticleCandidate>, ProviderError> {
        let call = entry
            .provider
            .search(&group.symbol, &group.country, limit, cutoff);

        match tokio::time::timeout(self.provider_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.provider_timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn test_group_holdings_dedupes_and_normalizes() {
        let holdings = vec![
            HoldingRef::new("ACME", Some("in")),
            HoldingRef::new(" ACME ", None),
            HoldingRef::new("ACME", Some("US")),
            HoldingRef::new("   ", Some("IN")),
            HoldingRef::new("FOO", Some("")),
        ];

        let groups = group_holdings(&holdings);
        assert_eq!(
            groups,
            vec![
                FetchGroup { symbol: "ACME".into(), country: "IN".into() },
                FetchGroup { symbol: "ACME".into(), country: "US".into() },
                FetchGroup { symbol: "FOO".into(), country: "IN".into() },
            ]
        );
    }

    #[test]
    fn test_cutoff_drops_old_and_undated() {
        let now = Utc::now();
        let recent = ArticleCandidate {
            title: "recent".into(),
            published_at: Some(now - ChronoDuration::days(1)),
            ..Default::default()
        };
        let stale = ArticleCandidate {
            title: "stale".into(),
            published_at: Some(now - ChronoDuration::days(100)),
            ..Default::default()
        };
        let undated = ArticleCandidate {
            title: "undated".into(),
            ..Default::default()
        };

        let kept = apply_cutoff(
            vec![recent, stale, undated],
            Some(now - ChronoDuration::days(90)),
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "recent");
    }

    #[test]
    fn test_no_cutoff_keeps_everything() {
        let undated = ArticleCandidate::default();
        assert_eq!(apply_cutoff(vec![undated], None).len(), 1);
    }

    #[test]
    fn test_run_error_serialization_skips_empty_fields() {
        let json = serde_json::to_value(RunError::provider("marketaux", "ACME", "boom")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"provider": "marketaux", "symbol": "ACME", "message": "boom"})
        );
    }
}
