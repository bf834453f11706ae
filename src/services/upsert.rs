use crate::error::RepositoryError;
use crate::models::{ArticleCandidate, ArticleIdentity, ArticleRefresh, NewArticle};
use crate::repositories::ArticleStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// What the policy did with a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    /// First sighting, stored with empty analysis fields
    Inserted,
    /// Existing record refreshed with newer metadata
    Updated,
    /// Existing record is as new or newer
    Unchanged,
}

impl UpsertOutcome {
    pub fn inserted(&self) -> bool {
        matches!(self, UpsertOutcome::Inserted)
    }

    pub fn updated(&self) -> bool {
        matches!(self, UpsertOutcome::Updated)
    }
}

/// A candidate is newer when the stored record has no publish time, or the
/// candidate's publish time is strictly later. Equal timestamps do not update.
pub fn is_newer(incoming: Option<DateTime<Utc>>, existing: Option<DateTime<Utc>>) -> bool {
    match (existing, incoming) {
        (None, _) => true,
        (Some(current), Some(candidate)) => candidate > current,
        (Some(_), None) => false,
    }
}

/// Insert-or-refresh decisions for normalized candidates
pub struct UpsertPolicy {
    store: Arc<dyn ArticleStore>,
}

impl UpsertPolicy {
    pub fn new(store: Arc<dyn ArticleStore>) -> Self {
        Self { store }
    }

    /// Insert a first sighting, refresh an older record, or leave it alone.
    ///
    /// The insert goes through the store's insert-if-absent primitive so
    /// concurrent runs cannot create a second row for the same identity. The
    /// refresh never touches summary, key facts, rationale or impact fields.
    pub async fn upsert(
        &self,
        symbol: &str,
        candidate: &ArticleCandidate,
    ) -> Result<UpsertOutcome, RepositoryError> {
        let new_article = NewArticle::from_candidate(symbol, candidate, Utc::now());
        let identity = ArticleIdentity::resolve(&new_article);

        let existing = match self.store.find_by_identity(&identity).await? {
            Some(existing) => existing,
            None => {
                if let Some(id) = self.store.insert_if_absent(&new_article).await? {
                    debug!(symbol, %id, identity = identity.kind(), "Inserted article");
                    return Ok(UpsertOutcome::Inserted);
                }

                // Another writer got there first, or a secondary unique key matched
                match self.store.find_by_identity(&identity).await? {
                    Some(existing) => existing,
                    None => {
                        debug!(symbol, identity = identity.kind(), "Insert skipped on conflicting key");
                        return Ok(UpsertOutcome::Unchanged);
                    }
                }
            }
        };

        if !is_newer(new_article.published_at, existing.published_at) {
            return Ok(UpsertOutcome::Unchanged);
        }

        let refresh = ArticleRefresh::from_new(&new_article);
        if self.store.refresh_if_newer(existing.id, &refresh).await? {
            debug!(symbol, id = %existing.id, "Refreshed article metadata");
            Ok(UpsertOutcome::Updated)
        } else {
            Ok(UpsertOutcome::Unchanged)
        }
    }
}
