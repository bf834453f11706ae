use crate::error::RepositoryError;
use crate::repositories::ArticleStore;
use std::sync::Arc;
use tracing::info;

/// Keeps only the newest articles per symbol
pub struct RetentionPruner {
    store: Arc<dyn ArticleStore>,
}

impl RetentionPruner {
    pub fn new(store: Arc<dyn ArticleStore>) -> Self {
        Self { store }
    }

    /// Delete everything after the first `keep` articles of `symbol`, ranked
    /// by publish time desc then id desc. Returns the number deleted.
    pub async fn prune(&self, symbol: &str, keep: usize) -> Result<u64, RepositoryError> {
        if symbol.is_empty() {
            return Ok(0);
        }

        let ids = self.store.ids_beyond_retention(symbol, keep).await?;
        if ids.is_empty() {
            return Ok(0);
        }

        let deleted = self.store.delete_by_ids(&ids).await?;
        info!(symbol, kept = keep, deleted, "Pruned old articles");
        Ok(deleted)
    }
}
