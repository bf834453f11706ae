use crate::models::ArticleCandidate;
use std::collections::HashSet;

/// Intra-run deduplication scoped to one (symbol, country) group.
///
/// First sighting wins. A candidate is a duplicate when its
/// `provider||providerId` key or its url was already accepted in this group.
/// Candidates carrying neither are always passed through; cross-run identity
/// resolution handles them at persistence time.
#[derive(Debug, Clone, Default)]
pub struct IntraRunDeduplicator {
    seen_provider_ids: HashSet<String>,
    seen_urls: HashSet<String>,
}

impl IntraRunDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything; called at the start of each group
    pub fn reset(&mut self) {
        self.seen_provider_ids.clear();
        self.seen_urls.clear();
    }

    /// Record the candidate and report whether it is new in this group
    pub fn accept(&mut self, candidate: &ArticleCandidate) -> bool {
        let provider_key = candidate.provider_key();
        let url = candidate.url();

        let seen = provider_key
            .as_ref()
            .is_some_and(|key| self.seen_provider_ids.contains(key))
            || url.is_some_and(|u| self.seen_urls.contains(u));
        if seen {
            return false;
        }

        if let Some(key) = provider_key {
            self.seen_provider_ids.insert(key);
        }
        if let Some(u) = url {
            self.seen_urls.insert(u.to_string());
        }
        true
    }

    /// Candidates that would be accepted, in input order, without recording
    /// any of them. Callers `accept` each one as it is persisted.
    pub fn preview(&self, candidates: Vec<ArticleCandidate>) -> Vec<ArticleCandidate> {
        let mut scratch = self.clone();
        candidates
            .into_iter()
            .filter(|candidate| scratch.accept(candidate))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(provider_id: Option<&str>, url: Option<&str>) -> ArticleCandidate {
        ArticleCandidate {
            title: "t".into(),
            provider: "marketaux".into(),
            provider_id: provider_id.map(str::to_string),
            url: url.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_same_provider_id_is_dropped() {
        let mut dedup = IntraRunDeduplicator::new();
        assert!(dedup.accept(&candidate(Some("p1"), Some("https://a"))));
        assert!(!dedup.accept(&candidate(Some("p1"), Some("https://b"))));
    }

    #[test]
    fn test_same_url_is_dropped() {
        let mut dedup = IntraRunDeduplicator::new();
        assert!(dedup.accept(&candidate(None, Some("https://a"))));
        assert!(!dedup.accept(&candidate(None, Some("https://a"))));
    }

    #[test]
    fn test_url_seen_under_provider_id_is_dropped() {
        let mut dedup = IntraRunDeduplicator::new();
        assert!(dedup.accept(&candidate(Some("p1"), Some("https://a"))));
        assert!(!dedup.accept(&candidate(None, Some("https://a"))));
    }

    #[test]
    fn test_candidates_without_identity_pass_through() {
        let mut dedup = IntraRunDeduplicator::new();
        assert!(dedup.accept(&candidate(None, None)));
        assert!(dedup.accept(&candidate(None, None)));
    }

    #[test]
    fn test_different_providers_with_same_id_are_distinct() {
        let mut dedup = IntraRunDeduplicator::new();
        let mut other = candidate(Some("p1"), None);
        other.provider = "newsdata".into();
        assert!(dedup.accept(&candidate(Some("p1"), None)));
        assert!(dedup.accept(&other));
    }

    #[test]
    fn test_blank_provider_shares_key_with_default_provider() {
        let mut dedup = IntraRunDeduplicator::new();
        let mut blank = candidate(Some("p1"), None);
        blank.provider = String::new();
        let mut named = candidate(Some("p1"), None);
        named.provider = "unknown".into();
        assert!(dedup.accept(&blank));
        assert!(!dedup.accept(&named));
    }

    #[test]
    fn test_preview_drops_batch_duplicates_without_recording() {
        let mut dedup = IntraRunDeduplicator::new();
        assert!(dedup.accept(&candidate(Some("p0"), None)));

        let fresh = dedup.preview(vec![
            candidate(Some("p0"), None),
            candidate(Some("p1"), Some("https://a")),
            candidate(Some("p2"), Some("https://a")),
            candidate(Some("p3"), None),
        ]);
        let ids: Vec<_> = fresh.iter().map(|c| c.provider_id.as_deref()).collect();
        assert_eq!(ids, vec![Some("p1"), Some("p3")]);

        // Nothing in the batch was recorded
        assert!(dedup.accept(&candidate(Some("p1"), Some("https://a"))));
        assert!(dedup.accept(&candidate(Some("p3"), None)));
    }

    #[test]
    fn test_reset_clears_state() {
        let mut dedup = IntraRunDeduplicator::new();
        assert!(dedup.accept(&candidate(Some("p1"), None)));
        dedup.reset();
        assert!(dedup.accept(&candidate(Some("p1"), None)));
    }
}
