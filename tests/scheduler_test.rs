mod helpers;

use helpers::*;
use std::sync::Arc;
use std::time::Duration;
use stocknews_backend::providers::ProviderRegistry;
use stocknews_backend::repositories::{ArticleStore, MemoryArticleStore};
use stocknews_backend::services::NewsScheduler;
use tokio_test::assert_ok;

fn scheduler(schedule: &str, provider: Arc<StaticProvider>) -> (NewsScheduler, Arc<MemoryArticleStore>) {
    let articles = Arc::new(MemoryArticleStore::new());
    let registry = ProviderRegistry::new().register("a", provider, true);
    let fetcher = Arc::new(fetcher(holdings(&[("ACME", None)]), articles.clone(), registry));
    (NewsScheduler::new(fetcher, schedule), articles)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_start_is_idempotent_and_stop_clears() {
    let (scheduler, _) = scheduler("0 0 * * *", StaticProvider::new(Vec::new()));
    assert_eq!(scheduler.schedule(), "0 0 0 * * *");
    assert!(!scheduler.is_running().await);

    assert_ok!(scheduler.start().await);
    assert!(scheduler.is_running().await);

    assert_ok!(scheduler.start().await);
    assert!(scheduler.is_running().await);

    assert_ok!(scheduler.stop().await);
    assert!(!scheduler.is_running().await);

    // Stopping twice is harmless
    assert_ok!(scheduler.stop().await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scheduled_job_runs_until_stopped() {
    let provider = StaticProvider::new(vec![candidate(
        "a",
        Some("1"),
        None,
        "scheduled story",
        Some(days_ago(1)),
    )]);
    let (scheduler, articles) = scheduler("* * * * * *", provider.clone());

    scheduler.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(2500)).await;
    scheduler.stop().await.unwrap();

    let calls_at_stop = provider.call_count();
    assert!(calls_at_stop >= 1, "job never fired");
    assert_eq!(articles.count_by_symbol("ACME").await.unwrap(), 1);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(provider.call_count(), calls_at_stop);
}
