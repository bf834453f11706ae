use crate::error::{AppError, AppResult};
use crate::services::news_fetcher::{FetchOptions, NewsFetcher};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{info, warn};

/// Prefix a 5-field cron expression with a zero seconds field.
/// 6 and 7 field expressions are passed through.
pub fn normalize_cron(expression: &str) -> String {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    if fields.len() == 5 {
        format!("0 {}", fields.join(" "))
    } else {
        fields.join(" ")
    }
}

fn scheduler_error(e: JobSchedulerError) -> AppError {
    AppError::Scheduler(e.to_string())
}

/// Runs the ingestion pipeline on a cron schedule (UTC)
pub struct NewsScheduler {
    fetcher: Arc<NewsFetcher>,
    schedule: String,
    handle: Mutex<Option<JobScheduler>>,
}

impl NewsScheduler {
    pub fn new(fetcher: Arc<NewsFetcher>, schedule: &str) -> Self {
        Self {
            fetcher,
            schedule: normalize_cron(schedule),
            handle: Mutex::new(None),
        }
    }

    pub fn schedule(&self) -> &str {
        &self.schedule
    }

    /// Register the fetch job and start ticking. No-op when already running.
    pub async fn start(&self) -> AppResult<()> {
        let mut handle = self.handle.lock().await;
        if handle.is_some() {
            warn!("News scheduler already running");
            return Ok(());
        }

        let scheduler = JobScheduler::new().await.map_err(scheduler_error)?;

        let fetcher = self.fetcher.clone();
        let job = Job::new_async(self.schedule.as_str(), move |_uuid, _lock| {
            let fetcher = fetcher.clone();
            Box::pin(async move {
                info!("Scheduled news fetch triggered");
                let stats = fetcher.run(FetchOptions::default()).await;
                info!(
                    saved = stats.total_saved,
                    pruned = stats.total_pruned,
                    errors = stats.errors.len(),
                    "Scheduled news fetch done"
                );
            })
        })
        .map_err(scheduler_error)?;

        scheduler.add(job).await.map_err(scheduler_error)?;
        scheduler.start().await.map_err(scheduler_error)?;

        info!(schedule = %self.schedule, "News scheduler started");
        *handle = Some(scheduler);
        Ok(())
    }

    /// Shut the scheduler down and forget it
    pub async fn stop(&self) -> AppResult<()> {
        let mut handle = self.handle.lock().await;
        if let Some(mut scheduler) = handle.take() {
            scheduler.shutdown().await.map_err(scheduler_error)?;
            info!("News scheduler stopped");
        }
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.handle.lock().await.is_some()
    }
}
