//! Stock News Backend Service
//!
//! Main entry point for the portfolio news ingestion service.
//! This service provides:
//! - Scheduled news fetches for every symbol held in a portfolio
//! - Retention of the newest articles per symbol
//! - An optional fetch right after boot

use stocknews_backend::database::{create_pool, run_migrations};
use stocknews_backend::services::FetchOptions;
use stocknews_backend::{AppConfig, AppError, AppResult, AppState};
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load environment variables first
    dotenv::dotenv().ok();

    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        AppError::Config(e)
    })?;

    // Initialize tracing/logging with config; production logs as JSON
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("stocknews_backend={},sqlx=warn", config.log_level).into()
    });
    if config.is_production() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Stock news backend starting");
    info!("Environment: {}", config.environment);
    info!("Log level: {}", config.log_level);
    info!("Fetch schedule: {} (UTC)", config.news.cron_schedule);

    // =========================================================================
    // DATABASE SETUP
    // =========================================================================
    info!("Connecting to database...");

    let pool = create_pool(&config.database).await.map_err(|e| {
        error!("Failed to create database pool: {}", e);
        AppError::Database(e)
    })?;

    info!("Database connection pool created successfully");
    info!("Max connections: {}", config.database.max_connections);

    info!("Running database migrations...");
    run_migrations(&pool, None).await.map_err(|e| {
        error!("Database migration failed: {}", e);
        AppError::Database(e)
    })?;

    info!("Database migrations completed successfully");

    // =========================================================================
    // SERVICES
    // =========================================================================
    let app_state = Arc::new(AppState::new(pool, &config.news)?);

    if config.news.marketaux_api_key.is_none() {
        warn!("MARKETAUX_API_KEY not set - Marketaux provider disabled, fetches will save nothing");
    }

    app_state.scheduler.start().await?;
    info!(
        "✓ News scheduler started ({})",
        app_state.scheduler.schedule()
    );

    if config.news.fetch_on_startup {
        let state = app_state.clone();
        tokio::spawn(async move {
            info!("Running startup news fetch...");
            let stats = state.news_fetcher.run(FetchOptions::default()).await;
            info!(
                saved = stats.total_saved,
                pruned = stats.total_pruned,
                errors = stats.errors.len(),
                "Startup news fetch done"
            );
        });
    }

    info!("Press Ctrl+C to shutdown gracefully");

    // =========================================================================
    // SHUTDOWN HANDLING
    // =========================================================================
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received, shutting down gracefully...");

    if let Err(e) = app_state.scheduler.stop().await {
        warn!("Scheduler did not stop cleanly: {}", e);
    }

    info!("Stock news backend shutdown complete");
    Ok(())
}
