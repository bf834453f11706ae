use std::env;
use std::time::Duration;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub test_before_acquire: bool,
}

/// News ingestion configuration
#[derive(Debug, Clone)]
pub struct NewsConfig {
    pub marketaux_api_key: Option<String>,
    pub marketaux_base_url: String,
    /// Default per-symbol fetch quota for a run
    pub fetch_limit_per_symbol: usize,
    /// Articles retained per symbol after pruning
    pub keep_per_symbol: usize,
    /// Recency cutoff in days; 0 disables the filter
    pub lookback_days: u32,
    pub cron_schedule: String,
    pub provider_timeout_secs: u64,
    pub fetch_on_startup: bool,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub news: NewsConfig,
    pub log_level: String,
    pub environment: String,
}

pub const DEFAULT_MARKETAUX_BASE_URL: &str = "https://api.marketaux.com/v1";
pub const DEFAULT_CRON_SCHEDULE: &str = "0 0 * * *";
/// Upper bound for `FETCH_RECENT_DAYS`
pub const MAX_LOOKBACK_DAYS: u32 = 36_500;

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value
        .and_then(|s| s.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl DatabaseConfig {
    /// Create database config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL environment variable is required")?;

        let max_connections = parse_or(env::var("DATABASE_MAX_CONNECTIONS").ok(), 10u32);
        let acquire_timeout_secs = parse_or(env::var("DATABASE_ACQUIRE_TIMEOUT_SECS").ok(), 30u64);
        let idle_timeout_secs = parse_or(env::var("DATABASE_IDLE_TIMEOUT_SECS").ok(), 600u64); // 10 minutes
        let max_lifetime_secs = parse_or(env::var("DATABASE_MAX_LIFETIME_SECS").ok(), 1800u64); // 30 minutes
        let test_before_acquire = parse_or(env::var("DATABASE_TEST_BEFORE_ACQUIRE").ok(), true);

        if max_connections == 0 {
            return Err("DATABASE_MAX_CONNECTIONS must be greater than 0".to_string());
        }

        if acquire_timeout_secs == 0 {
            return Err("DATABASE_ACQUIRE_TIMEOUT_SECS must be greater than 0".to_string());
        }

        Ok(Self {
            url,
            max_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
            test_before_acquire,
        })
    }

    /// Get acquire timeout as Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    /// Get idle timeout as Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Get max lifetime as Duration
    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/stocknews".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            test_before_acquire: true,
        }
    }
}

impl NewsConfig {
    /// Create news config from environment variables
    pub fn from_env() -> Result<Self, String> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup
    pub fn from_vars<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        // An empty key counts as missing so the provider stays disabled
        let marketaux_api_key = lookup("MARKETAUX_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        let marketaux_base_url = lookup("MARKETAUX_BASE_URL")
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_MARKETAUX_BASE_URL.to_string());

        let fetch_limit_per_symbol = parse_or(lookup("FETCH_TOP_N_PER_TICKER"), 10usize);
        let keep_per_symbol = parse_or(lookup("KEEP_PER_STOCK"), 5usize);
        let lookback_days = parse_or(lookup("FETCH_RECENT_DAYS"), 90u32);
        let provider_timeout_secs = parse_or(lookup("PROVIDER_TIMEOUT_SECS"), 15u64);
        let fetch_on_startup = parse_or(lookup("FETCH_ON_STARTUP"), false);

        let cron_schedule = lookup("CRON_SCHEDULE")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_CRON_SCHEDULE.to_string());

        if fetch_limit_per_symbol == 0 {
            return Err("FETCH_TOP_N_PER_TICKER must be greater than 0".to_string());
        }

        if lookback_days > MAX_LOOKBACK_DAYS {
            return Err(format!(
                "FETCH_RECENT_DAYS must be at most {}, got {}",
                MAX_LOOKBACK_DAYS, lookback_days
            ));
        }

        if provider_timeout_secs == 0 {
            return Err("PROVIDER_TIMEOUT_SECS must be greater than 0".to_string());
        }

        let fields = cron_schedule.split_whitespace().count();
        if !(5..=7).contains(&fields) {
            return Err(format!(
                "Invalid CRON_SCHEDULE: {}. Expected 5 to 7 fields",
                cron_schedule
            ));
        }

        Ok(Self {
            marketaux_api_key,
            marketaux_base_url,
            fetch_limit_per_symbol,
            keep_per_symbol,
            lookback_days,
            cron_schedule,
            provider_timeout_secs,
            fetch_on_startup,
        })
    }

    /// Per provider call timeout as Duration
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    /// Recency window, or None when the cutoff is disabled
    pub fn lookback(&self) -> Option<chrono::Duration> {
        if self.lookback_days == 0 {
            None
        } else {
            Some(chrono::Duration::days(i64::from(self.lookback_days)))
        }
    }
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            marketaux_api_key: None,
            marketaux_base_url: DEFAULT_MARKETAUX_BASE_URL.to_string(),
            fetch_limit_per_symbol: 10,
            keep_per_symbol: 5,
            lookback_days: 90,
            cron_schedule: DEFAULT_CRON_SCHEDULE.to_string(),
            provider_timeout_secs: 15,
            fetch_on_startup: false,
        }
    }
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let database = DatabaseConfig::from_env()?;
        let news = NewsConfig::from_env()?;

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        // Validate log level
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&environment.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                environment, valid_environments
            ));
        }

        Ok(Self {
            database,
            news,
            log_level: log_level.to_lowercase(),
            environment: environment.to_lowercase(),
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            news: NewsConfig::default(),
            log_level: "info".to_string(),
            environment: "development".to_string(),
        }
    }
}
