//! Configuration loader for the `schoolair-monitor` backend service.
//!
//! This module centralizes all runtime configuration values and their
//! defaults, loading from environment variables (with optional `.env` file
//! support provided by the caller). By consolidating configuration logic
//! here, we avoid scattering `env::var` calls throughout the codebase.

use std::env;
use std::time::Duration;

use anyhow::{anyhow, Result};

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent
/// configuration snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Base URL of the air quality API.
    pub openaq_base_url: String,

    /// API key sent as the `X-API-Key` header on every upstream call.
    pub openaq_api_key: String,

    /// Station search radius around each school, in meters.
    pub search_radius_m: u32,

    /// Maximum number of station candidates returned by the search.
    pub max_stations: u32,

    /// Readings older than this many hours are discarded.
    pub stale_after_hours: u32,

    /// Minimum spacing between consecutive upstream calls, in milliseconds.
    pub min_request_interval_ms: u32,

    /// Per-call timeout for upstream requests, in seconds.
    pub http_timeout_secs: u32,

    /// Cadence of the scheduled ingestion run; 0 disables the scheduler.
    pub ingest_interval_mins: u32,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string
/// - `OPENAQ_API_KEY` – air quality API key; ingestion cannot run without it,
///   so a missing key is fatal at startup rather than a per-call error
///
/// Optional:
/// - `OPENAQ_BASE_URL` – API base URL (default: `https://api.openaq.org/v3`)
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `SEARCH_RADIUS_M` – station search radius in meters (default: 5000)
/// - `MAX_STATIONS` – station candidates per search (default: 5)
/// - `STALE_AFTER_HOURS` – staleness threshold (default: 120)
/// - `MIN_REQUEST_INTERVAL_MS` – upstream call spacing (default: 1000)
/// - `HTTP_TIMEOUT_SECS` – upstream call timeout (default: 12)
/// - `INGEST_INTERVAL_MINS` – scheduled run cadence, 0 disables (default: 60)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let db_url = require_env!("DATABASE_URL");
    let openaq_api_key = require_env!("OPENAQ_API_KEY");
    let openaq_base_url = env::var("OPENAQ_BASE_URL")
        .unwrap_or_else(|_| "https://api.openaq.org/v3".to_string());

    let db_pool_max = parse_env_u32!("DB_POOL_MAX", 5);
    let search_radius_m = parse_env_u32!("SEARCH_RADIUS_M", 5000);
    let max_stations = parse_env_u32!("MAX_STATIONS", 5);
    let stale_after_hours = parse_env_u32!("STALE_AFTER_HOURS", 120);
    let min_request_interval_ms = parse_env_u32!("MIN_REQUEST_INTERVAL_MS", 1000);
    let http_timeout_secs = parse_env_u32!("HTTP_TIMEOUT_SECS", 12);
    let ingest_interval_mins = parse_env_u32!("INGEST_INTERVAL_MINS", 60);

    Ok(Config {
        db_url,
        db_pool_max,
        openaq_base_url,
        openaq_api_key,
        search_radius_m,
        max_stations,
        stale_after_hours,
        min_request_interval_ms,
        http_timeout_secs,
        ingest_interval_mins,
    })
}

impl Config {
    /// Staleness threshold as a [`chrono::Duration`] for timestamp math.
    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.stale_after_hours))
    }

    /// Rate limiter spacing.
    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(u64::from(self.min_request_interval_ms))
    }

    /// Upstream per-call timeout.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.http_timeout_secs))
    }

    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks sensitive information (database password, API key) while
    /// showing all configuration values that were loaded.
    pub fn log_config(&self) {
        // ---
        // Mask the password in the database URL for security
        let masked_db_url = if let Some(at_pos) = self.db_url.rfind('@') {
            if let Some(colon_pos) = self.db_url[..at_pos].rfind(':') {
                format!(
                    "{}:****{}",
                    &self.db_url[..colon_pos],
                    &self.db_url[at_pos..]
                )
            } else {
                self.db_url.clone()
            }
        } else {
            self.db_url.clone()
        };

        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL            : {}", masked_db_url);
        tracing::info!("  OPENAQ_BASE_URL         : {}", self.openaq_base_url);
        tracing::info!("  OPENAQ_API_KEY          : ****");
        tracing::info!("  DB_POOL_MAX             : {}", self.db_pool_max);
        tracing::info!("  SEARCH_RADIUS_M         : {}", self.search_radius_m);
        tracing::info!("  MAX_STATIONS            : {}", self.max_stations);
        tracing::info!("  STALE_AFTER_HOURS       : {}", self.stale_after_hours);
        tracing::info!("  MIN_REQUEST_INTERVAL_MS : {}", self.min_request_interval_ms);
        tracing::info!("  HTTP_TIMEOUT_SECS       : {}", self.http_timeout_secs);
        tracing::info!("  INGEST_INTERVAL_MINS    : {}", self.ingest_interval_mins);
    }
}
