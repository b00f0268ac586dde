//! Ingestion runner: iterates every registered school and aggregates a
//! run summary.

use std::time::Duration;

use serde::Serialize;
use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{store, Config};

use super::client::OpenAqClient;
use super::pipeline::{self, PipelineStatus};
use super::rate_limit::RateLimiter;
use super::resolver::SensorResolver;

// ---

/// Aggregated outcome of one full ingestion run.
///
/// Partial success is the expected steady state; the counts are
/// informational and never abort anything.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub succeeded: u32,
    pub failed: u32,
    pub results: Vec<SchoolReport>,
}

/// Per-school diagnostic line in the run summary.
#[derive(Debug, Serialize)]
pub struct SchoolReport {
    pub school_id: i64,
    pub school_name: String,
    pub stored_count: u32,
    pub error: Option<String>,
}

impl RunSummary {
    fn new() -> Self {
        // ---
        Self {
            run_id: Uuid::new_v4(),
            succeeded: 0,
            failed: 0,
            results: Vec::new(),
        }
    }

    fn record(&mut self, report: SchoolReport) {
        // ---
        if report.error.is_none() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(report);
    }
}

/// Run the ingestion pipeline for every registered school.
///
/// The rate limiter and the sensor cache are created fresh here and shared
/// across all schools for the duration of this run only, so schools behind
/// the same monitoring station pay each sensor lookup once. One school's
/// failure is recorded and does not abort the loop.
pub async fn run_all(pool: &PgPool, cfg: &Config) -> Result<RunSummary, sqlx::Error> {
    // ---
    let schools = store::list_all_schools(pool).await?;
    let mut summary = RunSummary::new();

    if schools.is_empty() {
        warn!("no schools registered, nothing to ingest");
        return Ok(summary);
    }

    info!(
        run_id = %summary.run_id,
        "starting ingestion run for {} school(s)",
        schools.len()
    );

    let client = OpenAqClient::new(cfg);
    let mut limiter = RateLimiter::new(cfg.min_request_interval());
    let mut resolver = SensorResolver::new();

    for school in &schools {
        let result =
            pipeline::run_for_school(pool, &client, cfg, &mut limiter, &mut resolver, school)
                .await;

        let error = match result.status {
            PipelineStatus::Succeeded => None,
            PipelineStatus::Failed(err) => {
                warn!("{}: ingestion failed: {err}", school.name);
                Some(err.to_string())
            }
        };

        summary.record(SchoolReport {
            school_id: school.id,
            school_name: school.name.clone(),
            stored_count: result.stored_count,
            error,
        });
    }

    info!(
        run_id = %summary.run_id,
        "ingestion run complete: {}/{} school(s) succeeded, {} failed",
        summary.succeeded,
        summary.results.len(),
        summary.failed
    );

    Ok(summary)
}

/// Periodic driver for [`run_all`], spawned from `main`.
///
/// The first run starts immediately; later runs tick on the configured
/// interval. A run that fails outright (e.g. the database is down) is
/// logged and the loop keeps going.
pub async fn run_periodically(pool: PgPool, cfg: Config) {
    // ---
    let period = Duration::from_secs(u64::from(cfg.ingest_interval_mins) * 60);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if let Err(err) = run_all(&pool, &cfg).await {
            error!("scheduled ingestion run aborted: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn report(id: i64, stored: u32, error: Option<&str>) -> SchoolReport {
        // ---
        SchoolReport {
            school_id: id,
            school_name: format!("School {id}"),
            stored_count: stored,
            error: error.map(String::from),
        }
    }

    #[test]
    fn summary_counts_partial_failure() {
        // ---
        let mut summary = RunSummary::new();
        summary.record(report(1, 3, None));
        summary.record(report(2, 0, Some("no monitoring station within 5000 m")));
        summary.record(report(3, 0, None));

        // One failure is isolated: the other schools still count as
        // succeeded, including the one that stored nothing new.
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.results.len(), 3);
    }
}
