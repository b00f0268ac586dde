//! Per-school ingestion pipeline: locate, fetch, resolve, normalize,
//! idempotent insert.

use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::{store, Config, School};

use super::client::{IngestError, OpenAqClient};
use super::normalize::{normalize, Rejection};
use super::rate_limit::RateLimiter;
use super::resolver::SensorResolver;

// ---

/// Outcome of one school's pipeline run.
#[derive(Debug)]
pub struct PipelineResult {
    pub stored_count: u32,
    pub status: PipelineStatus,
}

#[derive(Debug)]
pub enum PipelineStatus {
    /// The run completed; zero new readings is still a success, the
    /// station may simply have nothing fresh this cycle.
    Succeeded,
    Failed(IngestError),
}

impl PipelineResult {
    fn failed(err: IngestError) -> Self {
        Self {
            stored_count: 0,
            status: PipelineStatus::Failed(err),
        }
    }
}

/// Run the full pipeline for one school.
///
/// Only the nearest station is consulted; when it yields nothing there is
/// no escalation to the next candidate. Station lookup or fetch failures
/// abort this school only. Per-measurement conditions (unresolvable
/// sensor, staleness) skip that measurement and keep going.
pub async fn run_for_school(
    pool: &PgPool,
    client: &OpenAqClient,
    cfg: &Config,
    limiter: &mut RateLimiter,
    resolver: &mut SensorResolver,
    school: &School,
) -> PipelineResult {
    // ---
    let stations = match client
        .find_nearest_stations(
            limiter,
            school.latitude,
            school.longitude,
            cfg.search_radius_m,
            cfg.max_stations,
        )
        .await
    {
        Ok(stations) => stations,
        Err(err) => return PipelineResult::failed(err),
    };

    // find_nearest_stations never returns an empty list, but don't index
    // blindly.
    let Some(station) = stations.into_iter().next() else {
        return PipelineResult::failed(IngestError::NoStationFound {
            latitude: school.latitude,
            longitude: school.longitude,
            radius_m: cfg.search_radius_m,
        });
    };
    debug!(
        "{}: nearest station is '{}' (id={}, {} sensor(s))",
        school.name,
        station.name,
        station.id,
        station.sensors.len()
    );

    let raws = match client.latest_for_station(limiter, station.id).await {
        Ok(raws) => raws,
        Err(err) => return PipelineResult::failed(err),
    };

    // One instant for the whole invocation, so every measurement is judged
    // against the same staleness cut.
    let now = Utc::now();
    let stale_after = cfg.stale_after();
    let mut stored_count = 0u32;

    for raw in &raws {
        let lim = &mut *limiter;
        let sensor = resolver
            .resolve(raw.sensor_id, move || client.sensor_info(lim, raw.sensor_id))
            .await;

        let reading = match normalize(raw, sensor.as_ref(), now, stale_after) {
            Ok(reading) => reading,
            Err(Rejection::UnsupportedPollutant) => {
                debug!(
                    "{}: sensor {} does not map to a tracked pollutant, skipping",
                    school.name, raw.sensor_id
                );
                continue;
            }
            Err(Rejection::Stale { age_hours }) => {
                debug!(
                    "{}: sensor {} reading is {age_hours:.1}h old, past the staleness threshold, skipping",
                    school.name, raw.sensor_id
                );
                continue;
            }
        };

        match store::insert_reading(pool, school.id, &reading).await {
            Ok(true) => stored_count += 1,
            Ok(false) => debug!(
                "{}: {} at {} already stored, skipping",
                school.name,
                reading.pollutant.label(),
                reading.measured_at
            ),
            Err(err) => {
                return PipelineResult {
                    stored_count,
                    status: PipelineStatus::Failed(err.into()),
                }
            }
        }
    }

    info!(
        "{}: stored {} new reading(s) from station '{}'",
        school.name, stored_count, station.name
    );

    PipelineResult {
        stored_count,
        status: PipelineStatus::Succeeded,
    }
}
