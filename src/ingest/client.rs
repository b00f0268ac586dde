//! Client for the upstream air quality API (OpenAQ v3).
//!
//! Three read-only endpoints are used: station search by coordinates and
//! radius, latest measurements by station id, and sensor metadata by sensor
//! id. Every request is authenticated with the `X-API-Key` header and gated
//! by the run's [`RateLimiter`].

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::{Config, RawMeasurement, SensorInfo, Station};

use super::rate_limit::RateLimiter;

// ---

/// Failures that abort one school's pipeline run. None of these are fatal
/// to the overall ingestion run; the runner records them and moves on.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Non-2xx status, transport failure, or timeout from the upstream API.
    #[error("air quality API unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The search radius around a school contains no monitoring station.
    #[error("no monitoring station within {radius_m} m of ({latitude}, {longitude})")]
    NoStationFound {
        latitude: f64,
        longitude: f64,
        radius_m: u32,
    },

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl From<reqwest::Error> for IngestError {
    fn from(err: reqwest::Error) -> Self {
        IngestError::UpstreamUnavailable(err.to_string())
    }
}

// ---

pub struct OpenAqClient {
    // ---
    http: Client,
    base_url: String,
    api_key: String,
}

impl OpenAqClient {
    pub fn new(cfg: &Config) -> Self {
        // ---
        let http = Client::builder()
            .timeout(cfg.http_timeout())
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http,
            base_url: cfg.openaq_base_url.trim_end_matches('/').to_string(),
            api_key: cfg.openaq_api_key.clone(),
        }
    }

    /// Find monitoring stations near a coordinate, nearest first, truncated
    /// to `max_results`. An empty result set is reported as
    /// [`IngestError::NoStationFound`], so a successful return is never
    /// empty.
    pub async fn find_nearest_stations(
        &self,
        limiter: &mut RateLimiter,
        latitude: f64,
        longitude: f64,
        radius_m: u32,
        max_results: u32,
    ) -> Result<Vec<Station>, IngestError> {
        // ---
        limiter.wait().await;

        let url = format!(
            "{}/locations?coordinates={},{}&radius={}&limit={}",
            self.base_url, latitude, longitude, radius_m, max_results
        );
        debug!("station search: {url}");

        let response = self
            .http
            .get(&url)
            .header("X-API-Key", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IngestError::UpstreamUnavailable(format!(
                "station search returned status {}",
                response.status()
            )));
        }

        let body: LocationsResponse = response.json().await?;

        if body.results.is_empty() {
            return Err(IngestError::NoStationFound {
                latitude,
                longitude,
                radius_m,
            });
        }

        Ok(body
            .results
            .into_iter()
            .map(|loc| Station {
                id: loc.id,
                name: loc.name,
                sensors: loc
                    .sensors
                    .unwrap_or_default()
                    .into_iter()
                    .map(|s| s.id)
                    .collect(),
            })
            .collect())
    }

    /// Latest raw measurements for every sensor at a station. A station
    /// that currently reports nothing yields an empty list, not an error.
    pub async fn latest_for_station(
        &self,
        limiter: &mut RateLimiter,
        station_id: i64,
    ) -> Result<Vec<RawMeasurement>, IngestError> {
        // ---
        limiter.wait().await;

        let url = format!("{}/locations/{}/latest", self.base_url, station_id);
        debug!("latest measurements: {url}");

        let response = self
            .http
            .get(&url)
            .header("X-API-Key", &self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IngestError::UpstreamUnavailable(format!(
                "latest measurements returned status {}",
                response.status()
            )));
        }

        let body: LatestResponse = response.json().await?;

        Ok(body
            .results
            .into_iter()
            .map(|m| RawMeasurement {
                sensor_id: m.sensors_id,
                value: m.value,
                utc: m.datetime.utc,
            })
            .collect())
    }

    /// Pollutant identity of one sensor.
    ///
    /// Resolution failure is routine (not every sensor is bound to a
    /// tracked pollutant), so request errors, non-2xx statuses, and empty
    /// or malformed bodies all collapse to `None`.
    pub async fn sensor_info(
        &self,
        limiter: &mut RateLimiter,
        sensor_id: i64,
    ) -> Option<SensorInfo> {
        // ---
        limiter.wait().await;

        let url = format!("{}/sensors/{}", self.base_url, sensor_id);

        let response = match self
            .http
            .get(&url)
            .header("X-API-Key", &self.api_key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                debug!("sensor {sensor_id} lookup failed: {err}");
                return None;
            }
        };

        if !response.status().is_success() {
            debug!(
                "sensor {} lookup returned status {}",
                sensor_id,
                response.status()
            );
            return None;
        }

        let body: SensorsResponse = match response.json().await {
            Ok(body) => body,
            Err(err) => {
                debug!("sensor {sensor_id} metadata unparsable: {err}");
                return None;
            }
        };

        body.results.into_iter().next().map(|sensor| SensorInfo {
            sensor_id: sensor.id,
            parameter: sensor.parameter.name,
            display_name: sensor.parameter.display_name.unwrap_or(sensor.name),
        })
    }
}

// ---
// Wire formats for the three endpoints. Unknown fields are ignored.

#[derive(Debug, Deserialize)]
struct LocationsResponse {
    results: Vec<ApiLocation>,
}

#[derive(Debug, Deserialize)]
struct ApiLocation {
    id: i64,
    name: String,
    sensors: Option<Vec<ApiSensorRef>>,
}

#[derive(Debug, Deserialize)]
struct ApiSensorRef {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    results: Vec<ApiLatest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiLatest {
    datetime: ApiDatetime,
    value: f64,
    sensors_id: i64,
}

#[derive(Debug, Deserialize)]
struct ApiDatetime {
    utc: String,
}

#[derive(Debug, Deserialize)]
struct SensorsResponse {
    results: Vec<ApiSensor>,
}

#[derive(Debug, Deserialize)]
struct ApiSensor {
    id: i64,
    name: String,
    parameter: ApiParameter,
}

#[derive(Debug, Deserialize)]
struct ApiParameter {
    name: String,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}
