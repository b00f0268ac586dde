//! Domain types for the school air quality monitor.

use chrono::{DateTime, Utc};
use serde::Serialize;

// ---

/// Pollutants tracked by the monitor. Anything else a station measures
/// (CO, relative humidity, ...) is skipped during ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pollutant {
    Pm25,
    Pm10,
    No2,
    O3,
    So2,
}

impl Pollutant {
    pub const ALL: [Pollutant; 5] = [
        Pollutant::Pm25,
        Pollutant::Pm10,
        Pollutant::No2,
        Pollutant::O3,
        Pollutant::So2,
    ];

    /// Canonical label, used both in storage and in API payloads.
    pub fn label(&self) -> &'static str {
        // ---
        match self {
            Pollutant::Pm25 => "PM2.5",
            Pollutant::Pm10 => "PM10",
            Pollutant::No2 => "NO2",
            Pollutant::O3 => "O3",
            Pollutant::So2 => "SO2",
        }
    }

    /// Map an upstream parameter name (e.g. `pm25`, `ozone`) to a tracked
    /// pollutant. Returns `None` for parameters outside the tracked set.
    pub fn from_parameter(name: &str) -> Option<Self> {
        // ---
        match name.to_ascii_lowercase().as_str() {
            "pm25" | "pm2.5" => Some(Pollutant::Pm25),
            "pm10" => Some(Pollutant::Pm10),
            "no2" => Some(Pollutant::No2),
            "o3" | "ozone" => Some(Pollutant::O3),
            "so2" => Some(Pollutant::So2),
            _ => None,
        }
    }

    /// Parse a canonical label, e.g. from a query-string parameter.
    pub fn from_label(label: &str) -> Option<Self> {
        // ---
        Pollutant::ALL.iter().copied().find(|p| p.label() == label)
    }
}

// ---

/// A registered school. The registry is managed elsewhere; the ingestion
/// core and the read accessors only ever read this table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct School {
    // ---
    pub id: i64,
    pub name: String,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// A persisted reading as returned by the read accessors.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ReadingRow {
    // ---
    pub pollutant: String,
    pub value: f64,
    pub measured_at: DateTime<Utc>,
}

// ---

/// A monitoring station discovered by proximity search. Fetched fresh each
/// run, never persisted.
#[derive(Debug, Clone)]
pub struct Station {
    // ---
    pub id: i64,
    pub name: String,
    pub sensors: Vec<i64>,
}

/// Resolved pollutant identity of one sensor.
#[derive(Debug, Clone)]
pub struct SensorInfo {
    // ---
    pub sensor_id: i64,
    pub parameter: String,
    pub display_name: String,
}

/// A raw measurement as reported by the upstream latest endpoint.
#[derive(Debug, Clone)]
pub struct RawMeasurement {
    // ---
    pub sensor_id: i64,
    pub value: f64,
    pub utc: String,
}

/// A normalized reading, ready for the idempotent insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    // ---
    pub pollutant: Pollutant,
    pub value: f64,
    pub measured_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_parameter_mapping() {
        // ---
        assert_eq!(Pollutant::from_parameter("pm25"), Some(Pollutant::Pm25));
        assert_eq!(Pollutant::from_parameter("pm2.5"), Some(Pollutant::Pm25));
        assert_eq!(Pollutant::from_parameter("PM10"), Some(Pollutant::Pm10));
        assert_eq!(Pollutant::from_parameter("no2"), Some(Pollutant::No2));
        assert_eq!(Pollutant::from_parameter("ozone"), Some(Pollutant::O3));
        assert_eq!(Pollutant::from_parameter("o3"), Some(Pollutant::O3));
        assert_eq!(Pollutant::from_parameter("so2"), Some(Pollutant::So2));

        // Untracked parameters must not map
        assert_eq!(Pollutant::from_parameter("co"), None);
        assert_eq!(Pollutant::from_parameter("relativehumidity"), None);
        assert_eq!(Pollutant::from_parameter(""), None);
    }

    #[test]
    fn test_label_roundtrip() {
        // ---
        for pollutant in Pollutant::ALL {
            assert_eq!(Pollutant::from_label(pollutant.label()), Some(pollutant));
        }
        assert_eq!(Pollutant::from_label("PM2.5"), Some(Pollutant::Pm25));
        assert_eq!(Pollutant::from_label("pm2.5"), None); // labels are exact
    }
}
