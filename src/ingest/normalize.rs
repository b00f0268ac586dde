//! Raw-measurement normalization and the staleness policy.

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::{NewReading, Pollutant, RawMeasurement, SensorInfo};

// ---

/// Why a measurement was skipped. Both cases are routine per-measurement
/// outcomes, not pipeline failures.
#[derive(Debug, PartialEq)]
pub enum Rejection {
    /// The sensor is unresolvable, or bound to a parameter outside the
    /// tracked set.
    UnsupportedPollutant,

    /// Older than the configured threshold.
    Stale { age_hours: f64 },
}

/// Map a raw measurement to a canonical reading.
///
/// A malformed timestamp degrades to `now` rather than rejecting: a reading
/// with an unreliable timestamp is still usable telemetry, while a missing
/// pollutant binding is unrecoverable. Staleness rejects strictly greater
/// than the threshold, so a reading exactly at the limit passes.
///
/// `now` is captured once per pipeline invocation by the caller, keeping
/// the staleness cut consistent across all measurements of a run.
pub fn normalize(
    raw: &RawMeasurement,
    sensor: Option<&SensorInfo>,
    now: DateTime<Utc>,
    stale_after: Duration,
) -> Result<NewReading, Rejection> {
    // ---
    let pollutant = sensor
        .and_then(|s| Pollutant::from_parameter(&s.parameter))
        .ok_or(Rejection::UnsupportedPollutant)?;

    let measured_at = match DateTime::parse_from_rfc3339(&raw.utc) {
        Ok(ts) => ts.with_timezone(&Utc),
        Err(err) => {
            warn!(
                sensor_id = raw.sensor_id,
                timestamp = %raw.utc,
                "unparsable measurement timestamp, substituting current time: {err}"
            );
            now
        }
    };

    let age = now - measured_at;
    if age > stale_after {
        return Err(Rejection::Stale {
            age_hours: age.num_seconds() as f64 / 3600.0,
        });
    }

    Ok(NewReading {
        pollutant,
        value: raw.value,
        measured_at,
    })
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;

    fn sensor(parameter: &str) -> SensorInfo {
        // ---
        SensorInfo {
            sensor_id: 1,
            parameter: parameter.to_string(),
            display_name: parameter.to_uppercase(),
        }
    }

    fn raw(utc: &str) -> RawMeasurement {
        // ---
        RawMeasurement {
            sensor_id: 1,
            value: 35.2,
            utc: utc.to_string(),
        }
    }

    fn threshold() -> Duration {
        Duration::hours(120)
    }

    #[test]
    fn fresh_reading_is_normalized() {
        // ---
        let now = Utc.with_ymd_and_hms(2025, 11, 12, 10, 0, 0).unwrap();
        let result = normalize(
            &raw("2025-11-12T09:00:00Z"),
            Some(&sensor("pm25")),
            now,
            threshold(),
        )
        .unwrap();

        assert_eq!(result.pollutant, Pollutant::Pm25);
        assert_eq!(result.value, 35.2);
        assert_eq!(
            result.measured_at,
            Utc.with_ymd_and_hms(2025, 11, 12, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn old_reading_is_rejected_as_stale() {
        // ---
        // Same measurement, but seen 8 days later (192h age)
        let now = Utc.with_ymd_and_hms(2025, 11, 20, 9, 0, 0).unwrap();
        let result = normalize(
            &raw("2025-11-12T09:00:00Z"),
            Some(&sensor("pm25")),
            now,
            threshold(),
        );

        assert_eq!(
            result,
            Err(Rejection::Stale { age_hours: 192.0 })
        );
    }

    #[test]
    fn staleness_boundary_is_strictly_greater() {
        // ---
        let now = Utc.with_ymd_and_hms(2025, 11, 17, 9, 0, 0).unwrap();

        // Exactly 120h old: age == threshold, accepted
        let at_threshold = normalize(
            &raw("2025-11-12T09:00:00Z"),
            Some(&sensor("pm25")),
            now,
            threshold(),
        );
        assert!(at_threshold.is_ok());

        // One second younger: accepted
        let just_under = normalize(
            &raw("2025-11-12T09:00:01Z"),
            Some(&sensor("pm25")),
            now,
            threshold(),
        );
        assert!(just_under.is_ok());

        // One second older: rejected
        let just_over = normalize(
            &raw("2025-11-12T08:59:59Z"),
            Some(&sensor("pm25")),
            now,
            threshold(),
        );
        assert!(matches!(just_over, Err(Rejection::Stale { .. })));
    }

    #[test]
    fn unresolved_sensor_is_rejected() {
        // ---
        let now = Utc.with_ymd_and_hms(2025, 11, 12, 10, 0, 0).unwrap();
        let result = normalize(&raw("2025-11-12T09:00:00Z"), None, now, threshold());

        assert_eq!(result, Err(Rejection::UnsupportedPollutant));
    }

    #[test]
    fn untracked_parameter_is_rejected() {
        // ---
        let now = Utc.with_ymd_and_hms(2025, 11, 12, 10, 0, 0).unwrap();
        let result = normalize(
            &raw("2025-11-12T09:00:00Z"),
            Some(&sensor("co")),
            now,
            threshold(),
        );

        assert_eq!(result, Err(Rejection::UnsupportedPollutant));
    }

    #[test]
    fn malformed_timestamp_falls_back_to_now() {
        // ---
        let now = Utc.with_ymd_and_hms(2025, 11, 12, 10, 0, 0).unwrap();
        let result = normalize(
            &raw("yesterday-ish"),
            Some(&sensor("no2")),
            now,
            threshold(),
        )
        .unwrap();

        // Degraded but kept, stamped with the current instant
        assert_eq!(result.pollutant, Pollutant::No2);
        assert_eq!(result.measured_at, now);
    }
}
