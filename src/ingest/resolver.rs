//! Per-run sensor resolution cache.

use std::collections::HashMap;
use std::future::Future;

use crate::SensorInfo;

// ---

/// Memoizes sensor-to-pollutant resolution for the duration of one
/// ingestion run.
///
/// Failed resolutions are cached as `None` (negative caching), so a sensor
/// that does not map to a tracked pollutant is looked up at most once per
/// run. The cache is owned by the runner and deliberately not persisted
/// across runs: sensor bindings are stable but cheap to re-resolve, and a
/// cold start each run keeps them fresh.
#[derive(Default)]
pub struct SensorResolver {
    // ---
    cache: HashMap<i64, Option<SensorInfo>>,
}

impl SensorResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a sensor, consulting the cache first.
    ///
    /// `lookup` runs only on a cache miss; its result, including `None`, is
    /// recorded for the rest of the run.
    pub async fn resolve<F, Fut>(&mut self, sensor_id: i64, lookup: F) -> Option<SensorInfo>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<SensorInfo>>,
    {
        // ---
        if let Some(cached) = self.cache.get(&sensor_id) {
            return cached.clone();
        }

        let resolved = lookup().await;
        self.cache.insert(sensor_id, resolved.clone());
        resolved
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn pm25_sensor(sensor_id: i64) -> SensorInfo {
        // ---
        SensorInfo {
            sensor_id,
            parameter: "pm25".to_string(),
            display_name: "PM2.5".to_string(),
        }
    }

    #[tokio::test]
    async fn successful_resolution_is_cached() {
        // ---
        let mut resolver = SensorResolver::new();
        let mut calls = 0;

        let first = resolver
            .resolve(7, || {
                calls += 1;
                async { Some(pm25_sensor(7)) }
            })
            .await;
        assert_eq!(first.as_ref().map(|s| s.sensor_id), Some(7));

        // Second resolve must be served from the cache
        let second = resolver
            .resolve(7, || {
                calls += 1;
                async { Some(pm25_sensor(7)) }
            })
            .await;
        assert_eq!(second.map(|s| s.parameter), Some("pm25".to_string()));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn failed_resolution_is_not_retried() {
        // ---
        let mut resolver = SensorResolver::new();
        let mut calls = 0;

        for _ in 0..2 {
            let resolved = resolver
                .resolve(42, || {
                    calls += 1;
                    async { None }
                })
                .await;
            assert!(resolved.is_none());
        }

        assert_eq!(calls, 1, "unresolvable sensor was looked up again");
    }

    #[tokio::test]
    async fn distinct_sensors_are_resolved_independently() {
        // ---
        let mut resolver = SensorResolver::new();
        let mut calls = 0;

        resolver
            .resolve(1, || {
                calls += 1;
                async { Some(pm25_sensor(1)) }
            })
            .await;
        resolver
            .resolve(2, || {
                calls += 1;
                async { None }
            })
            .await;

        assert_eq!(calls, 2);
    }
}
