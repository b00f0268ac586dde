// src/routes/health.rs
//! API health check endpoint for the school air monitor backend.
//!
//! Defines the `/health` route used by container orchestrators and CI
//! pipelines to verify that the service is up and able to respond. Sibling
//! module in the `routes` directory following the Explicit Module Boundary
//! Pattern (EMBP): the handler stays internal, the gateway (`mod.rs`) only
//! sees the subrouter.

use axum::{routing::get, Json, Router};
use serde::Serialize;

/// JSON response body for the `/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Handle `GET /health`.
///
/// Deliberately lightweight: does not touch the database or the upstream
/// air quality API.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Create a subrouter containing the `/health` route.
///
/// Generic over the application state so it merges cleanly with the
/// gateway router regardless of the state type (e.g. `(PgPool, Config)`).
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health))
}
