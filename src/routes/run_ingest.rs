//! On-demand ingestion trigger.
//!
//! The same run the scheduler performs periodically, exposed for manual
//! invocation. The response body is the run summary.

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router,
};
use serde_json::json;
use sqlx::PgPool;
use tracing::{error, info};

use crate::{ingest, Config};

// ---

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new().route("/ingest/run", post(handler))
}

/// Handle `POST /ingest/run`.
///
/// Runs the full pipeline for every registered school. Partial failure is
/// the expected steady state, so the response is 200 even when some
/// schools failed; only a run that cannot start at all (e.g. the school
/// list is unreadable) maps to a 500.
async fn handler(State((pool, config)): State<(PgPool, Config)>) -> impl IntoResponse {
    // ---
    info!("POST /ingest/run - starting on-demand ingestion run");

    match ingest::run_all(&pool, &config).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => {
            error!("ingestion run aborted: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "ingestion run aborted"})),
            )
                .into_response()
        }
    }
}
