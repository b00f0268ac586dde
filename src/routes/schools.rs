//! Read endpoints consumed by the map front end.
//!
//! `GET /api/schools` is the marker payload: every school with its latest
//! reading per pollutant. `GET /api/schools/{id}/stats` serves the
//! per-pollutant statistics panel (latest, all-time average, peak, top-N).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use tracing::error;

use crate::{store, Config, Pollutant, ReadingRow, School};

// ---

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new()
        .route("/api/schools", get(list_schools))
        .route("/api/schools/{id}/stats", get(school_stats))
}

// ---

/// One map marker: the school plus its latest reading per pollutant.
#[derive(Debug, Serialize)]
struct SchoolMarker {
    #[serde(flatten)]
    school: School,
    latest_readings: Vec<ReadingRow>,
}

async fn list_schools(State((pool, _config)): State<(PgPool, Config)>) -> impl IntoResponse {
    // ---
    let schools = match store::list_all_schools(&pool).await {
        Ok(schools) => schools,
        Err(err) => {
            error!("failed to list schools: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "database error"})),
            )
                .into_response();
        }
    };

    let mut markers = Vec::with_capacity(schools.len());
    for school in schools {
        match store::latest_per_pollutant(&pool, school.id).await {
            Ok(latest_readings) => markers.push(SchoolMarker {
                school,
                latest_readings,
            }),
            Err(err) => {
                error!("failed to load readings for school {}: {err}", school.id);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "database error"})),
                )
                    .into_response();
            }
        }
    }

    (StatusCode::OK, Json(markers)).into_response()
}

// ---

#[derive(Debug, Deserialize)]
struct StatsQuery {
    pollutant: Option<String>,
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
struct SchoolStats {
    school_id: i64,
    school_name: String,
    pollutant: &'static str,
    latest: Option<ReadingRow>,
    average: Option<f64>,
    peak: Option<ReadingRow>,
    top_readings: Vec<ReadingRow>,
}

async fn school_stats(
    Path(id): Path<i64>,
    Query(params): Query<StatsQuery>,
    State((pool, _config)): State<(PgPool, Config)>,
) -> impl IntoResponse {
    // ---
    let label = params.pollutant.as_deref().unwrap_or("PM2.5");
    let Some(pollutant) = Pollutant::from_label(label) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": format!("unknown pollutant: {label}")})),
        )
            .into_response();
    };

    let school = match store::find_school_by_id(&pool, id).await {
        Ok(Some(school)) => school,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({"error": format!("no school with id {id}")})),
            )
                .into_response();
        }
        Err(err) => {
            error!("failed to load school {id}: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "database error"})),
            )
                .into_response();
        }
    };

    let limit = params.limit.unwrap_or(5).clamp(1, 100);

    let stats = async {
        Ok::<_, sqlx::Error>(SchoolStats {
            school_id: school.id,
            school_name: school.name.clone(),
            pollutant: pollutant.label(),
            latest: store::latest_reading(&pool, school.id, pollutant).await?,
            average: store::average_reading(&pool, school.id, pollutant).await?,
            peak: store::peak_reading(&pool, school.id, pollutant).await?,
            top_readings: store::top_readings(&pool, school.id, pollutant, limit).await?,
        })
    }
    .await;

    match stats {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(err) => {
            error!("failed to load stats for school {id}: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "database error"})),
            )
                .into_response()
        }
    }
}
