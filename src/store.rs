//! Repository layer over PostgreSQL.
//!
//! The ingestion pipeline writes through [`insert_reading`] only; everything
//! else here is a read accessor. Readings are never updated or deleted.

use sqlx::PgPool;

use crate::{NewReading, Pollutant, ReadingRow, School};

// ---

pub async fn list_all_schools(pool: &PgPool) -> Result<Vec<School>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, School>(
        r#"
        SELECT id, name, location, latitude, longitude
        FROM schools
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn find_school_by_id(pool: &PgPool, id: i64) -> Result<Option<School>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, School>(
        r#"
        SELECT id, name, location, latitude, longitude
        FROM schools
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Insert a reading unless its natural key `(school, pollutant, measured_at)`
/// already exists. Returns `true` when a row was actually written.
///
/// `ON CONFLICT DO NOTHING` folds the existence check and the insert into
/// one statement, so the operation stays idempotent under retries: the
/// stored value is never overwritten.
pub async fn insert_reading(
    pool: &PgPool,
    school_id: i64,
    reading: &NewReading,
) -> Result<bool, sqlx::Error> {
    // ---
    let result = sqlx::query(
        r#"
        INSERT INTO air_quality_readings (school_id, pollutant, value, measured_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (school_id, pollutant, measured_at) DO NOTHING
        "#,
    )
    .bind(school_id)
    .bind(reading.pollutant.label())
    .bind(reading.value)
    .bind(reading.measured_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

// ---

/// Most recent reading for one pollutant at one school.
pub async fn latest_reading(
    pool: &PgPool,
    school_id: i64,
    pollutant: Pollutant,
) -> Result<Option<ReadingRow>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, ReadingRow>(
        r#"
        SELECT pollutant, value, measured_at
        FROM air_quality_readings
        WHERE school_id = $1 AND pollutant = $2
        ORDER BY measured_at DESC
        LIMIT 1
        "#,
    )
    .bind(school_id)
    .bind(pollutant.label())
    .fetch_optional(pool)
    .await
}

/// Latest reading per pollutant at one school, for the map markers.
pub async fn latest_per_pollutant(
    pool: &PgPool,
    school_id: i64,
) -> Result<Vec<ReadingRow>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, ReadingRow>(
        r#"
        SELECT DISTINCT ON (pollutant) pollutant, value, measured_at
        FROM air_quality_readings
        WHERE school_id = $1
        ORDER BY pollutant, measured_at DESC
        "#,
    )
    .bind(school_id)
    .fetch_all(pool)
    .await
}

/// All-time average for one pollutant at one school; `None` when no
/// readings exist.
pub async fn average_reading(
    pool: &PgPool,
    school_id: i64,
    pollutant: Pollutant,
) -> Result<Option<f64>, sqlx::Error> {
    // ---
    sqlx::query_scalar::<_, Option<f64>>(
        r#"
        SELECT AVG(value)
        FROM air_quality_readings
        WHERE school_id = $1 AND pollutant = $2
        "#,
    )
    .bind(school_id)
    .bind(pollutant.label())
    .fetch_one(pool)
    .await
}

/// Highest reading ever recorded for one pollutant at one school, with its
/// timestamp.
pub async fn peak_reading(
    pool: &PgPool,
    school_id: i64,
    pollutant: Pollutant,
) -> Result<Option<ReadingRow>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, ReadingRow>(
        r#"
        SELECT pollutant, value, measured_at
        FROM air_quality_readings
        WHERE school_id = $1 AND pollutant = $2
        ORDER BY value DESC, measured_at DESC
        LIMIT 1
        "#,
    )
    .bind(school_id)
    .bind(pollutant.label())
    .fetch_optional(pool)
    .await
}

/// Top-N highest readings for one pollutant at one school.
pub async fn top_readings(
    pool: &PgPool,
    school_id: i64,
    pollutant: Pollutant,
    limit: i64,
) -> Result<Vec<ReadingRow>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, ReadingRow>(
        r#"
        SELECT pollutant, value, measured_at
        FROM air_quality_readings
        WHERE school_id = $1 AND pollutant = $2
        ORDER BY value DESC, measured_at DESC
        LIMIT $3
        "#,
    )
    .bind(school_id)
    .bind(pollutant.label())
    .bind(limit)
    .fetch_all(pool)
    .await
}
