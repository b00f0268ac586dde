//! Database schema management for `schoolair-monitor`.
//!
//! Ensures required tables and indexes exist before serving requests.
//! Applied once on startup from `main.rs` (EMBP: single gateway call).

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates the `schools` registry table and the `air_quality_readings`
/// table. The `UNIQUE (school_id, pollutant, measured_at)` constraint is the
/// natural key of a reading and is what makes repeated ingestion runs
/// insert each reading at most once.
///
/// Safe to call on every startup; no-op if objects already exist.
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // School registry. Rows are created and edited by the registry CRUD,
    // which lives outside this service; ingestion only reads them.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schools (
            id        BIGSERIAL PRIMARY KEY,
            name      TEXT             NOT NULL,
            location  TEXT             NOT NULL,
            latitude  DOUBLE PRECISION NOT NULL,
            longitude DOUBLE PRECISION NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Readings are immutable once stored and disappear only when their
    // school is deleted (cascade).
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS air_quality_readings (
            id          BIGSERIAL PRIMARY KEY,
            school_id   BIGINT           NOT NULL REFERENCES schools (id) ON DELETE CASCADE,
            pollutant   TEXT             NOT NULL,
            value       DOUBLE PRECISION NOT NULL,
            measured_at TIMESTAMPTZ      NOT NULL,
            UNIQUE (school_id, pollutant, measured_at)
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Serves the latest/average/peak accessors
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_readings_school_pollutant_measured
            ON air_quality_readings (school_id, pollutant, measured_at DESC);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
