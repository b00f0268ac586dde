use axum::Router;
use sqlx::PgPool;

use crate::Config;

mod health;
mod run_ingest;
mod schools;

// ---

pub fn router(pool: PgPool, config: Config) -> Router {
    // ---
    Router::new()
        .merge(schools::router())
        .merge(run_ingest::router())
        .merge(health::router())
        .with_state((pool, config))
}
