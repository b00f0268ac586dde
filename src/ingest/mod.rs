//! Air quality ingestion pipeline.
//!
//! Per school: discover the nearest monitoring station, fetch its latest
//! raw measurements, resolve each sensor to a pollutant (memoized per run),
//! drop stale data, and store only genuinely new readings. Gateway module
//! (EMBP): submodules stay internal, consumers use the re-exports below.

mod client;
mod normalize;
mod pipeline;
mod rate_limit;
mod resolver;
mod runner;

pub use runner::{run_all, run_periodically, RunSummary};
