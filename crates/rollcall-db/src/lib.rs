//! # Rollcall DB
//!
//! Database pool and utilities for the Rollcall API.
//!
//! - [`init_db_pool`]: PostgreSQL pool from `DATABASE_URL`
//! - [`sequences`]: per-institution counters used for registration numbers
//!   and employee IDs
//!
//! # Example
//!
//! ```ignore
//! use rollcall_db::init_db_pool;
//!
//! #[tokio::main]
//! async fn main() {
//!     let pool = init_db_pool().await;
//! }
//! ```

pub mod sequences;

use std::env;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

pub use sequences::{format_sequence_code, next_sequence_value};
pub use sqlx::PgPool;

/// Initializes a PostgreSQL connection pool.
///
/// Reads `DATABASE_URL` and, optionally, `DATABASE_MAX_CONNECTIONS`
/// (default 10).
///
/// # Panics
///
/// Panics if `DATABASE_URL` is not set or the database is unreachable.
/// This is only called during startup.
pub async fn init_db_pool() -> PgPool {
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!(max_connections, "Database pool initialized");
    pool
}
