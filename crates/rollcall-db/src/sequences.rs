//! Per-institution counters.
//!
//! A sequence row is created on first use and incremented atomically with a
//! single upsert, so concurrent signups in the same institution never receive
//! the same value. Call it with a transaction to tie the allocation to the
//! rows that use it.

use sqlx::PgExecutor;
use uuid::Uuid;

pub const STUDENT_REGISTRATION: &str = "student_registration";
pub const FACULTY_EMPLOYEE: &str = "faculty_employee";

/// Returns the next value of the named sequence, starting at 1.
pub async fn next_sequence_value<'e, E>(
    executor: E,
    institution_id: Uuid,
    name: &str,
) -> Result<i64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO sequences (institution_id, name, value)
        VALUES ($1, $2, 1)
        ON CONFLICT (institution_id, name)
        DO UPDATE SET value = sequences.value + 1
        RETURNING value
        "#,
    )
    .bind(institution_id)
    .bind(name)
    .fetch_one(executor)
    .await
}

/// Renders a sequence value as a fixed-width code, e.g. `STU-000042`.
pub fn format_sequence_code(prefix: &str, value: i64) -> String {
    format!("{}-{:06}", prefix, value)
}
