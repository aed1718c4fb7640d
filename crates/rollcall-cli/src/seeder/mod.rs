//! Database seeding with fake institutions, sections and users.
//!
//! - [`institutions`]: schools and colleges, tagged with [`SEED_CODE_PREFIX`]
//! - [`sections`]: sections shaped for each institution kind
//! - [`users`]: admins, faculty (with assignments) and enrolled students
//! - [`models`]: seed records and [`SeedConfig`]
//!
//! Data is generated in parallel with Rayon and inserted with multi-row
//! `INSERT`s. All accounts share one bcrypt hash of [`SEED_PASSWORD`].
//!
//! ```ignore
//! use rollcall_cli::seeder::{seed_all, SeedConfig};
//!
//! seed_all(&pool, SeedConfig::new(3)).await?;
//! ```

pub mod institutions;
pub mod models;
pub mod sections;
pub mod users;

pub use models::{SEED_CODE_PREFIX, SEED_PASSWORD, SeedConfig};

use sqlx::PgPool;
use std::time::Instant;

/// `($1, $2), ($3, $4), ...` for `rows` rows of `cols` columns.
pub(crate) fn placeholders(rows: usize, cols: usize) -> String {
    (0..rows)
        .map(|row| {
            let params = (1..=cols)
                .map(|col| format!("${}", row * cols + col))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({})", params)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn hash_password() -> Result<String, Box<dyn std::error::Error>> {
    // Low cost keeps seeding fast.
    Ok(bcrypt::hash(SEED_PASSWORD, 4)?)
}

pub async fn seed_all(db: &PgPool, config: SeedConfig) -> Result<(), Box<dyn std::error::Error>> {
    let start_time = Instant::now();

    println!("🌱 Starting database seeding...");
    println!("   - Institutions: {}", config.institutions);
    println!(
        "   - Per institution: {} sections, {} faculty, {} students",
        config.sections_per_institution,
        config.faculty_per_institution,
        config.students_per_institution()
    );

    let password_hash = hash_password()?;

    let institutions = institutions::seed_institutions(db, config.institutions).await?;
    let sections = sections::seed_sections(
        db,
        &institutions,
        config.sections_per_institution,
        &config.academic_year,
    )
    .await?;
    let staff = users::seed_staff(
        db,
        &institutions,
        &sections,
        config.faculty_per_institution,
        &password_hash,
    )
    .await?;
    let students =
        users::seed_students(db, &sections, config.students_per_section, &password_hash).await?;

    println!(
        "\n✅ Seeding complete! Created {} institutions, {} sections, {} users in {:?}",
        institutions.len(),
        sections.len(),
        staff + students,
        start_time.elapsed()
    );
    println!("\n📝 Default password for all users: {}", SEED_PASSWORD);

    Ok(())
}

/// Removes every seeded institution and everything that belongs to it.
pub async fn clear_all(db: &PgPool) -> Result<u64, Box<dyn std::error::Error>> {
    institutions::clear_institutions(db).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(2, 3), "($1, $2, $3), ($4, $5, $6)");
        assert_eq!(placeholders(1, 1), "($1)");
    }
}
