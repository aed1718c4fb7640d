//! Institution seeding.

use fake::Fake;
use fake::faker::address::en::*;
use rayon::prelude::*;
use sqlx::PgPool;
use std::time::Instant;
use uuid::Uuid;

use rollcall_core::InstitutionKind;

use super::models::{InstitutionSeed, SEED_CODE_PREFIX, SeededInstitution};
use super::placeholders;

/// Alternates schools and colleges.
pub fn generate_institutions(count: usize) -> Vec<InstitutionSeed> {
    (0..count)
        .into_par_iter()
        .map(|idx| {
            let city: String = CityName().fake();
            let street: String = StreetName().fake();
            let building: String = BuildingNumber().fake();
            let kind = if idx % 2 == 0 {
                InstitutionKind::School
            } else {
                InstitutionKind::College
            };
            let suffix = match kind {
                InstitutionKind::School => "High School",
                InstitutionKind::College => "College",
            };
            let tag = Uuid::new_v4().simple().to_string()[..8].to_ascii_uppercase();

            InstitutionSeed {
                name: format!("{} {}", city, suffix),
                kind,
                code: format!("{}{}", SEED_CODE_PREFIX, tag),
                address: format!("{} {}, {}", building, street, city),
            }
        })
        .collect()
}

pub async fn seed_institutions(
    db: &PgPool,
    count: usize,
) -> Result<Vec<SeededInstitution>, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🏫 Seeding {} institutions...", count);

    let seeds = generate_institutions(count);
    if seeds.is_empty() {
        return Ok(Vec::new());
    }

    let query = format!(
        "INSERT INTO institutions (name, kind, code, address) VALUES {} RETURNING id",
        placeholders(seeds.len(), 4)
    );
    let mut q = sqlx::query_scalar::<_, Uuid>(&query);
    for seed in &seeds {
        q = q
            .bind(&seed.name)
            .bind(seed.kind)
            .bind(&seed.code)
            .bind(&seed.address);
    }
    let ids = q.fetch_all(db).await?;

    let seeded: Vec<SeededInstitution> = ids
        .into_iter()
        .zip(seeds.iter())
        .map(|(id, seed)| SeededInstitution {
            id,
            kind: seed.kind,
        })
        .collect();

    println!(
        "   ✓ Inserted {} institutions in {:?}",
        seeded.len(),
        start_time.elapsed()
    );

    Ok(seeded)
}

/// Deletes seeded institutions. Attendance sessions are removed first
/// because sections refuse deletion while sessions exist.
pub async fn clear_institutions(db: &PgPool) -> Result<u64, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    println!("🗑️  Clearing seeded institutions...");

    let pattern = format!("{}%", SEED_CODE_PREFIX);
    let mut tx = db.begin().await?;

    sqlx::query(
        "DELETE FROM attendance_sessions
         WHERE section_id IN (
             SELECT s.id FROM sections s
             JOIN institutions i ON i.id = s.institution_id
             WHERE i.code LIKE $1
         )",
    )
    .bind(&pattern)
    .execute(&mut *tx)
    .await?;

    let result = sqlx::query("DELETE FROM institutions WHERE code LIKE $1")
        .bind(&pattern)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;

    println!(
        "   ✓ Deleted {} institutions in {:?}",
        result,
        start_time.elapsed()
    );

    Ok(result)
}
