//! User seeding: one admin and a pool of faculty per institution, plus
//! students enrolled in each section. Faculty get employee IDs and section
//! assignments; students get registration numbers and roll numbers.

use fake::Fake;
use fake::faker::name::en::*;
use rayon::prelude::*;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use std::time::Instant;
use uuid::Uuid;

use rollcall_core::UserRole;
use rollcall_db::format_sequence_code;
use rollcall_db::sequences::{FACULTY_EMPLOYEE, STUDENT_REGISTRATION};

use super::models::{SeededInstitution, SeededSection, UserSeed};
use super::placeholders;

const BATCH_SIZE: usize = 1000;

fn generate_user(
    institution_id: Uuid,
    role: UserRole,
    tag: &str,
    idx: usize,
    section_id: Option<Uuid>,
) -> UserSeed {
    let first_name: String = FirstName().fake();
    let last_name: String = LastName().fake();
    let local: String = format!("{}.{}", first_name, last_name)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.')
        .collect();

    UserSeed {
        institution_id,
        email: format!(
            "{}+{}-{}{}@example.com",
            local.to_lowercase(),
            tag,
            role.as_str(),
            idx
        ),
        first_name,
        last_name,
        role,
        section_id,
    }
}

/// Short per-run tag that keeps emails unique across seed runs.
fn run_tag() -> String {
    Uuid::new_v4().simple().to_string()[..6].to_string()
}

pub fn generate_staff(
    institutions: &[SeededInstitution],
    faculty_per_institution: usize,
) -> Vec<UserSeed> {
    let tag = run_tag();
    institutions
        .par_iter()
        .enumerate()
        .flat_map(|(inst_idx, institution)| {
            let mut users = Vec::with_capacity(faculty_per_institution + 1);
            users.push(generate_user(
                institution.id,
                UserRole::Admin,
                &tag,
                inst_idx * 1000,
                None,
            ));
            for idx in 0..faculty_per_institution {
                users.push(generate_user(
                    institution.id,
                    UserRole::Faculty,
                    &tag,
                    inst_idx * 1000 + idx,
                    None,
                ));
            }
            users
        })
        .collect()
}

pub fn generate_students(sections: &[SeededSection], students_per_section: usize) -> Vec<UserSeed> {
    let tag = run_tag();
    sections
        .par_iter()
        .enumerate()
        .flat_map(|(section_idx, section)| {
            (0..students_per_section)
                .map(|idx| {
                    generate_user(
                        section.institution_id,
                        UserRole::Student,
                        &tag,
                        section_idx * 1000 + idx,
                        Some(section.id),
                    )
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

async fn insert_users_chunk(
    tx: &mut Transaction<'_, Postgres>,
    users: &[UserSeed],
    password_hash: &str,
) -> Result<Vec<Uuid>, Box<dyn std::error::Error>> {
    if users.is_empty() {
        return Ok(Vec::new());
    }

    let query = format!(
        "INSERT INTO users (institution_id, first_name, last_name, email, password, role) \
         VALUES {} RETURNING id",
        placeholders(users.len(), 6)
    );
    let mut q = sqlx::query_scalar::<_, Uuid>(&query);
    for user in users {
        q = q
            .bind(user.institution_id)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(password_hash)
            .bind(user.role);
    }

    Ok(q.fetch_all(&mut **tx).await?)
}

async fn insert_rows(
    tx: &mut Transaction<'_, Postgres>,
    table_and_columns: &str,
    rows: &[(Uuid, Uuid, String)],
) -> Result<(), Box<dyn std::error::Error>> {
    for chunk in rows.chunks(BATCH_SIZE) {
        let query = format!(
            "INSERT INTO {} VALUES {}",
            table_and_columns,
            placeholders(chunk.len(), 3)
        );
        let mut q = sqlx::query(&query);
        for (a, b, c) in chunk {
            q = q.bind(a).bind(b).bind(c);
        }
        q.execute(&mut **tx).await?;
    }
    Ok(())
}

async fn set_sequences(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
    counters: &HashMap<Uuid, i64>,
) -> Result<(), Box<dyn std::error::Error>> {
    for (institution_id, value) in counters {
        sqlx::query(
            "INSERT INTO sequences (institution_id, name, value) VALUES ($1, $2, $3)
             ON CONFLICT (institution_id, name) DO UPDATE SET value = GREATEST(sequences.value, EXCLUDED.value)",
        )
        .bind(institution_id)
        .bind(name)
        .bind(value)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Seeds admins and faculty, and assigns faculty to sections round-robin.
pub async fn seed_staff(
    db: &PgPool,
    institutions: &[SeededInstitution],
    sections: &[SeededSection],
    faculty_per_institution: usize,
    password_hash: &str,
) -> Result<usize, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    let users = generate_staff(institutions, faculty_per_institution);
    println!("👥 Seeding {} staff users...", users.len());

    let mut tx = db.begin().await?;
    let mut ids = Vec::with_capacity(users.len());
    for chunk in users.chunks(BATCH_SIZE) {
        ids.extend(insert_users_chunk(&mut tx, chunk, password_hash).await?);
    }

    let mut counters: HashMap<Uuid, i64> = HashMap::new();
    let mut profiles = Vec::new();
    let mut faculty_by_institution: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for (id, user) in ids.iter().zip(users.iter()) {
        if user.role != UserRole::Faculty {
            continue;
        }
        let counter = counters.entry(user.institution_id).or_insert(0);
        *counter += 1;
        profiles.push((
            *id,
            user.institution_id,
            format_sequence_code("EMP", *counter),
        ));
        faculty_by_institution
            .entry(user.institution_id)
            .or_default()
            .push(*id);
    }

    insert_rows(
        &mut tx,
        "faculty_profiles (user_id, institution_id, employee_id)",
        &profiles,
    )
    .await?;
    set_sequences(&mut tx, FACULTY_EMPLOYEE, &counters).await?;

    let mut assignments = Vec::new();
    let mut section_counts: HashMap<Uuid, usize> = HashMap::new();
    for section in sections {
        if let Some(faculty) = faculty_by_institution.get(&section.institution_id)
            && !faculty.is_empty()
        {
            let n = section_counts.entry(section.institution_id).or_insert(0);
            assignments.push((section.id, faculty[*n % faculty.len()], "General".to_string()));
            *n += 1;
        }
    }
    insert_rows(
        &mut tx,
        "faculty_sections (section_id, faculty_id, subject)",
        &assignments,
    )
    .await?;

    tx.commit().await?;

    println!(
        "   ✓ Inserted {} staff users and {} assignments in {:?}",
        ids.len(),
        assignments.len(),
        start_time.elapsed()
    );

    Ok(ids.len())
}

/// Seeds students with registration numbers and enrolls them.
pub async fn seed_students(
    db: &PgPool,
    sections: &[SeededSection],
    students_per_section: usize,
    password_hash: &str,
) -> Result<usize, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    let users = generate_students(sections, students_per_section);
    println!(
        "🎓 Seeding {} students ({} per section)...",
        users.len(),
        students_per_section
    );

    let mut tx = db.begin().await?;
    let mut ids = Vec::with_capacity(users.len());
    for chunk in users.chunks(BATCH_SIZE) {
        ids.extend(insert_users_chunk(&mut tx, chunk, password_hash).await?);
    }

    let mut counters: HashMap<Uuid, i64> = HashMap::new();
    let mut rolls: HashMap<Uuid, usize> = HashMap::new();
    let mut profiles = Vec::with_capacity(ids.len());
    let mut enrollments = Vec::with_capacity(ids.len());
    for (id, user) in ids.iter().zip(users.iter()) {
        let counter = counters.entry(user.institution_id).or_insert(0);
        *counter += 1;
        profiles.push((
            *id,
            user.institution_id,
            format_sequence_code("STU", *counter),
        ));

        if let Some(section_id) = user.section_id {
            let roll = rolls.entry(section_id).or_insert(0);
            *roll += 1;
            enrollments.push((section_id, *id, roll.to_string()));
        }
    }

    insert_rows(
        &mut tx,
        "student_profiles (user_id, institution_id, registration_number)",
        &profiles,
    )
    .await?;
    set_sequences(&mut tx, STUDENT_REGISTRATION, &counters).await?;
    insert_rows(
        &mut tx,
        "enrollments (section_id, student_id, roll_number)",
        &enrollments,
    )
    .await?;

    tx.commit().await?;

    println!(
        "   ✓ Inserted {} students in {:?}",
        ids.len(),
        start_time.elapsed()
    );

    Ok(ids.len())
}
