//! Section seeding.
//!
//! School sections are `Class N - A`, college sections are a department,
//! year and semester with a letter name.

use sqlx::PgPool;
use std::time::Instant;
use uuid::Uuid;

use rollcall_core::InstitutionKind;

use super::models::{SectionSeed, SeededInstitution, SeededSection};
use super::placeholders;

const DEPARTMENTS: [&str; 4] = ["CSE", "ECE", "MECH", "CIVIL"];
const LETTERS: [&str; 4] = ["A", "B", "C", "D"];

pub fn generate_sections(
    institutions: &[SeededInstitution],
    per_institution: usize,
) -> Vec<SectionSeed> {
    institutions
        .iter()
        .flat_map(|institution| {
            (0..per_institution).map(move |idx| {
                let name = LETTERS[idx % LETTERS.len()].to_string();
                let group = idx / LETTERS.len();
                match institution.kind {
                    InstitutionKind::School => SectionSeed {
                        institution_id: institution.id,
                        name,
                        class_name: Some((group + 1).to_string()),
                        department: None,
                        year: None,
                        semester: None,
                    },
                    InstitutionKind::College => {
                        let year = (group % 4) as i16 + 1;
                        SectionSeed {
                            institution_id: institution.id,
                            name,
                            class_name: None,
                            department: Some(
                                DEPARTMENTS[(group / 4) % DEPARTMENTS.len()].to_string(),
                            ),
                            year: Some(year),
                            semester: Some(year * 2 - 1),
                        }
                    }
                }
            })
        })
        .collect()
}

pub async fn seed_sections(
    db: &PgPool,
    institutions: &[SeededInstitution],
    per_institution: usize,
    academic_year: &str,
) -> Result<Vec<SeededSection>, Box<dyn std::error::Error>> {
    let start_time = Instant::now();
    let seeds = generate_sections(institutions, per_institution);
    println!("📋 Seeding {} sections...", seeds.len());

    if seeds.is_empty() {
        return Ok(Vec::new());
    }

    let query = format!(
        "INSERT INTO sections (institution_id, name, academic_year, class_name, department, year, semester) \
         VALUES {} RETURNING id",
        placeholders(seeds.len(), 7)
    );
    let mut q = sqlx::query_scalar::<_, Uuid>(&query);
    for seed in &seeds {
        q = q
            .bind(seed.institution_id)
            .bind(&seed.name)
            .bind(academic_year)
            .bind(&seed.class_name)
            .bind(&seed.department)
            .bind(seed.year)
            .bind(seed.semester);
    }
    let ids = q.fetch_all(db).await?;

    let seeded: Vec<SeededSection> = ids
        .into_iter()
        .zip(seeds.iter())
        .map(|(id, seed)| SeededSection {
            id,
            institution_id: seed.institution_id,
        })
        .collect();

    println!(
        "   ✓ Inserted {} sections in {:?}",
        seeded.len(),
        start_time.elapsed()
    );

    Ok(seeded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_models::sections::SectionShape;

    #[test]
    fn test_generated_sections_fit_institution_kind() {
        let institutions = [
            SeededInstitution {
                id: Uuid::from_u128(1),
                kind: InstitutionKind::School,
            },
            SeededInstitution {
                id: Uuid::from_u128(2),
                kind: InstitutionKind::College,
            },
        ];

        let sections = generate_sections(&institutions, 6);
        assert_eq!(sections.len(), 12);

        for (section, institution) in sections.iter().zip(
            std::iter::repeat_n(institutions[0], 6).chain(std::iter::repeat_n(institutions[1], 6)),
        ) {
            let shape = SectionShape {
                class_name: section.class_name.clone(),
                department: section.department.clone(),
                year: section.year,
                semester: section.semester,
            };
            assert!(shape.check(institution.kind).is_ok());
        }
    }

    #[test]
    fn test_section_names_are_unique_per_group() {
        let institutions = [SeededInstitution {
            id: Uuid::from_u128(1),
            kind: InstitutionKind::School,
        }];
        let sections = generate_sections(&institutions, 5);
        assert_eq!(sections[0].class_name.as_deref(), Some("1"));
        assert_eq!(sections[4].class_name.as_deref(), Some("2"));
        assert_eq!(sections[4].name, "A");
    }
}
