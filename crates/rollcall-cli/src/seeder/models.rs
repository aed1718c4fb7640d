//! Seed records and configuration.

use uuid::Uuid;

use rollcall_core::{InstitutionKind, UserRole};

/// Seeded institutions carry this code prefix so they can be cleared later.
pub const SEED_CODE_PREFIX: &str = "SEED-";

/// Password of every seeded account.
pub const SEED_PASSWORD: &str = "password123";

pub struct InstitutionSeed {
    pub name: String,
    pub kind: InstitutionKind,
    pub code: String,
    pub address: String,
}

#[derive(Clone, Copy)]
pub struct SeededInstitution {
    pub id: Uuid,
    pub kind: InstitutionKind,
}

pub struct SectionSeed {
    pub institution_id: Uuid,
    pub name: String,
    pub class_name: Option<String>,
    pub department: Option<String>,
    pub year: Option<i16>,
    pub semester: Option<i16>,
}

#[derive(Clone, Copy)]
pub struct SeededSection {
    pub id: Uuid,
    pub institution_id: Uuid,
}

pub struct UserSeed {
    pub institution_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: UserRole,
    /// Section a student is enrolled in.
    pub section_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct SeedConfig {
    pub institutions: usize,
    pub sections_per_institution: usize,
    pub faculty_per_institution: usize,
    pub students_per_section: usize,
    pub academic_year: String,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            institutions: 2,
            sections_per_institution: 4,
            faculty_per_institution: 6,
            students_per_section: 30,
            academic_year: "2025-26".to_string(),
        }
    }
}

impl SeedConfig {
    pub fn new(institutions: usize) -> Self {
        Self {
            institutions,
            ..Default::default()
        }
    }

    pub fn students_per_institution(&self) -> usize {
        self.sections_per_institution * self.students_per_section
    }

    /// One admin, the faculty and the students.
    pub fn users_per_institution(&self) -> usize {
        1 + self.faculty_per_institution + self.students_per_institution()
    }
}
