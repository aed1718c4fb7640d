//! Sections, enrollments and faculty assignments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use rollcall_core::serde::{deserialize_optional_i64, deserialize_trimmed_option};
use rollcall_core::{PaginationMeta, PaginationParams};

use crate::institutions::InstitutionKind;

/// A school class section (`class_name`) or a college grouping
/// (`department`, `year`, `semester`), always within one academic year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Section {
    pub id: Uuid,
    pub institution_id: Uuid,
    pub name: String,
    pub academic_year: String,
    pub class_name: Option<String>,
    pub department: Option<String>,
    pub year: Option<i16>,
    pub semester: Option<i16>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Section {
    /// e.g. `Class 10 - A` or `CSE Year 2 Sem 3 - A`
    pub fn label(&self) -> String {
        match (&self.class_name, &self.department) {
            (Some(class), _) => format!("Class {} - {}", class, self.name),
            (None, Some(dept)) => format!(
                "{} Year {} Sem {} - {}",
                dept,
                self.year.unwrap_or_default(),
                self.semester.unwrap_or_default(),
                self.name
            ),
            (None, None) => self.name.clone(),
        }
    }
}

/// The grouping fields of a section, checked against the institution kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionShape {
    pub class_name: Option<String>,
    pub department: Option<String>,
    pub year: Option<i16>,
    pub semester: Option<i16>,
}

impl SectionShape {
    pub fn check(&self, kind: InstitutionKind) -> Result<(), &'static str> {
        let college_fields =
            self.department.is_some() || self.year.is_some() || self.semester.is_some();
        match kind {
            InstitutionKind::School => {
                if self.class_name.is_none() {
                    return Err("School sections require class_name");
                }
                if college_fields {
                    return Err("School sections cannot have department, year or semester");
                }
            }
            InstitutionKind::College => {
                if self.class_name.is_some() {
                    return Err("College sections cannot have class_name");
                }
                if self.department.is_none() || self.year.is_none() || self.semester.is_none() {
                    return Err("College sections require department, year and semester");
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSectionDto {
    #[validate(length(min = 1, max = 50))]
    #[schema(example = "A")]
    pub name: String,
    #[validate(length(min = 4, max = 20))]
    #[schema(example = "2025-26")]
    pub academic_year: String,
    #[validate(length(min = 1, max = 50))]
    pub class_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub department: Option<String>,
    #[validate(range(min = 1, max = 6))]
    pub year: Option<i16>,
    #[validate(range(min = 1, max = 12))]
    pub semester: Option<i16>,
}

impl CreateSectionDto {
    pub fn shape(&self) -> SectionShape {
        SectionShape {
            class_name: self.class_name.clone(),
            department: self.department.clone(),
            year: self.year,
            semester: self.semester,
        }
    }
}

/// Omitted fields keep their current value.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateSectionDto {
    #[validate(length(min = 1, max = 50))]
    pub name: Option<String>,
    #[validate(length(min = 4, max = 20))]
    pub academic_year: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub class_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub department: Option<String>,
    #[validate(range(min = 1, max = 6))]
    pub year: Option<i16>,
    #[validate(range(min = 1, max = 12))]
    pub semester: Option<i16>,
}

impl UpdateSectionDto {
    /// The shape the section will have once this update is applied.
    pub fn merged_shape(&self, current: &Section) -> SectionShape {
        SectionShape {
            class_name: self.class_name.clone().or_else(|| current.class_name.clone()),
            department: self.department.clone().or_else(|| current.department.clone()),
            year: self.year.or(current.year),
            semester: self.semester.or(current.semester),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SectionFilterParams {
    #[serde(default, deserialize_with = "deserialize_trimmed_option")]
    pub academic_year: Option<String>,
    #[serde(default, deserialize_with = "deserialize_trimmed_option")]
    pub class_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_trimmed_option")]
    pub department: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub limit: Option<i64>,
}

impl SectionFilterParams {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.limit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedSectionsResponse {
    pub data: Vec<Section>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Enrollment {
    pub id: Uuid,
    pub section_id: Uuid,
    pub student_id: Uuid,
    pub roll_number: String,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateEnrollmentDto {
    pub student_id: Uuid,
    #[validate(length(min = 1, max = 20))]
    #[schema(example = "21")]
    pub roll_number: String,
}

/// A student row in a section roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct EnrolledStudent {
    pub student_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub registration_number: String,
    pub roll_number: String,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AssignFacultyDto {
    pub faculty_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "Mathematics")]
    pub subject: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SectionFaculty {
    pub faculty_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub employee_id: String,
    pub subject: Option<String>,
    pub assigned_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn school_shape() -> SectionShape {
        SectionShape {
            class_name: Some("10".to_string()),
            ..Default::default()
        }
    }

    fn college_shape() -> SectionShape {
        SectionShape {
            class_name: None,
            department: Some("CSE".to_string()),
            year: Some(2),
            semester: Some(3),
        }
    }

    #[test]
    fn test_shape_matches_institution_kind() {
        assert!(school_shape().check(InstitutionKind::School).is_ok());
        assert!(college_shape().check(InstitutionKind::College).is_ok());
        assert!(school_shape().check(InstitutionKind::College).is_err());
        assert!(college_shape().check(InstitutionKind::School).is_err());
    }

    #[test]
    fn test_mixed_shapes_are_rejected() {
        let mixed = SectionShape {
            year: Some(1),
            ..school_shape()
        };
        assert_eq!(
            mixed.check(InstitutionKind::School),
            Err("School sections cannot have department, year or semester")
        );

        let partial = SectionShape {
            semester: None,
            ..college_shape()
        };
        assert!(partial.check(InstitutionKind::College).is_err());
    }

    #[test]
    fn test_year_range_is_validated() {
        let dto = CreateSectionDto {
            name: "A".to_string(),
            academic_year: "2025-26".to_string(),
            class_name: None,
            department: Some("CSE".to_string()),
            year: Some(7),
            semester: Some(1),
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_label() {
        let section = Section {
            id: Uuid::nil(),
            institution_id: Uuid::nil(),
            name: "B".to_string(),
            academic_year: "2025-26".to_string(),
            class_name: None,
            department: Some("ECE".to_string()),
            year: Some(1),
            semester: Some(2),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(section.label(), "ECE Year 1 Sem 2 - B");
    }
}
