//! Per-row field rules.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::ValidateEmail;

use rollcall_core::InstitutionKind;

use crate::field::{Field, ImportKind, RowFields};

const NAME_MAX: usize = 100;
const EMPLOYEE_ID_MAX: usize = 32;
const ROLL_NUMBER_MAX: usize = 20;
const SHORT_TEXT_MAX: usize = 50;
const LONG_TEXT_MAX: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RowIssue {
    /// `None` for problems that concern the row as a whole.
    pub field: Option<Field>,
    pub message: String,
}

impl RowIssue {
    pub fn field(field: Field, message: impl Into<String>) -> Self {
        Self {
            field: Some(field),
            message: message.into(),
        }
    }
}

/// Strips `+`, spaces, `-`, `(` and `)` and returns the digits, or `None`
/// when anything else remains or the length is outside 10..=15.
pub fn normalize_phone(value: &str) -> Option<String> {
    let stripped: String = value
        .chars()
        .filter(|c| !matches!(c, '+' | ' ' | '-' | '(' | ')'))
        .collect();

    let valid = (10..=15).contains(&stripped.len()) && stripped.chars().all(|c| c.is_ascii_digit());
    valid.then_some(stripped)
}

/// Accepts `YYYY-MM-DD`, `DD/MM/YYYY` and `DD-MM-YYYY`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value.trim(), fmt).ok())
}

pub fn parse_bounded(value: &str, min: i16, max: i16) -> Option<i16> {
    value
        .trim()
        .parse::<i16>()
        .ok()
        .filter(|v| (min..=max).contains(v))
}

pub fn is_valid_employee_id(value: &str) -> bool {
    value.len() <= EMPLOYEE_ID_MAX
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '/')
}

/// Checks one row in isolation.
pub fn validate_fields(
    kind: ImportKind,
    institution_kind: InstitutionKind,
    fields: &RowFields,
    today: NaiveDate,
) -> Vec<RowIssue> {
    let mut issues = Vec::new();

    for field in kind.required_fields(institution_kind) {
        if fields.get(field).is_none() {
            issues.push(RowIssue::field(field, format!("{} is required", field.label())));
        }
    }

    let mut max_len = |field: Field, max: usize| {
        if let Some(v) = fields.get(field) {
            if v.chars().count() > max {
                issues.push(RowIssue::field(
                    field,
                    format!("{} must be at most {} characters", field.label(), max),
                ));
            }
        }
    };
    max_len(Field::FirstName, NAME_MAX);
    max_len(Field::LastName, NAME_MAX);
    max_len(Field::GuardianName, NAME_MAX * 2);
    max_len(Field::Department, LONG_TEXT_MAX);
    max_len(Field::Designation, LONG_TEXT_MAX);
    max_len(Field::RollNumber, ROLL_NUMBER_MAX);
    max_len(Field::Section, SHORT_TEXT_MAX);
    max_len(Field::ClassName, SHORT_TEXT_MAX);

    if let Some(email) = fields.get(Field::Email) {
        if !email.validate_email() {
            issues.push(RowIssue::field(Field::Email, "Email is not valid"));
        }
    }

    for field in [Field::Phone, Field::GuardianPhone] {
        if let Some(phone) = fields.get(field) {
            if normalize_phone(phone).is_none() {
                issues.push(RowIssue::field(
                    field,
                    format!("{} must contain 10 to 15 digits", field.label()),
                ));
            }
        }
    }

    match kind {
        ImportKind::Faculty => {
            if let Some(id) = fields.get(Field::EmployeeId) {
                if !is_valid_employee_id(id) {
                    issues.push(RowIssue::field(
                        Field::EmployeeId,
                        "Employee ID may contain only letters, digits, '-' and '/' (max 32)",
                    ));
                }
            }
        }
        ImportKind::Students => {
            if institution_kind == InstitutionKind::College {
                if let Some(year) = fields.get(Field::Year) {
                    if parse_bounded(year, 1, 6).is_none() {
                        issues.push(RowIssue::field(Field::Year, "Year must be between 1 and 6"));
                    }
                }
                if let Some(semester) = fields.get(Field::Semester) {
                    if parse_bounded(semester, 1, 12).is_none() {
                        issues.push(RowIssue::field(
                            Field::Semester,
                            "Semester must be between 1 and 12",
                        ));
                    }
                }
            }

            if let Some(dob) = fields.get(Field::DateOfBirth) {
                match parse_date(dob) {
                    None => issues.push(RowIssue::field(
                        Field::DateOfBirth,
                        "Date of Birth must be YYYY-MM-DD, DD/MM/YYYY or DD-MM-YYYY",
                    )),
                    Some(date) if date > today => issues.push(RowIssue::field(
                        Field::DateOfBirth,
                        "Date of Birth cannot be in the future",
                    )),
                    Some(_) => {}
                }
            }
        }
    }

    issues
}
