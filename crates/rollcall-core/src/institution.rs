//! Institution kinds.
//!
//! The kind decides how sections are described: schools group students by
//! class, colleges by department, year and semester.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "institution_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InstitutionKind {
    School,
    College,
}

impl InstitutionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstitutionKind::School => "school",
            InstitutionKind::College => "college",
        }
    }
}

impl fmt::Display for InstitutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstitutionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "school" => Ok(InstitutionKind::School),
            "college" => Ok(InstitutionKind::College),
            other => Err(format!("Invalid institution kind: {}", other)),
        }
    }
}
