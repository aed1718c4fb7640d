//! Column auto-detection.
//!
//! Headers are normalized to lowercase alphanumerics and matched against
//! each field's alias list. The first header to claim a field wins.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use rollcall_core::InstitutionKind;

use crate::error::ImportError;
use crate::field::{Field, ImportKind, RowFields};

const FULL_NAME_ALIASES: &[&str] = &[
    "name",
    "fullname",
    "studentname",
    "facultyname",
    "teachername",
    "staffname",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ColumnMapping {
    pub field: Field,
    pub header: String,
    pub column: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ColumnReport {
    pub mapped: Vec<ColumnMapping>,
    /// Set when a single name column is split into first and last name.
    pub full_name_column: Option<ColumnMapping>,
    pub unmapped: Vec<String>,
    pub missing: Vec<Field>,
}

impl ColumnReport {
    pub fn column_for(&self, field: Field) -> Option<usize> {
        self.mapped
            .iter()
            .find(|m| m.field == field)
            .map(|m| m.column)
    }

    pub fn ensure_complete(&self) -> Result<(), ImportError> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(ImportError::MissingColumns(self.missing.clone()))
        }
    }

    /// Reads one sheet row into fields using the detected mapping.
    pub fn extract(&self, cells: &[String]) -> RowFields {
        let cell = |column: usize| cells.get(column).map(String::as_str).unwrap_or("");

        let mut fields = RowFields::default();
        for mapping in &self.mapped {
            fields.set(mapping.field, cell(mapping.column));
        }

        if let Some(full) = &self.full_name_column {
            let (first, last) = split_full_name(cell(full.column));
            fields.set(Field::FirstName, first);
            fields.set(Field::LastName, last);
        }

        fields
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TemplateColumn {
    pub field: Field,
    pub header: String,
    pub required: bool,
    pub aliases: Vec<String>,
}

/// Lowercases and keeps ASCII letters and digits only.
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

pub fn detect_columns(
    kind: ImportKind,
    institution_kind: InstitutionKind,
    headers: &[String],
) -> ColumnReport {
    let fields = kind.fields(institution_kind);
    let mut report = ColumnReport::default();
    let mut full_name: Option<ColumnMapping> = None;

    for (column, header) in headers.iter().enumerate() {
        let normalized = normalize_header(header);
        if normalized.is_empty() {
            continue;
        }

        let matched = fields
            .iter()
            .copied()
            .find(|f| f.aliases().contains(&normalized.as_str()));

        match matched {
            Some(field) if report.column_for(field).is_none() => {
                report.mapped.push(ColumnMapping {
                    field,
                    header: header.clone(),
                    column,
                });
            }
            None if full_name.is_none() && FULL_NAME_ALIASES.contains(&normalized.as_str()) => {
                full_name = Some(ColumnMapping {
                    field: Field::FirstName,
                    header: header.clone(),
                    column,
                });
            }
            _ => report.unmapped.push(header.clone()),
        }
    }

    let has_first = report.column_for(Field::FirstName).is_some();
    let has_last = report.column_for(Field::LastName).is_some();
    match full_name {
        Some(mapping) if !has_first && !has_last => report.full_name_column = Some(mapping),
        Some(mapping) => report.unmapped.push(mapping.header),
        None => {}
    }

    report.missing = kind
        .required_fields(institution_kind)
        .into_iter()
        .filter(|f| report.column_for(*f).is_none())
        .filter(|f| {
            !(report.full_name_column.is_some()
                && matches!(f, Field::FirstName | Field::LastName))
        })
        .collect();

    report
}

/// Splits at the last space: everything before is the first name.
pub fn split_full_name(name: &str) -> (String, String) {
    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
    match name.rsplit_once(' ') {
        Some((first, last)) => (first.to_string(), last.to_string()),
        None => (name, String::new()),
    }
}

pub fn template(kind: ImportKind, institution_kind: InstitutionKind) -> Vec<TemplateColumn> {
    kind.fields(institution_kind)
        .into_iter()
        .map(|field| TemplateColumn {
            field,
            header: field.label().to_string(),
            required: field.is_required(kind, institution_kind),
            aliases: field.aliases().iter().map(|a| a.to_string()).collect(),
        })
        .collect()
}
