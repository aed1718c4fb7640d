//! The import draft: an ordered list of rows that can be edited, removed and
//! revalidated.
//!
//! Issues are never patched in place. Every call to [`ImportBatch::revalidate`]
//! clears them and recomputes field checks, in-file duplicates and conflicts
//! with existing records, so editing one row of a duplicate pair clears the
//! issue on both rows.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use rollcall_core::InstitutionKind;

use crate::columns::{ColumnReport, detect_columns};
use crate::error::ImportError;
use crate::field::{Field, ImportKind, RowFields};
use crate::sheet::Sheet;
use crate::validate::{RowIssue, normalize_phone, parse_bounded, validate_fields};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImportRow {
    /// Row number in the uploaded sheet.
    pub row_number: usize,
    pub fields: RowFields,
    #[serde(default)]
    pub issues: Vec<RowIssue>,
    /// Resolved section for student rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<Uuid>,
}

impl ImportRow {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// A section the import can enroll students into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownSection {
    pub id: Uuid,
    pub name: String,
    pub class_name: Option<String>,
    pub department: Option<String>,
    pub year: Option<i16>,
    pub semester: Option<i16>,
}

/// Identifiers already taken in the institution. Emails and employee IDs are
/// lowercase, phones digits only, roll numbers lowercase per section.
#[derive(Debug, Clone, Default)]
pub struct ExistingRecords {
    pub emails: HashSet<String>,
    pub phones: HashSet<String>,
    pub employee_ids: HashSet<String>,
    pub roll_numbers: HashSet<(Uuid, String)>,
    pub sections: Vec<KnownSection>,
}

impl ExistingRecords {
    fn find_section(
        &self,
        institution_kind: InstitutionKind,
        fields: &RowFields,
    ) -> Option<&KnownSection> {
        let name = fields.get(Field::Section)?;
        let same = |a: Option<&str>, b: Option<&String>| match (a, b) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b.trim()),
            _ => false,
        };

        self.sections.iter().find(|s| {
            if !s.name.trim().eq_ignore_ascii_case(name) {
                return false;
            }
            match institution_kind {
                InstitutionKind::School => same(fields.get(Field::ClassName), s.class_name.as_ref()),
                InstitutionKind::College => {
                    same(fields.get(Field::Department), s.department.as_ref())
                        && fields
                            .get(Field::Year)
                            .and_then(|v| parse_bounded(v, 1, 6))
                            .is_some_and(|y| s.year == Some(y))
                        && fields
                            .get(Field::Semester)
                            .and_then(|v| parse_bounded(v, 1, 12))
                            .is_some_and(|v| s.semester == Some(v))
                }
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ImportBatch {
    pub kind: ImportKind,
    pub institution_kind: InstitutionKind,
    pub rows: Vec<ImportRow>,
}

impl ImportBatch {
    pub fn new(kind: ImportKind, institution_kind: InstitutionKind, rows: Vec<ImportRow>) -> Self {
        Self {
            kind,
            institution_kind,
            rows,
        }
    }

    /// Detects columns and extracts every row. Fails when required columns
    /// are missing or the sheet exceeds `max_rows`.
    pub fn from_sheet(
        kind: ImportKind,
        institution_kind: InstitutionKind,
        sheet: &Sheet,
        max_rows: usize,
    ) -> Result<(Self, ColumnReport), ImportError> {
        if sheet.rows.len() > max_rows {
            return Err(ImportError::TooManyRows {
                found: sheet.rows.len(),
                max: max_rows,
            });
        }

        let report = detect_columns(kind, institution_kind, &sheet.headers);
        report.ensure_complete()?;

        let rows = sheet
            .rows
            .iter()
            .map(|row| ImportRow {
                row_number: row.row_number,
                fields: report.extract(&row.cells),
                issues: Vec::new(),
                section_id: None,
            })
            .collect();

        Ok((Self::new(kind, institution_kind, rows), report))
    }

    pub fn update_row(&mut self, index: usize, fields: RowFields) -> Result<(), ImportError> {
        let row = self
            .rows
            .get_mut(index)
            .ok_or(ImportError::RowOutOfRange(index))?;
        row.fields = fields.normalized();
        Ok(())
    }

    pub fn remove_row(&mut self, index: usize) -> Result<ImportRow, ImportError> {
        if index >= self.rows.len() {
            return Err(ImportError::RowOutOfRange(index));
        }
        Ok(self.rows.remove(index))
    }

    pub fn revalidate(&mut self, existing: &ExistingRecords, today: NaiveDate) {
        for row in &mut self.rows {
            row.issues = validate_fields(self.kind, self.institution_kind, &row.fields, today);
            row.section_id = None;
        }

        self.flag_duplicates();
        self.flag_conflicts(existing);
    }

    pub fn issue_count(&self) -> usize {
        self.rows.iter().map(|r| r.issues.len()).sum()
    }

    pub fn rows_with_issues(&self) -> usize {
        self.rows.iter().filter(|r| !r.is_valid()).count()
    }

    pub fn is_ready(&self) -> bool {
        !self.rows.is_empty() && self.issue_count() == 0
    }

    fn duplicate_keys(&self, fields: &RowFields) -> Vec<(Field, String)> {
        let mut keys = Vec::new();

        if let Some(email) = fields.get(Field::Email) {
            keys.push((Field::Email, email.to_lowercase()));
        }
        if let Some(phone) = fields.get(Field::Phone).and_then(normalize_phone) {
            keys.push((Field::Phone, phone));
        }

        match self.kind {
            ImportKind::Faculty => {
                if let Some(id) = fields.get(Field::EmployeeId) {
                    keys.push((Field::EmployeeId, id.to_lowercase()));
                }
            }
            ImportKind::Students => {
                if let (Some(roll), Some(section)) =
                    (fields.get(Field::RollNumber), fields.get(Field::Section))
                {
                    let group = match self.institution_kind {
                        InstitutionKind::School => {
                            fields.get(Field::ClassName).unwrap_or("").to_string()
                        }
                        InstitutionKind::College => format!(
                            "{}|{}|{}",
                            fields.get(Field::Department).unwrap_or(""),
                            fields.get(Field::Year).unwrap_or(""),
                            fields.get(Field::Semester).unwrap_or("")
                        ),
                    };
                    keys.push((
                        Field::RollNumber,
                        format!("{}|{}|{}", roll, group, section).to_lowercase(),
                    ));
                }
            }
        }

        keys
    }

    /// One grouping pass: key to row indexes, then every group larger than
    /// one flags each member.
    fn flag_duplicates(&mut self) {
        let mut groups: BTreeMap<(Field, String), Vec<usize>> = BTreeMap::new();
        for (index, row) in self.rows.iter().enumerate() {
            for key in self.duplicate_keys(&row.fields) {
                groups.entry(key).or_default().push(index);
            }
        }

        for ((field, _), indexes) in groups.into_iter().filter(|(_, v)| v.len() > 1) {
            for &index in &indexes {
                let others = indexes
                    .iter()
                    .filter(|&&i| i != index)
                    .map(|&i| self.rows[i].row_number.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");

                let what = match field {
                    Field::RollNumber => "Roll number is duplicated in the same section",
                    Field::Email => "Email is duplicated",
                    Field::Phone => "Phone is duplicated",
                    _ => "Employee ID is duplicated",
                };
                self.rows[index]
                    .issues
                    .push(RowIssue::field(field, format!("{} in row {}", what, others)));
            }
        }
    }

    fn flag_conflicts(&mut self, existing: &ExistingRecords) {
        let kind = self.kind;
        let institution_kind = self.institution_kind;

        for row in &mut self.rows {
            let fields = &row.fields;
            let mut issues = Vec::new();

            if let Some(email) = fields.get(Field::Email) {
                if existing.emails.contains(&email.to_lowercase()) {
                    issues.push(RowIssue::field(Field::Email, "Email is already registered"));
                }
            }
            if let Some(phone) = fields.get(Field::Phone).and_then(normalize_phone) {
                if existing.phones.contains(&phone) {
                    issues.push(RowIssue::field(Field::Phone, "Phone is already registered"));
                }
            }

            match kind {
                ImportKind::Faculty => {
                    if let Some(id) = fields.get(Field::EmployeeId) {
                        if existing.employee_ids.contains(&id.to_lowercase()) {
                            issues.push(RowIssue::field(
                                Field::EmployeeId,
                                "Employee ID is already in use",
                            ));
                        }
                    }
                }
                ImportKind::Students => {
                    if fields.get(Field::Section).is_some() {
                        match existing.find_section(institution_kind, fields) {
                            Some(section) => {
                                row.section_id = Some(section.id);
                                if let Some(roll) = fields.get(Field::RollNumber) {
                                    if existing
                                        .roll_numbers
                                        .contains(&(section.id, roll.to_lowercase()))
                                    {
                                        issues.push(RowIssue::field(
                                            Field::RollNumber,
                                            "Roll number is already taken in this section",
                                        ));
                                    }
                                }
                            }
                            None => issues.push(RowIssue::field(
                                Field::Section,
                                "Section does not exist for this academic year",
                            )),
                        }
                    }
                }
            }

            row.issues.extend(issues);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::SheetRow;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn faculty(row_number: usize, email: &str, employee_id: &str) -> ImportRow {
        let mut fields = RowFields::default();
        fields.set(Field::FirstName, "Asha");
        fields.set(Field::LastName, "Rao");
        fields.set(Field::Email, email);
        fields.set(Field::EmployeeId, employee_id);
        ImportRow {
            row_number,
            fields,
            issues: Vec::new(),
            section_id: None,
        }
    }

    fn student(row_number: usize, email: &str, roll: &str, class: &str, section: &str) -> ImportRow {
        let mut fields = RowFields::default();
        fields.set(Field::FirstName, "Ravi");
        fields.set(Field::LastName, "Kumar");
        fields.set(Field::Email, email);
        fields.set(Field::RollNumber, roll);
        fields.set(Field::ClassName, class);
        fields.set(Field::Section, section);
        ImportRow {
            row_number,
            fields,
            issues: Vec::new(),
            section_id: None,
        }
    }

    fn school_sections() -> ExistingRecords {
        ExistingRecords {
            sections: vec![KnownSection {
                id: Uuid::from_u128(1),
                name: "A".to_string(),
                class_name: Some("10".to_string()),
                department: None,
                year: None,
                semester: None,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_duplicate_emails_flag_both_rows() {
        let mut batch = ImportBatch::new(
            ImportKind::Faculty,
            InstitutionKind::School,
            vec![
                faculty(2, "asha@example.com", "E1"),
                faculty(3, "ravi@example.com", "E2"),
                faculty(4, "ASHA@example.com", "E3"),
            ],
        );

        batch.revalidate(&ExistingRecords::default(), today());

        assert_eq!(batch.rows[0].issues.len(), 1);
        assert_eq!(batch.rows[0].issues[0].message, "Email is duplicated in row 4");
        assert_eq!(batch.rows[2].issues[0].message, "Email is duplicated in row 2");
        assert!(batch.rows[1].is_valid());
        assert_eq!(batch.rows_with_issues(), 2);
    }

    #[test]
    fn test_fixing_one_duplicate_clears_both() {
        let mut batch = ImportBatch::new(
            ImportKind::Faculty,
            InstitutionKind::School,
            vec![
                faculty(2, "asha@example.com", "E1"),
                faculty(3, "other@example.com", "e1"),
            ],
        );
        batch.revalidate(&ExistingRecords::default(), today());
        assert_eq!(batch.issue_count(), 2);

        let mut fixed = batch.rows[1].fields.clone();
        fixed.set(Field::EmployeeId, "E2");
        batch.update_row(1, fixed).unwrap();
        batch.revalidate(&ExistingRecords::default(), today());

        assert_eq!(batch.issue_count(), 0);
        assert!(batch.is_ready());
    }

    #[test]
    fn test_removing_a_duplicate_clears_the_other() {
        let mut batch = ImportBatch::new(
            ImportKind::Faculty,
            InstitutionKind::School,
            vec![
                faculty(2, "asha@example.com", "E1"),
                faculty(3, "asha@example.com", "E2"),
            ],
        );
        batch.revalidate(&ExistingRecords::default(), today());
        assert_eq!(batch.rows_with_issues(), 2);

        let removed = batch.remove_row(0).unwrap();
        assert_eq!(removed.row_number, 2);
        batch.revalidate(&ExistingRecords::default(), today());

        assert_eq!(batch.rows.len(), 1);
        assert!(batch.is_ready());
    }

    #[test]
    fn test_out_of_range_index() {
        let mut batch = ImportBatch::new(
            ImportKind::Faculty,
            InstitutionKind::School,
            vec![faculty(2, "asha@example.com", "E1")],
        );
        assert!(matches!(
            batch.remove_row(5),
            Err(ImportError::RowOutOfRange(5))
        ));
        assert!(matches!(
            batch.update_row(1, RowFields::default()),
            Err(ImportError::RowOutOfRange(1))
        ));
    }

    #[test]
    fn test_existing_records_conflict() {
        let mut existing = ExistingRecords::default();
        existing.emails.insert("asha@example.com".to_string());
        existing.employee_ids.insert("e9".to_string());

        let mut batch = ImportBatch::new(
            ImportKind::Faculty,
            InstitutionKind::College,
            vec![faculty(2, "Asha@Example.com", "E9")],
        );
        batch.revalidate(&existing, today());

        let messages: Vec<_> = batch.rows[0].issues.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["Email is already registered", "Employee ID is already in use"]
        );
    }

    #[test]
    fn test_student_rows_resolve_sections() {
        let mut existing = school_sections();
        existing
            .roll_numbers
            .insert((Uuid::from_u128(1), "7".to_string()));

        let mut batch = ImportBatch::new(
            ImportKind::Students,
            InstitutionKind::School,
            vec![
                student(2, "a@example.com", "1", "10", "a"),
                student(3, "b@example.com", "2", "9", "A"),
                student(4, "c@example.com", "7", "10", "A"),
            ],
        );
        batch.revalidate(&existing, today());

        assert!(batch.rows[0].is_valid());
        assert_eq!(batch.rows[0].section_id, Some(Uuid::from_u128(1)));

        assert_eq!(batch.rows[1].section_id, None);
        assert_eq!(batch.rows[1].issues[0].field, Some(Field::Section));

        assert_eq!(
            batch.rows[2].issues[0].message,
            "Roll number is already taken in this section"
        );
    }

    #[test]
    fn test_roll_numbers_are_scoped_by_class_and_section() {
        let mut batch = ImportBatch::new(
            ImportKind::Students,
            InstitutionKind::School,
            vec![
                student(2, "a@example.com", "1", "10", "A"),
                student(3, "b@example.com", "1", "10", "B"),
                student(4, "c@example.com", "1", "10", "a"),
            ],
        );
        batch.revalidate(&ExistingRecords::default(), today());

        let roll_issues = |i: usize| {
            batch.rows[i]
                .issues
                .iter()
                .filter(|issue| issue.field == Some(Field::RollNumber))
                .count()
        };
        assert_eq!(roll_issues(0), 1);
        assert_eq!(roll_issues(1), 0);
        assert_eq!(roll_issues(2), 1);
    }

    #[test]
    fn test_from_sheet_maps_cells() {
        let sheet = Sheet {
            headers: vec!["Name".into(), "Email".into(), "Emp Code".into()],
            rows: vec![SheetRow {
                row_number: 2,
                cells: vec!["Asha Rao".into(), "asha@example.com".into(), "E1".into()],
            }],
        };

        let (batch, report) =
            ImportBatch::from_sheet(ImportKind::Faculty, InstitutionKind::School, &sheet, 10)
                .unwrap();

        assert!(report.full_name_column.is_some());
        assert_eq!(batch.rows[0].fields.get(Field::LastName), Some("Rao"));
        assert_eq!(batch.rows[0].fields.get(Field::EmployeeId), Some("E1"));

        let err = ImportBatch::from_sheet(ImportKind::Faculty, InstitutionKind::School, &sheet, 0)
            .unwrap_err();
        assert!(matches!(err, ImportError::TooManyRows { found: 1, max: 0 }));
    }

    #[test]
    fn test_draft_survives_json() {
        let mut batch = ImportBatch::new(
            ImportKind::Faculty,
            InstitutionKind::School,
            vec![faculty(2, "asha@example.com", "E1")],
        );
        batch.revalidate(&ExistingRecords::default(), today());

        let json = serde_json::to_value(&batch.rows).unwrap();
        let rows: Vec<ImportRow> = serde_json::from_value(json).unwrap();
        assert_eq!(rows, batch.rows);
    }
}
