//! Import kinds, row fields and their header aliases.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use rollcall_core::InstitutionKind;

use crate::error::ImportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    Faculty,
    Students,
}

impl ImportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportKind::Faculty => "faculty",
            ImportKind::Students => "students",
        }
    }

    /// Fields recognised in uploads of this kind, in template order.
    pub fn fields(&self, institution_kind: InstitutionKind) -> Vec<Field> {
        match self {
            ImportKind::Faculty => vec![
                Field::FirstName,
                Field::LastName,
                Field::Email,
                Field::Phone,
                Field::EmployeeId,
                Field::Department,
                Field::Designation,
            ],
            ImportKind::Students => {
                let mut fields = vec![
                    Field::FirstName,
                    Field::LastName,
                    Field::Email,
                    Field::Phone,
                    Field::RollNumber,
                ];
                match institution_kind {
                    InstitutionKind::School => fields.push(Field::ClassName),
                    InstitutionKind::College => {
                        fields.extend([Field::Department, Field::Year, Field::Semester])
                    }
                }
                fields.extend([
                    Field::Section,
                    Field::DateOfBirth,
                    Field::GuardianName,
                    Field::GuardianPhone,
                ]);
                fields
            }
        }
    }

    pub fn required_fields(&self, institution_kind: InstitutionKind) -> Vec<Field> {
        self.fields(institution_kind)
            .into_iter()
            .filter(|f| f.is_required(*self, institution_kind))
            .collect()
    }
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportKind {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "faculty" => Ok(ImportKind::Faculty),
            "students" | "student" => Ok(ImportKind::Students),
            other => Err(ImportError::UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    FirstName,
    LastName,
    Email,
    Phone,
    EmployeeId,
    Department,
    Designation,
    RollNumber,
    Section,
    ClassName,
    Year,
    Semester,
    DateOfBirth,
    GuardianName,
    GuardianPhone,
}

impl Field {
    pub fn key(&self) -> &'static str {
        match self {
            Field::FirstName => "first_name",
            Field::LastName => "last_name",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::EmployeeId => "employee_id",
            Field::Department => "department",
            Field::Designation => "designation",
            Field::RollNumber => "roll_number",
            Field::Section => "section",
            Field::ClassName => "class_name",
            Field::Year => "year",
            Field::Semester => "semester",
            Field::DateOfBirth => "date_of_birth",
            Field::GuardianName => "guardian_name",
            Field::GuardianPhone => "guardian_phone",
        }
    }

    /// Column header used in templates and messages.
    pub fn label(&self) -> &'static str {
        match self {
            Field::FirstName => "First Name",
            Field::LastName => "Last Name",
            Field::Email => "Email",
            Field::Phone => "Phone",
            Field::EmployeeId => "Employee ID",
            Field::Department => "Department",
            Field::Designation => "Designation",
            Field::RollNumber => "Roll Number",
            Field::Section => "Section",
            Field::ClassName => "Class",
            Field::Year => "Year",
            Field::Semester => "Semester",
            Field::DateOfBirth => "Date of Birth",
            Field::GuardianName => "Guardian Name",
            Field::GuardianPhone => "Guardian Phone",
        }
    }

    /// Normalized header spellings that map to this field.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Field::FirstName => &["firstname", "fname", "givenname", "first"],
            Field::LastName => &["lastname", "lname", "surname", "familyname", "last"],
            Field::Email => &["email", "emailaddress", "emailid", "mail", "mailid"],
            Field::Phone => &[
                "phone",
                "phonenumber",
                "phoneno",
                "mobile",
                "mobilenumber",
                "mobileno",
                "contact",
                "contactnumber",
                "contactno",
            ],
            Field::EmployeeId => &[
                "employeeid",
                "empid",
                "employeeno",
                "employeenumber",
                "employeecode",
                "empcode",
                "staffid",
                "facultyid",
            ],
            Field::Department => &["department", "dept", "branch"],
            Field::Designation => &["designation", "title", "jobtitle", "position"],
            Field::RollNumber => &["rollnumber", "rollno", "roll", "rollnum"],
            Field::Section => &["section", "sec", "division", "div"],
            Field::ClassName => &["class", "classname", "grade", "standard", "std"],
            Field::Year => &["year", "yearofstudy", "studyyear", "currentyear"],
            Field::Semester => &["semester", "sem"],
            Field::DateOfBirth => &["dateofbirth", "dob", "birthdate", "birthday"],
            Field::GuardianName => &[
                "guardianname",
                "guardian",
                "parentname",
                "fathername",
                "mothername",
            ],
            Field::GuardianPhone => &[
                "guardianphone",
                "guardianmobile",
                "guardiancontact",
                "parentphone",
                "parentmobile",
                "parentcontact",
            ],
        }
    }

    pub fn is_required(&self, kind: ImportKind, institution_kind: InstitutionKind) -> bool {
        match self {
            Field::FirstName | Field::LastName | Field::Email => true,
            Field::EmployeeId => kind == ImportKind::Faculty,
            Field::RollNumber | Field::Section => kind == ImportKind::Students,
            Field::ClassName => {
                kind == ImportKind::Students && institution_kind == InstitutionKind::School
            }
            Field::Department | Field::Year | Field::Semester => {
                kind == ImportKind::Students && institution_kind == InstitutionKind::College
            }
            _ => false,
        }
    }

    pub fn labels(fields: &[Field]) -> String {
        fields
            .iter()
            .map(|f| f.label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// The editable cells of one import row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RowFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semester: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardian_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardian_phone: Option<String>,
}

impl RowFields {
    fn slot(&self, field: Field) -> &Option<String> {
        match field {
            Field::FirstName => &self.first_name,
            Field::LastName => &self.last_name,
            Field::Email => &self.email,
            Field::Phone => &self.phone,
            Field::EmployeeId => &self.employee_id,
            Field::Department => &self.department,
            Field::Designation => &self.designation,
            Field::RollNumber => &self.roll_number,
            Field::Section => &self.section,
            Field::ClassName => &self.class_name,
            Field::Year => &self.year,
            Field::Semester => &self.semester,
            Field::DateOfBirth => &self.date_of_birth,
            Field::GuardianName => &self.guardian_name,
            Field::GuardianPhone => &self.guardian_phone,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::FirstName => &mut self.first_name,
            Field::LastName => &mut self.last_name,
            Field::Email => &mut self.email,
            Field::Phone => &mut self.phone,
            Field::EmployeeId => &mut self.employee_id,
            Field::Department => &mut self.department,
            Field::Designation => &mut self.designation,
            Field::RollNumber => &mut self.roll_number,
            Field::Section => &mut self.section,
            Field::ClassName => &mut self.class_name,
            Field::Year => &mut self.year,
            Field::Semester => &mut self.semester,
            Field::DateOfBirth => &mut self.date_of_birth,
            Field::GuardianName => &mut self.guardian_name,
            Field::GuardianPhone => &mut self.guardian_phone,
        }
    }

    /// The trimmed value of a field; blank cells read as `None`.
    pub fn get(&self, field: Field) -> Option<&str> {
        self.slot(field)
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = value.into().trim().to_string();
        *self.slot_mut(field) = if value.is_empty() { None } else { Some(value) };
    }

    /// Trims every value and drops blanks.
    pub fn normalized(&self) -> RowFields {
        let mut out = RowFields::default();
        for field in ALL_FIELDS {
            if let Some(v) = self.get(field) {
                out.set(field, v);
            }
        }
        out
    }
}

pub const ALL_FIELDS: [Field; 15] = [
    Field::FirstName,
    Field::LastName,
    Field::Email,
    Field::Phone,
    Field::EmployeeId,
    Field::Department,
    Field::Designation,
    Field::RollNumber,
    Field::Section,
    Field::ClassName,
    Field::Year,
    Field::Semester,
    Field::DateOfBirth,
    Field::GuardianName,
    Field::GuardianPhone,
];
