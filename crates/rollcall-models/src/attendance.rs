//! Attendance sessions, punches and summaries.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use rollcall_core::serde::{deserialize_optional_i64, deserialize_optional_uuid};
use rollcall_core::{PaginationMeta, PaginationParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "session_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "punch_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PunchStatus {
    Present,
    Absent,
    Late,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AttendanceSession {
    pub id: Uuid,
    pub section_id: Uuid,
    pub created_by: Uuid,
    pub session_date: NaiveDate,
    pub period: Option<i16>,
    pub subject: Option<String>,
    pub notes: Option<String>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSessionDto {
    pub section_id: Uuid,
    pub session_date: NaiveDate,
    #[validate(range(min = 1, max = 24))]
    pub period: Option<i16>,
    #[validate(length(min = 1, max = 100))]
    pub subject: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SessionFilterParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub section_id: Option<Uuid>,
    /// Inclusive start date
    pub from: Option<NaiveDate>,
    /// Inclusive end date
    pub to: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_i64")]
    pub limit: Option<i64>,
}

impl SessionFilterParams {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.limit)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedSessionsResponse {
    pub data: Vec<AttendanceSession>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PunchRecord {
    pub student_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub roll_number: String,
    pub status: PunchStatus,
    pub remarks: Option<String>,
    pub marked_by: Uuid,
    pub marked_at: DateTime<Utc>,
}

/// An enrolled student with no punch in the session yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UnmarkedStudent {
    pub student_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub roll_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: AttendanceSession,
    pub punches: Vec<PunchRecord>,
    pub unmarked: Vec<UnmarkedStudent>,
    pub tally: AttendanceTally,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct PunchInput {
    pub student_id: Uuid,
    pub status: PunchStatus,
    #[validate(length(max = 255))]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct MarkPunchesDto {
    #[validate(length(min = 1, message = "At least one punch is required"), nested)]
    pub punches: Vec<PunchInput>,
}

impl MarkPunchesDto {
    /// Students listed more than once, in first-seen order.
    pub fn repeated_students(&self) -> Vec<Uuid> {
        let mut seen = std::collections::HashSet::new();
        let mut repeated = Vec::new();
        for punch in &self.punches {
            if !seen.insert(punch.student_id) && !repeated.contains(&punch.student_id) {
                repeated.push(punch.student_id);
            }
        }
        repeated
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceTally {
    pub present: i64,
    pub absent: i64,
    pub late: i64,
    pub total: i64,
}

impl AttendanceTally {
    pub fn from_statuses<I: IntoIterator<Item = PunchStatus>>(statuses: I) -> Self {
        let mut tally = Self::default();
        for status in statuses {
            tally.add(status, 1);
        }
        tally
    }

    pub fn add(&mut self, status: PunchStatus, count: i64) {
        match status {
            PunchStatus::Present => self.present += count,
            PunchStatus::Absent => self.absent += count,
            PunchStatus::Late => self.late += count,
        }
        self.total += count;
    }

    /// `(present + late) / total * 100`, rounded to two decimals; `None`
    /// when nothing has been recorded.
    pub fn percentage(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        let attended = (self.present + self.late) as f64;
        Some((attended / self.total as f64 * 10000.0).round() / 100.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MarkPunchesResponse {
    pub session_id: Uuid,
    pub marked: usize,
    pub tally: AttendanceTally,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SummaryParams {
    #[serde(default, deserialize_with = "deserialize_optional_uuid")]
    pub section_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttendanceSummary {
    pub student_id: Uuid,
    pub section_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub present: i64,
    pub absent: i64,
    pub late: i64,
    pub total: i64,
    pub percentage: Option<f64>,
}

impl AttendanceSummary {
    pub fn new(student_id: Uuid, params: &SummaryParams, tally: AttendanceTally) -> Self {
        Self {
            student_id,
            section_id: params.section_id,
            from: params.from,
            to: params.to,
            present: tally.present,
            absent: tally.absent,
            late: tally.late,
            total: tally.total,
            percentage: tally.percentage(),
        }
    }
}
