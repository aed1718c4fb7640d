use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use rollcall_core::{AppError, PaginationMeta, UserRole};
use rollcall_models::attendance::{
    AttendanceSession, AttendanceSummary, AttendanceTally, CreateSessionDto, MarkPunchesDto,
    MarkPunchesResponse, PaginatedSessionsResponse, PunchRecord, PunchStatus, SessionDetail,
    SessionFilterParams, SessionStatus, SummaryParams, UnmarkedStudent,
};

use crate::metrics::track_punches;
use crate::modules::sections::service::{SectionService, Viewer};

const SESSION_COLUMNS: &str = "a.id, a.section_id, a.created_by, a.session_date, a.period, \
     a.subject, a.notes, a.status, a.created_at, a.updated_at";

fn check_date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<(), AppError> {
    if let (Some(from), Some(to)) = (from, to)
        && from > to
    {
        return Err(AppError::unprocessable(anyhow::anyhow!(
            "from must not be after to"
        )));
    }
    Ok(())
}

fn join_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct AttendanceService;

impl AttendanceService {
    async fn load_session(
        db: &PgPool,
        institution_id: Uuid,
        session_id: Uuid,
    ) -> Result<AttendanceSession, AppError> {
        let sql = format!(
            "SELECT {} FROM attendance_sessions a
             JOIN sections s ON s.id = a.section_id
             WHERE a.id = $1 AND s.institution_id = $2",
            SESSION_COLUMNS
        );
        sqlx::query_as::<_, AttendanceSession>(&sql)
            .bind(session_id)
            .bind(institution_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Attendance session not found")))
    }

    fn ensure_owner(viewer: Viewer, session: &AttendanceSession) -> Result<(), AppError> {
        if viewer.role == UserRole::Admin || session.created_by == viewer.user_id {
            Ok(())
        } else {
            Err(AppError::forbidden(
                "Only the session creator or an admin can do this",
            ))
        }
    }

    async fn session_tally(db: &PgPool, session_id: Uuid) -> Result<AttendanceTally, AppError> {
        let counts = sqlx::query_as::<_, (PunchStatus, i64)>(
            "SELECT status, COUNT(*) FROM attendance_punches WHERE session_id = $1 GROUP BY status",
        )
        .bind(session_id)
        .fetch_all(db)
        .await?;

        let mut tally = AttendanceTally::default();
        for (status, count) in counts {
            tally.add(status, count);
        }
        Ok(tally)
    }

    #[instrument(skip(db, dto), fields(section.id = %dto.section_id))]
    pub async fn create_session(
        db: &PgPool,
        viewer: Viewer,
        dto: CreateSessionDto,
    ) -> Result<AttendanceSession, AppError> {
        SectionService::get_section(db, viewer.institution_id, dto.section_id).await?;
        SectionService::ensure_can_manage(db, viewer, dto.section_id).await?;

        if dto.session_date > Utc::now().date_naive() {
            return Err(AppError::unprocessable(anyhow::anyhow!(
                "session_date cannot be in the future"
            )));
        }

        let session = sqlx::query_as::<_, AttendanceSession>(
            r#"INSERT INTO attendance_sessions
                (section_id, created_by, session_date, period, subject, notes)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id, section_id, created_by, session_date, period, subject, notes,
                         status, created_at, updated_at"#,
        )
        .bind(dto.section_id)
        .bind(viewer.user_id)
        .bind(dto.session_date)
        .bind(dto.period)
        .bind(dto.subject.as_deref().map(str::trim))
        .bind(dto.notes.as_deref().map(str::trim))
        .fetch_one(db)
        .await
        .map_err(|e| {
            AppError::from_unique_violation(
                e,
                "An attendance session already exists for this section, date, period and subject",
            )
        })?;

        info!(session.id = %session.id, session.date = %session.session_date, "Attendance session created");
        Ok(session)
    }

    #[instrument(skip(db, filters))]
    pub async fn list_sessions(
        db: &PgPool,
        viewer: Viewer,
        filters: SessionFilterParams,
    ) -> Result<PaginatedSessionsResponse, AppError> {
        check_date_range(filters.from, filters.to)?;
        let pagination = filters.pagination();

        const WHERE: &str = r#"WHERE s.institution_id = $1
              AND ($2::uuid IS NULL OR a.section_id = $2)
              AND ($3::date IS NULL OR a.session_date >= $3)
              AND ($4::date IS NULL OR a.session_date <= $4)
              AND ($5::user_role = 'admin' OR EXISTS (
                  SELECT 1 FROM faculty_sections fs
                  WHERE fs.section_id = a.section_id AND fs.faculty_id = $6))"#;

        let total = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM attendance_sessions a JOIN sections s ON s.id = a.section_id {}",
            WHERE
        ))
        .bind(viewer.institution_id)
        .bind(filters.section_id)
        .bind(filters.from)
        .bind(filters.to)
        .bind(viewer.role)
        .bind(viewer.user_id)
        .fetch_one(db)
        .await?;

        let sql = format!(
            "SELECT {} FROM attendance_sessions a JOIN sections s ON s.id = a.section_id {}
             ORDER BY a.session_date DESC, a.period NULLS FIRST, a.created_at DESC
             LIMIT $7 OFFSET $8",
            SESSION_COLUMNS, WHERE
        );
        let sessions = sqlx::query_as::<_, AttendanceSession>(&sql)
            .bind(viewer.institution_id)
            .bind(filters.section_id)
            .bind(filters.from)
            .bind(filters.to)
            .bind(viewer.role)
            .bind(viewer.user_id)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(db)
            .await?;

        Ok(PaginatedSessionsResponse {
            data: sessions,
            meta: PaginationMeta::new(&pagination, total),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_session(
        db: &PgPool,
        viewer: Viewer,
        session_id: Uuid,
    ) -> Result<SessionDetail, AppError> {
        let session = Self::load_session(db, viewer.institution_id, session_id).await?;
        SectionService::ensure_can_manage(db, viewer, session.section_id).await?;

        let punches = sqlx::query_as::<_, PunchRecord>(
            r#"SELECT p.student_id, u.first_name, u.last_name,
                      COALESCE(e.roll_number, '') AS roll_number,
                      p.status, p.remarks, p.marked_by, p.marked_at
               FROM attendance_punches p
               JOIN users u ON u.id = p.student_id
               LEFT JOIN enrollments e ON e.student_id = p.student_id AND e.section_id = $2
               WHERE p.session_id = $1
               ORDER BY LENGTH(COALESCE(e.roll_number, '')), e.roll_number, u.last_name"#,
        )
        .bind(session.id)
        .bind(session.section_id)
        .fetch_all(db)
        .await?;

        let unmarked = sqlx::query_as::<_, UnmarkedStudent>(
            r#"SELECT u.id AS student_id, u.first_name, u.last_name, e.roll_number
               FROM enrollments e
               JOIN users u ON u.id = e.student_id
               WHERE e.section_id = $1
                 AND NOT EXISTS (
                     SELECT 1 FROM attendance_punches p
                     WHERE p.session_id = $2 AND p.student_id = e.student_id)
               ORDER BY LENGTH(e.roll_number), e.roll_number"#,
        )
        .bind(session.section_id)
        .bind(session.id)
        .fetch_all(db)
        .await?;

        let tally = AttendanceTally::from_statuses(punches.iter().map(|p| p.status));

        Ok(SessionDetail {
            session,
            punches,
            unmarked,
            tally,
        })
    }

    #[instrument(skip(db, dto), fields(punches = dto.punches.len()))]
    pub async fn mark_punches(
        db: &PgPool,
        viewer: Viewer,
        session_id: Uuid,
        dto: MarkPunchesDto,
    ) -> Result<MarkPunchesResponse, AppError> {
        let session = Self::load_session(db, viewer.institution_id, session_id).await?;
        SectionService::ensure_can_manage(db, viewer, session.section_id).await?;

        let repeated = dto.repeated_students();
        if !repeated.is_empty() {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Students listed more than once: {}",
                join_ids(&repeated)
            )));
        }

        let student_ids: Vec<Uuid> = dto.punches.iter().map(|p| p.student_id).collect();
        let enrolled = sqlx::query_scalar::<_, Uuid>(
            "SELECT student_id FROM enrollments WHERE section_id = $1 AND student_id = ANY($2)",
        )
        .bind(session.section_id)
        .bind(&student_ids)
        .fetch_all(db)
        .await?;

        let not_enrolled: Vec<Uuid> = student_ids
            .iter()
            .filter(|id| !enrolled.contains(id))
            .copied()
            .collect();
        if !not_enrolled.is_empty() {
            warn!(count = not_enrolled.len(), "Punches for students outside the section");
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Students not enrolled in this section: {}",
                join_ids(&not_enrolled)
            )));
        }

        let mut tx = db.begin().await?;

        let status = sqlx::query_scalar::<_, SessionStatus>(
            "SELECT status FROM attendance_sessions WHERE id = $1 FOR UPDATE",
        )
        .bind(session.id)
        .fetch_one(&mut *tx)
        .await?;

        if status == SessionStatus::Closed && viewer.role != UserRole::Admin {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Attendance session is closed"
            )));
        }

        for punch in &dto.punches {
            sqlx::query(
                r#"INSERT INTO attendance_punches (session_id, student_id, status, remarks, marked_by)
                   VALUES ($1, $2, $3, $4, $5)
                   ON CONFLICT (session_id, student_id) DO UPDATE SET
                       status = EXCLUDED.status,
                       remarks = EXCLUDED.remarks,
                       marked_by = EXCLUDED.marked_by,
                       marked_at = NOW()"#,
            )
            .bind(session.id)
            .bind(punch.student_id)
            .bind(punch.status)
            .bind(punch.remarks.as_deref().map(str::trim))
            .bind(viewer.user_id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE attendance_sessions SET updated_at = NOW() WHERE id = $1")
            .bind(session.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let marked = AttendanceTally::from_statuses(dto.punches.iter().map(|p| p.status));
        track_punches("present", marked.present as u64);
        track_punches("absent", marked.absent as u64);
        track_punches("late", marked.late as u64);

        let tally = Self::session_tally(db, session.id).await?;
        info!(session.id = %session.id, marked = dto.punches.len(), "Punches recorded");

        Ok(MarkPunchesResponse {
            session_id: session.id,
            marked: dto.punches.len(),
            tally,
        })
    }

    #[instrument(skip(db))]
    pub async fn close_session(
        db: &PgPool,
        viewer: Viewer,
        session_id: Uuid,
    ) -> Result<AttendanceSession, AppError> {
        let session = Self::load_session(db, viewer.institution_id, session_id).await?;
        Self::ensure_owner(viewer, &session)?;

        if session.status == SessionStatus::Closed {
            debug!(session.id = %session.id, "Session already closed");
            return Ok(session);
        }

        let session = sqlx::query_as::<_, AttendanceSession>(
            r#"UPDATE attendance_sessions SET status = 'closed', updated_at = NOW()
               WHERE id = $1
               RETURNING id, section_id, created_by, session_date, period, subject, notes,
                         status, created_at, updated_at"#,
        )
        .bind(session.id)
        .fetch_one(db)
        .await?;

        info!(session.id = %session.id, "Attendance session closed");
        Ok(session)
    }

    #[instrument(skip(db))]
    pub async fn delete_session(
        db: &PgPool,
        viewer: Viewer,
        session_id: Uuid,
    ) -> Result<(), AppError> {
        let session = Self::load_session(db, viewer.institution_id, session_id).await?;
        Self::ensure_owner(viewer, &session)?;

        sqlx::query("DELETE FROM attendance_sessions WHERE id = $1")
            .bind(session.id)
            .execute(db)
            .await?;

        info!(session.id = %session.id, "Attendance session deleted");
        Ok(())
    }

    /// Whether `viewer` may see the attendance of `student_id`.
    async fn can_view_student(
        db: &PgPool,
        viewer: Viewer,
        student_id: Uuid,
    ) -> Result<bool, AppError> {
        let allowed = match viewer.role {
            UserRole::Admin => true,
            UserRole::Student => viewer.user_id == student_id,
            UserRole::Parent => {
                sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS(SELECT 1 FROM parent_students WHERE parent_id = $1 AND student_id = $2)",
                )
                .bind(viewer.user_id)
                .bind(student_id)
                .fetch_one(db)
                .await?
            }
            UserRole::Faculty => {
                sqlx::query_scalar::<_, bool>(
                    r#"SELECT EXISTS(
                        SELECT 1 FROM enrollments e
                        JOIN faculty_sections fs ON fs.section_id = e.section_id
                        WHERE e.student_id = $1 AND fs.faculty_id = $2)"#,
                )
                .bind(student_id)
                .bind(viewer.user_id)
                .fetch_one(db)
                .await?
            }
        };
        Ok(allowed)
    }

    #[instrument(skip(db, params))]
    pub async fn student_summary(
        db: &PgPool,
        viewer: Viewer,
        student_id: Uuid,
        params: SummaryParams,
    ) -> Result<AttendanceSummary, AppError> {
        check_date_range(params.from, params.to)?;

        let is_student = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND institution_id = $2 AND role = 'student')",
        )
        .bind(student_id)
        .bind(viewer.institution_id)
        .fetch_one(db)
        .await?;

        if !is_student {
            return Err(AppError::not_found(anyhow::anyhow!("Student not found")));
        }

        if !Self::can_view_student(db, viewer, student_id).await? {
            return Err(AppError::forbidden(
                "You are not allowed to view this student's attendance",
            ));
        }

        let counts = sqlx::query_as::<_, (PunchStatus, i64)>(
            r#"SELECT p.status, COUNT(*)
               FROM attendance_punches p
               JOIN attendance_sessions a ON a.id = p.session_id
               WHERE p.student_id = $1
                 AND ($2::uuid IS NULL OR a.section_id = $2)
                 AND ($3::date IS NULL OR a.session_date >= $3)
                 AND ($4::date IS NULL OR a.session_date <= $4)
               GROUP BY p.status"#,
        )
        .bind(student_id)
        .bind(params.section_id)
        .bind(params.from)
        .bind(params.to)
        .fetch_all(db)
        .await?;

        let mut tally = AttendanceTally::default();
        for (status, count) in counts {
            tally.add(status, count);
        }

        Ok(AttendanceSummary::new(student_id, &params, tally))
    }
}
