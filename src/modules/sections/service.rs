use sqlx::{PgExecutor, PgPool};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use rollcall_core::{AppError, PaginationMeta, UserRole};
use rollcall_models::sections::{
    AssignFacultyDto, CreateEnrollmentDto, CreateSectionDto, EnrolledStudent, Enrollment,
    PaginatedSectionsResponse, Section, SectionFaculty, SectionFilterParams, UpdateSectionDto,
};

use crate::modules::institutions::service::InstitutionService;

const SECTION_COLUMNS: &str = "s.id, s.institution_id, s.name, s.academic_year, s.class_name, \
     s.department, s.year, s.semester, s.created_at, s.updated_at";

/// Restricts `s` to the sections the viewer (`$role`, `$user`) may see.
fn visibility_clause(role: usize, user: usize) -> String {
    format!(
        r#"(
            ${role}::user_role = 'admin'
            OR (${role}::user_role = 'faculty' AND EXISTS (
                SELECT 1 FROM faculty_sections fs WHERE fs.section_id = s.id AND fs.faculty_id = ${user}))
            OR (${role}::user_role = 'student' AND EXISTS (
                SELECT 1 FROM enrollments e WHERE e.section_id = s.id AND e.student_id = ${user}))
            OR (${role}::user_role = 'parent' AND EXISTS (
                SELECT 1 FROM enrollments e
                JOIN parent_students ps ON ps.student_id = e.student_id
                WHERE e.section_id = s.id AND ps.parent_id = ${user}))
        )"#
    )
}

fn map_section_conflict(err: sqlx::Error) -> AppError {
    AppError::from_unique_violation(err, "A section with these details already exists")
}

/// Who is looking at sections.
#[derive(Debug, Clone, Copy)]
pub struct Viewer {
    pub institution_id: Uuid,
    pub user_id: Uuid,
    pub role: UserRole,
}

pub struct SectionService;

impl SectionService {
    #[instrument(skip(db))]
    pub async fn get_section(
        db: &PgPool,
        institution_id: Uuid,
        section_id: Uuid,
    ) -> Result<Section, AppError> {
        let sql = format!(
            "SELECT {} FROM sections s WHERE s.id = $1 AND s.institution_id = $2",
            SECTION_COLUMNS
        );
        sqlx::query_as::<_, Section>(&sql)
            .bind(section_id)
            .bind(institution_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Section not found")))
    }

    /// A section the viewer is allowed to see. Hidden sections are reported as missing.
    #[instrument(skip(db))]
    pub async fn get_visible_section(
        db: &PgPool,
        viewer: Viewer,
        section_id: Uuid,
    ) -> Result<Section, AppError> {
        let sql = format!(
            "SELECT {} FROM sections s WHERE s.id = $1 AND s.institution_id = $2 AND {}",
            SECTION_COLUMNS,
            visibility_clause(3, 4)
        );
        sqlx::query_as::<_, Section>(&sql)
            .bind(section_id)
            .bind(viewer.institution_id)
            .bind(viewer.role)
            .bind(viewer.user_id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Section not found")))
    }

    pub async fn is_assigned_faculty<'e, E>(
        executor: E,
        section_id: Uuid,
        faculty_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: PgExecutor<'e>,
    {
        let assigned = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM faculty_sections WHERE section_id = $1 AND faculty_id = $2)",
        )
        .bind(section_id)
        .bind(faculty_id)
        .fetch_one(executor)
        .await?;
        Ok(assigned)
    }

    /// Admins, or faculty assigned to the section.
    pub async fn ensure_can_manage(
        db: &PgPool,
        viewer: Viewer,
        section_id: Uuid,
    ) -> Result<(), AppError> {
        if viewer.role == UserRole::Admin {
            return Ok(());
        }
        if viewer.role == UserRole::Faculty
            && Self::is_assigned_faculty(db, section_id, viewer.user_id).await?
        {
            return Ok(());
        }
        Err(AppError::forbidden("You are not assigned to this section"))
    }

    #[instrument(skip(db, dto), fields(section.name = %dto.name))]
    pub async fn create_section(
        db: &PgPool,
        institution_id: Uuid,
        dto: CreateSectionDto,
    ) -> Result<Section, AppError> {
        let kind = InstitutionService::kind(db, institution_id).await?;
        dto.shape()
            .check(kind)
            .map_err(|msg| AppError::unprocessable(anyhow::anyhow!(msg)))?;

        let section = sqlx::query_as::<_, Section>(
            r#"INSERT INTO sections
                (institution_id, name, academic_year, class_name, department, year, semester)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING id, institution_id, name, academic_year, class_name, department,
                         year, semester, created_at, updated_at"#,
        )
        .bind(institution_id)
        .bind(dto.name.trim())
        .bind(dto.academic_year.trim())
        .bind(dto.class_name.as_deref().map(str::trim))
        .bind(dto.department.as_deref().map(str::trim))
        .bind(dto.year)
        .bind(dto.semester)
        .fetch_one(db)
        .await
        .map_err(map_section_conflict)?;

        info!(section.id = %section.id, section.label = %section.label(), "Section created");
        Ok(section)
    }

    #[instrument(skip(db, filters))]
    pub async fn list_sections(
        db: &PgPool,
        viewer: Viewer,
        filters: SectionFilterParams,
    ) -> Result<PaginatedSectionsResponse, AppError> {
        let pagination = filters.pagination();
        let where_clause = format!(
            r#"WHERE s.institution_id = $1
                 AND ($2::text IS NULL OR s.academic_year = $2)
                 AND ($3::text IS NULL OR s.class_name = $3)
                 AND ($4::text IS NULL OR LOWER(s.department) = LOWER($4))
                 AND {}"#,
            visibility_clause(5, 6)
        );

        let total =
            sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM sections s {}", where_clause))
                .bind(viewer.institution_id)
                .bind(&filters.academic_year)
                .bind(&filters.class_name)
                .bind(&filters.department)
                .bind(viewer.role)
                .bind(viewer.user_id)
                .fetch_one(db)
                .await?;

        let sql = format!(
            "SELECT {} FROM sections s {}
             ORDER BY s.academic_year DESC, s.class_name, s.department, s.year, s.semester, s.name
             LIMIT $7 OFFSET $8",
            SECTION_COLUMNS, where_clause
        );
        let sections = sqlx::query_as::<_, Section>(&sql)
            .bind(viewer.institution_id)
            .bind(&filters.academic_year)
            .bind(&filters.class_name)
            .bind(&filters.department)
            .bind(viewer.role)
            .bind(viewer.user_id)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(db)
            .await?;

        debug!(count = sections.len(), total, "Listed sections");

        Ok(PaginatedSectionsResponse {
            data: sections,
            meta: PaginationMeta::new(&pagination, total),
        })
    }

    #[instrument(skip(db, dto))]
    pub async fn update_section(
        db: &PgPool,
        institution_id: Uuid,
        section_id: Uuid,
        dto: UpdateSectionDto,
    ) -> Result<Section, AppError> {
        let current = Self::get_section(db, institution_id, section_id).await?;
        let kind = InstitutionService::kind(db, institution_id).await?;
        dto.merged_shape(&current)
            .check(kind)
            .map_err(|msg| AppError::unprocessable(anyhow::anyhow!(msg)))?;

        let section = sqlx::query_as::<_, Section>(
            r#"UPDATE sections SET
                name = COALESCE($3, name),
                academic_year = COALESCE($4, academic_year),
                class_name = COALESCE($5, class_name),
                department = COALESCE($6, department),
                year = COALESCE($7, year),
                semester = COALESCE($8, semester),
                updated_at = NOW()
               WHERE id = $1 AND institution_id = $2
               RETURNING id, institution_id, name, academic_year, class_name, department,
                         year, semester, created_at, updated_at"#,
        )
        .bind(section_id)
        .bind(institution_id)
        .bind(dto.name.as_deref().map(str::trim))
        .bind(dto.academic_year.as_deref().map(str::trim))
        .bind(dto.class_name.as_deref().map(str::trim))
        .bind(dto.department.as_deref().map(str::trim))
        .bind(dto.year)
        .bind(dto.semester)
        .fetch_one(db)
        .await
        .map_err(map_section_conflict)?;

        info!(section.id = %section.id, "Section updated");
        Ok(section)
    }

    #[instrument(skip(db))]
    pub async fn delete_section(
        db: &PgPool,
        institution_id: Uuid,
        section_id: Uuid,
    ) -> Result<(), AppError> {
        Self::get_section(db, institution_id, section_id).await?;

        let has_sessions = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM attendance_sessions WHERE section_id = $1)",
        )
        .bind(section_id)
        .fetch_one(db)
        .await?;

        if has_sessions {
            return Err(AppError::bad_request(anyhow::anyhow!(
                "Cannot delete a section that has attendance sessions"
            )));
        }

        sqlx::query("DELETE FROM sections WHERE id = $1 AND institution_id = $2")
            .bind(section_id)
            .bind(institution_id)
            .execute(db)
            .await?;

        info!(section.id = %section_id, "Section deleted");
        Ok(())
    }

    /// Fails with 400 unless `user_id` is an active user of `role` in the institution.
    async fn ensure_member(
        db: &PgPool,
        institution_id: Uuid,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<(), AppError> {
        let ok = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(
                SELECT 1 FROM users
                WHERE id = $1 AND institution_id = $2 AND role = $3 AND is_active = true)"#,
        )
        .bind(user_id)
        .bind(institution_id)
        .bind(role)
        .fetch_one(db)
        .await?;

        if ok {
            Ok(())
        } else {
            Err(AppError::bad_request(anyhow::anyhow!(
                "User is not an active {} of this institution",
                role
            )))
        }
    }

    #[instrument(skip(db, dto), fields(student.id = %dto.student_id))]
    pub async fn enroll_student(
        db: &PgPool,
        institution_id: Uuid,
        section_id: Uuid,
        dto: CreateEnrollmentDto,
    ) -> Result<Enrollment, AppError> {
        Self::get_section(db, institution_id, section_id).await?;
        Self::ensure_member(db, institution_id, dto.student_id, UserRole::Student).await?;

        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"INSERT INTO enrollments (section_id, student_id, roll_number)
               VALUES ($1, $2, $3)
               RETURNING id, section_id, student_id, roll_number, enrolled_at"#,
        )
        .bind(section_id)
        .bind(dto.student_id)
        .bind(dto.roll_number.trim())
        .fetch_one(db)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.constraint() == Some("enrollments_roll_unique")
            {
                return AppError::bad_request(anyhow::anyhow!(
                    "Roll number is already taken in this section"
                ));
            }
            AppError::from_unique_violation(e, "Student is already enrolled in this section")
        })?;

        info!(enrollment.id = %enrollment.id, "Student enrolled");
        Ok(enrollment)
    }

    #[instrument(skip(db))]
    pub async fn list_students(
        db: &PgPool,
        section_id: Uuid,
    ) -> Result<Vec<EnrolledStudent>, AppError> {
        let students = sqlx::query_as::<_, EnrolledStudent>(
            r#"SELECT u.id AS student_id, u.first_name, u.last_name, u.email,
                      sp.registration_number, e.roll_number, e.enrolled_at
               FROM enrollments e
               JOIN users u ON u.id = e.student_id
               JOIN student_profiles sp ON sp.user_id = u.id
               WHERE e.section_id = $1
               ORDER BY LENGTH(e.roll_number), e.roll_number"#,
        )
        .bind(section_id)
        .fetch_all(db)
        .await?;

        Ok(students)
    }

    #[instrument(skip(db))]
    pub async fn unenroll_student(
        db: &PgPool,
        institution_id: Uuid,
        section_id: Uuid,
        student_id: Uuid,
    ) -> Result<(), AppError> {
        Self::get_section(db, institution_id, section_id).await?;

        let result =
            sqlx::query("DELETE FROM enrollments WHERE section_id = $1 AND student_id = $2")
                .bind(section_id)
                .bind(student_id)
                .execute(db)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("Enrollment not found")));
        }

        info!(section.id = %section_id, student.id = %student_id, "Student unenrolled");
        Ok(())
    }

    #[instrument(skip(db, dto), fields(faculty.id = %dto.faculty_id))]
    pub async fn assign_faculty(
        db: &PgPool,
        institution_id: Uuid,
        section_id: Uuid,
        dto: AssignFacultyDto,
    ) -> Result<SectionFaculty, AppError> {
        Self::get_section(db, institution_id, section_id).await?;
        Self::ensure_member(db, institution_id, dto.faculty_id, UserRole::Faculty).await?;

        let assignment_id = sqlx::query_scalar::<_, Uuid>(
            r#"INSERT INTO faculty_sections (section_id, faculty_id, subject)
               VALUES ($1, $2, $3)
               RETURNING id"#,
        )
        .bind(section_id)
        .bind(dto.faculty_id)
        .bind(dto.subject.as_deref().map(str::trim))
        .fetch_one(db)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Faculty is already assigned to this section"))?;

        let assignment = sqlx::query_as::<_, SectionFaculty>(
            r#"SELECT u.id AS faculty_id, u.first_name, u.last_name, u.email,
                      fp.employee_id, fs.subject, fs.assigned_at
               FROM faculty_sections fs
               JOIN users u ON u.id = fs.faculty_id
               JOIN faculty_profiles fp ON fp.user_id = u.id
               WHERE fs.id = $1"#,
        )
        .bind(assignment_id)
        .fetch_one(db)
        .await?;

        info!(section.id = %section_id, "Faculty assigned");
        Ok(assignment)
    }

    #[instrument(skip(db))]
    pub async fn list_faculty(
        db: &PgPool,
        section_id: Uuid,
    ) -> Result<Vec<SectionFaculty>, AppError> {
        let faculty = sqlx::query_as::<_, SectionFaculty>(
            r#"SELECT u.id AS faculty_id, u.first_name, u.last_name, u.email,
                      fp.employee_id, fs.subject, fs.assigned_at
               FROM faculty_sections fs
               JOIN users u ON u.id = fs.faculty_id
               JOIN faculty_profiles fp ON fp.user_id = u.id
               WHERE fs.section_id = $1
               ORDER BY u.last_name, u.first_name, fs.subject NULLS FIRST"#,
        )
        .bind(section_id)
        .fetch_all(db)
        .await?;

        Ok(faculty)
    }

    /// Removes every subject assignment of the faculty member in the section.
    #[instrument(skip(db))]
    pub async fn remove_faculty(
        db: &PgPool,
        institution_id: Uuid,
        section_id: Uuid,
        faculty_id: Uuid,
    ) -> Result<(), AppError> {
        Self::get_section(db, institution_id, section_id).await?;

        let result =
            sqlx::query("DELETE FROM faculty_sections WHERE section_id = $1 AND faculty_id = $2")
                .bind(section_id)
                .bind(faculty_id)
                .execute(db)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!(
                "Faculty assignment not found"
            )));
        }

        info!(section.id = %section_id, faculty.id = %faculty_id, "Faculty removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_clause_uses_given_placeholders() {
        let clause = visibility_clause(5, 6);
        assert!(clause.contains("$5::user_role = 'admin'"));
        assert!(clause.contains("fs.faculty_id = $6"));
        assert!(!clause.contains("$3"));
    }
}
