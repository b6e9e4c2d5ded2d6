use crate::core::AppError;
use crate::models::common::{clean_optional, contains_pattern, normalize_tags};
use crate::models::pagination::PaginationQuery;
use crate::models::profiles::{
    KycStatus, KycSubmission, RoleProfile, StudentProfile, StudentProfileRow, SubmitKycRequest,
    TeacherProfile, TeacherProfileRow, TeacherSearchQuery, TeacherSummary, TeacherSummaryRow,
    UpsertStudentProfileRequest, UpsertTeacherProfileRequest,
};
use crate::models::users::Role;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::{MySql, MySqlPool, QueryBuilder};

const TEACHER_COLUMNS: &str = r#"
    user_id, subjects, classes, qualification, experience_years, hourly_fee, teaching_mode, bio,
    rating, review_count, kyc_status, kyc_document_type, kyc_document_url,
    kyc_submitted_at, kyc_reviewed_at, kyc_rejection_reason, updated_at
"#;

pub async fn get_student_profile(
    pool: &MySqlPool,
    user_id: i32,
) -> Result<Option<StudentProfile>, AppError> {
    let row = sqlx::query_as::<_, StudentProfileRow>(
        r#"
        SELECT user_id, class_level, school, board, subjects, learning_mode, bio, updated_at
        FROM tbl_student_profiles
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(AppError::db_error)?;

    Ok(row.map(StudentProfile::from))
}

pub async fn get_teacher_profile_row(
    pool: &MySqlPool,
    user_id: i32,
) -> Result<Option<TeacherProfileRow>, AppError> {
    let query = format!(
        "SELECT {} FROM tbl_teacher_profiles WHERE user_id = ?",
        TEACHER_COLUMNS
    );

    sqlx::query_as::<_, TeacherProfileRow>(&query)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::db_error)
}

pub async fn get_teacher_profile(
    pool: &MySqlPool,
    user_id: i32,
) -> Result<Option<TeacherProfile>, AppError> {
    Ok(get_teacher_profile_row(pool, user_id)
        .await?
        .map(TeacherProfile::from))
}

/// The profile that belongs to the user's role, if one has been filled in.
pub async fn get_role_profile(
    pool: &MySqlPool,
    user_id: i32,
    role: Role,
) -> Result<Option<RoleProfile>, AppError> {
    let profile = match role {
        Role::Student => get_student_profile(pool, user_id)
            .await?
            .map(RoleProfile::Student),
        Role::Teacher => get_teacher_profile(pool, user_id)
            .await?
            .map(RoleProfile::Teacher),
        Role::Admin => None,
    };
    Ok(profile)
}

pub async fn upsert_student_profile(
    pool: &MySqlPool,
    user_id: i32,
    request: &UpsertStudentProfileRequest,
) -> Result<StudentProfile, AppError> {
    let now = Utc::now().naive_utc();
    let subjects = normalize_tags(&request.subjects);

    sqlx::query(
        r#"
        INSERT INTO tbl_student_profiles (user_id, class_level, school, board, subjects, learning_mode, bio, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            class_level = VALUES(class_level),
            school = VALUES(school),
            board = VALUES(board),
            subjects = VALUES(subjects),
            learning_mode = VALUES(learning_mode),
            bio = VALUES(bio),
            updated_at = VALUES(updated_at)
        "#,
    )
    .bind(user_id)
    .bind(request.class_level.trim())
    .bind(request.school.trim())
    .bind(clean_optional(&request.board))
    .bind(Json(subjects))
    .bind(request.learning_mode.as_str())
    .bind(clean_optional(&request.bio))
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(AppError::db_error)?;

    get_student_profile(pool, user_id)
        .await?
        .ok_or_else(|| AppError::internal_error("Student profile was not saved"))
}

pub async fn upsert_teacher_profile(
    pool: &MySqlPool,
    user_id: i32,
    request: &UpsertTeacherProfileRequest,
) -> Result<TeacherProfile, AppError> {
    let now = Utc::now().naive_utc();
    let subjects = normalize_tags(&request.subjects);
    let classes = normalize_tags(&request.classes);

    if subjects.is_empty() {
        return Err(AppError::validation("At least one subject is required"));
    }

    // Rating, review count and KYC fields are owned by other flows and left untouched on update.
    sqlx::query(
        r#"
        INSERT INTO tbl_teacher_profiles
            (user_id, subjects, classes, qualification, experience_years, hourly_fee, teaching_mode, bio,
             rating, review_count, kyc_status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, 0, 'not_submitted', ?, ?)
        ON DUPLICATE KEY UPDATE
            subjects = VALUES(subjects),
            classes = VALUES(classes),
            qualification = VALUES(qualification),
            experience_years = VALUES(experience_years),
            hourly_fee = VALUES(hourly_fee),
            teaching_mode = VALUES(teaching_mode),
            bio = VALUES(bio),
            updated_at = VALUES(updated_at)
        "#,
    )
    .bind(user_id)
    .bind(Json(subjects))
    .bind(Json(classes))
    .bind(request.qualification.trim())
    .bind(request.experience_years)
    .bind(request.hourly_fee.clone())
    .bind(request.teaching_mode.as_str())
    .bind(clean_optional(&request.bio))
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(AppError::db_error)?;

    get_teacher_profile(pool, user_id)
        .await?
        .ok_or_else(|| AppError::internal_error("Teacher profile was not saved"))
}

fn push_teacher_filters(builder: &mut QueryBuilder<'_, MySql>, query: &TeacherSearchQuery) {
    builder.push(" WHERE u.is_active = 1 AND u.role = 'teacher'");

    if let Some(subject) = clean_optional(&query.subject) {
        builder
            .push(" AND LOWER(CAST(tp.subjects AS CHAR)) LIKE ")
            .push_bind(contains_pattern(&subject.to_lowercase()));
    }
    if let Some(class_level) = clean_optional(&query.class_level) {
        builder
            .push(" AND LOWER(CAST(tp.classes AS CHAR)) LIKE ")
            .push_bind(contains_pattern(&class_level.to_lowercase()));
    }
    if let Some(min_rating) = query.min_rating {
        builder.push(" AND tp.rating >= ").push_bind(min_rating);
    }
    if let Some(city) = clean_optional(&query.city) {
        builder.push(" AND u.city = ").push_bind(city);
    }
}

pub async fn search_teachers(
    pool: &MySqlPool,
    query: &TeacherSearchQuery,
    pagination: &PaginationQuery,
) -> Result<(Vec<TeacherSummary>, i64), AppError> {
    let mut count_builder: QueryBuilder<MySql> = QueryBuilder::new(
        "SELECT COUNT(*) FROM tbl_teacher_profiles tp JOIN tbl_users u ON u.id = tp.user_id",
    );
    push_teacher_filters(&mut count_builder, query);

    let total: i64 = count_builder
        .build_query_scalar()
        .fetch_one(pool)
        .await
        .map_err(AppError::db_error)?;

    let mut data_builder: QueryBuilder<MySql> = QueryBuilder::new(
        r#"
        SELECT tp.user_id, u.name, u.city, u.is_online, tp.subjects, tp.classes, tp.qualification,
               tp.experience_years, tp.hourly_fee, tp.teaching_mode, tp.rating, tp.review_count, tp.kyc_status
        FROM tbl_teacher_profiles tp
        JOIN tbl_users u ON u.id = tp.user_id
        "#,
    );
    push_teacher_filters(&mut data_builder, query);
    data_builder
        .push(" ORDER BY tp.rating DESC, tp.review_count DESC, tp.user_id ASC LIMIT ")
        .push_bind(pagination.limit())
        .push(" OFFSET ")
        .push_bind(pagination.offset());

    let rows = data_builder
        .build_query_as::<TeacherSummaryRow>()
        .fetch_all(pool)
        .await
        .map_err(AppError::db_error)?;

    Ok((rows.into_iter().map(TeacherSummary::from).collect(), total))
}

pub async fn submit_kyc(
    pool: &MySqlPool,
    user_id: i32,
    request: &SubmitKycRequest,
) -> Result<TeacherProfile, AppError> {
    let profile = get_teacher_profile_row(pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Complete your teacher profile before submitting KYC"))?;

    if profile.kyc_status() == KycStatus::Verified {
        return Err(AppError::conflict("KYC is already verified"));
    }

    let now = Utc::now().naive_utc();
    sqlx::query(
        r#"
        UPDATE tbl_teacher_profiles
        SET kyc_status = ?, kyc_document_type = ?, kyc_document_url = ?,
            kyc_submitted_at = ?, kyc_reviewed_at = NULL, kyc_rejection_reason = NULL, updated_at = ?
        WHERE user_id = ?
        "#,
    )
    .bind(KycStatus::Pending.as_str())
    .bind(request.document_type.trim())
    .bind(request.document_url.trim())
    .bind(now)
    .bind(now)
    .bind(user_id)
    .execute(pool)
    .await
    .map_err(AppError::db_error)?;

    get_teacher_profile(pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Teacher profile not found"))
}

pub async fn get_pending_kyc(pool: &MySqlPool) -> Result<Vec<KycSubmission>, AppError> {
    sqlx::query_as::<_, KycSubmission>(
        r#"
        SELECT tp.user_id, u.name, u.email, tp.qualification, tp.kyc_status,
               tp.kyc_document_type, tp.kyc_document_url, tp.kyc_submitted_at
        FROM tbl_teacher_profiles tp
        JOIN tbl_users u ON u.id = tp.user_id
        WHERE tp.kyc_status = 'pending'
        ORDER BY tp.kyc_submitted_at ASC
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(AppError::db_error)
}

pub async fn review_kyc(
    pool: &MySqlPool,
    user_id: i32,
    status: KycStatus,
    reason: Option<String>,
) -> Result<TeacherProfile, AppError> {
    let profile = get_teacher_profile_row(pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Teacher profile not found"))?;

    if profile.kyc_status() != KycStatus::Pending {
        return Err(AppError::conflict(format!(
            "KYC is {}, only pending submissions can be reviewed",
            profile.kyc_status()
        )));
    }

    let now = Utc::now().naive_utc();
    sqlx::query(
        r#"
        UPDATE tbl_teacher_profiles
        SET kyc_status = ?, kyc_reviewed_at = ?, kyc_rejection_reason = ?, updated_at = ?
        WHERE user_id = ?
        "#,
    )
    .bind(status.as_str())
    .bind(now)
    .bind(reason)
    .bind(now)
    .bind(user_id)
    .execute(pool)
    .await
    .map_err(AppError::db_error)?;

    get_teacher_profile(pool, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Teacher profile not found"))
}

/// Recomputes the cached rating columns from `tbl_reviews`. No-op for users without a teacher profile.
pub async fn refresh_teacher_rating(pool: &MySqlPool, user_id: i32) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE tbl_teacher_profiles tp
        SET tp.rating = (
                SELECT CAST(COALESCE(ROUND(AVG(r.rating), 2), 0) AS DOUBLE)
                FROM tbl_reviews r WHERE r.reviewee_id = tp.user_id
            ),
            tp.review_count = (
                SELECT COUNT(*) FROM tbl_reviews r WHERE r.reviewee_id = tp.user_id
            )
        WHERE tp.user_id = ?
        "#,
    )
    .bind(user_id)
    .execute(pool)
    .await
    .map_err(AppError::db_error)?;

    Ok(())
}
