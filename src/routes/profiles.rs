use actix_web::{get, post, put, web, HttpResponse};
use sqlx::MySqlPool;
use validator::Validate;

use crate::core::jwt_auth::JwtMiddleware;
use crate::core::{AppError, AppSuccessResponse};
use crate::db::profiles;
use crate::models::profiles::{
    SubmitKycRequest, TeacherSearchQuery, UpsertStudentProfileRequest,
    UpsertTeacherProfileRequest,
};
use crate::models::users::Role;

#[tracing::instrument(name = "Upsert Student Profile", skip(pool, auth, request), fields(user_id = auth.user_id))]
#[put("/student")]
pub async fn upsert_student_profile(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
    request: web::Json<UpsertStudentProfileRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_role(Role::Student)?;
    request.validate()?;

    let profile = profiles::upsert_student_profile(&pool, auth.user_id, &request).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        profile,
        "Student profile saved successfully",
    )))
}

#[tracing::instrument(name = "Upsert Teacher Profile", skip(pool, auth, request), fields(user_id = auth.user_id))]
#[put("/teacher")]
pub async fn upsert_teacher_profile(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
    request: web::Json<UpsertTeacherProfileRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_role(Role::Teacher)?;
    request.validate()?;

    let profile = profiles::upsert_teacher_profile(&pool, auth.user_id, &request).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        profile,
        "Teacher profile saved successfully",
    )))
}

#[tracing::instrument(name = "Search Teachers", skip(pool, _auth, query))]
#[get("/teachers")]
pub async fn search_teachers(
    pool: web::Data<MySqlPool>,
    _auth: JwtMiddleware,
    query: web::Query<TeacherSearchQuery>,
) -> Result<HttpResponse, AppError> {
    if let Some(min_rating) = query.min_rating {
        if !(0.0..=5.0).contains(&min_rating) {
            return Err(AppError::validation("min_rating must be between 0 and 5"));
        }
    }

    let pagination = query.pagination();
    let (teachers, total) = profiles::search_teachers(&pool, &query, &pagination).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::paginated(
        teachers,
        "Teachers retrieved successfully",
        pagination.meta(total),
    )))
}

#[tracing::instrument(name = "Submit KYC", skip(pool, auth, request), fields(user_id = auth.user_id))]
#[post("/teacher/kyc")]
pub async fn submit_kyc(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
    request: web::Json<SubmitKycRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_role(Role::Teacher)?;
    request.validate()?;

    let profile = profiles::submit_kyc(&pool, auth.user_id, &request).await?;
    tracing::info!("KYC documents submitted by teacher {}", auth.user_id);

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        profile,
        "KYC documents submitted for review",
    )))
}
