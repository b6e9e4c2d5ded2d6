use actix_web::{delete, get, post, put, web, HttpResponse};
use sqlx::MySqlPool;

use crate::core::jwt_auth::JwtMiddleware;
use crate::core::{AppError, AppSuccessResponse};
use crate::db::{admin, messages, profiles, requirements, reviews, users};
use crate::models::admin::{AdminUserQuery, PurgeResult, SetUserRoleRequest, SetUserStatusRequest};
use crate::models::common::clean_optional;
use crate::models::profiles::{KycDecision, KycStatus, ReviewKycRequest};
use crate::models::users::{MessageResponse, Role, UserProfile};

#[tracing::instrument(name = "Admin Stats", skip(pool, auth), fields(admin_id = auth.user_id))]
#[get("/stats")]
pub async fn get_stats(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let stats = admin::get_stats(&pool).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        stats,
        "Statistics retrieved successfully",
    )))
}

#[tracing::instrument(name = "Admin List Users", skip(pool, auth, query), fields(admin_id = auth.user_id))]
#[get("/users")]
pub async fn list_users(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
    query: web::Query<AdminUserQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let pagination = query.pagination();
    let (items, total) = admin::list_users(&pool, &query, &pagination).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::paginated(
        items,
        "Users retrieved successfully",
        pagination.meta(total),
    )))
}

#[tracing::instrument(name = "Admin Set User Status", skip(pool, auth, request), fields(admin_id = auth.user_id))]
#[put("/users/{user_id}/status")]
pub async fn set_user_status(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
    path: web::Path<i32>,
    request: web::Json<SetUserStatusRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let user_id = path.into_inner();
    if user_id == auth.user_id && !request.is_active {
        return Err(AppError::validation("You cannot deactivate your own account"));
    }

    users::set_user_active(&pool, user_id, request.is_active).await?;
    tracing::info!(
        "Admin {} set user {} active = {}",
        auth.user_id,
        user_id,
        request.is_active
    );

    let user = UserProfile::try_from(users::get_user_by_id(&pool, user_id).await?)?;
    let message = if request.is_active {
        "User activated successfully"
    } else {
        "User deactivated successfully"
    };

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(user, message)))
}

#[tracing::instrument(name = "Admin Set User Role", skip(pool, auth, request), fields(admin_id = auth.user_id))]
#[put("/users/{user_id}/role")]
pub async fn set_user_role(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
    path: web::Path<i32>,
    request: web::Json<SetUserRoleRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let user_id = path.into_inner();
    if user_id == auth.user_id && request.role != Role::Admin {
        return Err(AppError::validation("You cannot remove your own admin role"));
    }

    let user = users::set_user_role(&pool, user_id, request.role).await?;
    tracing::info!("Admin {} set user {} role to {}", auth.user_id, user_id, request.role);

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        UserProfile::try_from(user)?,
        "User role updated successfully",
    )))
}

#[tracing::instrument(name = "Admin Pending KYC", skip(pool, auth), fields(admin_id = auth.user_id))]
#[get("/kyc/pending")]
pub async fn get_pending_kyc(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let submissions = profiles::get_pending_kyc(&pool).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        submissions,
        "Pending KYC submissions retrieved successfully",
    )))
}

#[tracing::instrument(name = "Admin Review KYC", skip(pool, auth, request), fields(admin_id = auth.user_id))]
#[put("/kyc/{user_id}/review")]
pub async fn review_kyc(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
    path: web::Path<i32>,
    request: web::Json<ReviewKycRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let reason = clean_optional(&request.reason);
    if request.decision == KycDecision::Rejected && reason.is_none() {
        return Err(AppError::validation("A reason is required when rejecting KYC"));
    }

    let user_id = path.into_inner();
    let status = KycStatus::from(request.decision);
    let profile = profiles::review_kyc(&pool, user_id, status, reason).await?;
    tracing::info!("Admin {} marked KYC of teacher {} as {}", auth.user_id, user_id, status);

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        profile,
        format!("KYC {}", status),
    )))
}

#[tracing::instrument(name = "Admin Delete Requirement", skip(pool, auth), fields(admin_id = auth.user_id))]
#[delete("/requirements/{requirement_id}")]
pub async fn delete_requirement_as_admin(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let requirement_id = path.into_inner();
    requirements::delete_requirement(&pool, requirement_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        MessageResponse {
            message: format!("Requirement {} deleted", requirement_id),
        },
        "Requirement deleted successfully",
    )))
}

#[tracing::instrument(name = "Admin Delete Review", skip(pool, auth), fields(admin_id = auth.user_id))]
#[delete("/reviews/{review_id}")]
pub async fn delete_review_as_admin(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let review_id = path.into_inner();
    reviews::delete_review(&pool, review_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        MessageResponse {
            message: format!("Review {} deleted", review_id),
        },
        "Review deleted successfully",
    )))
}

#[tracing::instrument(name = "Admin Purge Expired Messages", skip(pool, auth), fields(admin_id = auth.user_id))]
#[post("/messages/purge-expired")]
pub async fn purge_expired_messages(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;

    let deleted = messages::purge_expired_messages(&pool).await?;
    tracing::info!("Admin {} purged {} expired messages", auth.user_id, deleted);

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        PurgeResult { deleted },
        "Expired messages purged",
    )))
}
