use actix_web::{delete, get, post, put, web, HttpResponse};
use sqlx::MySqlPool;
use validator::Validate;

use crate::core::jwt_auth::JwtMiddleware;
use crate::core::{hash_password, verify_password, AppError, AppSuccessResponse};
use crate::db::{location, profiles, users};
use crate::geo::{rank_candidates, BoundingBox};
use crate::models::location::NearbyQuery;
use crate::models::users::{
    ChangePasswordRequest, MessageResponse, PublicUser, UpdateProfileRequest, UserProfile,
};

#[tracing::instrument(name = "Get My Profile", skip(pool, auth), fields(user_id = auth.user_id))]
#[get("/me")]
pub async fn get_me(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    let user = users::get_active_user(&pool, auth.user_id).await?;
    let profile = profiles::get_role_profile(&pool, user.id, user.role()?).await?;

    let mut user_profile = UserProfile::try_from(user)?;
    user_profile.profile = profile;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        user_profile,
        "Profile retrieved successfully",
    )))
}

#[tracing::instrument(name = "Update My Profile", skip(pool, auth, request), fields(user_id = auth.user_id))]
#[put("/me")]
pub async fn update_me(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
    request: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, AppError> {
    request.validate()?;

    let user = users::update_user_profile(&pool, auth.user_id, &request).await?;
    let user_profile = UserProfile::try_from(user)?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        user_profile,
        "Profile updated successfully",
    )))
}

#[tracing::instrument(name = "Change Password", skip(pool, auth, request), fields(user_id = auth.user_id))]
#[post("/me/change-password")]
pub async fn change_password(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
    request: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, AppError> {
    request.validate()?;

    let user = users::get_active_user(&pool, auth.user_id).await?;
    if !verify_password(&request.current_password, &user.password)? {
        return Err(AppError::validation("Current password is incorrect"));
    }

    let password_hash = hash_password(&request.new_password)?;
    users::change_user_password(&pool, user.id, &password_hash).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        MessageResponse {
            message: "Password changed successfully".to_string(),
        },
        "Password changed successfully",
    )))
}

#[tracing::instrument(name = "Deactivate Account", skip(pool, auth), fields(user_id = auth.user_id))]
#[delete("/me")]
pub async fn deactivate_account(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    users::deactivate_user(&pool, auth.user_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        MessageResponse {
            message: "Your account has been deactivated".to_string(),
        },
        "Account deactivated successfully",
    )))
}

#[tracing::instrument(name = "Find Nearby Users", skip(pool, auth, query), fields(user_id = auth.user_id))]
#[get("/nearby")]
pub async fn find_nearby(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
    query: web::Query<NearbyQuery>,
) -> Result<HttpResponse, AppError> {
    let radius_km = query.radius_km()?;
    let origin = match query.origin()? {
        Some(origin) => origin,
        None => users::get_active_user(&pool, auth.user_id)
            .await?
            .coordinates()
            .ok_or_else(|| {
                AppError::validation(
                    "Share your location or pass latitude and longitude to search nearby",
                )
            })?,
    };

    let bbox = BoundingBox::around(&origin, radius_km);
    let candidates =
        location::find_nearby_candidates(&pool, &bbox, auth.user_id, query.role, query.live_only)
            .await?;

    let ranked = rank_candidates(&origin, candidates, radius_km);
    let pagination = query.pagination();
    let total = ranked.len() as i64;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::paginated(
        pagination.slice(ranked),
        "Nearby users retrieved successfully",
        pagination.meta(total),
    )))
}

#[tracing::instrument(name = "Get User", skip(pool, _auth))]
#[get("/{user_id}")]
pub async fn get_user(
    pool: web::Data<MySqlPool>,
    _auth: JwtMiddleware,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let user = users::get_active_user(&pool, path.into_inner()).await?;
    let profile = profiles::get_role_profile(&pool, user.id, user.role()?).await?;

    let mut public_user = PublicUser::try_from(user)?;
    public_user.profile = profile;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        public_user,
        "User retrieved successfully",
    )))
}
