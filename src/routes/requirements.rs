use actix_web::{delete, get, post, put, web, HttpResponse};
use sqlx::MySqlPool;
use validator::Validate;

use crate::core::jwt_auth::JwtMiddleware;
use crate::core::{AppError, AppSuccessResponse};
use crate::db::requirements::{self, NearFilter};
use crate::db::users;
use crate::models::location::{optional_coordinates, search_radius};
use crate::models::requirements::{
    validate_fee, CreateRequirementRequest, RequirementQuery, UpdateRequirementRequest,
};
use crate::models::users::MessageResponse;

#[tracing::instrument(name = "Create Requirement", skip(pool, auth, request), fields(user_id = auth.user_id))]
#[post("")]
pub async fn create_requirement(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
    request: web::Json<CreateRequirementRequest>,
) -> Result<HttpResponse, AppError> {
    request.validate()?;
    validate_fee(&request.fee)?;

    let coords = match optional_coordinates(request.latitude, request.longitude)? {
        Some(coords) => Some(coords),
        None => users::get_active_user(&pool, auth.user_id).await?.coordinates(),
    };

    let requirement =
        requirements::create_requirement(&pool, auth.user_id, &request, coords).await?;

    Ok(HttpResponse::Created().json(AppSuccessResponse::new(
        requirement,
        "Requirement posted successfully",
    )))
}

#[tracing::instrument(name = "List Requirements", skip(pool, _auth, query))]
#[get("")]
pub async fn list_requirements(
    pool: web::Data<MySqlPool>,
    _auth: JwtMiddleware,
    query: web::Query<RequirementQuery>,
) -> Result<HttpResponse, AppError> {
    let near = match optional_coordinates(query.latitude, query.longitude)? {
        Some(origin) => Some(NearFilter {
            origin,
            radius_km: search_radius(query.radius_km)?,
        }),
        None => None,
    };

    let pagination = query.pagination();
    let (items, total) = requirements::list_requirements(&pool, &query, near, &pagination).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::paginated(
        items,
        "Requirements retrieved successfully",
        pagination.meta(total),
    )))
}

#[tracing::instrument(name = "Get My Requirements", skip(pool, auth), fields(user_id = auth.user_id))]
#[get("/mine")]
pub async fn get_my_requirements(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    let items = requirements::get_user_requirements(&pool, auth.user_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        items,
        "Your requirements retrieved successfully",
    )))
}

#[tracing::instrument(name = "Get Requirement", skip(pool, _auth))]
#[get("/{requirement_id}")]
pub async fn get_requirement(
    pool: web::Data<MySqlPool>,
    _auth: JwtMiddleware,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let requirement = requirements::get_requirement(&pool, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        requirement,
        "Requirement retrieved successfully",
    )))
}

#[tracing::instrument(name = "Update Requirement", skip(pool, auth, request), fields(user_id = auth.user_id))]
#[put("/{requirement_id}")]
pub async fn update_requirement(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
    path: web::Path<i32>,
    request: web::Json<UpdateRequirementRequest>,
) -> Result<HttpResponse, AppError> {
    request.validate()?;
    validate_fee(&request.fee)?;
    let coords = optional_coordinates(request.latitude, request.longitude)?;

    let requirement_id = path.into_inner();
    let existing = requirements::get_requirement(&pool, requirement_id).await?;
    if existing.user_id != auth.user_id {
        return Err(AppError::forbidden_error(
            "You can only edit your own requirements",
        ));
    }

    let requirement =
        requirements::update_requirement(&pool, requirement_id, &request, coords).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        requirement,
        "Requirement updated successfully",
    )))
}

#[tracing::instrument(name = "Delete Requirement", skip(pool, auth), fields(user_id = auth.user_id))]
#[delete("/{requirement_id}")]
pub async fn delete_requirement(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let requirement_id = path.into_inner();
    let existing = requirements::get_requirement(&pool, requirement_id).await?;
    if existing.user_id != auth.user_id && !auth.is_admin() {
        return Err(AppError::forbidden_error(
            "You can only delete your own requirements",
        ));
    }

    requirements::delete_requirement(&pool, requirement_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        MessageResponse {
            message: format!("Requirement {} deleted", requirement_id),
        },
        "Requirement deleted successfully",
    )))
}
