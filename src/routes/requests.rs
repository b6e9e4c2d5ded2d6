use actix_web::{get, post, put, web, HttpResponse};
use sqlx::MySqlPool;
use validator::Validate;

use crate::core::jwt_auth::JwtMiddleware;
use crate::core::{AppError, AppSuccessResponse};
use crate::db::requests::{self, Direction};
use crate::db::{requirements, users};
use crate::models::requests::{
    CreateUserRequest, RequestListQuery, RequestStatus, RespondRequest,
};

#[tracing::instrument(name = "Send Request", skip(pool, auth, request), fields(user_id = auth.user_id))]
#[post("")]
pub async fn send_request(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
    request: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, AppError> {
    request.validate()?;

    if request.receiver_id == auth.user_id {
        return Err(AppError::validation("You cannot send a request to yourself"));
    }
    if !users::is_active_user(&pool, request.receiver_id).await? {
        return Err(AppError::not_found("User not found"));
    }
    if let Some(requirement_id) = request.requirement_id {
        requirements::get_requirement(&pool, requirement_id).await?;
    }

    let created = requests::create_request(&pool, auth.user_id, &request).await?;

    Ok(HttpResponse::Created().json(AppSuccessResponse::new(
        created,
        "Request sent successfully",
    )))
}

#[tracing::instrument(name = "Get Incoming Requests", skip(pool, auth, query), fields(user_id = auth.user_id))]
#[get("/incoming")]
pub async fn get_incoming_requests(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
    query: web::Query<RequestListQuery>,
) -> Result<HttpResponse, AppError> {
    let items = requests::list_requests(&pool, auth.user_id, Direction::Incoming, query.status).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        items,
        "Incoming requests retrieved successfully",
    )))
}

#[tracing::instrument(name = "Get Outgoing Requests", skip(pool, auth, query), fields(user_id = auth.user_id))]
#[get("/outgoing")]
pub async fn get_outgoing_requests(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
    query: web::Query<RequestListQuery>,
) -> Result<HttpResponse, AppError> {
    let items = requests::list_requests(&pool, auth.user_id, Direction::Outgoing, query.status).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        items,
        "Outgoing requests retrieved successfully",
    )))
}

#[tracing::instrument(name = "Respond To Request", skip(pool, auth, request), fields(user_id = auth.user_id))]
#[put("/{request_id}/respond")]
pub async fn respond_to_request(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
    path: web::Path<i32>,
    request: web::Json<RespondRequest>,
) -> Result<HttpResponse, AppError> {
    let request_id = path.into_inner();
    requests::get_request(&pool, request_id)
        .await?
        .ensure_respondable_by(auth.user_id)?;

    let status = RequestStatus::from(request.decision);
    let updated = requests::update_request_status(&pool, request_id, status).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        updated,
        format!("Request {}", status),
    )))
}

#[tracing::instrument(name = "Cancel Request", skip(pool, auth), fields(user_id = auth.user_id))]
#[put("/{request_id}/cancel")]
pub async fn cancel_request(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let request_id = path.into_inner();
    requests::get_request(&pool, request_id)
        .await?
        .ensure_cancellable_by(auth.user_id)?;

    let updated =
        requests::update_request_status(&pool, request_id, RequestStatus::Cancelled).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        updated,
        "Request cancelled",
    )))
}
