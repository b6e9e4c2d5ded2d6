use actix_web::{delete, get, post, web, HttpResponse};
use sqlx::MySqlPool;
use validator::Validate;

use crate::core::jwt_auth::JwtMiddleware;
use crate::core::{AppError, AppSuccessResponse};
use crate::db::{reviews, users};
use crate::models::reviews::{CreateReviewRequest, ReviewQuery, UserReviews};
use crate::models::users::MessageResponse;

#[tracing::instrument(name = "Create Review", skip(pool, auth, request), fields(user_id = auth.user_id))]
#[post("")]
pub async fn create_review(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
    request: web::Json<CreateReviewRequest>,
) -> Result<HttpResponse, AppError> {
    request.validate()?;

    if request.reviewee_id == auth.user_id {
        return Err(AppError::validation("You cannot review yourself"));
    }
    if !users::is_active_user(&pool, request.reviewee_id).await? {
        return Err(AppError::not_found("User not found"));
    }

    let review = reviews::upsert_review(&pool, auth.user_id, &request).await?;

    Ok(HttpResponse::Created().json(AppSuccessResponse::new(
        review,
        "Review saved successfully",
    )))
}

#[tracing::instrument(name = "Get User Reviews", skip(pool, _auth, query))]
#[get("/user/{user_id}")]
pub async fn get_user_reviews(
    pool: web::Data<MySqlPool>,
    _auth: JwtMiddleware,
    path: web::Path<i32>,
    query: web::Query<ReviewQuery>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let pagination = query.pagination();

    let summary = reviews::get_rating_summary(&pool, user_id).await?;
    let items = reviews::get_reviews_for_user(&pool, user_id, &pagination).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::paginated(
        UserReviews {
            user_id,
            summary,
            reviews: items,
        },
        "Reviews retrieved successfully",
        pagination.meta(summary.review_count),
    )))
}

#[tracing::instrument(name = "Delete Review", skip(pool, auth), fields(user_id = auth.user_id))]
#[delete("/{review_id}")]
pub async fn delete_review(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let review_id = path.into_inner();
    let review = reviews::get_review(&pool, review_id).await?;
    if review.reviewer_id != auth.user_id && !auth.is_admin() {
        return Err(AppError::forbidden_error(
            "You can only delete reviews you wrote",
        ));
    }

    reviews::delete_review(&pool, review_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        MessageResponse {
            message: format!("Review {} deleted", review_id),
        },
        "Review deleted successfully",
    )))
}
