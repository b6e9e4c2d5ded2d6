use crate::core::AppError;
use crate::db::profiles::refresh_teacher_rating;
use crate::models::common::clean_optional;
use crate::models::pagination::PaginationQuery;
use crate::models::reviews::{CreateReviewRequest, RatingSummary, Review, ReviewWithReviewer};
use chrono::Utc;
use sqlx::MySqlPool;

const REVIEW_COLUMNS: &str = "id, reviewer_id, reviewee_id, rating, comment, created_at, updated_at";

/// Creates the review, or updates the reviewer's existing review of the same user.
pub async fn upsert_review(
    pool: &MySqlPool,
    reviewer_id: i32,
    request: &CreateReviewRequest,
) -> Result<Review, AppError> {
    let now = Utc::now().naive_utc();

    sqlx::query(
        r#"
        INSERT INTO tbl_reviews (reviewer_id, reviewee_id, rating, comment, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            rating = VALUES(rating),
            comment = VALUES(comment),
            updated_at = VALUES(updated_at)
        "#,
    )
    .bind(reviewer_id)
    .bind(request.reviewee_id)
    .bind(request.rating)
    .bind(clean_optional(&request.comment))
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(AppError::db_error)?;

    refresh_teacher_rating(pool, request.reviewee_id).await?;

    let query = format!(
        "SELECT {} FROM tbl_reviews WHERE reviewer_id = ? AND reviewee_id = ?",
        REVIEW_COLUMNS
    );
    sqlx::query_as::<_, Review>(&query)
        .bind(reviewer_id)
        .bind(request.reviewee_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::db_error)?
        .ok_or_else(|| AppError::internal_error("Review was not saved"))
}

pub async fn get_review(pool: &MySqlPool, review_id: i32) -> Result<Review, AppError> {
    let query = format!("SELECT {} FROM tbl_reviews WHERE id = ?", REVIEW_COLUMNS);

    sqlx::query_as::<_, Review>(&query)
        .bind(review_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::db_error)?
        .ok_or_else(|| AppError::not_found("Review not found"))
}

pub async fn get_reviews_for_user(
    pool: &MySqlPool,
    user_id: i32,
    pagination: &PaginationQuery,
) -> Result<Vec<ReviewWithReviewer>, AppError> {
    sqlx::query_as::<_, ReviewWithReviewer>(
        r#"
        SELECT r.id, r.reviewer_id, u.name AS reviewer_name, r.rating, r.comment, r.created_at, r.updated_at
        FROM tbl_reviews r
        JOIN tbl_users u ON u.id = r.reviewer_id
        WHERE r.reviewee_id = ?
        ORDER BY r.updated_at DESC, r.id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(user_id)
    .bind(pagination.limit())
    .bind(pagination.offset())
    .fetch_all(pool)
    .await
    .map_err(AppError::db_error)
}

pub async fn get_rating_summary(pool: &MySqlPool, user_id: i32) -> Result<RatingSummary, AppError> {
    sqlx::query_as::<_, RatingSummary>(
        r#"
        SELECT CAST(COALESCE(ROUND(AVG(rating), 2), 0) AS DOUBLE) AS average_rating,
               COUNT(*) AS review_count
        FROM tbl_reviews
        WHERE reviewee_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .map_err(AppError::db_error)
}

pub async fn delete_review(pool: &MySqlPool, review_id: i32) -> Result<(), AppError> {
    let review = get_review(pool, review_id).await?;

    sqlx::query("DELETE FROM tbl_reviews WHERE id = ?")
        .bind(review_id)
        .execute(pool)
        .await
        .map_err(AppError::db_error)?;

    refresh_teacher_rating(pool, review.reviewee_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::profiles::{get_teacher_profile, upsert_teacher_profile};
    use crate::db::test_fixtures::insert_user;
    use crate::models::profiles::UpsertTeacherProfileRequest;
    use crate::models::users::Role;
    use claim::assert_err;

    async fn teacher_with_profile(pool: &MySqlPool) -> i32 {
        let teacher = insert_user(pool, Role::Teacher).await;
        let profile: UpsertTeacherProfileRequest = serde_json::from_value(serde_json::json!({
            "subjects": ["Maths"],
            "classes": ["10"],
            "qualification": "MSc Mathematics",
            "experience_years": 6,
            "teaching_mode": "both"
        }))
        .unwrap();
        upsert_teacher_profile(pool, teacher, &profile).await.unwrap();
        teacher
    }

    fn review(reviewee_id: i32, rating: i32) -> CreateReviewRequest {
        CreateReviewRequest {
            reviewee_id,
            rating,
            comment: Some("Patient and clear".to_string()),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn writing_again_updates_the_same_review(pool: MySqlPool) {
        let teacher = teacher_with_profile(&pool).await;
        let student = insert_user(&pool, Role::Student).await;

        let first = upsert_review(&pool, student, &review(teacher, 2)).await.unwrap();
        let second = upsert_review(&pool, student, &review(teacher, 5)).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.rating, 5);
        let summary = get_rating_summary(&pool, teacher).await.unwrap();
        assert_eq!(summary.review_count, 1);
        assert_eq!(summary.average_rating, 5.0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn teacher_rating_follows_creates_and_deletes(pool: MySqlPool) {
        let teacher = teacher_with_profile(&pool).await;
        let alice = insert_user(&pool, Role::Student).await;
        let bob = insert_user(&pool, Role::Student).await;

        upsert_review(&pool, alice, &review(teacher, 4)).await.unwrap();
        let bobs = upsert_review(&pool, bob, &review(teacher, 5)).await.unwrap();

        let profile = get_teacher_profile(&pool, teacher).await.unwrap().unwrap();
        assert_eq!(profile.review_count, 2);
        assert_eq!(profile.rating, 4.5);

        delete_review(&pool, bobs.id).await.unwrap();
        let profile = get_teacher_profile(&pool, teacher).await.unwrap().unwrap();
        assert_eq!(profile.review_count, 1);
        assert_eq!(profile.rating, 4.0);

        let listed = get_reviews_for_user(&pool, teacher, &PaginationQuery::default())
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].reviewer_id, alice);
        assert_err!(get_review(&pool, bobs.id).await);
    }
}
