use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::pagination::PaginationQuery;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: i32,
    pub reviewer_id: i32,
    pub reviewee_id: i32,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ReviewWithReviewer {
    pub id: i32,
    pub reviewer_id: i32,
    pub reviewer_name: String,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    pub reviewee_id: i32,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(max = 1000, message = "Comment cannot exceed 1000 characters"))]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, sqlx::FromRow)]
pub struct RatingSummary {
    pub average_rating: f64,
    pub review_count: i64,
}

#[derive(Debug, Serialize)]
pub struct UserReviews {
    pub user_id: i32,
    pub summary: RatingSummary,
    pub reviews: Vec<ReviewWithReviewer>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ReviewQuery {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery::new(self.page, self.per_page)
    }
}
