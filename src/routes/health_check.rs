use actix_web::{get, HttpResponse};

use crate::core::AppSuccessResponse;

#[get("/health_check")]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(AppSuccessResponse::new(
        serde_json::json!({ "status": "ok" }),
        "Service is healthy",
    ))
}
