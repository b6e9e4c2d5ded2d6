use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use validator::Validate;

use crate::core::AppError;
use crate::geo::{google_maps_url, Coordinates};
use crate::models::common::TeachingMode;
use crate::models::pagination::PaginationQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementType {
    /// A student looking for a tutor.
    Need,
    /// A tutor advertising availability.
    Offer,
}

impl RequirementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementType::Need => "need",
            RequirementType::Offer => "offer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementStatus {
    Open,
    Closed,
}

impl RequirementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementStatus::Open => "open",
            RequirementStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeePeriod {
    Hourly,
    Monthly,
    OneTime,
}

impl FeePeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeePeriod::Hourly => "hourly",
            FeePeriod::Monthly => "monthly",
            FeePeriod::OneTime => "one_time",
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RequirementRow {
    pub id: i32,
    pub user_id: i32,
    pub owner_name: String,
    pub title: String,
    pub description: String,
    pub requirement_type: String,
    pub subjects: Json<Vec<String>>,
    pub classes: Json<Vec<String>>,
    pub mode: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub fee: Option<BigDecimal>,
    pub fee_period: Option<String>,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl RequirementRow {
    pub fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::from_columns(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Requirement {
    pub id: i32,
    pub user_id: i32,
    pub owner_name: String,
    pub title: String,
    pub description: String,
    pub requirement_type: String,
    pub subjects: Vec<String>,
    pub classes: Vec<String>,
    pub mode: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub fee: Option<BigDecimal>,
    pub fee_period: Option<String>,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maps_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl From<RequirementRow> for Requirement {
    fn from(row: RequirementRow) -> Self {
        Requirement {
            maps_url: row.coordinates().map(|c| google_maps_url(&c)),
            distance_km: None,
            id: row.id,
            user_id: row.user_id,
            owner_name: row.owner_name,
            title: row.title,
            description: row.description,
            requirement_type: row.requirement_type,
            subjects: row.subjects.0,
            classes: row.classes.0,
            mode: row.mode,
            latitude: row.latitude,
            longitude: row.longitude,
            address: row.address,
            city: row.city,
            fee: row.fee,
            fee_period: row.fee_period,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRequirementRequest {
    #[validate(length(min = 1, max = 150, message = "Title must be 1-150 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 2000, message = "Description must be 1-2000 characters"))]
    pub description: String,
    pub requirement_type: RequirementType,
    #[validate(length(min = 1, message = "At least one subject is required"))]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    pub mode: TeachingMode,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    pub fee: Option<BigDecimal>,
    pub fee_period: Option<FeePeriod>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateRequirementRequest {
    #[validate(length(min = 1, max = 150, message = "Title must be 1-150 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 2000, message = "Description must be 1-2000 characters"))]
    pub description: Option<String>,
    pub subjects: Option<Vec<String>>,
    pub classes: Option<Vec<String>>,
    pub mode: Option<TeachingMode>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    pub fee: Option<BigDecimal>,
    pub fee_period: Option<FeePeriod>,
    pub status: Option<RequirementStatus>,
}

pub fn validate_fee(fee: &Option<BigDecimal>) -> Result<(), AppError> {
    match fee {
        Some(fee) if *fee < BigDecimal::from(0) => {
            Err(AppError::validation("Fee cannot be negative"))
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Deserialize)]
pub struct RequirementQuery {
    pub subject: Option<String>,
    pub class_level: Option<String>,
    pub city: Option<String>,
    pub requirement_type: Option<RequirementType>,
    pub status: Option<RequirementStatus>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_km: Option<f64>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl RequirementQuery {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery::new(self.page, self.per_page)
    }
}
