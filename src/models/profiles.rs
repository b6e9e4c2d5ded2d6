use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::models::common::TeachingMode;
use crate::models::pagination::PaginationQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    NotSubmitted,
    Pending,
    Verified,
    Rejected,
}

impl KycStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KycStatus::NotSubmitted => "not_submitted",
            KycStatus::Pending => "pending",
            KycStatus::Verified => "verified",
            KycStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for KycStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not_submitted" => Ok(KycStatus::NotSubmitted),
            "pending" => Ok(KycStatus::Pending),
            "verified" => Ok(KycStatus::Verified),
            "rejected" => Ok(KycStatus::Rejected),
            other => Err(format!("Invalid KYC status: {}", other)),
        }
    }
}

impl fmt::Display for KycStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StudentProfileRow {
    pub user_id: i32,
    pub class_level: String,
    pub school: String,
    pub board: Option<String>,
    pub subjects: Json<Vec<String>>,
    pub learning_mode: String,
    pub bio: Option<String>,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentProfile {
    pub user_id: i32,
    pub class_level: String,
    pub school: String,
    pub board: Option<String>,
    pub subjects: Vec<String>,
    pub learning_mode: TeachingMode,
    pub bio: Option<String>,
    pub updated_at: NaiveDateTime,
}

impl From<StudentProfileRow> for StudentProfile {
    fn from(row: StudentProfileRow) -> Self {
        StudentProfile {
            user_id: row.user_id,
            class_level: row.class_level,
            school: row.school,
            board: row.board,
            subjects: row.subjects.0,
            learning_mode: row.learning_mode.parse().unwrap_or(TeachingMode::Both),
            bio: row.bio,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TeacherProfileRow {
    pub user_id: i32,
    pub subjects: Json<Vec<String>>,
    pub classes: Json<Vec<String>>,
    pub qualification: String,
    pub experience_years: i32,
    pub hourly_fee: Option<BigDecimal>,
    pub teaching_mode: String,
    pub bio: Option<String>,
    pub rating: f64,
    pub review_count: i32,
    pub kyc_status: String,
    pub kyc_document_type: Option<String>,
    pub kyc_document_url: Option<String>,
    pub kyc_submitted_at: Option<NaiveDateTime>,
    pub kyc_reviewed_at: Option<NaiveDateTime>,
    pub kyc_rejection_reason: Option<String>,
    pub updated_at: NaiveDateTime,
}

impl TeacherProfileRow {
    pub fn kyc_status(&self) -> KycStatus {
        self.kyc_status.parse().unwrap_or(KycStatus::NotSubmitted)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TeacherProfile {
    pub user_id: i32,
    pub subjects: Vec<String>,
    pub classes: Vec<String>,
    pub qualification: String,
    pub experience_years: i32,
    pub hourly_fee: Option<BigDecimal>,
    pub teaching_mode: TeachingMode,
    pub bio: Option<String>,
    pub rating: f64,
    pub review_count: i32,
    pub kyc_status: KycStatus,
    pub kyc_rejection_reason: Option<String>,
    pub updated_at: NaiveDateTime,
}

impl From<TeacherProfileRow> for TeacherProfile {
    fn from(row: TeacherProfileRow) -> Self {
        TeacherProfile {
            kyc_status: row.kyc_status(),
            user_id: row.user_id,
            subjects: row.subjects.0,
            classes: row.classes.0,
            qualification: row.qualification,
            experience_years: row.experience_years,
            hourly_fee: row.hourly_fee,
            teaching_mode: row.teaching_mode.parse().unwrap_or(TeachingMode::Both),
            bio: row.bio,
            rating: row.rating,
            review_count: row.review_count,
            kyc_rejection_reason: row.kyc_rejection_reason,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RoleProfile {
    Student(StudentProfile),
    Teacher(TeacherProfile),
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertStudentProfileRequest {
    #[validate(length(min = 1, max = 50, message = "Class is required"))]
    pub class_level: String,
    #[validate(length(min = 1, max = 150, message = "School is required"))]
    pub school: String,
    #[validate(length(max = 50))]
    pub board: Option<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
    pub learning_mode: TeachingMode,
    #[validate(length(max = 2000))]
    pub bio: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpsertTeacherProfileRequest {
    #[validate(length(min = 1, message = "At least one subject is required"))]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[validate(length(min = 1, max = 150, message = "Qualification is required"))]
    pub qualification: String,
    #[validate(range(min = 0, max = 70, message = "Experience must be between 0 and 70 years"))]
    pub experience_years: i32,
    pub hourly_fee: Option<BigDecimal>,
    pub teaching_mode: TeachingMode,
    #[validate(length(max = 2000))]
    pub bio: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitKycRequest {
    #[validate(length(min = 1, max = 50, message = "Document type is required"))]
    pub document_type: String,
    #[validate(url(message = "Document URL must be a valid URL"))]
    pub document_url: String,
}

#[derive(Debug, Deserialize)]
pub struct TeacherSearchQuery {
    pub subject: Option<String>,
    pub class_level: Option<String>,
    pub min_rating: Option<f64>,
    pub city: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl TeacherSearchQuery {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery::new(self.page, self.per_page)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TeacherSummaryRow {
    pub user_id: i32,
    pub name: String,
    pub city: Option<String>,
    pub is_online: bool,
    pub subjects: Json<Vec<String>>,
    pub classes: Json<Vec<String>>,
    pub qualification: String,
    pub experience_years: i32,
    pub hourly_fee: Option<BigDecimal>,
    pub teaching_mode: String,
    pub rating: f64,
    pub review_count: i32,
    pub kyc_status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeacherSummary {
    pub user_id: i32,
    pub name: String,
    pub city: Option<String>,
    pub is_online: bool,
    pub subjects: Vec<String>,
    pub classes: Vec<String>,
    pub qualification: String,
    pub experience_years: i32,
    pub hourly_fee: Option<BigDecimal>,
    pub teaching_mode: TeachingMode,
    pub rating: f64,
    pub review_count: i32,
    pub kyc_verified: bool,
}

impl From<TeacherSummaryRow> for TeacherSummary {
    fn from(row: TeacherSummaryRow) -> Self {
        TeacherSummary {
            kyc_verified: row.kyc_status == KycStatus::Verified.as_str(),
            user_id: row.user_id,
            name: row.name,
            city: row.city,
            is_online: row.is_online,
            subjects: row.subjects.0,
            classes: row.classes.0,
            qualification: row.qualification,
            experience_years: row.experience_years,
            hourly_fee: row.hourly_fee,
            teaching_mode: row.teaching_mode.parse().unwrap_or(TeachingMode::Both),
            rating: row.rating,
            review_count: row.review_count,
        }
    }
}

/// Admin view of a teacher awaiting document review.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct KycSubmission {
    pub user_id: i32,
    pub name: String,
    pub email: String,
    pub qualification: String,
    pub kyc_status: String,
    pub kyc_document_type: Option<String>,
    pub kyc_document_url: Option<String>,
    pub kyc_submitted_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KycDecision {
    Verified,
    Rejected,
}

impl From<KycDecision> for KycStatus {
    fn from(decision: KycDecision) -> Self {
        match decision {
            KycDecision::Verified => KycStatus::Verified,
            KycDecision::Rejected => KycStatus::Rejected,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReviewKycRequest {
    pub decision: KycDecision,
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use claim::{assert_err, assert_ok};
    use serde_json::json;

    #[test]
    fn teacher_profile_needs_a_subject() {
        let request: UpsertTeacherProfileRequest = serde_json::from_value(json!({
            "subjects": [],
            "qualification": "M.Sc Physics",
            "experience_years": 4,
            "teaching_mode": "offline"
        }))
        .unwrap();
        assert_err!(request.validate());
    }

    #[test]
    fn hourly_fee_accepts_decimal_strings() {
        let request: UpsertTeacherProfileRequest = serde_json::from_value(json!({
            "subjects": ["Physics"],
            "qualification": "M.Sc Physics",
            "experience_years": 4,
            "hourly_fee": "450.50",
            "teaching_mode": "both"
        }))
        .unwrap();
        assert_ok!(request.validate());
        assert_eq!(request.hourly_fee.unwrap().to_string(), "450.50");
    }

    #[test]
    fn kyc_document_must_be_a_url() {
        let request = SubmitKycRequest {
            document_type: "aadhaar".into(),
            document_url: "not a url".into(),
        };
        assert_err!(request.validate());
    }

    #[test]
    fn role_profile_is_tagged_with_its_type() {
        let profile = RoleProfile::Student(StudentProfile {
            user_id: 7,
            class_level: "10".into(),
            school: "DPS".into(),
            board: Some("CBSE".into()),
            subjects: vec!["Maths".into()],
            learning_mode: TeachingMode::Online,
            bio: None,
            updated_at: chrono::NaiveDateTime::default(),
        });
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["type"], "student");
        assert_eq!(value["learning_mode"], "online");
    }
}
