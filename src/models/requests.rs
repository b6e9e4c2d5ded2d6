use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::core::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "accepted" => Ok(RequestStatus::Accepted),
            "rejected" => Ok(RequestStatus::Rejected),
            "cancelled" => Ok(RequestStatus::Cancelled),
            other => Err(format!("Invalid request status: {}", other)),
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserRequest {
    pub id: i32,
    pub sender_id: i32,
    pub receiver_id: i32,
    pub requirement_id: Option<i32>,
    pub message: Option<String>,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub responded_at: Option<NaiveDateTime>,
}

/// A request joined with the name and role of the other party.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserRequestView {
    pub id: i32,
    pub sender_id: i32,
    pub receiver_id: i32,
    pub counterpart_name: String,
    pub counterpart_role: String,
    pub requirement_id: Option<i32>,
    pub requirement_title: Option<String>,
    pub message: Option<String>,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub responded_at: Option<NaiveDateTime>,
}

impl UserRequest {
    pub fn status(&self) -> RequestStatus {
        self.status.parse().unwrap_or(RequestStatus::Pending)
    }

    /// Only the receiver can answer, and only while the request is pending.
    pub fn ensure_respondable_by(&self, user_id: i32) -> Result<(), AppError> {
        if self.receiver_id != user_id {
            return Err(AppError::forbidden_error(
                "Only the receiver can respond to this request",
            ));
        }
        self.ensure_pending()
    }

    pub fn ensure_cancellable_by(&self, user_id: i32) -> Result<(), AppError> {
        if self.sender_id != user_id {
            return Err(AppError::forbidden_error(
                "Only the sender can cancel this request",
            ));
        }
        self.ensure_pending()
    }

    fn ensure_pending(&self) -> Result<(), AppError> {
        match self.status() {
            RequestStatus::Pending => Ok(()),
            other => Err(AppError::conflict(format!(
                "This request is already {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    pub receiver_id: i32,
    pub requirement_id: Option<i32>,
    #[validate(length(max = 500, message = "Message cannot exceed 500 characters"))]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestDecision {
    Accepted,
    Rejected,
}

impl From<RequestDecision> for RequestStatus {
    fn from(decision: RequestDecision) -> Self {
        match decision {
            RequestDecision::Accepted => RequestStatus::Accepted,
            RequestDecision::Rejected => RequestStatus::Rejected,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub decision: RequestDecision,
}

#[derive(Debug, Deserialize)]
pub struct RequestListQuery {
    pub status: Option<RequestStatus>,
}
