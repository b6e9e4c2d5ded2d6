use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use crate::core::{validate_display_name, AppError};
use crate::geo::{google_maps_url, Coordinates};
use crate::models::profiles::RoleProfile;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password: String,
    pub role: String,
    pub is_active: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub location_updated_at: Option<NaiveDateTime>,
    pub is_online: bool,
    pub live_sharing: bool,
    pub last_seen_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Stored role and status of an account, re-read on every authenticated request.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountAccess {
    pub role: String,
    pub is_active: bool,
}

impl User {
    pub fn role(&self) -> Result<Role, AppError> {
        self.role.parse().map_err(|e: String| {
            tracing::error!("User {} has an unknown role: {}", self.id, e);
            AppError::internal_error("Stored user role is invalid")
        })
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::from_columns(self.latitude, self.longitude)
    }

    pub fn location(&self) -> Option<UserLocation> {
        let coords = self.coordinates()?;
        Some(UserLocation {
            latitude: coords.latitude(),
            longitude: coords.longitude(),
            address: self.address.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            country: self.country.clone(),
            postal_code: self.postal_code.clone(),
            updated_at: self.location_updated_at,
            maps_url: google_maps_url(&coords),
        })
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct UserLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub updated_at: Option<NaiveDateTime>,
    pub maps_url: String,
}

/// The caller's own account view.
#[derive(Debug, Serialize, Clone)]
pub struct UserProfile {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub location: Option<UserLocation>,
    pub is_online: bool,
    pub live_sharing: bool,
    pub last_seen_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<RoleProfile>,
}

impl TryFrom<User> for UserProfile {
    type Error = AppError;

    fn try_from(user: User) -> Result<Self, Self::Error> {
        Ok(UserProfile {
            role: user.role()?,
            location: user.location(),
            id: user.id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            is_online: user.is_online,
            live_sharing: user.live_sharing,
            last_seen_at: user.last_seen_at,
            created_at: user.created_at,
            profile: None,
        })
    }
}

/// What other users may see: no email, phone or precise timestamps.
#[derive(Debug, Serialize, Clone)]
pub struct PublicUser {
    pub id: i32,
    pub name: String,
    pub role: Role,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub is_online: bool,
    pub last_seen_at: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<RoleProfile>,
}

impl TryFrom<User> for PublicUser {
    type Error = AppError;

    fn try_from(user: User) -> Result<Self, Self::Error> {
        Ok(PublicUser {
            role: user.role()?,
            id: user.id,
            name: user.name,
            city: user.city,
            state: user.state,
            country: user.country,
            is_online: user.is_online,
            last_seen_at: user.last_seen_at,
            profile: None,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(custom = "validate_display_name")]
    pub name: String,
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters long"))]
    pub password: String,
    #[validate(length(min = 7, max = 20, message = "Phone number must be 7-20 characters"))]
    pub phone: Option<String>,
    pub role: Role,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserProfile,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(custom = "validate_display_name")]
    pub name: Option<String>,
    #[validate(length(min = 7, max = 20, message = "Phone number must be 7-20 characters"))]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    #[validate(length(min = 6, message = "New password must be at least 6 characters long"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(email(message = "Please provide a valid email address"))]
    pub email: String,
    #[validate(length(equal = 6, message = "OTP must be 6 digits"))]
    pub otp: String,
    #[validate(length(min = 6, message = "New password must be at least 6 characters long"))]
    pub new_password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OtpData {
    pub email: String,
    pub otp: String,
    pub created_at: i64,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
