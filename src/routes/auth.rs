use std::time::Duration;

use actix_web::{post, web, HttpResponse};
use chrono::Utc;
use sqlx::MySqlPool;
use validator::Validate;

use crate::core::config::JwtAuthConfig;
use crate::core::jwt_auth::{generate_jwt_token, JwtClaims};
use crate::core::{
    generate_otp, hash_password, otp_key, verify_password, AppError, AppSuccessResponse,
    EmailService, RedisHelper, OTP_TTL_SECS,
};
use crate::db::{profiles, users};
use crate::models::users::{
    ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse, OtpData,
    RegisterRequest, ResetPasswordRequest, Role, UserProfile,
};

const INVALID_CREDENTIALS: &str = "Email or password is incorrect";
const INVALID_OTP: &str = "Invalid or expired OTP";

#[tracing::instrument(name = "Register User", skip(pool, request), fields(email = %request.email))]
#[post("/register")]
pub async fn register(
    pool: web::Data<MySqlPool>,
    request: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    request.validate()?;

    if request.role == Role::Admin {
        return Err(AppError::validation(
            "Registration is only open to students and teachers",
        ));
    }

    if users::email_exists(&pool, &request.email).await? {
        return Err(AppError::conflict(
            "A user with this email address already exists",
        ));
    }

    let password_hash = hash_password(&request.password)?;
    let user = users::create_user(&pool, &request, &password_hash).await?;
    let user_profile = UserProfile::try_from(user)?;

    Ok(HttpResponse::Created().json(AppSuccessResponse::new(
        user_profile,
        "User registered successfully",
    )))
}

#[tracing::instrument(name = "User Login", skip(pool, jwt_config, request), fields(email = %request.email))]
#[post("/login")]
pub async fn login(
    pool: web::Data<MySqlPool>,
    jwt_config: web::Data<JwtAuthConfig>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    request.validate()?;

    let user = match users::find_user_by_email(&pool, &request.email).await? {
        Some(user) if user.is_active => user,
        _ => return Err(AppError::unauthorized(INVALID_CREDENTIALS)),
    };

    if !verify_password(&request.password, &user.password)? {
        return Err(AppError::unauthorized(INVALID_CREDENTIALS));
    }

    let role = user.role()?;
    let (claims, expires_at) = JwtClaims::for_user(user.id, &user.email, role, &jwt_config);
    let token = generate_jwt_token(&claims, &jwt_config.secret)?;

    let profile = profiles::get_role_profile(&pool, user.id, role).await?;
    let mut user_profile = UserProfile::try_from(user)?;
    user_profile.profile = profile;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        LoginResponse {
            user: user_profile,
            token,
            expires_at,
        },
        "Login successful",
    )))
}

#[tracing::instrument(name = "Forgot Password", skip(pool, redis, email_service, request))]
#[post("/forgot-password")]
pub async fn forgot_password(
    pool: web::Data<MySqlPool>,
    redis: web::Data<RedisHelper>,
    email_service: web::Data<EmailService>,
    request: web::Json<ForgotPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    request.validate()?;

    let response = AppSuccessResponse::new(
        MessageResponse {
            message: "If an account exists with this email, you will receive an OTP shortly"
                .to_string(),
        },
        "Password reset OTP sent",
    );

    let user = match users::find_user_by_email(&pool, &request.email).await? {
        Some(user) if user.is_active => user,
        _ => return Ok(HttpResponse::Ok().json(response)),
    };

    let otp = generate_otp();
    let otp_data = OtpData {
        email: user.email.clone(),
        otp: otp.clone(),
        created_at: Utc::now().timestamp(),
    };
    // Unknown emails get this same reply.
    if let Err(e) = redis
        .set(
            &otp_key(&user.email),
            &otp_data,
            Duration::from_secs(OTP_TTL_SECS as u64),
        )
        .await
    {
        tracing::error!(error.message = %e, "Failed to store OTP for user {}", user.id);
        return Ok(HttpResponse::Ok().json(response));
    }

    if let Err(e) = email_service.send_otp_email(&user.email, &otp).await {
        tracing::error!(error.message = %e, "Failed to send OTP email to user {}", user.id);
    }

    Ok(HttpResponse::Ok().json(response))
}

#[tracing::instrument(name = "Reset Password", skip(pool, redis, email_service, request))]
#[post("/reset-password")]
pub async fn reset_password(
    pool: web::Data<MySqlPool>,
    redis: web::Data<RedisHelper>,
    email_service: web::Data<EmailService>,
    request: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    request.validate()?;

    let key = otp_key(&request.email);
    let otp_data: OtpData = redis
        .get(&key)
        .await?
        .ok_or_else(|| AppError::validation(INVALID_OTP))?;

    if otp_data.otp != request.otp || !otp_data.email.eq_ignore_ascii_case(&request.email) {
        return Err(AppError::validation(INVALID_OTP));
    }

    if Utc::now().timestamp() - otp_data.created_at > OTP_TTL_SECS {
        redis.delete(&key).await?;
        return Err(AppError::validation(INVALID_OTP));
    }

    let user = match users::find_user_by_email(&pool, &request.email).await? {
        Some(user) if user.is_active => user,
        _ => return Err(AppError::validation(INVALID_OTP)),
    };

    let password_hash = hash_password(&request.new_password)?;
    users::change_user_password(&pool, user.id, &password_hash).await?;
    redis.delete(&key).await?;

    if let Err(e) = email_service
        .send_password_reset_confirmation(&user.email)
        .await
    {
        tracing::warn!(
            "Failed to send password reset confirmation to user {}: {}",
            user.id,
            e
        );
    }

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        MessageResponse {
            message: "Your password has been reset. You can now log in".to_string(),
        },
        "Password reset successful",
    )))
}
