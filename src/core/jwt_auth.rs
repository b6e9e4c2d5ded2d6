use actix_web::dev::Payload;
use actix_web::{http, web, FromRequest, HttpMessage, HttpRequest};
use chrono::{DateTime, Duration, Utc};
use futures_util::future::LocalBoxFuture;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;

use crate::core::config::JwtAuthConfig;
use crate::core::AppError;
use crate::db::users;
use crate::models::users::Role;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtClaims {
    pub sub: String, // user ID
    pub email: String,
    pub role: String,
    pub exp: usize, // expiration time
}

impl JwtClaims {
    pub fn for_user(
        user_id: i32,
        email: &str,
        role: Role,
        config: &JwtAuthConfig,
    ) -> (Self, DateTime<Utc>) {
        let expires_at = Utc::now() + Duration::hours(config.token_expiration_time);
        let claims = JwtClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            exp: expires_at.timestamp() as usize,
        };
        (claims, expires_at)
    }
}

/// Authenticated caller, extracted from `Authorization: Bearer <token>`.
/// The role is the stored one; the token only proves identity.
#[derive(Debug)]
pub struct JwtMiddleware {
    pub user_id: i32,
    pub role: Role,
    pub claims: JwtClaims,
}

impl JwtMiddleware {
    pub fn from_claims(claims: JwtClaims) -> Result<Self, AppError> {
        let user_id: i32 = claims
            .sub
            .parse()
            .map_err(|_| AppError::unauthorized("Invalid user ID in token"))?;
        let role: Role = claims
            .role
            .parse()
            .map_err(|_| AppError::unauthorized("Invalid role in token"))?;

        Ok(JwtMiddleware {
            user_id,
            role,
            claims,
        })
    }

    /// Resolves a verified token against the account as it is stored now.
    /// Deactivated or deleted accounts are rejected even while their token is unexpired.
    pub async fn from_stored_account(pool: &MySqlPool, claims: JwtClaims) -> Result<Self, AppError> {
        let mut caller = Self::from_claims(claims)?;

        let access = users::get_account_access(pool, caller.user_id)
            .await?
            .filter(|access| access.is_active)
            .ok_or_else(|| AppError::unauthorized("Account is not active"))?;

        caller.role = access.role.parse().map_err(|e: String| {
            tracing::error!("User {} has an unknown role: {}", caller.user_id, e);
            AppError::internal_error("Stored user role is invalid")
        })?;
        Ok(caller)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        self.require_role(Role::Admin)
    }

    pub fn require_role(&self, role: Role) -> Result<(), AppError> {
        if self.role != role {
            return Err(AppError::forbidden_error(format!(
                "This action requires the {} role",
                role
            )));
        }
        Ok(())
    }
}

impl FromRequest for JwtMiddleware {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let claims = bearer_claims(req);
        let pool = req.app_data::<web::Data<MySqlPool>>().cloned();

        Box::pin(async move {
            let claims = claims?;
            let pool =
                pool.ok_or_else(|| AppError::internal_error("Database pool is not registered"))?;
            JwtMiddleware::from_stored_account(&pool, claims).await
        })
    }
}

fn bearer_claims(req: &HttpRequest) -> Result<JwtClaims, AppError> {
    let config = req
        .app_data::<web::Data<JwtAuthConfig>>()
        .ok_or_else(|| AppError::internal_error("JWT configuration is not registered"))?;

    let token = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::unauthorized("Invalid login credentials"))?;

    let claims = decode_jwt_token(token, &config.secret)?;
    req.extensions_mut().insert(claims.clone());

    Ok(claims)
}

pub fn generate_jwt_token(claims: &JwtClaims, secret: &Secret<String>) -> Result<String, AppError> {
    let encoding_key = EncodingKey::from_secret(secret.expose_secret().as_bytes());

    encode(&Header::default(), claims, &encoding_key).map_err(|e| {
        tracing::error!("Failed to generate token string: {:?}", e);
        AppError::internal_error("Failed to generate JWT token")
    })
}

pub fn decode_jwt_token(token: &str, secret: &Secret<String>) -> Result<JwtClaims, AppError> {
    decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid token"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use claim::{assert_err, assert_ok};

    fn config() -> JwtAuthConfig {
        JwtAuthConfig {
            secret: Secret::new("test-secret".to_string()),
            token_expiration_time: 24,
        }
    }

    #[test]
    fn issued_token_authenticates_the_same_user() {
        let config = config();
        let (claims, _) = JwtClaims::for_user(42, "t@example.com", Role::Teacher, &config);
        let token = assert_ok!(generate_jwt_token(&claims, &config.secret));

        let req = TestRequest::default()
            .app_data(web::Data::new(config))
            .insert_header((http::header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_http_request();

        let claims = assert_ok!(bearer_claims(&req));
        let auth = assert_ok!(JwtMiddleware::from_claims(claims));
        assert_eq!(auth.user_id, 42);
        assert_eq!(auth.role, Role::Teacher);
        assert!(!auth.is_admin());
        assert_err!(auth.require_admin());
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let config = config();
        let (claims, _) = JwtClaims::for_user(1, "a@example.com", Role::Admin, &config);
        let token = generate_jwt_token(&claims, &Secret::new("other".to_string())).unwrap();

        assert_err!(decode_jwt_token(&token, &config.secret));
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = JwtAuthConfig {
            token_expiration_time: -2,
            ..config()
        };
        let (claims, _) = JwtClaims::for_user(1, "a@example.com", Role::Student, &config);
        let token = generate_jwt_token(&claims, &config.secret).unwrap();

        assert_err!(decode_jwt_token(&token, &config.secret));
    }

    #[test]
    fn missing_bearer_prefix_is_unauthorized() {
        let req = TestRequest::default()
            .app_data(web::Data::new(config()))
            .insert_header((http::header::AUTHORIZATION, "Token abc"))
            .to_http_request();

        let err = assert_err!(bearer_claims(&req));
        assert_eq!(err.error_type, crate::core::AppErrorType::AuthError);
    }
}
