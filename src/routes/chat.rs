use actix_web::{get, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use sqlx::MySqlPool;

use crate::chat::{run_session, ChatHub, SessionContext};
use crate::core::config::{JwtAuthConfig, MessagingConfig};
use crate::core::jwt_auth::{decode_jwt_token, JwtMiddleware};
use crate::core::AppError;

#[derive(Debug, Deserialize)]
pub struct SocketQuery {
    pub token: Option<String>,
}

/// Upgrades to the chat socket. Browsers cannot set headers here, so the JWT comes in `?token=`.
#[tracing::instrument(name = "Chat Socket Upgrade", skip_all)]
#[get("/ws")]
pub async fn chat_socket(
    req: HttpRequest,
    body: web::Payload,
    query: web::Query<SocketQuery>,
    pool: web::Data<MySqlPool>,
    hub: web::Data<ChatHub>,
    jwt_config: web::Data<JwtAuthConfig>,
    messaging: web::Data<MessagingConfig>,
) -> Result<HttpResponse, AppError> {
    let token = query
        .token
        .as_deref()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::unauthorized("A token is required to open the chat socket"))?;

    let claims = decode_jwt_token(token, &jwt_config.secret)?;
    let auth = JwtMiddleware::from_stored_account(&pool, claims).await?;

    let (response, session, stream) = actix_ws::handle(&req, body).map_err(|e| {
        tracing::warn!("Socket handshake failed for user {}: {}", auth.user_id, e);
        AppError::validation("Invalid websocket handshake")
    })?;

    let ctx = SessionContext {
        hub: hub.into_inner(),
        pool: pool.get_ref().clone(),
        expiry_days: messaging.expiry_days,
        user_id: auth.user_id,
    };
    actix_web::rt::spawn(run_session(ctx, session, stream));

    Ok(response)
}
