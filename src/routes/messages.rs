use actix_web::{delete, get, post, put, web, HttpResponse};
use serde_json::json;
use sqlx::MySqlPool;

use crate::chat::{ChatHub, ServerEvent};
use crate::core::config::MessagingConfig;
use crate::core::jwt_auth::JwtMiddleware;
use crate::core::{AppError, AppSuccessResponse};
use crate::db::{messages, users};
use crate::models::messages::{ConversationQuery, NewMessage, SendMessageRequest};
use crate::models::users::MessageResponse;

#[tracing::instrument(name = "Send Message", skip(pool, hub, messaging, auth, request), fields(user_id = auth.user_id))]
#[post("")]
pub async fn send_message(
    pool: web::Data<MySqlPool>,
    hub: web::Data<ChatHub>,
    messaging: web::Data<MessagingConfig>,
    auth: JwtMiddleware,
    request: web::Json<SendMessageRequest>,
) -> Result<HttpResponse, AppError> {
    let new_message = NewMessage::parse(auth.user_id, &request)?;

    if !users::is_active_user(&pool, new_message.receiver_id).await? {
        return Err(AppError::not_found("Recipient not found"));
    }

    let message = messages::insert_message(&pool, &new_message, messaging.expiry_days).await?;

    let delivered = hub.send_to_user(
        message.receiver_id,
        ServerEvent::MessageReceived {
            message: message.clone(),
        },
    );
    hub.send_to_user(
        auth.user_id,
        ServerEvent::MessageSent {
            message: message.clone(),
            client_id: None,
        },
    );
    tracing::debug!(message_id = message.id, delivered, "Message stored");

    Ok(HttpResponse::Created().json(AppSuccessResponse::new(
        message,
        "Message sent successfully",
    )))
}

#[tracing::instrument(name = "Get Conversations", skip(pool, auth), fields(user_id = auth.user_id))]
#[get("/conversations")]
pub async fn get_conversations(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    let conversations = messages::get_conversations(&pool, auth.user_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        conversations,
        "Conversations retrieved successfully",
    )))
}

#[tracing::instrument(name = "Get Unread Count", skip(pool, auth), fields(user_id = auth.user_id))]
#[get("/unread-count")]
pub async fn get_unread_count(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    let unread = messages::get_unread_count(&pool, auth.user_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        json!({ "unread_count": unread }),
        "Unread count retrieved successfully",
    )))
}

#[tracing::instrument(name = "Get Conversation", skip(pool, auth, query), fields(user_id = auth.user_id))]
#[get("/conversations/{partner_id}")]
pub async fn get_conversation(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
    path: web::Path<i32>,
    query: web::Query<ConversationQuery>,
) -> Result<HttpResponse, AppError> {
    let partner_id = path.into_inner();
    let pagination = query.pagination();

    messages::mark_conversation_read(&pool, auth.user_id, partner_id).await?;
    let (items, total) =
        messages::get_conversation(&pool, auth.user_id, partner_id, &pagination).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::paginated(
        items,
        "Conversation retrieved successfully",
        pagination.meta(total),
    )))
}

#[tracing::instrument(name = "Mark Conversation Read", skip(pool, auth), fields(user_id = auth.user_id))]
#[put("/conversations/{partner_id}/read")]
pub async fn mark_read(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let marked = messages::mark_conversation_read(&pool, auth.user_id, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        json!({ "marked_read": marked }),
        "Messages marked as read",
    )))
}

#[tracing::instrument(name = "Toggle Message Like", skip(pool, auth), fields(user_id = auth.user_id))]
#[put("/{message_id}/like")]
pub async fn toggle_like(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let message = messages::toggle_like(&pool, path.into_inner(), auth.user_id).await?;
    let note = if message.is_liked {
        "Message liked"
    } else {
        "Message unliked"
    };

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(message, note)))
}

#[tracing::instrument(name = "Delete Message", skip(pool, auth), fields(user_id = auth.user_id))]
#[delete("/{message_id}")]
pub async fn delete_message(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let message_id = path.into_inner();
    messages::delete_message(&pool, message_id, auth.user_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        MessageResponse {
            message: format!("Message {} deleted", message_id),
        },
        "Message deleted successfully",
    )))
}
