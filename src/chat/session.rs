use std::sync::Arc;

use actix_ws::{CloseReason, Message as WsMessage, MessageStream, Session};
use futures_util::StreamExt;
use sqlx::MySqlPool;
use uuid::Uuid;

use crate::chat::events::{ClientEvent, OutgoingMessage, ServerEvent};
use crate::chat::hub::{ChatHub, Claim};
use crate::core::AppError;
use crate::db;
use crate::models::messages::{Message, NewMessage};

/// Everything a socket session needs to act on behalf of its user.
pub struct SessionContext {
    pub hub: Arc<ChatHub>,
    pub pool: MySqlPool,
    pub expiry_days: i64,
    pub user_id: i32,
}

/// Drives one socket connection until the client closes it or the transport fails.
#[tracing::instrument(name = "Chat session", skip(ctx, session, stream), fields(user_id = ctx.user_id))]
pub async fn run_session(ctx: SessionContext, mut session: Session, mut stream: MessageStream) {
    let mut connection = ctx.hub.connect(ctx.user_id);
    let session_id = connection.session_id;

    if connection.first_session {
        persist_presence(&ctx).await;
    }
    tracing::info!(%session_id, "Socket session opened");

    let close_reason: Option<CloseReason> = loop {
        tokio::select! {
            outgoing = connection.receiver.recv() => {
                let Some(event) = outgoing else { break None };
                if session.text(event.to_json()).await.is_err() {
                    break None;
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(WsMessage::Text(text))) => {
                        handle_frame(&ctx, session_id, &text).await;
                    }
                    Some(Ok(WsMessage::Ping(bytes))) => {
                        if session.pong(&bytes).await.is_err() {
                            break None;
                        }
                    }
                    Some(Ok(WsMessage::Close(reason))) => break reason,
                    Some(Ok(WsMessage::Binary(_))) => {
                        ctx.hub.send_to_session(
                            ctx.user_id,
                            session_id,
                            ServerEvent::error("Binary frames are not supported"),
                        );
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(%session_id, "Socket protocol error: {}", e);
                        break None;
                    }
                    None => break None,
                }
            }
        }
    };

    if ctx.hub.disconnect(ctx.user_id, session_id) {
        persist_presence(&ctx).await;
    }
    let _ = session.close(close_reason).await;
    tracing::info!(%session_id, "Socket session closed");
}

async fn persist_presence(ctx: &SessionContext) {
    if let Err(e) = sync_presence(ctx).await {
        tracing::error!(
            error.message = %e,
            "Failed to store presence for user {}",
            ctx.user_id
        );
    }
}

async fn sync_presence(ctx: &SessionContext) -> Result<bool, AppError> {
    ctx.hub
        .persist_presence(ctx.user_id, |is_online| {
            db::users::set_online_status(&ctx.pool, ctx.user_id, is_online)
        })
        .await
}

async fn handle_frame(ctx: &SessionContext, session_id: Uuid, text: &str) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!("Rejected socket frame: {}", e);
            ctx.hub.send_to_session(
                ctx.user_id,
                session_id,
                ServerEvent::error("Unrecognised event"),
            );
            return;
        }
    };

    if let Err(e) = handle_event(ctx, session_id, event).await {
        ctx.hub
            .send_to_session(ctx.user_id, session_id, ServerEvent::error(e.message()));
    }
}

pub async fn handle_event(
    ctx: &SessionContext,
    session_id: Uuid,
    event: ClientEvent,
) -> Result<(), AppError> {
    match event {
        ClientEvent::UserOnline => {
            let is_online = sync_presence(ctx).await?;
            ctx.hub.broadcast_status(ctx.user_id, is_online);
            Ok(())
        }
        ClientEvent::SendMessage(payload) => send_message(ctx, session_id, payload).await,
        ClientEvent::TypingStart { receiver_id } => {
            if receiver_id != ctx.user_id {
                ctx.hub.typing_started(ctx.user_id, receiver_id);
            }
            Ok(())
        }
        ClientEvent::TypingStop { receiver_id } => {
            ctx.hub.typing_stopped(ctx.user_id, receiver_id);
            Ok(())
        }
    }
}

async fn send_message(
    ctx: &SessionContext,
    session_id: Uuid,
    payload: OutgoingMessage,
) -> Result<(), AppError> {
    let new_message = NewMessage::parse(ctx.user_id, &payload.to_request())?;
    let client_id = payload.client_id().map(str::to_string);

    if let Some(client_id) = &client_id {
        match ctx.hub.claim_client_id(ctx.user_id, client_id) {
            Claim::New => {}
            Claim::InFlight => return Ok(()),
            Claim::Delivered(message) => {
                ctx.hub.send_to_session(
                    ctx.user_id,
                    session_id,
                    ServerEvent::MessageSent {
                        message,
                        client_id: Some(client_id.clone()),
                    },
                );
                return Ok(());
            }
        }
    }

    let stored = store_message(ctx, &new_message).await;
    let message = match (stored, &client_id) {
        (Ok(message), Some(client_id)) => {
            ctx.hub.complete_client_id(ctx.user_id, client_id, &message);
            message
        }
        (Ok(message), None) => message,
        (Err(e), Some(client_id)) => {
            ctx.hub.release_client_id(ctx.user_id, client_id);
            return Err(e);
        }
        (Err(e), None) => return Err(e),
    };

    ctx.hub.send_to_user(
        message.receiver_id,
        ServerEvent::MessageReceived {
            message: message.clone(),
        },
    );
    ctx.hub.send_to_user(
        ctx.user_id,
        ServerEvent::MessageSent { message, client_id },
    );
    Ok(())
}

async fn store_message(
    ctx: &SessionContext,
    new_message: &NewMessage,
) -> Result<Message, AppError> {
    if !db::users::is_active_user(&ctx.pool, new_message.receiver_id).await? {
        return Err(AppError::not_found("Recipient not found"));
    }
    db::messages::insert_message(&ctx.pool, new_message, ctx.expiry_days).await
}
