use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::AppError;
use crate::models::common::clean_optional;
use crate::models::pagination::PaginationQuery;

pub const MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: i32,
    pub sender_id: i32,
    pub receiver_id: i32,
    pub content: String,
    pub attachment_url: Option<String>,
    pub is_read: bool,
    pub is_liked: bool,
    pub read_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendMessageRequest {
    pub receiver_id: i32,
    pub content: Option<String>,
    #[validate(url(message = "Attachment must be a valid URL"))]
    pub attachment_url: Option<String>,
}

/// A message that passed content checks and is ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub sender_id: i32,
    pub receiver_id: i32,
    pub content: String,
    pub attachment_url: Option<String>,
}

impl NewMessage {
    pub fn parse(sender_id: i32, request: &SendMessageRequest) -> Result<Self, AppError> {
        request.validate()?;

        if sender_id == request.receiver_id {
            return Err(AppError::validation("You cannot send a message to yourself"));
        }

        let content = request
            .content
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        let attachment_url = clean_optional(&request.attachment_url);

        if content.is_empty() && attachment_url.is_none() {
            return Err(AppError::validation(
                "A message needs text content or an attachment",
            ));
        }
        if content.chars().count() > MAX_MESSAGE_CHARS {
            return Err(AppError::validation(format!(
                "Message cannot be longer than {} characters",
                MAX_MESSAGE_CHARS
            )));
        }

        Ok(NewMessage {
            sender_id,
            receiver_id: request.receiver_id,
            content,
            attachment_url,
        })
    }
}

pub fn expiry_for(created_at: NaiveDateTime, expiry_days: i64) -> NaiveDateTime {
    created_at + Duration::days(expiry_days)
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConversationRow {
    pub partner_id: i64,
    pub unread_count: i64,
    pub partner_name: String,
    pub partner_role: String,
    pub partner_online: bool,
    pub partner_last_seen_at: Option<NaiveDateTime>,
    pub last_message_id: i32,
    pub last_message: String,
    pub last_attachment_url: Option<String>,
    pub last_sender_id: i32,
    pub last_message_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub partner_id: i32,
    pub partner_name: String,
    pub partner_role: String,
    pub partner_online: bool,
    pub partner_last_seen_at: Option<NaiveDateTime>,
    pub last_message_id: i32,
    pub last_message: String,
    pub last_message_has_attachment: bool,
    pub last_message_is_mine: bool,
    pub last_message_at: NaiveDateTime,
    pub unread_count: i64,
}

impl ConversationSummary {
    pub fn from_row(row: ConversationRow, user_id: i32) -> Self {
        ConversationSummary {
            partner_id: row.partner_id as i32,
            partner_name: row.partner_name,
            partner_role: row.partner_role,
            partner_online: row.partner_online,
            partner_last_seen_at: row.partner_last_seen_at,
            last_message_id: row.last_message_id,
            last_message: row.last_message,
            last_message_has_attachment: row.last_attachment_url.is_some(),
            last_message_is_mine: row.last_sender_id == user_id,
            last_message_at: row.last_message_at,
            unread_count: row.unread_count,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConversationQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ConversationQuery {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery::new(self.page, self.per_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claim::{assert_err, assert_ok};

    fn request(content: Option<&str>, attachment: Option<&str>) -> SendMessageRequest {
        SendMessageRequest {
            receiver_id: 2,
            content: content.map(String::from),
            attachment_url: attachment.map(String::from),
        }
    }

    #[test]
    fn content_is_trimmed() {
        let message = assert_ok!(NewMessage::parse(1, &request(Some("  hi there "), None)));
        assert_eq!(message.content, "hi there");
    }

    #[test]
    fn attachment_only_message_is_allowed() {
        let message = assert_ok!(NewMessage::parse(
            1,
            &request(None, Some("https://cdn.example.com/notes.pdf"))
        ));
        assert_eq!(message.content, "");
        assert!(message.attachment_url.is_some());
    }

    #[test]
    fn empty_message_is_rejected() {
        assert_err!(NewMessage::parse(1, &request(Some("   "), None)));
    }

    #[test]
    fn messaging_yourself_is_rejected() {
        assert_err!(NewMessage::parse(2, &request(Some("hello"), None)));
    }

    #[test]
    fn overlong_message_is_rejected() {
        let long = "x".repeat(MAX_MESSAGE_CHARS + 1);
        assert_err!(NewMessage::parse(1, &request(Some(&long), None)));
    }

    #[test]
    fn messages_expire_after_configured_days() {
        let created = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let expires = expiry_for(created, 30);
        assert_eq!(expires.date(), chrono::NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
    }
}
