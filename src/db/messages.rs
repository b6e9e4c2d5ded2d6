use crate::core::AppError;
use crate::models::messages::{expiry_for, ConversationRow, ConversationSummary, Message, NewMessage};
use crate::models::pagination::PaginationQuery;
use chrono::Utc;
use sqlx::MySqlPool;

const MESSAGE_COLUMNS: &str =
    "id, sender_id, receiver_id, content, attachment_url, is_read, is_liked, read_at, created_at, expires_at";

pub async fn insert_message(
    pool: &MySqlPool,
    message: &NewMessage,
    expiry_days: i64,
) -> Result<Message, AppError> {
    let now = Utc::now().naive_utc();
    let expires_at = expiry_for(now, expiry_days);

    let result = sqlx::query(
        r#"
        INSERT INTO tbl_messages (sender_id, receiver_id, content, attachment_url, is_read, is_liked, created_at, expires_at)
        VALUES (?, ?, ?, ?, 0, 0, ?, ?)
        "#,
    )
    .bind(message.sender_id)
    .bind(message.receiver_id)
    .bind(&message.content)
    .bind(&message.attachment_url)
    .bind(now)
    .bind(expires_at)
    .execute(pool)
    .await
    .map_err(AppError::db_error)?;

    get_message(pool, result.last_insert_id() as i32)
        .await?
        .ok_or_else(|| AppError::internal_error("Message was not saved"))
}

/// Returns the message unless it has expired.
pub async fn get_message(pool: &MySqlPool, message_id: i32) -> Result<Option<Message>, AppError> {
    let query = format!(
        "SELECT {} FROM tbl_messages WHERE id = ? AND expires_at > ?",
        MESSAGE_COLUMNS
    );

    sqlx::query_as::<_, Message>(&query)
        .bind(message_id)
        .bind(Utc::now().naive_utc())
        .fetch_optional(pool)
        .await
        .map_err(AppError::db_error)
}

/// One page of the conversation, oldest first within the page; page 1 holds the newest messages.
pub async fn get_conversation(
    pool: &MySqlPool,
    user_id: i32,
    partner_id: i32,
    pagination: &PaginationQuery,
) -> Result<(Vec<Message>, i64), AppError> {
    let now = Utc::now().naive_utc();

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM tbl_messages
        WHERE ((sender_id = ? AND receiver_id = ?) OR (sender_id = ? AND receiver_id = ?))
          AND expires_at > ?
        "#,
    )
    .bind(user_id)
    .bind(partner_id)
    .bind(partner_id)
    .bind(user_id)
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(AppError::db_error)?;

    let query = format!(
        r#"
        SELECT {} FROM tbl_messages
        WHERE ((sender_id = ? AND receiver_id = ?) OR (sender_id = ? AND receiver_id = ?))
          AND expires_at > ?
        ORDER BY created_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
        MESSAGE_COLUMNS
    );

    let mut messages = sqlx::query_as::<_, Message>(&query)
        .bind(user_id)
        .bind(partner_id)
        .bind(partner_id)
        .bind(user_id)
        .bind(now)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(pool)
        .await
        .map_err(AppError::db_error)?;

    messages.reverse();
    Ok((messages, total))
}

/// Marks every unread message from `partner_id` to `user_id` as read.
pub async fn mark_conversation_read(
    pool: &MySqlPool,
    user_id: i32,
    partner_id: i32,
) -> Result<u64, AppError> {
    let now = Utc::now().naive_utc();

    let result = sqlx::query(
        r#"
        UPDATE tbl_messages
        SET is_read = 1, read_at = ?
        WHERE receiver_id = ? AND sender_id = ? AND is_read = 0 AND expires_at > ?
        "#,
    )
    .bind(now)
    .bind(user_id)
    .bind(partner_id)
    .bind(now)
    .execute(pool)
    .await
    .map_err(AppError::db_error)?;

    Ok(result.rows_affected())
}

pub async fn get_conversations(
    pool: &MySqlPool,
    user_id: i32,
) -> Result<Vec<ConversationSummary>, AppError> {
    let now = Utc::now().naive_utc();

    let rows = sqlx::query_as::<_, ConversationRow>(
        r#"
        SELECT c.partner_id, c.unread_count,
               u.name AS partner_name, u.role AS partner_role,
               u.is_online AS partner_online, u.last_seen_at AS partner_last_seen_at,
               m.id AS last_message_id, m.content AS last_message,
               m.attachment_url AS last_attachment_url, m.sender_id AS last_sender_id,
               m.created_at AS last_message_at
        FROM (
            SELECT CAST(CASE WHEN sender_id = ? THEN receiver_id ELSE sender_id END AS SIGNED) AS partner_id,
                   MAX(id) AS last_id,
                   CAST(COUNT(CASE WHEN receiver_id = ? AND is_read = 0 THEN 1 END) AS SIGNED) AS unread_count
            FROM tbl_messages
            WHERE (sender_id = ? OR receiver_id = ?) AND expires_at > ?
            GROUP BY partner_id
        ) c
        JOIN tbl_messages m ON m.id = c.last_id
        JOIN tbl_users u ON u.id = c.partner_id
        ORDER BY m.created_at DESC, m.id DESC
        "#,
    )
    .bind(user_id)
    .bind(user_id)
    .bind(user_id)
    .bind(user_id)
    .bind(now)
    .fetch_all(pool)
    .await
    .map_err(AppError::db_error)?;

    Ok(rows
        .into_iter()
        .map(|row| ConversationSummary::from_row(row, user_id))
        .collect())
}

pub async fn get_unread_count(pool: &MySqlPool, user_id: i32) -> Result<i64, AppError> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM tbl_messages WHERE receiver_id = ? AND is_read = 0 AND expires_at > ?",
    )
    .bind(user_id)
    .bind(Utc::now().naive_utc())
    .fetch_one(pool)
    .await
    .map_err(AppError::db_error)
}

pub async fn toggle_like(pool: &MySqlPool, message_id: i32, user_id: i32) -> Result<Message, AppError> {
    let message = get_message(pool, message_id)
        .await?
        .ok_or_else(|| AppError::not_found("Message not found"))?;

    if message.receiver_id != user_id {
        return Err(AppError::forbidden_error(
            "Only the receiver can like a message",
        ));
    }

    sqlx::query("UPDATE tbl_messages SET is_liked = NOT is_liked WHERE id = ?")
        .bind(message_id)
        .execute(pool)
        .await
        .map_err(AppError::db_error)?;

    get_message(pool, message_id)
        .await?
        .ok_or_else(|| AppError::not_found("Message not found"))
}

pub async fn delete_message(pool: &MySqlPool, message_id: i32, user_id: i32) -> Result<(), AppError> {
    let message = get_message(pool, message_id)
        .await?
        .ok_or_else(|| AppError::not_found("Message not found"))?;

    if message.sender_id != user_id {
        return Err(AppError::forbidden_error(
            "Only the sender can delete a message",
        ));
    }

    sqlx::query("DELETE FROM tbl_messages WHERE id = ?")
        .bind(message_id)
        .execute(pool)
        .await
        .map_err(AppError::db_error)?;

    Ok(())
}

pub async fn purge_expired_messages(pool: &MySqlPool) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM tbl_messages WHERE expires_at <= ?")
        .bind(Utc::now().naive_utc())
        .execute(pool)
        .await
        .map_err(AppError::db_error)?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_fixtures::{backdate, expire, insert_user, send};
    use crate::models::users::Role;
    use claim::{assert_none, assert_some};

    #[sqlx::test(migrations = "./migrations")]
    async fn expired_messages_are_never_returned(pool: MySqlPool) {
        let student = insert_user(&pool, Role::Student).await;
        let teacher = insert_user(&pool, Role::Teacher).await;

        let live = send(&pool, teacher, student, "See you at 5").await;
        let stale = send(&pool, teacher, student, "Old news").await;
        expire(&pool, stale.id).await;

        assert_some!(get_message(&pool, live.id).await.unwrap());
        assert_none!(get_message(&pool, stale.id).await.unwrap());

        let (page, total) = get_conversation(&pool, student, teacher, &PaginationQuery::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(page.iter().map(|m| m.id).collect::<Vec<_>>(), vec![live.id]);

        assert_eq!(get_unread_count(&pool, student).await.unwrap(), 1);

        assert_eq!(purge_expired_messages(&pool).await.unwrap(), 1);
        assert_eq!(purge_expired_messages(&pool).await.unwrap(), 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn conversation_pages_take_the_newest_and_read_oldest_first(pool: MySqlPool) {
        let student = insert_user(&pool, Role::Student).await;
        let teacher = insert_user(&pool, Role::Teacher).await;

        let mut ids = Vec::new();
        for (minutes_ago, content) in [(40, "one"), (30, "two"), (20, "three"), (10, "four")] {
            let message = send(&pool, teacher, student, content).await;
            backdate(&pool, message.id, minutes_ago).await;
            ids.push(message.id);
        }

        let first_page = PaginationQuery::new(Some(1), Some(3));
        let (page, total) = get_conversation(&pool, student, teacher, &first_page).await.unwrap();
        assert_eq!(total, 4);
        assert_eq!(
            page.iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![ids[1], ids[2], ids[3]]
        );

        let second_page = PaginationQuery::new(Some(2), Some(3));
        let (page, _) = get_conversation(&pool, student, teacher, &second_page).await.unwrap();
        assert_eq!(page.iter().map(|m| m.id).collect::<Vec<_>>(), vec![ids[0]]);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn marking_read_only_touches_incoming_messages(pool: MySqlPool) {
        let student = insert_user(&pool, Role::Student).await;
        let teacher = insert_user(&pool, Role::Teacher).await;

        send(&pool, teacher, student, "Homework is ready").await;
        send(&pool, teacher, student, "Page 42").await;
        send(&pool, student, teacher, "Thanks").await;

        assert_eq!(mark_conversation_read(&pool, student, teacher).await.unwrap(), 2);
        assert_eq!(get_unread_count(&pool, student).await.unwrap(), 0);
        assert_eq!(get_unread_count(&pool, teacher).await.unwrap(), 1);
        assert_eq!(mark_conversation_read(&pool, student, teacher).await.unwrap(), 0);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn conversations_list_newest_first_with_unread_counts(pool: MySqlPool) {
        let student = insert_user(&pool, Role::Student).await;
        let maths = insert_user(&pool, Role::Teacher).await;
        let physics = insert_user(&pool, Role::Teacher).await;

        let first = send(&pool, maths, student, "Algebra at 4?").await;
        backdate(&pool, first.id, 30).await;
        let second = send(&pool, maths, student, "Or 5?").await;
        backdate(&pool, second.id, 25).await;
        let reply = send(&pool, student, physics, "Can you teach optics?").await;
        backdate(&pool, reply.id, 5).await;

        let conversations = get_conversations(&pool, student).await.unwrap();

        assert_eq!(conversations.len(), 2);
        assert_eq!(conversations[0].partner_id, physics);
        assert_eq!(conversations[0].unread_count, 0);
        assert!(conversations[0].last_message_is_mine);
        assert_eq!(conversations[1].partner_id, maths);
        assert_eq!(conversations[1].unread_count, 2);
        assert_eq!(conversations[1].last_message_id, second.id);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn only_the_receiver_likes_and_only_the_sender_deletes(pool: MySqlPool) {
        let student = insert_user(&pool, Role::Student).await;
        let teacher = insert_user(&pool, Role::Teacher).await;
        let message = send(&pool, teacher, student, "Great progress").await;

        let err = toggle_like(&pool, message.id, teacher).await.unwrap_err();
        assert_eq!(err.error_type, crate::core::AppErrorType::ForbiddenError);
        assert!(toggle_like(&pool, message.id, student).await.unwrap().is_liked);
        assert!(!toggle_like(&pool, message.id, student).await.unwrap().is_liked);

        let err = delete_message(&pool, message.id, student).await.unwrap_err();
        assert_eq!(err.error_type, crate::core::AppErrorType::ForbiddenError);
        delete_message(&pool, message.id, teacher).await.unwrap();
        assert_none!(get_message(&pool, message.id).await.unwrap());
    }
}
