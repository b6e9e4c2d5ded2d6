use crate::core::AppError;
use crate::models::common::clean_optional;
use crate::models::requests::{CreateUserRequest, RequestStatus, UserRequest, UserRequestView};
use chrono::Utc;
use sqlx::{MySqlExecutor, MySqlPool};

const REQUEST_COLUMNS: &str =
    "id, sender_id, receiver_id, requirement_id, message, status, created_at, updated_at, responded_at";

pub async fn pending_request_exists<'e, E>(
    executor: E,
    user_a: i32,
    user_b: i32,
) -> Result<bool, AppError>
where
    E: MySqlExecutor<'e>,
{
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM tbl_user_requests
        WHERE status = 'pending'
          AND ((sender_id = ? AND receiver_id = ?) OR (sender_id = ? AND receiver_id = ?))
        "#,
    )
    .bind(user_a)
    .bind(user_b)
    .bind(user_b)
    .bind(user_a)
    .fetch_one(executor)
    .await
    .map_err(AppError::db_error)?;

    Ok(count > 0)
}

/// Inserts a pending request unless the pair already has one.
/// Both user rows are locked in id order first, so concurrent sends between
/// the same two users (in either direction) are serialised.
pub async fn create_request(
    pool: &MySqlPool,
    sender_id: i32,
    request: &CreateUserRequest,
) -> Result<UserRequest, AppError> {
    let mut transaction = pool.begin().await.map_err(AppError::db_error)?;

    sqlx::query("SELECT id FROM tbl_users WHERE id IN (?, ?) ORDER BY id FOR UPDATE")
        .bind(sender_id)
        .bind(request.receiver_id)
        .fetch_all(&mut *transaction)
        .await
        .map_err(AppError::db_error)?;

    if pending_request_exists(&mut *transaction, sender_id, request.receiver_id).await? {
        return Err(AppError::conflict(
            "A pending request already exists between you and this user",
        ));
    }

    let now = Utc::now().naive_utc();
    let result = sqlx::query(
        r#"
        INSERT INTO tbl_user_requests (sender_id, receiver_id, requirement_id, message, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(sender_id)
    .bind(request.receiver_id)
    .bind(request.requirement_id)
    .bind(clean_optional(&request.message))
    .bind(RequestStatus::Pending.as_str())
    .bind(now)
    .bind(now)
    .execute(&mut *transaction)
    .await
    .map_err(AppError::db_error)?;

    transaction.commit().await.map_err(AppError::db_error)?;

    get_request(pool, result.last_insert_id() as i32).await
}

pub async fn get_request(pool: &MySqlPool, request_id: i32) -> Result<UserRequest, AppError> {
    let query = format!("SELECT {} FROM tbl_user_requests WHERE id = ?", REQUEST_COLUMNS);

    sqlx::query_as::<_, UserRequest>(&query)
        .bind(request_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::db_error)?
        .ok_or_else(|| AppError::not_found("Request not found"))
}

#[derive(Debug, Clone, Copy)]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// Requests received (incoming) or sent (outgoing) by `user_id`, newest first.
pub async fn list_requests(
    pool: &MySqlPool,
    user_id: i32,
    direction: Direction,
    status: Option<RequestStatus>,
) -> Result<Vec<UserRequestView>, AppError> {
    let (owner_column, counterpart_column) = match direction {
        Direction::Incoming => ("receiver_id", "sender_id"),
        Direction::Outgoing => ("sender_id", "receiver_id"),
    };

    let query = format!(
        r#"
        SELECT ur.id, ur.sender_id, ur.receiver_id, u.name AS counterpart_name, u.role AS counterpart_role,
               ur.requirement_id, r.title AS requirement_title, ur.message, ur.status,
               ur.created_at, ur.responded_at
        FROM tbl_user_requests ur
        JOIN tbl_users u ON u.id = ur.{counterpart}
        LEFT JOIN tbl_requirements r ON r.id = ur.requirement_id
        WHERE ur.{owner} = ? AND (? IS NULL OR ur.status = ?)
        ORDER BY ur.created_at DESC, ur.id DESC
        "#,
        counterpart = counterpart_column,
        owner = owner_column
    );

    let status = status.map(|s| s.as_str());
    sqlx::query_as::<_, UserRequestView>(&query)
        .bind(user_id)
        .bind(status)
        .bind(status)
        .fetch_all(pool)
        .await
        .map_err(AppError::db_error)
}

pub async fn update_request_status(
    pool: &MySqlPool,
    request_id: i32,
    status: RequestStatus,
) -> Result<UserRequest, AppError> {
    let now = Utc::now().naive_utc();
    let responded_at = matches!(status, RequestStatus::Accepted | RequestStatus::Rejected).then_some(now);

    // Guarded on `pending` so two concurrent answers cannot both win.
    let result = sqlx::query(
        r#"
        UPDATE tbl_user_requests
        SET status = ?, responded_at = COALESCE(?, responded_at), updated_at = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(status.as_str())
    .bind(responded_at)
    .bind(now)
    .bind(request_id)
    .execute(pool)
    .await
    .map_err(AppError::db_error)?;

    if result.rows_affected() == 0 {
        return Err(AppError::conflict("This request is no longer pending"));
    }
    get_request(pool, request_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AppErrorType;
    use crate::db::test_fixtures::insert_user;
    use crate::models::users::Role;

    fn request_to(receiver_id: i32) -> CreateUserRequest {
        CreateUserRequest {
            receiver_id,
            requirement_id: None,
            message: Some("Could you help with calculus?".to_string()),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn one_pending_request_per_pair_in_either_direction(pool: MySqlPool) {
        let student = insert_user(&pool, Role::Student).await;
        let teacher = insert_user(&pool, Role::Teacher).await;

        let created = create_request(&pool, student, &request_to(teacher)).await.unwrap();
        assert_eq!(created.status, "pending");

        let again = create_request(&pool, student, &request_to(teacher)).await.unwrap_err();
        assert_eq!(again.error_type, AppErrorType::ConflictError);
        let reverse = create_request(&pool, teacher, &request_to(student)).await.unwrap_err();
        assert_eq!(reverse.error_type, AppErrorType::ConflictError);

        update_request_status(&pool, created.id, RequestStatus::Rejected).await.unwrap();
        assert!(!pending_request_exists(&pool, student, teacher).await.unwrap());
        create_request(&pool, teacher, &request_to(student)).await.unwrap();
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn concurrent_sends_leave_a_single_pending_request(pool: MySqlPool) {
        let student = insert_user(&pool, Role::Student).await;
        let teacher = insert_user(&pool, Role::Teacher).await;

        let forward_request = request_to(teacher);
        let reverse_request = request_to(student);
        let (forward, reverse) = tokio::join!(
            create_request(&pool, student, &forward_request),
            create_request(&pool, teacher, &reverse_request),
        );
        assert_eq!(forward.is_ok() as u8 + reverse.is_ok() as u8, 1);

        let pending: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM tbl_user_requests WHERE status = 'pending'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(pending, 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn answered_requests_cannot_change_again(pool: MySqlPool) {
        let student = insert_user(&pool, Role::Student).await;
        let teacher = insert_user(&pool, Role::Teacher).await;
        let created = create_request(&pool, student, &request_to(teacher)).await.unwrap();

        let accepted = update_request_status(&pool, created.id, RequestStatus::Accepted)
            .await
            .unwrap();
        assert_eq!(accepted.status, "accepted");
        assert!(accepted.responded_at.is_some());

        for status in [RequestStatus::Rejected, RequestStatus::Cancelled] {
            let err = update_request_status(&pool, created.id, status).await.unwrap_err();
            assert_eq!(err.error_type, AppErrorType::ConflictError);
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn listings_are_split_by_direction_and_status(pool: MySqlPool) {
        let student = insert_user(&pool, Role::Student).await;
        let maths = insert_user(&pool, Role::Teacher).await;
        let physics = insert_user(&pool, Role::Teacher).await;

        create_request(&pool, student, &request_to(maths)).await.unwrap();
        let cancelled = create_request(&pool, student, &request_to(physics)).await.unwrap();
        update_request_status(&pool, cancelled.id, RequestStatus::Cancelled).await.unwrap();

        let outgoing = list_requests(&pool, student, Direction::Outgoing, None).await.unwrap();
        assert_eq!(outgoing.len(), 2);
        let pending = list_requests(&pool, student, Direction::Outgoing, Some(RequestStatus::Pending))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].receiver_id, maths);

        assert_eq!(list_requests(&pool, maths, Direction::Incoming, None).await.unwrap().len(), 1);
        assert!(list_requests(&pool, student, Direction::Incoming, None).await.unwrap().is_empty());
    }
}
