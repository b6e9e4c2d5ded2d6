use crate::core::AppError;
use crate::models::users::{AccountAccess, RegisterRequest, Role, UpdateProfileRequest, User};
use chrono::Utc;
use sqlx::MySqlPool;

pub(crate) const USER_COLUMNS: &str = r#"
    id, name, email, phone, password, role, is_active,
    latitude, longitude, address, city, state, country, postal_code, location_updated_at,
    is_online, live_sharing, last_seen_at, created_at, updated_at
"#;

pub async fn create_user(
    pool: &MySqlPool,
    request: &RegisterRequest,
    password_hash: &str,
) -> Result<User, AppError> {
    let now = Utc::now().naive_utc();
    let phone = crate::models::common::clean_optional(&request.phone);

    let result = sqlx::query(
        r#"
        INSERT INTO tbl_users (name, email, phone, password, role, is_active, is_online, live_sharing, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, 1, 0, 0, ?, ?)
        "#,
    )
    .bind(request.name.trim())
    .bind(request.email.trim().to_lowercase())
    .bind(phone)
    .bind(password_hash)
    .bind(request.role.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| {
        let duplicate = e
            .as_database_error()
            .map(|db_error| db_error.is_unique_violation())
            .unwrap_or(false);
        if duplicate {
            AppError::conflict("An account with this email already exists")
        } else {
            AppError::db_error(e)
        }
    })?;

    let user_id = result.last_insert_id() as i32;

    get_user_by_id(pool, user_id).await
}

/// Looks up a user by email regardless of `is_active`; callers decide what an inactive account means.
pub async fn find_user_by_email(pool: &MySqlPool, email: &str) -> Result<Option<User>, AppError> {
    let query = format!("SELECT {} FROM tbl_users WHERE email = ?", USER_COLUMNS);

    sqlx::query_as::<_, User>(&query)
        .bind(email.trim().to_lowercase())
        .fetch_optional(pool)
        .await
        .map_err(AppError::db_error)
}

pub async fn get_user_by_id(pool: &MySqlPool, user_id: i32) -> Result<User, AppError> {
    let query = format!("SELECT {} FROM tbl_users WHERE id = ?", USER_COLUMNS);

    sqlx::query_as::<_, User>(&query)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::db_error)?
        .ok_or_else(|| AppError::not_found("User not found"))
}

pub async fn get_active_user(pool: &MySqlPool, user_id: i32) -> Result<User, AppError> {
    let user = get_user_by_id(pool, user_id).await?;
    if !user.is_active {
        return Err(AppError::not_found("User not found"));
    }
    Ok(user)
}

pub async fn is_active_user(pool: &MySqlPool, user_id: i32) -> Result<bool, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tbl_users WHERE id = ? AND is_active = 1")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .map_err(AppError::db_error)?;

    Ok(count > 0)
}

pub async fn get_account_access(
    pool: &MySqlPool,
    user_id: i32,
) -> Result<Option<AccountAccess>, AppError> {
    sqlx::query_as::<_, AccountAccess>("SELECT role, is_active FROM tbl_users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::db_error)
}

pub async fn email_exists(pool: &MySqlPool, email: &str) -> Result<bool, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tbl_users WHERE email = ?")
        .bind(email.trim().to_lowercase())
        .fetch_one(pool)
        .await
        .map_err(AppError::db_error)?;

    Ok(count > 0)
}

pub async fn update_user_profile(
    pool: &MySqlPool,
    user_id: i32,
    request: &UpdateProfileRequest,
) -> Result<User, AppError> {
    let now = Utc::now().naive_utc();
    let current_user = get_active_user(pool, user_id).await?;

    let name = request
        .name
        .as_deref()
        .map(str::trim)
        .unwrap_or(&current_user.name);
    let phone = match &request.phone {
        Some(_) => crate::models::common::clean_optional(&request.phone),
        None => current_user.phone.clone(),
    };

    sqlx::query("UPDATE tbl_users SET name = ?, phone = ?, updated_at = ? WHERE id = ?")
        .bind(name)
        .bind(phone)
        .bind(now)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(AppError::db_error)?;

    get_user_by_id(pool, user_id).await
}

pub async fn change_user_password(
    pool: &MySqlPool,
    user_id: i32,
    password_hash: &str,
) -> Result<(), AppError> {
    let now = Utc::now().naive_utc();

    sqlx::query("UPDATE tbl_users SET password = ?, updated_at = ? WHERE id = ?")
        .bind(password_hash)
        .bind(now)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(AppError::db_error)?;

    Ok(())
}

pub async fn deactivate_user(pool: &MySqlPool, user_id: i32) -> Result<(), AppError> {
    set_user_active(pool, user_id, false).await
}

pub async fn set_user_active(pool: &MySqlPool, user_id: i32, is_active: bool) -> Result<(), AppError> {
    let now = Utc::now().naive_utc();

    // A deactivated account also drops out of presence and live sharing.
    let result = sqlx::query(
        r#"
        UPDATE tbl_users
        SET is_active = ?,
            is_online = IF(?, is_online, 0),
            live_sharing = IF(?, live_sharing, 0),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(is_active)
    .bind(is_active)
    .bind(is_active)
    .bind(now)
    .bind(user_id)
    .execute(pool)
    .await
    .map_err(AppError::db_error)?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("User not found"));
    }
    Ok(())
}

pub async fn set_user_role(pool: &MySqlPool, user_id: i32, role: Role) -> Result<User, AppError> {
    let now = Utc::now().naive_utc();

    let result = sqlx::query("UPDATE tbl_users SET role = ?, updated_at = ? WHERE id = ?")
        .bind(role.as_str())
        .bind(now)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(AppError::db_error)?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("User not found"));
    }
    get_user_by_id(pool, user_id).await
}

/// Presence flag driven by the chat hub. Only going offline stamps `last_seen_at`.
pub async fn set_online_status(pool: &MySqlPool, user_id: i32, is_online: bool) -> Result<(), AppError> {
    let now = Utc::now().naive_utc();

    sqlx::query(
        r#"
        UPDATE tbl_users
        SET is_online = ?, last_seen_at = IF(?, last_seen_at, ?)
        WHERE id = ?
        "#,
    )
    .bind(is_online)
    .bind(is_online)
    .bind(now)
    .bind(user_id)
    .execute(pool)
    .await
    .map_err(AppError::db_error)?;

    Ok(())
}

/// Clears stale presence left behind by a previous process.
pub async fn reset_online_flags(pool: &MySqlPool) -> Result<u64, AppError> {
    let result = sqlx::query("UPDATE tbl_users SET is_online = 0 WHERE is_online = 1")
        .execute(pool)
        .await
        .map_err(AppError::db_error)?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_fixtures::insert_user;
    use claim::{assert_none, assert_some};

    #[sqlx::test(migrations = "./migrations")]
    async fn account_access_reflects_role_and_status_changes(pool: MySqlPool) {
        let user_id = insert_user(&pool, Role::Admin).await;

        let access = get_account_access(&pool, user_id).await.unwrap().unwrap();
        assert_eq!(access.role, "admin");
        assert!(access.is_active);

        set_user_role(&pool, user_id, Role::Teacher).await.unwrap();
        deactivate_user(&pool, user_id).await.unwrap();

        let access = get_account_access(&pool, user_id).await.unwrap().unwrap();
        assert_eq!(access.role, "teacher");
        assert!(!access.is_active);
        assert_none!(get_account_access(&pool, user_id + 1000).await.unwrap());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn only_going_offline_stamps_last_seen(pool: MySqlPool) {
        let user_id = insert_user(&pool, Role::Student).await;

        set_online_status(&pool, user_id, true).await.unwrap();
        let user = get_user_by_id(&pool, user_id).await.unwrap();
        assert!(user.is_online);
        assert_none!(user.last_seen_at);

        set_online_status(&pool, user_id, false).await.unwrap();
        let user = get_user_by_id(&pool, user_id).await.unwrap();
        assert!(!user.is_online);
        let seen = assert_some!(user.last_seen_at);

        set_online_status(&pool, user_id, true).await.unwrap();
        let user = get_user_by_id(&pool, user_id).await.unwrap();
        assert_eq!(user.last_seen_at, Some(seen));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn deactivation_clears_presence_and_live_sharing(pool: MySqlPool) {
        let user_id = insert_user(&pool, Role::Teacher).await;
        set_online_status(&pool, user_id, true).await.unwrap();
        crate::db::location::set_live_sharing(&pool, user_id, true).await.unwrap();

        deactivate_user(&pool, user_id).await.unwrap();

        let user = get_user_by_id(&pool, user_id).await.unwrap();
        assert!(!user.is_active);
        assert!(!user.is_online);
        assert!(!user.live_sharing);
        assert!(!is_active_user(&pool, user_id).await.unwrap());
    }
}
