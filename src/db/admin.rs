use crate::core::AppError;
use crate::models::admin::{AdminStats, AdminUserQuery, AdminUserRow};
use crate::models::pagination::PaginationQuery;
use chrono::Utc;
use sqlx::{MySql, MySqlPool, QueryBuilder};

pub async fn get_stats(pool: &MySqlPool) -> Result<AdminStats, AppError> {
    sqlx::query_as::<_, AdminStats>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM tbl_users WHERE role = 'student') AS total_students,
            (SELECT COUNT(*) FROM tbl_users WHERE role = 'teacher') AS total_teachers,
            (SELECT COUNT(*) FROM tbl_users WHERE role = 'admin') AS total_admins,
            (SELECT COUNT(*) FROM tbl_users WHERE is_active = 1) AS active_users,
            (SELECT COUNT(*) FROM tbl_users WHERE is_online = 1) AS online_users,
            (SELECT COUNT(*) FROM tbl_users WHERE live_sharing = 1) AS live_sharing_users,
            (SELECT COUNT(*) FROM tbl_requirements WHERE status = 'open') AS open_requirements,
            (SELECT COUNT(*) FROM tbl_messages WHERE expires_at > ?) AS active_messages,
            (SELECT COUNT(*) FROM tbl_user_requests WHERE status = 'pending') AS pending_requests,
            (SELECT COUNT(*) FROM tbl_teacher_profiles WHERE kyc_status = 'pending') AS pending_kyc
        "#,
    )
    .bind(Utc::now().naive_utc())
    .fetch_one(pool)
    .await
    .map_err(AppError::db_error)
}

fn push_user_filters(builder: &mut QueryBuilder<'_, MySql>, query: &AdminUserQuery) {
    builder.push(" WHERE 1 = 1");

    if let Some(role) = query.role {
        builder.push(" AND role = ").push_bind(role.as_str());
    }
    if let Some(is_active) = query.is_active {
        builder.push(" AND is_active = ").push_bind(is_active);
    }
    if let Some(pattern) = query.search_pattern() {
        builder
            .push(" AND (name LIKE ")
            .push_bind(pattern.clone())
            .push(" OR email LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub async fn list_users(
    pool: &MySqlPool,
    query: &AdminUserQuery,
    pagination: &PaginationQuery,
) -> Result<(Vec<AdminUserRow>, i64), AppError> {
    let mut count_builder: QueryBuilder<MySql> = QueryBuilder::new("SELECT COUNT(*) FROM tbl_users");
    push_user_filters(&mut count_builder, query);
    let total: i64 = count_builder
        .build_query_scalar()
        .fetch_one(pool)
        .await
        .map_err(AppError::db_error)?;

    let mut data_builder: QueryBuilder<MySql> = QueryBuilder::new(
        r#"
        SELECT id, name, email, phone, role, is_active, is_online, live_sharing, city, last_seen_at, created_at
        FROM tbl_users
        "#,
    );
    push_user_filters(&mut data_builder, query);
    data_builder
        .push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(pagination.limit())
        .push(" OFFSET ")
        .push_bind(pagination.offset());

    let users = data_builder
        .build_query_as::<AdminUserRow>()
        .fetch_all(pool)
        .await
        .map_err(AppError::db_error)?;

    Ok((users, total))
}
