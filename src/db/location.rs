use crate::core::AppError;
use crate::geo::{BoundingBox, Coordinates};
use crate::models::location::{AddressParts, NearbyCandidate};
use crate::models::users::Role;
use chrono::Utc;
use sqlx::{MySql, MySqlPool, QueryBuilder};

pub async fn update_user_location(
    pool: &MySqlPool,
    user_id: i32,
    coords: &Coordinates,
    address: &AddressParts,
) -> Result<(), AppError> {
    let now = Utc::now().naive_utc();

    sqlx::query(
        r#"
        UPDATE tbl_users
        SET latitude = ?, longitude = ?, address = ?, city = ?, state = ?, country = ?, postal_code = ?,
            location_updated_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(coords.latitude())
    .bind(coords.longitude())
    .bind(&address.address)
    .bind(&address.city)
    .bind(&address.state)
    .bind(&address.country)
    .bind(&address.postal_code)
    .bind(now)
    .bind(now)
    .bind(user_id)
    .execute(pool)
    .await
    .map_err(AppError::db_error)?;

    Ok(())
}

pub async fn clear_user_location(pool: &MySqlPool, user_id: i32) -> Result<(), AppError> {
    let now = Utc::now().naive_utc();

    sqlx::query(
        r#"
        UPDATE tbl_users
        SET latitude = NULL, longitude = NULL, address = NULL, city = NULL, state = NULL,
            country = NULL, postal_code = NULL, location_updated_at = NULL,
            live_sharing = 0, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(now)
    .bind(user_id)
    .execute(pool)
    .await
    .map_err(AppError::db_error)?;

    Ok(())
}

pub async fn set_live_sharing(pool: &MySqlPool, user_id: i32, enabled: bool) -> Result<(), AppError> {
    let now = Utc::now().naive_utc();

    sqlx::query("UPDATE tbl_users SET live_sharing = ?, updated_at = ? WHERE id = ?")
        .bind(enabled)
        .bind(now)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(AppError::db_error)?;

    Ok(())
}

/// Active users inside the bounding box, excluding `exclude_user_id`. Exact distance filtering happens in Rust.
pub async fn find_nearby_candidates(
    pool: &MySqlPool,
    bbox: &BoundingBox,
    exclude_user_id: i32,
    role: Option<Role>,
    live_only: bool,
) -> Result<Vec<NearbyCandidate>, AppError> {
    let mut builder: QueryBuilder<MySql> = QueryBuilder::new(
        r#"
        SELECT id, name, role, latitude, longitude, city, is_online, live_sharing, last_seen_at
        FROM tbl_users
        WHERE is_active = 1 AND latitude IS NOT NULL AND longitude IS NOT NULL
        "#,
    );

    builder
        .push(" AND id <> ")
        .push_bind(exclude_user_id)
        .push(" AND latitude BETWEEN ")
        .push_bind(bbox.min_lat)
        .push(" AND ")
        .push_bind(bbox.max_lat)
        .push(" AND longitude BETWEEN ")
        .push_bind(bbox.min_lng)
        .push(" AND ")
        .push_bind(bbox.max_lng);

    if let Some(role) = role {
        builder.push(" AND role = ").push_bind(role.as_str());
    }
    if live_only {
        builder.push(" AND live_sharing = 1");
    }

    builder
        .build_query_as::<NearbyCandidate>()
        .fetch_all(pool)
        .await
        .map_err(AppError::db_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_fixtures::{insert_user, place_user};
    use crate::db::users::set_user_active;

    fn box_around_bangalore() -> BoundingBox {
        BoundingBox::around(&Coordinates::new(12.9716, 77.5946).unwrap(), 10.0)
    }

    fn ids(candidates: &[NearbyCandidate]) -> Vec<i32> {
        let mut ids: Vec<i32> = candidates.iter().map(|c| c.id).collect();
        ids.sort_unstable();
        ids
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn candidates_skip_the_caller_inactive_and_unplaced_users(pool: MySqlPool) {
        let caller = insert_user(&pool, Role::Student).await;
        let teacher = insert_user(&pool, Role::Teacher).await;
        let inactive = insert_user(&pool, Role::Teacher).await;
        let far_away = insert_user(&pool, Role::Teacher).await;
        insert_user(&pool, Role::Teacher).await;

        place_user(&pool, caller, 12.9716, 77.5946).await;
        place_user(&pool, teacher, 12.9800, 77.6000).await;
        place_user(&pool, inactive, 12.9750, 77.5950).await;
        place_user(&pool, far_away, 28.6139, 77.2090).await;
        set_user_active(&pool, inactive, false).await.unwrap();

        let found = find_nearby_candidates(&pool, &box_around_bangalore(), caller, None, false)
            .await
            .unwrap();
        assert_eq!(ids(&found), vec![teacher]);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn role_and_live_only_narrow_the_candidates(pool: MySqlPool) {
        let caller = insert_user(&pool, Role::Teacher).await;
        let sharing = insert_user(&pool, Role::Student).await;
        let quiet = insert_user(&pool, Role::Student).await;
        let colleague = insert_user(&pool, Role::Teacher).await;

        for (user, lng) in [(caller, 77.5946), (sharing, 77.6), (quiet, 77.59), (colleague, 77.58)] {
            place_user(&pool, user, 12.97, lng).await;
        }
        set_live_sharing(&pool, sharing, true).await.unwrap();

        let bbox = box_around_bangalore();
        let students = find_nearby_candidates(&pool, &bbox, caller, Some(Role::Student), false)
            .await
            .unwrap();
        assert_eq!(ids(&students), vec![sharing, quiet]);

        let live = find_nearby_candidates(&pool, &bbox, caller, None, true).await.unwrap();
        assert_eq!(ids(&live), vec![sharing]);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn clearing_a_location_drops_out_of_nearby(pool: MySqlPool) {
        let caller = insert_user(&pool, Role::Student).await;
        let teacher = insert_user(&pool, Role::Teacher).await;
        place_user(&pool, teacher, 12.97, 77.59).await;
        set_live_sharing(&pool, teacher, true).await.unwrap();

        clear_user_location(&pool, teacher).await.unwrap();

        let found = find_nearby_candidates(&pool, &box_around_bangalore(), caller, None, false)
            .await
            .unwrap();
        assert!(found.is_empty());
        let stored = crate::db::users::get_user_by_id(&pool, teacher).await.unwrap();
        assert!(stored.latitude.is_none());
        assert!(!stored.live_sharing);
    }
}
