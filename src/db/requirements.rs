use crate::core::AppError;
use crate::geo::{haversine_km, round_km, BoundingBox, Coordinates};
use crate::models::common::{clean_optional, contains_pattern, normalize_tags};
use crate::models::pagination::PaginationQuery;
use crate::models::requirements::{
    CreateRequirementRequest, Requirement, RequirementQuery, RequirementRow, RequirementStatus,
    UpdateRequirementRequest,
};
use chrono::Utc;
use sqlx::types::Json;
use sqlx::{MySql, MySqlPool, QueryBuilder};
use std::cmp::Ordering;

const REQUIREMENT_SELECT: &str = r#"
    SELECT r.id, r.user_id, u.name AS owner_name, r.title, r.description, r.requirement_type,
           r.subjects, r.classes, r.mode, r.latitude, r.longitude, r.address, r.city,
           r.fee, r.fee_period, r.status, r.created_at, r.updated_at
    FROM tbl_requirements r
    JOIN tbl_users u ON u.id = r.user_id
"#;

/// Geographic filter for requirement listings.
#[derive(Debug, Clone, Copy)]
pub struct NearFilter {
    pub origin: Coordinates,
    pub radius_km: f64,
}

pub async fn create_requirement(
    pool: &MySqlPool,
    user_id: i32,
    request: &CreateRequirementRequest,
    coords: Option<Coordinates>,
) -> Result<Requirement, AppError> {
    let now = Utc::now().naive_utc();
    let subjects = normalize_tags(&request.subjects);
    if subjects.is_empty() {
        return Err(AppError::validation("At least one subject is required"));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO tbl_requirements
            (user_id, title, description, requirement_type, subjects, classes, mode,
             latitude, longitude, address, city, fee, fee_period, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'open', ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(request.title.trim())
    .bind(request.description.trim())
    .bind(request.requirement_type.as_str())
    .bind(Json(subjects))
    .bind(Json(normalize_tags(&request.classes)))
    .bind(request.mode.as_str())
    .bind(coords.map(|c| c.latitude()))
    .bind(coords.map(|c| c.longitude()))
    .bind(clean_optional(&request.address))
    .bind(clean_optional(&request.city))
    .bind(request.fee.clone())
    .bind(request.fee_period.map(|p| p.as_str()))
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(AppError::db_error)?;

    get_requirement(pool, result.last_insert_id() as i32).await
}

pub async fn get_requirement(pool: &MySqlPool, requirement_id: i32) -> Result<Requirement, AppError> {
    let query = format!("{} WHERE r.id = ?", REQUIREMENT_SELECT);

    let row = sqlx::query_as::<_, RequirementRow>(&query)
        .bind(requirement_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::db_error)?
        .ok_or_else(|| AppError::not_found("Requirement not found"))?;

    Ok(Requirement::from(row))
}

pub async fn get_user_requirements(
    pool: &MySqlPool,
    user_id: i32,
) -> Result<Vec<Requirement>, AppError> {
    let query = format!(
        "{} WHERE r.user_id = ? ORDER BY r.created_at DESC, r.id DESC",
        REQUIREMENT_SELECT
    );

    let rows = sqlx::query_as::<_, RequirementRow>(&query)
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::db_error)?;

    Ok(rows.into_iter().map(Requirement::from).collect())
}

fn push_requirement_filters(
    builder: &mut QueryBuilder<'_, MySql>,
    query: &RequirementQuery,
    near: Option<&NearFilter>,
) {
    let status = query.status.unwrap_or(RequirementStatus::Open);
    builder
        .push(" WHERE u.is_active = 1 AND r.status = ")
        .push_bind(status.as_str());

    if let Some(requirement_type) = query.requirement_type {
        builder
            .push(" AND r.requirement_type = ")
            .push_bind(requirement_type.as_str());
    }
    if let Some(subject) = clean_optional(&query.subject) {
        builder
            .push(" AND LOWER(CAST(r.subjects AS CHAR)) LIKE ")
            .push_bind(contains_pattern(&subject.to_lowercase()));
    }
    if let Some(class_level) = clean_optional(&query.class_level) {
        builder
            .push(" AND LOWER(CAST(r.classes AS CHAR)) LIKE ")
            .push_bind(contains_pattern(&class_level.to_lowercase()));
    }
    if let Some(city) = clean_optional(&query.city) {
        builder.push(" AND r.city = ").push_bind(city);
    }
    if let Some(near) = near {
        let bbox = BoundingBox::around(&near.origin, near.radius_km);
        builder
            .push(" AND r.latitude BETWEEN ")
            .push_bind(bbox.min_lat)
            .push(" AND ")
            .push_bind(bbox.max_lat)
            .push(" AND r.longitude BETWEEN ")
            .push_bind(bbox.min_lng)
            .push(" AND ")
            .push_bind(bbox.max_lng);
    }
}

/// Lists requirements newest first, or nearest first when a near filter is given.
pub async fn list_requirements(
    pool: &MySqlPool,
    query: &RequirementQuery,
    near: Option<NearFilter>,
    pagination: &PaginationQuery,
) -> Result<(Vec<Requirement>, i64), AppError> {
    match near {
        Some(near) => list_requirements_near(pool, query, &near, pagination).await,
        None => {
            let mut count_builder: QueryBuilder<MySql> = QueryBuilder::new(
                "SELECT COUNT(*) FROM tbl_requirements r JOIN tbl_users u ON u.id = r.user_id",
            );
            push_requirement_filters(&mut count_builder, query, None);
            let total: i64 = count_builder
                .build_query_scalar()
                .fetch_one(pool)
                .await
                .map_err(AppError::db_error)?;

            let mut data_builder: QueryBuilder<MySql> = QueryBuilder::new(REQUIREMENT_SELECT);
            push_requirement_filters(&mut data_builder, query, None);
            data_builder
                .push(" ORDER BY r.created_at DESC, r.id DESC LIMIT ")
                .push_bind(pagination.limit())
                .push(" OFFSET ")
                .push_bind(pagination.offset());

            let rows = data_builder
                .build_query_as::<RequirementRow>()
                .fetch_all(pool)
                .await
                .map_err(AppError::db_error)?;

            Ok((rows.into_iter().map(Requirement::from).collect(), total))
        }
    }
}

async fn list_requirements_near(
    pool: &MySqlPool,
    query: &RequirementQuery,
    near: &NearFilter,
    pagination: &PaginationQuery,
) -> Result<(Vec<Requirement>, i64), AppError> {
    let mut builder: QueryBuilder<MySql> = QueryBuilder::new(REQUIREMENT_SELECT);
    push_requirement_filters(&mut builder, query, Some(near));

    let rows = builder
        .build_query_as::<RequirementRow>()
        .fetch_all(pool)
        .await
        .map_err(AppError::db_error)?;

    let ranked = rank_by_distance(rows, near);
    let total = ranked.len() as i64;

    Ok((pagination.slice(ranked), total))
}

fn rank_by_distance(rows: Vec<RequirementRow>, near: &NearFilter) -> Vec<Requirement> {
    let mut within: Vec<(f64, RequirementRow)> = rows
        .into_iter()
        .filter_map(|row| {
            let distance = haversine_km(&near.origin, &row.coordinates()?);
            (distance <= near.radius_km).then_some((distance, row))
        })
        .collect();

    within.sort_by(|(da, a), (db, b)| {
        da.partial_cmp(db)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });

    within
        .into_iter()
        .map(|(distance, row)| {
            let mut requirement = Requirement::from(row);
            requirement.distance_km = Some(round_km(distance));
            requirement
        })
        .collect()
}

pub async fn update_requirement(
    pool: &MySqlPool,
    requirement_id: i32,
    request: &UpdateRequirementRequest,
    coords: Option<Coordinates>,
) -> Result<Requirement, AppError> {
    let now = Utc::now().naive_utc();

    let subjects = match &request.subjects {
        Some(subjects) => {
            let subjects = normalize_tags(subjects);
            if subjects.is_empty() {
                return Err(AppError::validation("At least one subject is required"));
            }
            Some(Json(subjects))
        }
        None => None,
    };
    let classes = request.classes.as_deref().map(|c| Json(normalize_tags(c)));

    sqlx::query(
        r#"
        UPDATE tbl_requirements
        SET title = COALESCE(?, title),
            description = COALESCE(?, description),
            subjects = COALESCE(?, subjects),
            classes = COALESCE(?, classes),
            mode = COALESCE(?, mode),
            latitude = COALESCE(?, latitude),
            longitude = COALESCE(?, longitude),
            address = COALESCE(?, address),
            city = COALESCE(?, city),
            fee = COALESCE(?, fee),
            fee_period = COALESCE(?, fee_period),
            status = COALESCE(?, status),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(request.title.as_deref().map(str::trim))
    .bind(request.description.as_deref().map(str::trim))
    .bind(subjects)
    .bind(classes)
    .bind(request.mode.map(|m| m.as_str()))
    .bind(coords.map(|c| c.latitude()))
    .bind(coords.map(|c| c.longitude()))
    .bind(clean_optional(&request.address))
    .bind(clean_optional(&request.city))
    .bind(request.fee.clone())
    .bind(request.fee_period.map(|p| p.as_str()))
    .bind(request.status.map(|s| s.as_str()))
    .bind(now)
    .bind(requirement_id)
    .execute(pool)
    .await
    .map_err(AppError::db_error)?;

    get_requirement(pool, requirement_id).await
}

pub async fn delete_requirement(pool: &MySqlPool, requirement_id: i32) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM tbl_requirements WHERE id = ?")
        .bind(requirement_id)
        .execute(pool)
        .await
        .map_err(AppError::db_error)?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Requirement not found"));
    }
    Ok(())
}
