use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::common::contains_pattern;
use crate::models::pagination::PaginationQuery;
use crate::models::users::Role;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AdminStats {
    pub total_students: i64,
    pub total_teachers: i64,
    pub total_admins: i64,
    pub active_users: i64,
    pub online_users: i64,
    pub live_sharing_users: i64,
    pub open_requirements: i64,
    pub active_messages: i64,
    pub pending_requests: i64,
    pub pending_kyc: i64,
}

/// Row shape for the admin user listing; includes email and activity flags.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AdminUserRow {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    pub is_active: bool,
    pub is_online: bool,
    pub live_sharing: bool,
    pub city: Option<String>,
    pub last_seen_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Deserialize)]
pub struct AdminUserQuery {
    pub role: Option<Role>,
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl AdminUserQuery {
    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery::new(self.page, self.per_page)
    }

    /// `LIKE` pattern for the search term, with wildcard characters escaped.
    pub fn search_pattern(&self) -> Option<String> {
        let term = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some(contains_pattern(term))
    }
}

#[derive(Debug, Deserialize)]
pub struct SetUserStatusRequest {
    pub is_active: bool,
}

#[derive(Debug, Deserialize)]
pub struct SetUserRoleRequest {
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct PurgeResult {
    pub deleted: u64,
}
