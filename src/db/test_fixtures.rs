//! Seed rows for the `#[sqlx::test]` suites in this module.

use chrono::{Duration, Utc};
use fake::faker::name::en::Name;
use fake::Fake;
use sqlx::MySqlPool;
use uuid::Uuid;

use crate::db::{location, messages, users};
use crate::geo::Coordinates;
use crate::models::location::AddressParts;
use crate::models::messages::{Message, NewMessage};
use crate::models::users::{RegisterRequest, Role};

pub async fn insert_user(pool: &MySqlPool, role: Role) -> i32 {
    let request = RegisterRequest {
        name: Name().fake(),
        email: format!("{}@example.com", Uuid::new_v4().simple()),
        password: "secret123".to_string(),
        phone: None,
        role,
    };

    users::create_user(pool, &request, "not-a-real-hash")
        .await
        .expect("Failed to insert user")
        .id
}

pub async fn place_user(pool: &MySqlPool, user_id: i32, latitude: f64, longitude: f64) {
    let coords = Coordinates::new(latitude, longitude).expect("Invalid test coordinates");
    location::update_user_location(pool, user_id, &coords, &AddressParts::default())
        .await
        .expect("Failed to store location");
}

pub async fn send(pool: &MySqlPool, sender_id: i32, receiver_id: i32, content: &str) -> Message {
    let message = NewMessage {
        sender_id,
        receiver_id,
        content: content.to_string(),
        attachment_url: None,
    };

    messages::insert_message(pool, &message, 30)
        .await
        .expect("Failed to insert message")
}

/// Moves a message's expiry into the past.
pub async fn expire(pool: &MySqlPool, message_id: i32) {
    sqlx::query("UPDATE tbl_messages SET expires_at = ? WHERE id = ?")
        .bind(Utc::now().naive_utc() - Duration::hours(1))
        .bind(message_id)
        .execute(pool)
        .await
        .expect("Failed to expire message");
}

/// Spreads `created_at` so ordering does not depend on insert timing.
pub async fn backdate(pool: &MySqlPool, message_id: i32, minutes: i64) {
    sqlx::query("UPDATE tbl_messages SET created_at = ? WHERE id = ?")
        .bind(Utc::now().naive_utc() - Duration::minutes(minutes))
        .bind(message_id)
        .execute(pool)
        .await
        .expect("Failed to backdate message");
}
