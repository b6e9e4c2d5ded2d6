use fake::faker::name::en::Name;
use fake::Fake;
use once_cell::sync::Lazy;
use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use std::time::Duration;
use tutor_connect::core::jwt_auth::{generate_jwt_token, JwtClaims};
use tutor_connect::core::{get_subscriber, init_subscriber, AppConfig};
use tutor_connect::db::users::create_user;
use tutor_connect::models::users::{RegisterRequest, Role};
use tutor_connect::tutor_connect_web_server::AppState;
use uuid::Uuid;

static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    }
});

pub fn test_config() -> AppConfig {
    AppConfig::new().expect("Failed to read configuration")
}

/// Application state over a pool that never connects unless a handler reaches the database.
pub fn test_state() -> AppState {
    Lazy::force(&TRACING);

    let config = test_config();
    let pool = MySqlPoolOptions::new()
        .acquire_timeout(Duration::from_secs(1))
        .connect_lazy_with(config.mysql.connect());

    AppState::new(&config, pool).expect("Failed to build application state")
}

/// Application state over a migrated test database.
pub fn state_with_pool(pool: MySqlPool) -> AppState {
    state_with_config(pool, |_| {})
}

pub fn state_with_config(pool: MySqlPool, adjust: impl FnOnce(&mut AppConfig)) -> AppState {
    Lazy::force(&TRACING);

    let mut config = test_config();
    adjust(&mut config);
    AppState::new(&config, pool).expect("Failed to build application state")
}

/// Registers an active account and returns its id.
pub async fn seed_user(pool: &MySqlPool, role: Role) -> i32 {
    let request = RegisterRequest {
        name: Name().fake(),
        email: format!("{}@example.com", Uuid::new_v4().simple()),
        password: "secret123".to_string(),
        phone: None,
        role,
    };

    create_user(pool, &request, "not-a-real-hash")
        .await
        .expect("Failed to seed user")
        .id
}

pub fn bearer_token(user_id: i32, role: Role) -> String {
    let config = test_config();
    let (claims, _) = JwtClaims::for_user(
        user_id,
        &format!("user{}@example.com", user_id),
        role,
        &config.jwt_auth_config,
    );
    let token = generate_jwt_token(&claims, &config.jwt_auth_config.secret)
        .expect("Failed to sign test token");
    format!("Bearer {}", token)
}
