use actix_web::http::StatusCode;
use actix_web::{test, App};
use sqlx::MySqlPool;
use tutor_connect::db::users;
use tutor_connect::models::users::Role;

use crate::helpers::{bearer_token, seed_user, state_with_pool, test_state};

#[actix_web::test]
async fn socket_upgrade_requires_a_token() {
    let state = test_state();
    let app = test::init_service(App::new().configure(move |conf| state.configure(conf))).await;

    for uri in ["/api/v1/ws", "/api/v1/ws?token=", "/api/v1/ws?token=garbage"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "uri {}", uri);
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn deactivated_accounts_cannot_open_the_socket(pool: MySqlPool) {
    let student = seed_user(&pool, Role::Student).await;
    let token = bearer_token(student, Role::Student);
    users::deactivate_user(&pool, student)
        .await
        .expect("Failed to deactivate user");

    let state = state_with_pool(pool);
    let app = test::init_service(App::new().configure(move |conf| state.configure(conf))).await;

    let jwt = token.trim_start_matches("Bearer ");
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/ws?token={}", jwt))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
