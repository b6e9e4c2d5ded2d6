use actix_web::http::{header, StatusCode};
use actix_web::{test, App};
use serde_json::{json, Value};
use sqlx::MySqlPool;
use tutor_connect::db::users;
use tutor_connect::models::users::Role;

use crate::helpers::{bearer_token, seed_user, state_with_config, state_with_pool, test_state};

#[actix_web::test]
async fn protected_routes_reject_missing_tokens() {
    let state = test_state();
    let app = test::init_service(App::new().configure(move |conf| state.configure(conf))).await;

    for uri in [
        "/api/v1/users/me",
        "/api/v1/users/nearby",
        "/api/v1/messages/conversations",
        "/api/v1/requirements/mine",
        "/api/v1/requests/incoming",
        "/api/v1/admin/stats",
    ] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "route {}", uri);
    }
}

#[actix_web::test]
async fn garbage_token_is_unauthorized() {
    let state = test_state();
    let app = test::init_service(App::new().configure(move |conf| state.configure(conf))).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/users/me")
        .insert_header((header::AUTHORIZATION, "Bearer not-a-jwt"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
}

#[sqlx::test(migrations = "./migrations")]
async fn admin_routes_forbid_other_roles(pool: MySqlPool) {
    let student = seed_user(&pool, Role::Student).await;
    let teacher = seed_user(&pool, Role::Teacher).await;
    let state = state_with_pool(pool);
    let app = test::init_service(App::new().configure(move |conf| state.configure(conf))).await;

    for (user_id, role) in [(student, Role::Student), (teacher, Role::Teacher)] {
        let req = test::TestRequest::get()
            .uri("/api/v1/admin/stats")
            .insert_header((header::AUTHORIZATION, bearer_token(user_id, role)))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "role {}", role);
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn admin_cannot_deactivate_themself(pool: MySqlPool) {
    let admin = seed_user(&pool, Role::Admin).await;
    let state = state_with_pool(pool);
    let app = test::init_service(App::new().configure(move |conf| state.configure(conf))).await;

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/admin/users/{}/status", admin))
        .insert_header((header::AUTHORIZATION, bearer_token(admin, Role::Admin)))
        .set_json(json!({ "is_active": false }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn registering_as_admin_is_rejected() {
    let state = test_state();
    let app = test::init_service(App::new().configure(move |conf| state.configure(conf))).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({
            "name": "Mallory",
            "email": "mallory@example.com",
            "password": "secret123",
            "role": "admin"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn register_returns_400_for_invalid_payloads() {
    let state = test_state();
    let app = test::init_service(App::new().configure(move |conf| state.configure(conf))).await;

    let cases = [
        (
            json!({"name": "Ada", "email": "not-an-email", "password": "secret123", "role": "student"}),
            "invalid email",
        ),
        (
            json!({"name": "Ada", "email": "ada@example.com", "password": "123", "role": "student"}),
            "short password",
        ),
        (
            json!({"name": "  ", "email": "ada@example.com", "password": "secret123", "role": "teacher"}),
            "blank name",
        ),
    ];

    for (payload, description) in cases {
        let req = test::TestRequest::post()
            .uri("/api/v1/auth/register")
            .set_json(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(
            resp.status(),
            StatusCode::BAD_REQUEST,
            "register did not reject {}",
            description
        );
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn profile_routes_enforce_the_callers_role(pool: MySqlPool) {
    let teacher = seed_user(&pool, Role::Teacher).await;
    let state = state_with_pool(pool);
    let app = test::init_service(App::new().configure(move |conf| state.configure(conf))).await;

    let req = test::TestRequest::put()
        .uri("/api/v1/profiles/student")
        .insert_header((header::AUTHORIZATION, bearer_token(teacher, Role::Teacher)))
        .set_json(json!({
            "class_level": "10",
            "school": "Central High",
            "learning_mode": "online"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn messaging_yourself_is_a_bad_request(pool: MySqlPool) {
    let student = seed_user(&pool, Role::Student).await;
    let state = state_with_pool(pool);
    let app = test::init_service(App::new().configure(move |conf| state.configure(conf))).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/messages")
        .insert_header((header::AUTHORIZATION, bearer_token(student, Role::Student)))
        .set_json(json!({ "receiver_id": student, "content": "hi me" }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn nearby_rejects_out_of_range_radius(pool: MySqlPool) {
    let student = seed_user(&pool, Role::Student).await;
    let state = state_with_pool(pool);
    let app = test::init_service(App::new().configure(move |conf| state.configure(conf))).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/users/nearby?latitude=12.97&longitude=77.59&radius_km=250")
        .insert_header((header::AUTHORIZATION, bearer_token(student, Role::Student)))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn demoted_admin_loses_admin_routes_with_the_old_token(pool: MySqlPool) {
    let admin = seed_user(&pool, Role::Admin).await;
    let token = bearer_token(admin, Role::Admin);
    let state = state_with_pool(pool.clone());
    let app = test::init_service(App::new().configure(move |conf| state.configure(conf))).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/admin/stats")
        .insert_header((header::AUTHORIZATION, token.clone()))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    users::set_user_role(&pool, admin, Role::Teacher)
        .await
        .expect("Failed to demote admin");

    let req = test::TestRequest::get()
        .uri("/api/v1/admin/stats")
        .insert_header((header::AUTHORIZATION, token))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn deactivated_account_cannot_write_with_an_unexpired_token(pool: MySqlPool) {
    let student = seed_user(&pool, Role::Student).await;
    let teacher = seed_user(&pool, Role::Teacher).await;
    let token = bearer_token(student, Role::Student);
    users::deactivate_user(&pool, student)
        .await
        .expect("Failed to deactivate user");

    let state = state_with_pool(pool);
    let app = test::init_service(App::new().configure(move |conf| state.configure(conf))).await;

    let writes = [
        ("/api/v1/messages", json!({ "receiver_id": teacher, "content": "still here?" })),
        ("/api/v1/requests", json!({ "receiver_id": teacher })),
        ("/api/v1/reviews", json!({ "reviewee_id": teacher, "rating": 5 })),
    ];
    for (uri, payload) in writes {
        let req = test::TestRequest::post()
            .uri(uri)
            .insert_header((header::AUTHORIZATION, token.clone()))
            .set_json(payload)
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "route {}", uri);
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn forgot_password_answers_the_same_when_the_otp_store_is_down(pool: MySqlPool) {
    let user_id = seed_user(&pool, Role::Student).await;
    let email = users::get_user_by_id(&pool, user_id)
        .await
        .expect("Failed to load seeded user")
        .email;
    let state = state_with_config(pool, |config| {
        config.redis.host = "127.0.0.1".to_string();
        config.redis.port = 1;
    });
    let app = test::init_service(App::new().configure(move |conf| state.configure(conf))).await;

    let mut bodies = Vec::new();
    for address in [email.as_str(), "nobody@example.com"] {
        let req = test::TestRequest::post()
            .uri("/api/v1/auth/forgot-password")
            .set_json(json!({ "email": address }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK, "email {}", address);
        let body: Value = test::read_body_json(resp).await;
        bodies.push(body);
    }
    assert_eq!(bodies[0], bodies[1]);
}
