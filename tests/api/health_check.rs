use actix_web::{test, App};
use serde_json::Value;

use crate::helpers::test_state;

#[actix_web::test]
async fn health_check_works() {
    let state = test_state();
    let app = test::init_service(App::new().configure(move |conf| state.configure(conf))).await;

    let req = test::TestRequest::get()
        .uri("/api/v1/health_check")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
}
