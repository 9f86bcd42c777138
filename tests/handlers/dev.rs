use axum::http::StatusCode;
use serde_json::json;

use crate::common::*;

#[tokio::test]
async fn test_dev_create_license_with_generated_key() {
    let env = test_env();

    let (status, body) = send_json(
        env.app(),
        json_request("POST", "/dev/create-license", None, json!({ "class": "trial" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["class"], "trial");
    assert_eq!(body["term_days"], 7);

    let key = body["license_key"].as_str().unwrap();
    assert!(key.starts_with("TEST-"));
    let stored = queries::get_license_by_key(&env.conn(), key).unwrap().unwrap();
    assert_eq!(stored.term_days, 7);
    assert_eq!(stored.owner_principal_id, None);
}

#[tokio::test]
async fn test_dev_create_license_with_explicit_key() {
    let env = test_env();
    let request = || {
        json_request(
            "POST",
            "/dev/create-license",
            None,
            json!({ "class": "standard", "key": "TEST-30DAYS-001" }),
        )
    };

    let (status, body) = send_json(env.app(), request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["license_key"], "TEST-30DAYS-001");
    assert_eq!(body["term_days"], 30);

    let (status, body) = send_json(env.app(), request()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");
}

#[tokio::test]
async fn test_dev_create_license_unknown_class() {
    let env = test_env();
    let (status, body) = send_json(
        env.app(),
        json_request("POST", "/dev/create-license", None, json!({ "class": "lifetime" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid");
}

#[tokio::test]
async fn test_dev_routes_absent_outside_dev_mode() {
    let env = test_env();
    let app = handlers::router(env.state.clone(), false).with_state(env.state.clone());

    let (status, _, _) = send(
        app,
        json_request("POST", "/dev/create-license", None, json!({ "class": "trial" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
