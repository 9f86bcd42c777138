use axum::http::StatusCode;
use serde_json::json;

use crate::common::*;

#[tokio::test]
async fn test_health() {
    let env = test_env();
    let (status, body) = send_json(env.app(), get_request("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_verify_license_for_bound_device() {
    let env = test_env();
    create_test_license(&env.conn(), "L1", 30);
    licensing::activate(&mut env.conn(), "L1", &user_a(), Some("device-1"), now()).unwrap();

    let (status, body) = send_json(
        env.app(),
        json_request(
            "POST",
            "/verify-license",
            None,
            json!({ "license_key": "L1", "device_id": "device-1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["remaining_days"], 30);
    assert!(body["expires_at"].is_i64());

    let (status, body) = send_json(
        env.app(),
        json_request(
            "POST",
            "/verify-license",
            None,
            json!({ "license_key": "L1", "device_id": "device-2" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "valid": false }));
}

#[tokio::test]
async fn test_verify_license_unknown_unused_and_expired() {
    let env = test_env();
    create_test_license(&env.conn(), "UNUSED", 7);
    create_owned_license(&env.conn(), "OLD", &user_a(), now() - 1);

    for key in ["MISSING", "UNUSED", "OLD"] {
        let (status, body) = send_json(
            env.app(),
            json_request(
                "POST",
                "/verify-license",
                None,
                json!({ "license_key": key, "device_id": "device-1" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", key);
        assert_eq!(body, json!({ "valid": false }), "{}", key);
    }
}

#[tokio::test]
async fn test_verify_license_requires_fields() {
    let env = test_env();
    let (status, body) = send_json(
        env.app(),
        json_request("POST", "/verify-license", None, json!({ "license_key": "L1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid");
}
