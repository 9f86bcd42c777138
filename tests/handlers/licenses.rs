use axum::http::StatusCode;
use serde_json::json;

use crate::common::*;

#[tokio::test]
async fn test_requests_without_identity_are_rejected() {
    let env = test_env();

    for uri in ["/activate-license", "/check-license", "/list-licenses", "/create-redirect-token"] {
        let (status, body) = send_json(env.app(), json_request("POST", uri, None, json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "unauthenticated");
    }

    let (status, _) = send_json(
        env.app(),
        json_request("POST", "/check-license", Some("not-a-token"), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let env = test_env();
    let forged = PrincipalVerifier::new(b"some-other-secret", None, Some(TEST_AUDIENCE.into()))
        .unwrap()
        .sign(&user_a(), 3600)
        .unwrap();

    let (status, body) = send_json(
        env.app(),
        json_request("POST", "/check-license", Some(&forged), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthenticated");
}

#[tokio::test]
async fn test_activate_then_check_as_owner_and_stranger() {
    let env = test_env();
    create_test_license(&env.conn(), "L1", 7);
    let token_a = env.token_for(&user_a());
    let token_b = env.token_for(&user_b());

    let before = now();
    let (status, body) = send_json(
        env.app(),
        json_request("POST", "/activate-license", Some(&token_a), json!({ "license_key": "L1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["license_key"], "L1");
    assert_eq!(body["remaining_days"], 7);
    let expires_at = body["expires_at"].as_i64().unwrap();
    assert!(expires_at >= before + 7 * DAY && expires_at <= now() + 7 * DAY);

    let (status, body) = send_json(
        env.app(),
        json_request("POST", "/check-license", Some(&token_a), json!({ "license_key": "L1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "active");
    assert_eq!(body["expires_at"], expires_at);
    assert_eq!(body["email"], "a@example.com");

    let (status, body) = send_json(
        env.app(),
        json_request("POST", "/check-license", Some(&token_b), json!({ "license_key": "L1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["status"], "foreign_owned");
    assert_eq!(body["email"], "a@example.com");
    assert!(body.get("expires_at").is_none());
    assert!(body.get("remaining_days").is_none());
}

#[tokio::test]
async fn test_activate_error_responses() {
    let env = test_env();
    create_owned_license(&env.conn(), "TAKEN", &user_a(), now() + DAY);
    create_owned_license(&env.conn(), "OLD", &user_b(), now() - 1);
    let token_b = env.token_for(&user_b());

    let cases = [
        (json!({ "license_key": "MISSING" }), StatusCode::NOT_FOUND, "not_found"),
        (json!({ "license_key": "  " }), StatusCode::BAD_REQUEST, "invalid"),
        (json!({}), StatusCode::BAD_REQUEST, "invalid"),
        (json!({ "license_key": "TAKEN" }), StatusCode::CONFLICT, "foreign_owned"),
        (json!({ "license_key": "OLD" }), StatusCode::GONE, "expired"),
    ];

    for (input, expected_status, expected_code) in cases {
        let (status, body) = send_json(
            env.app(),
            json_request("POST", "/activate-license", Some(&token_b), input.clone()),
        )
        .await;
        assert_eq!(status, expected_status, "{}", input);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], expected_code);
        assert!(body["error"].is_string());
    }

    let (_, body) = send_json(
        env.app(),
        json_request("POST", "/activate-license", Some(&token_b), json!({ "license_key": "TAKEN" })),
    )
    .await;
    assert_eq!(body["email"], "a@example.com");
}

#[tokio::test]
async fn test_malformed_json_is_invalid() {
    let env = test_env();
    let token = env.token_for(&user_a());
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/activate-license")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token))
        .body(axum::body::Body::from("{not json"))
        .unwrap();

    let (status, body) = send_json(env.app(), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "invalid");
}

#[tokio::test]
async fn test_check_expired_license_over_http() {
    let env = test_env();
    create_owned_license(&env.conn(), "L2", &user_a(), now() - 1);
    let token = env.token_for(&user_a());

    let (status, body) = send_json(
        env.app(),
        json_request("POST", "/check-license", Some(&token), json!({ "license_key": "L2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["status"], "expired");
    assert!(body["expires_at"].is_i64());
    assert!(body.get("remaining_days").is_none());
}

#[tokio::test]
async fn test_check_without_key_and_list() {
    let env = test_env();
    create_owned_license(&env.conn(), "A1", &user_a(), now() + DAY);
    create_owned_license(&env.conn(), "A2", &user_a(), now() + 2 * DAY);
    let token_a = env.token_for(&user_a());
    let token_b = env.token_for(&user_b());

    let (status, body) = send_json(
        env.app(),
        json_request("POST", "/check-license", Some(&token_a), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["license_key"], "A1");

    let (status, body) = send_json(
        env.app(),
        json_request("POST", "/check-license", Some(&token_b), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");

    let (status, body) = send_json(
        env.app(),
        json_request("POST", "/list-licenses", Some(&token_a), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let keys: Vec<&str> = body["licenses"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["license_key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["A1", "A2"]);
    assert_eq!(body["licenses"][1]["remaining_days"], 2);
}

#[tokio::test]
async fn test_create_redirect_token() {
    let env = test_env();
    let token = env.token_for(&user_a());

    let before = now();
    let (status, body) = send_json(
        env.app(),
        json_request(
            "POST",
            "/create-redirect-token",
            Some(&token),
            json!({ "target": "https://app.example/x" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let id = body["id"].as_str().unwrap();
    assert_eq!(id.len(), 43);
    assert_eq!(body["url"], format!("{}/redeem/{}", TEST_BASE_URL, id));
    let expires_at = body["expires_at"].as_i64().unwrap();
    assert!(expires_at >= before + 300 && expires_at <= now() + 300);
    // The target is never echoed back
    assert!(body.get("target").is_none());
}

#[tokio::test]
async fn test_create_redirect_token_rejects_bad_target() {
    let env = test_env_with_hosts(vec!["app.example".into()]);
    let token = env.token_for(&user_a());

    for target in [json!({}), json!({ "target": "/x" }), json!({ "target": "https://evil.example/" })] {
        let (status, body) = send_json(
            env.app(),
            json_request("POST", "/create-redirect-token", Some(&token), target),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid");
    }
}
