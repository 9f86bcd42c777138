use crate::common::*;
use licensegate::redirect::RedeemOutcome;

#[test]
fn test_scenario_token_redeems_once() {
    let env = test_env();
    let conn = env.conn();
    let now = now();

    let issued = redirect::issue(&conn, "https://app.example/x", &user_a(), 300, &[], now).unwrap();
    assert_eq!(issued.token.expires_at, now + 300);
    assert_eq!(issued.token.created_by_principal_id, "user-a");

    match redirect::redeem(&conn, &issued.id, now).unwrap() {
        RedeemOutcome::Redirect(token) => assert_eq!(token.target, "https://app.example/x"),
        other => panic!("expected Redirect, got {:?}", other),
    }
    assert_eq!(redirect::redeem(&conn, &issued.id, now).unwrap(), RedeemOutcome::NotFound);
}

#[test]
fn test_expired_token_reports_expired_once_then_not_found() {
    let env = test_env();
    let conn = env.conn();
    let now = now();

    let issued = redirect::issue(&conn, "https://app.example/x", &user_a(), 300, &[], now - 301).unwrap();

    assert!(matches!(
        redirect::redeem(&conn, &issued.id, now).unwrap(),
        RedeemOutcome::Expired(_)
    ));
    assert_eq!(redirect::redeem(&conn, &issued.id, now).unwrap(), RedeemOutcome::NotFound);
}

#[test]
fn test_token_expires_exactly_at_deadline() {
    let env = test_env();
    let conn = env.conn();
    let now = now();

    let issued = redirect::issue(&conn, "https://app.example/x", &user_a(), 300, &[], now).unwrap();
    assert!(matches!(
        redirect::redeem(&conn, &issued.id, now + 300).unwrap(),
        RedeemOutcome::Expired(_)
    ));
}

#[test]
fn test_unknown_and_empty_ids_are_not_found() {
    let env = test_env();
    let conn = env.conn();

    assert_eq!(redirect::redeem(&conn, "tok1", now()).unwrap(), RedeemOutcome::NotFound);
    assert_eq!(redirect::redeem(&conn, "", now()).unwrap(), RedeemOutcome::NotFound);
}

#[test]
fn test_token_id_is_never_stored() {
    let env = test_env();
    let conn = env.conn();

    let issued = redirect::issue(&conn, "https://app.example/x", &user_a(), 300, &[], now()).unwrap();

    let stored: Vec<String> = conn
        .prepare("SELECT id_hash FROM redirect_tokens")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(stored, vec![queries::hash_secret(&issued.id)]);
    assert!(!stored.contains(&issued.id));
}

#[test]
fn test_issue_rejects_invalid_targets() {
    let env = test_env();
    let conn = env.conn();
    let allowed = vec!["app.example".to_string()];

    for target in ["", "/dashboard", "javascript:alert(1)", "https://evil.example/x"] {
        assert!(
            matches!(
                redirect::issue(&conn, target, &user_a(), 300, &allowed, now()),
                Err(AppError::BadRequest(_))
            ),
            "accepted {:?}",
            target
        );
    }

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM redirect_tokens", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn test_issue_refuses_ttl_past_timestamp_range() {
    let env = test_env();
    let conn = env.conn();

    assert!(matches!(
        redirect::issue(&conn, "https://app.example/x", &user_a(), i64::MAX, &[], now()),
        Err(AppError::Internal(_))
    ));

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM redirect_tokens", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn test_issued_ids_are_distinct() {
    let env = test_env();
    let conn = env.conn();

    let a = redirect::issue(&conn, "https://app.example/x", &user_a(), 300, &[], now()).unwrap();
    let b = redirect::issue(&conn, "https://app.example/x", &user_a(), 300, &[], now()).unwrap();
    assert_ne!(a.id, b.id);

    // Redeeming one leaves the other intact
    assert!(matches!(redirect::redeem(&conn, &a.id, now()).unwrap(), RedeemOutcome::Redirect(_)));
    assert!(matches!(redirect::redeem(&conn, &b.id, now()).unwrap(), RedeemOutcome::Redirect(_)));
}
