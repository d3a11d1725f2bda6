mod common;

use account_service::services::AccountStore;
use axum::http::StatusCode;
use chrono::Duration;
use common::{bearer, TestApp};
use serde_json::json;

#[tokio::test]
async fn get_account_requires_token() {
    let app = TestApp::new();
    let (id, login) = app.verified_user("ada@example.com").await;
    let path = format!("/users/{}", id);

    let (status, body) = app.get(&path, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Token is required");

    let (status, body) = app.get(&path, Some(&bearer(&login["access_token"]))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);
    assert_eq!(body["email"], "ada@example.com");
    assert!(body.get("password_hash").is_none());
    assert!(body.get("verification_code").is_none());
}

#[tokio::test]
async fn get_account_accepts_bare_token() {
    let app = TestApp::new();
    let (id, login) = app.verified_user("ada@example.com").await;

    let (status, _) = app
        .get(
            &format!("/users/{}", id),
            Some(login["access_token"].as_str().unwrap()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn get_account_bad_id_and_missing() {
    let app = TestApp::new();
    let (_, login) = app.verified_user("ada@example.com").await;
    let auth = bearer(&login["access_token"]);

    let (status, body) = app.get("/users/abc", Some(&auth)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid user ID");

    let (status, body) = app.get("/users/999", Some(&auth)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn access_token_expires_after_ten_minutes() {
    let app = TestApp::new();
    let (id, login) = app.verified_user("ada@example.com").await;
    let path = format!("/users/{}", id);
    let auth = bearer(&login["access_token"]);

    app.clock.advance(Duration::minutes(10) - Duration::seconds(1));
    let (status, _) = app.get(&path, Some(&auth)).await;
    assert_eq!(status, StatusCode::OK);

    app.clock.advance(Duration::seconds(1));
    let (status, _) = app.get(&path, Some(&auth)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_check_distinguishes_roles() {
    let app = TestApp::new();
    let (_, regular) = app.verified_user("ada@example.com").await;
    let (_, admin) = app.admin_user("root@example.com").await;

    let (status, _) = app
        .get("/users/admin", Some(&bearer(&regular["access_token"])))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .get("/users/admin", Some(&bearer(&admin["access_token"])))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .get("/users/admin", Some(&bearer(&admin["refresh_token"])))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/users/admin", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_promotes_user() {
    let app = TestApp::new();
    let (user_id, _) = app.verified_user("ada@example.com").await;
    let (_, admin) = app.admin_user("root@example.com").await;
    let auth = bearer(&admin["access_token"]);

    let (status, _) = app
        .post_with_token("/users/promote-admin", json!({ "id": user_id }), Some(&auth))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(app.store.find_by_id(user_id).await.unwrap().unwrap().is_admin);

    // Promoting an admin again is not an error.
    let (status, _) = app
        .post_with_token("/users/promote-admin", json!({ "id": user_id }), Some(&auth))
        .await;
    assert_eq!(status, StatusCode::OK);

    // Claims are fixed at issuance; a fresh login carries the new role.
    let (_, relogin) = app.login("ada@example.com", common::TEST_PASSWORD).await;
    let claims = app
        .jwt()
        .validate_admin_token(relogin["access_token"].as_str().unwrap())
        .unwrap();
    assert!(claims.is_admin);
}

#[tokio::test]
async fn promote_requires_admin_and_existing_user() {
    let app = TestApp::new();
    let (user_id, regular) = app.verified_user("ada@example.com").await;
    let (_, admin) = app.admin_user("root@example.com").await;

    let (status, _) = app
        .post_with_token(
            "/users/promote-admin",
            json!({ "id": user_id }),
            Some(&bearer(&regular["access_token"])),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(!app.store.find_by_id(user_id).await.unwrap().unwrap().is_admin);

    let (status, body) = app
        .post_with_token(
            "/users/promote-admin",
            json!({ "id": 999 }),
            Some(&bearer(&admin["access_token"])),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
}
