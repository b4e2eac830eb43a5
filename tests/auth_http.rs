mod common;

use axum::http::Method;

use common::app::{spawn_test_app, ADMIN_EMAIL, ADMIN_PASSWORD};
use common::auth::{admin_token, seed_user_and_login};
use common::http::{authed, request, response_json, assert_json_error, assert_status_ok_json};
use crm_backend::store::operations::users::Role;

#[tokio::test]
async fn login_returns_token_and_cookie() {
    let test_app = spawn_test_app().await;

    let response = request(
        &test_app.app,
        Method::POST,
        "/api/auth/login",
        Some(serde_json::json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD })),
        &[],
    )
    .await;

    let (status, headers, body) = response_json(response).await;
    assert_status_ok_json(status, &body);
    assert!(body["data"]["accessToken"].as_str().is_some());
    assert_eq!(body["data"]["user"]["email"], ADMIN_EMAIL);
    assert!(body["data"]["user"].get("passwordHash").is_none());

    let cookie = headers
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .expect("set-cookie header");
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn login_rejects_wrong_password_and_unknown_email() {
    let test_app = spawn_test_app().await;

    for (email, password) in [
        (ADMIN_EMAIL, "WrongPass1"),
        ("nobody@test.com", ADMIN_PASSWORD),
    ] {
        let response = request(
            &test_app.app,
            Method::POST,
            "/api/auth/login",
            Some(serde_json::json!({ "email": email, "password": password })),
            &[],
        )
        .await;
        let (status, _headers, body) = response_json(response).await;
        assert_eq!(status, 401);
        assert_json_error(&body, "AUTH_UNAUTHORIZED");
    }
}

#[tokio::test]
async fn login_uppercase_email_is_normalized() {
    let test_app = spawn_test_app().await;

    let response = request(
        &test_app.app,
        Method::POST,
        "/api/auth/login",
        Some(serde_json::json!({
            "email": ADMIN_EMAIL.to_uppercase(),
            "password": ADMIN_PASSWORD,
        })),
        &[],
    )
    .await;
    let (status, _headers, body) = response_json(response).await;
    assert_status_ok_json(status, &body);
}

#[tokio::test]
async fn me_requires_token() {
    let test_app = spawn_test_app().await;

    let response = request(&test_app.app, Method::GET, "/api/auth/me", None, &[]).await;
    let (status, _headers, body) = response_json(response).await;
    assert_eq!(status, 401);
    assert_json_error(&body, "AUTH_UNAUTHORIZED");
}

#[tokio::test]
async fn me_returns_caller_profile() {
    let test_app = spawn_test_app().await;
    let (sales_id, token) =
        seed_user_and_login(&test_app.app, &test_app.state, Role::Sales).await;

    let response = authed(&test_app.app, Method::GET, "/api/auth/me", None, &token).await;
    let (status, _headers, body) = response_json(response).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["id"], sales_id.as_str());
    assert_eq!(body["data"]["role"], "sales");
}

#[tokio::test]
async fn logout_invalidates_the_session() {
    let test_app = spawn_test_app().await;
    let token = admin_token(&test_app.app).await;

    let response = authed(&test_app.app, Method::POST, "/api/auth/logout", None, &token).await;
    let (status, _headers, body) = response_json(response).await;
    assert_status_ok_json(status, &body);

    // the JWT is still valid, but its session row is gone
    let response = authed(&test_app.app, Method::GET, "/api/auth/me", None, &token).await;
    let (status, _headers, _body) = response_json(response).await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn deactivated_user_cannot_login() {
    let test_app = spawn_test_app().await;
    let (sales_id, _email) = {
        let (id, email) = common::auth::seed_user(&test_app.state, Role::Sales);
        (id, email)
    };

    let mut user = test_app
        .state
        .store()
        .get_user_by_id(&sales_id)
        .unwrap()
        .unwrap();
    user.is_active = false;
    let email = user.email.clone();
    test_app.state.store().update_user(&user).unwrap();

    let response = request(
        &test_app.app,
        Method::POST,
        "/api/auth/login",
        Some(serde_json::json!({
            "email": email,
            "password": common::auth::SEED_PASSWORD,
        })),
        &[],
    )
    .await;
    let (status, _headers, body) = response_json(response).await;
    assert_eq!(status, 403);
    assert_json_error(&body, "FORBIDDEN");
}
