use axum::http::Method;
use axum::Router;
use chrono::Utc;

use crm_backend::auth::hash_password;
use crm_backend::state::AppState;
use crm_backend::store::operations::users::{Role, User};

use super::app::{ADMIN_EMAIL, ADMIN_PASSWORD};
use super::http::{request, response_json};

pub const SEED_PASSWORD: &str = "Passw0rd1";

pub async fn login(app: &Router, email: &str, password: &str) -> String {
    let response = request(
        app,
        Method::POST,
        "/api/auth/login",
        Some(serde_json::json!({ "email": email, "password": password })),
        &[],
    )
    .await;

    let (status, _headers, body) = response_json(response).await;
    assert!(status.is_success(), "login failed: {body}");

    body["data"]["accessToken"]
        .as_str()
        .expect("access token in login response")
        .to_string()
}

pub async fn admin_token(app: &Router) -> String {
    login(app, ADMIN_EMAIL, ADMIN_PASSWORD).await
}

/// Seed a user row directly in the store and return its id and email.
/// The password is always [`SEED_PASSWORD`].
pub fn seed_user(state: &AppState, role: Role) -> (String, String) {
    let id = uuid::Uuid::new_v4().to_string();
    let email = format!("user-{}@test.com", uuid::Uuid::new_v4());
    let now = Utc::now();

    state
        .store()
        .create_user(&User {
            id: id.clone(),
            name: format!("Test {role:?}"),
            email: email.clone(),
            password_hash: hash_password(SEED_PASSWORD).expect("hash seed password"),
            role,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
        .expect("seed user");

    (id, email)
}

pub async fn seed_user_and_login(app: &Router, state: &AppState, role: Role) -> (String, String) {
    let (id, email) = seed_user(state, role);
    let token = login(app, &email, SEED_PASSWORD).await;
    (id, token)
}

pub fn auth_header(token: &str) -> String {
    format!("Bearer {token}")
}
