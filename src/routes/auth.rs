use axum::extract::State;
use axum::http::{header::SET_COOKIE, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::auth::{
    dummy_argon2_hash, hash_token, sign_jwt_for_user, verify_password, AuthUser,
};
use crate::extractors::JsonBody;
use crate::response::{ok, AppError};
use crate::routes::users::UserView;
use crate::state::AppState;
use crate::store::operations::sessions::Session;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub user: UserView,
}

async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Response, AppError> {
    let email = req.email.trim().to_lowercase();
    let user = state.store().get_user_by_email(&email)?;

    // Verify against a dummy hash for unknown accounts so response timing
    // does not leak which emails exist.
    let verified = match &user {
        Some(u) => verify_password(&req.password, &u.password_hash)?,
        None => {
            let _ = verify_password(&req.password, &dummy_argon2_hash());
            false
        }
    };

    let user = match (user, verified) {
        (Some(u), true) => u,
        _ => return Err(AppError::unauthorized("Invalid email or password")),
    };

    if !user.is_active {
        return Err(AppError::forbidden("User is deactivated"));
    }

    let access_token = sign_jwt_for_user(
        &user.id,
        &state.config().jwt_secret,
        state.config().jwt_expires_in_hours,
    )?;
    state
        .store()
        .create_session(&Session::new(&hash_token(&access_token), &user.id))?;

    let payload = AuthResponse {
        access_token: access_token.clone(),
        user: UserView::from(&user),
    };

    let mut response = ok(payload).into_response();
    set_token_cookie(&mut response, &access_token)?;
    Ok(response)
}

async fn logout(
    auth: AuthUser,
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> Result<Response, AppError> {
    // drop only the session behind the presented token, not every device
    let token = crate::auth::extract_token_from_headers(&headers)?;
    state.store().delete_session(&hash_token(&token))?;
    tracing::info!(user_id = %auth.user_id, "User logged out");

    let mut response = ok(serde_json::json!({ "loggedOut": true })).into_response();
    clear_token_cookie(&mut response)?;
    Ok(response)
}

async fn me(auth: AuthUser, State(state): State<AppState>) -> Result<Response, AppError> {
    let user = state
        .store()
        .get_user_by_id(&auth.user_id)?
        .ok_or_else(|| AppError::unauthorized("User not found"))?;
    Ok(ok(UserView::from(&user)).into_response())
}

fn set_token_cookie(response: &mut Response, token: &str) -> Result<(), AppError> {
    let cookie = format!("token={token}; Path=/; SameSite=Strict; HttpOnly; Secure");
    append_set_cookie(response, &cookie)
}

fn clear_token_cookie(response: &mut Response) -> Result<(), AppError> {
    append_set_cookie(
        response,
        "token=; Path=/; Max-Age=0; SameSite=Strict; HttpOnly; Secure",
    )
}

fn append_set_cookie(response: &mut Response, cookie: &str) -> Result<(), AppError> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|e| AppError::internal(&format!("cookie set failed: {e}")))?;
    response.headers_mut().append(SET_COOKIE, value);
    Ok(())
}
