use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{hash_password, AuthUser};
use crate::extractors::JsonBody;
use crate::response::{created, ok, paginated, AppError};
use crate::routes::PageQuery;
use crate::state::AppState;
use crate::store::operations::users::{Role, User};
use crate::validation::{is_valid_email, validate_name, validate_password};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route(
            "/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

/// User row as exposed over the API: no password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(value: &User) -> Self {
        Self {
            id: value.id.clone(),
            name: value.name.clone(),
            email: value.email.clone(),
            role: value.role,
            is_active: value.is_active,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

async fn list_users(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    auth.require_at_least(Role::Manager)?;

    let users = state.store().list_users(page.limit(), page.offset())?;
    let total = state.store().count_users()? as u64;
    let views: Vec<UserView> = users.iter().map(UserView::from).collect();
    Ok(paginated(views, total, page.page(), page.per_page()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateUserRequest {
    name: String,
    email: String,
    password: String,
    role: Role,
}

async fn create_user(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateUserRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    auth.require_at_least(Role::Admin)?;

    let email = req.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(AppError::bad_request(
            "USER_INVALID_EMAIL",
            "Invalid email format",
        ));
    }
    if let Err(msg) = validate_name(&req.name) {
        return Err(AppError::bad_request("USER_INVALID_NAME", msg));
    }
    if let Err(msg) = validate_password(&req.password) {
        return Err(AppError::bad_request("USER_WEAK_PASSWORD", msg));
    }

    let now = Utc::now();
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        name: req.name.trim().to_string(),
        email,
        password_hash: hash_password(&req.password)?,
        role: req.role,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    state.store().create_user(&user)?;

    Ok(created(UserView::from(&user)))
}

async fn get_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    if !auth.can_access_user(&user_id) {
        return Err(AppError::forbidden("Insufficient role"));
    }

    let user = state
        .store()
        .get_user_by_id(&user_id)?
        .ok_or_else(|| AppError::not_found(&format!("User not found: {user_id}")))?;
    Ok(ok(UserView::from(&user)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateUserRequest {
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    role: Option<Role>,
    is_active: Option<bool>,
}

async fn update_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    JsonBody(req): JsonBody<UpdateUserRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    auth.require_at_least(Role::Admin)?;

    let mut user = state
        .store()
        .get_user_by_id(&user_id)?
        .ok_or_else(|| AppError::not_found(&format!("User not found: {user_id}")))?;

    if let Some(name) = req.name {
        if let Err(msg) = validate_name(&name) {
            return Err(AppError::bad_request("USER_INVALID_NAME", msg));
        }
        user.name = name.trim().to_string();
    }
    if let Some(email) = req.email {
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AppError::bad_request(
                "USER_INVALID_EMAIL",
                "Invalid email format",
            ));
        }
        user.email = email;
    }
    if let Some(password) = req.password {
        if let Err(msg) = validate_password(&password) {
            return Err(AppError::bad_request("USER_WEAK_PASSWORD", msg));
        }
        user.password_hash = hash_password(&password)?;
    }
    if let Some(role) = req.role {
        user.role = role;
    }
    if let Some(is_active) = req.is_active {
        user.is_active = is_active;
    }

    user.updated_at = Utc::now();
    state.store().update_user(&user)?;
    Ok(ok(UserView::from(&user)))
}

async fn delete_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    auth.require_at_least(Role::Admin)?;

    if auth.user_id == user_id {
        return Err(AppError::bad_request(
            "USER_SELF_DELETE",
            "Cannot delete the account you are logged in with",
        ));
    }

    state.store().delete_user(&user_id)?;
    Ok(ok(serde_json::json!({ "deleted": true })))
}
