use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::comments::build_comment_tree;
use crate::extractors::JsonBody;
use crate::response::{created, ok, paginated, AppError};
use crate::routes::PageQuery;
use crate::state::AppState;
use crate::store::operations::leads::{Lead, LeadStatus};
use crate::store::operations::users::Role;
use crate::validation::validate_name;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_leads).post(create_lead))
        .route("/:id", get(get_lead).put(update_lead).delete(delete_lead))
        .route("/:id/comments", get(list_lead_comments).post(create_lead_comment))
}

async fn list_leads(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    // salespeople see only their own pipeline
    let owner_filter = if auth.role.at_least(Role::Gl) {
        None
    } else {
        Some(auth.user_id.as_str())
    };

    let (rows, total) =
        state
            .store()
            .list_leads(page.limit(), page.offset(), page.query(), owner_filter)?;
    Ok(paginated(rows, total as u64, page.page(), page.per_page()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LeadRequest {
    name: String,
    company_name: Option<String>,
    contact_name: Option<String>,
    phone: Option<String>,
    status: Option<LeadStatus>,
    owner_id: Option<String>,
}

async fn create_lead(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LeadRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    if let Err(msg) = validate_name(&req.name) {
        return Err(AppError::bad_request("LEAD_INVALID_NAME", msg));
    }

    let owner_id = req.owner_id.unwrap_or_else(|| auth.user_id.clone());
    if owner_id != auth.user_id {
        auth.require_at_least(Role::Gl)?;
        if state.store().get_user_by_id(&owner_id)?.is_none() {
            return Err(AppError::bad_request(
                "LEAD_UNKNOWN_OWNER",
                "Assigned owner does not exist",
            ));
        }
    }

    let now = Utc::now();
    let lead = Lead {
        id: uuid::Uuid::new_v4().to_string(),
        name: req.name.trim().to_string(),
        company_name: req.company_name,
        contact_name: req.contact_name,
        phone: req.phone,
        status: req.status.unwrap_or(LeadStatus::New),
        owner_id,
        created_at: now,
        updated_at: now,
    };
    state.store().create_lead(&lead)?;
    Ok(created(lead))
}

fn load_lead_checked(
    state: &AppState,
    auth: &AuthUser,
    lead_id: &str,
) -> Result<Lead, AppError> {
    let lead = state
        .store()
        .get_lead(lead_id)?
        .ok_or_else(|| AppError::not_found(&format!("Lead not found: {lead_id}")))?;
    if !auth.can_access_user(&lead.owner_id) {
        return Err(AppError::forbidden("Insufficient role"));
    }
    Ok(lead)
}

async fn get_lead(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(lead_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let lead = load_lead_checked(&state, &auth, &lead_id)?;
    let comments = build_comment_tree(state.store().list_comments(&lead_id)?);
    Ok(ok(serde_json::json!({ "lead": lead, "comments": comments })))
}

async fn update_lead(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(lead_id): Path<String>,
    JsonBody(req): JsonBody<LeadRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    if let Err(msg) = validate_name(&req.name) {
        return Err(AppError::bad_request("LEAD_INVALID_NAME", msg));
    }

    let mut lead = load_lead_checked(&state, &auth, &lead_id)?;
    lead.name = req.name.trim().to_string();
    lead.company_name = req.company_name;
    lead.contact_name = req.contact_name;
    lead.phone = req.phone;
    if let Some(status) = req.status {
        lead.status = status;
    }
    if let Some(owner_id) = req.owner_id {
        if owner_id != lead.owner_id {
            auth.require_at_least(Role::Gl)?;
            lead.owner_id = owner_id;
        }
    }
    lead.updated_at = Utc::now();

    state.store().update_lead(&lead)?;
    Ok(ok(lead))
}

async fn delete_lead(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(lead_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let _ = load_lead_checked(&state, &auth, &lead_id)?;
    state.store().delete_lead(&lead_id)?;
    Ok(ok(serde_json::json!({ "deleted": true })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentRequest {
    body: String,
    parent_id: Option<String>,
}

async fn list_lead_comments(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(lead_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let _ = load_lead_checked(&state, &auth, &lead_id)?;
    let tree = build_comment_tree(state.store().list_comments(&lead_id)?);
    Ok(ok(tree))
}

async fn create_lead_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(lead_id): Path<String>,
    JsonBody(req): JsonBody<CommentRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let _ = load_lead_checked(&state, &auth, &lead_id)?;
    let comment = state.store().create_comment(
        &lead_id,
        &auth.user_id,
        req.parent_id.as_deref(),
        &req.body,
    )?;
    Ok(created(comment))
}
