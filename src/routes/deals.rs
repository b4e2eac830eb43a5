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
use crate::store::operations::deals::{Deal, DealStage};
use crate::store::operations::users::Role;
use crate::validation::validate_name;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_deals).post(create_deal))
        .route("/:id", get(get_deal).put(update_deal).delete(delete_deal))
        .route("/:id/comments", get(list_deal_comments).post(create_deal_comment))
}

async fn list_deals(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let creator_filter = if auth.role.at_least(Role::Gl) {
        None
    } else {
        Some(auth.user_id.as_str())
    };

    let (rows, total) = state.store().list_deals(
        page.limit(),
        page.offset(),
        page.query(),
        creator_filter,
    )?;
    Ok(paginated(rows, total as u64, page.page(), page.per_page()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DealRequest {
    title: String,
    lead_id: Option<String>,
    company_id: Option<String>,
    value: Option<i64>,
    stage: Option<DealStage>,
}

async fn create_deal(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<DealRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    if let Err(msg) = validate_name(&req.title) {
        return Err(AppError::bad_request("DEAL_INVALID_TITLE", msg));
    }
    if let Some(lead_id) = &req.lead_id {
        if state.store().get_lead(lead_id)?.is_none() {
            return Err(AppError::bad_request(
                "DEAL_UNKNOWN_LEAD",
                "Referenced lead does not exist",
            ));
        }
    }
    if let Some(company_id) = &req.company_id {
        if state.store().get_company(company_id)?.is_none() {
            return Err(AppError::bad_request(
                "DEAL_UNKNOWN_COMPANY",
                "Referenced company does not exist",
            ));
        }
    }

    let now = Utc::now();
    let deal = Deal {
        id: uuid::Uuid::new_v4().to_string(),
        title: req.title.trim().to_string(),
        lead_id: req.lead_id,
        company_id: req.company_id,
        value: req.value.unwrap_or(0),
        stage: req.stage.unwrap_or(DealStage::Open),
        created_by: auth.user_id.clone(),
        created_at: now,
        updated_at: now,
    };
    state.store().create_deal(&deal)?;
    Ok(created(deal))
}

fn load_deal_checked(
    state: &AppState,
    auth: &AuthUser,
    deal_id: &str,
) -> Result<Deal, AppError> {
    let deal = state
        .store()
        .get_deal(deal_id)?
        .ok_or_else(|| AppError::not_found(&format!("Deal not found: {deal_id}")))?;
    if !auth.can_access_user(&deal.created_by) {
        return Err(AppError::forbidden("Insufficient role"));
    }
    Ok(deal)
}

async fn get_deal(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(deal_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let deal = load_deal_checked(&state, &auth, &deal_id)?;
    let comments = build_comment_tree(state.store().list_comments(&deal_id)?);
    Ok(ok(serde_json::json!({ "deal": deal, "comments": comments })))
}

async fn update_deal(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(deal_id): Path<String>,
    JsonBody(req): JsonBody<DealRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    if let Err(msg) = validate_name(&req.title) {
        return Err(AppError::bad_request("DEAL_INVALID_TITLE", msg));
    }

    let mut deal = load_deal_checked(&state, &auth, &deal_id)?;
    deal.title = req.title.trim().to_string();
    deal.lead_id = req.lead_id;
    deal.company_id = req.company_id;
    if let Some(value) = req.value {
        deal.value = value;
    }
    if let Some(stage) = req.stage {
        deal.stage = stage;
    }
    deal.updated_at = Utc::now();

    state.store().update_deal(&deal)?;
    Ok(ok(deal))
}

async fn delete_deal(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(deal_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let _ = load_deal_checked(&state, &auth, &deal_id)?;
    state.store().delete_deal(&deal_id)?;
    Ok(ok(serde_json::json!({ "deleted": true })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentRequest {
    body: String,
    parent_id: Option<String>,
}

async fn list_deal_comments(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(deal_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let _ = load_deal_checked(&state, &auth, &deal_id)?;
    let tree = build_comment_tree(state.store().list_comments(&deal_id)?);
    Ok(ok(tree))
}

async fn create_deal_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(deal_id): Path<String>,
    JsonBody(req): JsonBody<CommentRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let _ = load_deal_checked(&state, &auth, &deal_id)?;
    let comment = state.store().create_comment(
        &deal_id,
        &auth.user_id,
        req.parent_id.as_deref(),
        &req.body,
    )?;
    Ok(created(comment))
}
