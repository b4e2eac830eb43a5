use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::constants::DEFAULT_PAGE_SIZE_ACTIVITIES;
use crate::extractors::JsonBody;
use crate::kpi::categories::TaskCategory;
use crate::kpi::engine::spawn_completion_hook;
use crate::response::{created, ok, paginated, AppError};
use crate::state::AppState;
use crate::store::operations::activities::{ActivityRecord, ActivityStatus};
use crate::store::operations::users::Role;
use crate::validation::validate_name;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_activities).post(create_activity))
        .route(
            "/:id",
            get(get_activity).put(update_activity).delete(delete_activity),
        )
        .route("/:id/complete", post(complete_activity))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityListQuery {
    assigned_to: Option<String>,
    status: Option<ActivityStatus>,
    page: Option<u64>,
    per_page: Option<u64>,
}

async fn list_activities(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ActivityListQuery>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let assignee = query.assigned_to.unwrap_or_else(|| auth.user_id.clone());
    if !auth.can_access_user(&assignee) {
        return Err(AppError::forbidden("Insufficient role"));
    }

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query
        .per_page
        .unwrap_or(DEFAULT_PAGE_SIZE_ACTIVITIES)
        .clamp(1, crate::constants::MAX_PAGE_SIZE);

    let (rows, total) = state.store().list_user_activities(
        &assignee,
        per_page as usize,
        ((page - 1) * per_page) as usize,
        query.status,
    )?;
    Ok(paginated(rows, total as u64, page, per_page))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityRequest {
    title: String,
    category: TaskCategory,
    assigned_to: Option<String>,
    deal_id: Option<String>,
    due_date: Option<DateTime<Utc>>,
}

async fn create_activity(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ActivityRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    if let Err(msg) = validate_name(&req.title) {
        return Err(AppError::bad_request("ACTIVITY_INVALID_TITLE", msg));
    }

    let assigned_to = req.assigned_to.unwrap_or_else(|| auth.user_id.clone());
    if assigned_to != auth.user_id {
        auth.require_at_least(Role::Gl)?;
        if state.store().get_user_by_id(&assigned_to)?.is_none() {
            return Err(AppError::bad_request(
                "ACTIVITY_UNKNOWN_ASSIGNEE",
                "Assignee does not exist",
            ));
        }
    }
    if let Some(deal_id) = &req.deal_id {
        if state.store().get_deal(deal_id)?.is_none() {
            return Err(AppError::bad_request(
                "ACTIVITY_UNKNOWN_DEAL",
                "Referenced deal does not exist",
            ));
        }
    }

    let now = Utc::now();
    let activity = ActivityRecord {
        id: uuid::Uuid::new_v4().to_string(),
        title: req.title.trim().to_string(),
        assigned_to,
        category: req.category,
        status: ActivityStatus::Pending,
        deal_id: req.deal_id,
        due_date: req.due_date,
        completed_at: None,
        created_at: now,
        updated_at: now,
    };
    state.store().create_activity(&activity)?;
    Ok(created(activity))
}

fn load_activity_checked(
    state: &AppState,
    auth: &AuthUser,
    activity_id: &str,
) -> Result<ActivityRecord, AppError> {
    let activity = state
        .store()
        .get_activity_by_id(activity_id)?
        .ok_or_else(|| AppError::not_found(&format!("Activity not found: {activity_id}")))?;
    if !auth.can_access_user(&activity.assigned_to) {
        return Err(AppError::forbidden("Insufficient role"));
    }
    Ok(activity)
}

async fn get_activity(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(activity_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let activity = load_activity_checked(&state, &auth, &activity_id)?;
    Ok(ok(activity))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateActivityRequest {
    title: Option<String>,
    category: Option<TaskCategory>,
    assigned_to: Option<String>,
    deal_id: Option<String>,
    due_date: Option<DateTime<Utc>>,
}

async fn update_activity(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(activity_id): Path<String>,
    JsonBody(req): JsonBody<UpdateActivityRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let mut activity = load_activity_checked(&state, &auth, &activity_id)?;

    if let Some(title) = req.title {
        if let Err(msg) = validate_name(&title) {
            return Err(AppError::bad_request("ACTIVITY_INVALID_TITLE", msg));
        }
        activity.title = title.trim().to_string();
    }
    if let Some(category) = req.category {
        activity.category = category;
    }
    if let Some(assigned_to) = req.assigned_to {
        if assigned_to != activity.assigned_to {
            auth.require_at_least(Role::Gl)?;
            activity.assigned_to = assigned_to;
        }
    }
    if req.deal_id.is_some() {
        activity.deal_id = req.deal_id;
    }
    if req.due_date.is_some() {
        activity.due_date = req.due_date;
    }
    activity.updated_at = Utc::now();

    state.store().update_activity(&activity)?;
    Ok(ok(activity))
}

async fn delete_activity(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(activity_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let _ = load_activity_checked(&state, &auth, &activity_id)?;
    state.store().delete_activity(&activity_id)?;
    Ok(ok(serde_json::json!({ "deleted": true })))
}

/// Mark an activity completed and kick off KPI recomputation for its day and
/// month. The recomputation runs on a detached task: its failure is logged,
/// never surfaced here, so completing work cannot fail on KPI bookkeeping.
async fn complete_activity(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(activity_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let _ = load_activity_checked(&state, &auth, &activity_id)?;

    let completed = state.store().complete_activity(&activity_id, Utc::now())?;
    spawn_completion_hook(
        state.kpi().clone(),
        completed.id.clone(),
        completed.assigned_to.clone(),
    );

    Ok(ok(completed))
}
