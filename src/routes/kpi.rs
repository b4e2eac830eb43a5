use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Router;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::extractors::JsonBody;
use crate::kpi::categories::CategoryThresholds;
use crate::kpi::engine::BulkPeriod;
use crate::kpi::period::PeriodType;
use crate::response::{ok, AppError};
use crate::state::AppState;
use crate::store::operations::users::Role;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/daily", get(get_daily))
        .route("/monthly", get(get_monthly))
        .route("/aggregate/daily", post(aggregate_daily))
        .route("/aggregate/monthly", post(aggregate_monthly))
        .route("/aggregate/run-all", post(aggregate_run_all))
        .route("/targets/:period_type", get(get_active_target).put(replace_target))
        .route("/targets/:period_type/history", get(get_target_history))
}

/// Resolve the salesperson a snapshot query applies to. Salespeople are
/// pinned to themselves; `salesId` only means something at Gl and above.
fn resolve_sales_scope(auth: &AuthUser, requested: Option<String>) -> Result<Option<String>, AppError> {
    match requested {
        Some(id) if !auth.can_access_user(&id) => Err(AppError::forbidden("Insufficient role")),
        Some(id) => Ok(Some(id)),
        None if auth.role.at_least(Role::Gl) => Ok(None),
        None => Ok(Some(auth.user_id.clone())),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DailyQuery {
    date: Option<NaiveDate>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    sales_id: Option<String>,
}

async fn get_daily(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<DailyQuery>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    // ?from&to lists one salesperson's snapshots over a closed date range
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(AppError::bad_request(
                "INVALID_PERIOD",
                "from must not be after to",
            ));
        }
        let sales_id = resolve_sales_scope(&auth, query.sales_id)?
            .unwrap_or_else(|| auth.user_id.clone());
        let rows = state
            .store()
            .list_daily_snapshots_for_sales(&sales_id, from, to)?;
        return Ok(ok(serde_json::json!({
            "from": from,
            "to": to,
            "salesId": sales_id,
            "snapshots": rows,
        })));
    }

    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    match resolve_sales_scope(&auth, query.sales_id)? {
        Some(sales_id) => {
            let snapshot = state.store().get_daily_snapshot(&sales_id, date)?;
            Ok(ok(serde_json::json!({ "date": date, "snapshot": snapshot })))
        }
        None => {
            let rows = state.store().list_daily_snapshots(date)?;
            Ok(ok(serde_json::json!({ "date": date, "snapshots": rows })))
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MonthlyQuery {
    year: Option<i32>,
    month: Option<u32>,
    sales_id: Option<String>,
}

async fn get_monthly(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<MonthlyQuery>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let today = Utc::now().date_naive();
    let year = query.year.unwrap_or_else(|| chrono::Datelike::year(&today));
    let month = query.month.unwrap_or_else(|| chrono::Datelike::month(&today));
    if !(1..=12).contains(&month) {
        return Err(AppError::bad_request("INVALID_PERIOD", "Month must be 1-12"));
    }

    match resolve_sales_scope(&auth, query.sales_id)? {
        Some(sales_id) => {
            let snapshot = state.store().get_monthly_snapshot(&sales_id, year, month)?;
            Ok(ok(serde_json::json!({
                "year": year,
                "month": month,
                "snapshot": snapshot,
            })))
        }
        None => {
            let rows = state.store().list_monthly_snapshots(year, month)?;
            Ok(ok(serde_json::json!({
                "year": year,
                "month": month,
                "snapshots": rows,
            })))
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AggregateDailyRequest {
    sales_id: Option<String>,
    date: Option<NaiveDate>,
}

async fn aggregate_daily(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<AggregateDailyRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let sales_id = req.sales_id.unwrap_or_else(|| auth.user_id.clone());
    if sales_id != auth.user_id {
        auth.require_at_least(Role::Manager)?;
    }

    let snapshot = state.kpi().aggregate_daily(&sales_id, req.date)?;
    Ok(ok(snapshot))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AggregateMonthlyRequest {
    sales_id: Option<String>,
    year: i32,
    month: u32,
}

async fn aggregate_monthly(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<AggregateMonthlyRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let sales_id = req.sales_id.unwrap_or_else(|| auth.user_id.clone());
    if sales_id != auth.user_id {
        auth.require_at_least(Role::Manager)?;
    }

    let snapshot = state.kpi().aggregate_monthly(&sales_id, req.year, req.month)?;
    Ok(ok(snapshot))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunAllRequest {
    period_type: PeriodType,
    date: Option<NaiveDate>,
    year: Option<i32>,
    month: Option<u32>,
}

async fn aggregate_run_all(
    auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RunAllRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    auth.require_at_least(Role::Manager)?;

    let period = match req.period_type {
        PeriodType::Daily => {
            BulkPeriod::Daily(req.date.unwrap_or_else(|| Utc::now().date_naive()))
        }
        PeriodType::Monthly => {
            let (year, month) = match (req.year, req.month) {
                (Some(y), Some(m)) => (y, m),
                _ => {
                    return Err(AppError::bad_request(
                        "INVALID_PERIOD",
                        "Monthly run requires year and month",
                    ))
                }
            };
            BulkPeriod::Monthly { year, month }
        }
    };

    let summary = state.kpi().run_for_all_users(period)?;
    tracing::info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Bulk KPI run completed"
    );
    Ok(ok(summary))
}

fn parse_period_type(raw: &str) -> Result<PeriodType, AppError> {
    PeriodType::parse(raw).ok_or_else(|| {
        AppError::bad_request("INVALID_PERIOD", "Period type must be daily or monthly")
    })
}

async fn get_active_target(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(period_type): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let period_type = parse_period_type(&period_type)?;
    let target = state.store().find_active_target(period_type)?;
    Ok(ok(target))
}

async fn get_target_history(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(period_type): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    auth.require_at_least(Role::Manager)?;
    let period_type = parse_period_type(&period_type)?;
    let history = state.store().list_target_history(period_type)?;
    Ok(ok(history))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplaceTargetRequest {
    thresholds: CategoryThresholds,
}

async fn replace_target(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(period_type): Path<String>,
    JsonBody(req): JsonBody<ReplaceTargetRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    auth.require_at_least(Role::Manager)?;
    let period_type = parse_period_type(&period_type)?;
    let target = state
        .store()
        .replace_active_target(period_type, req.thresholds)?;
    tracing::info!(
        period = period_type.as_str(),
        version = target.version,
        "KPI target replaced"
    );
    Ok(ok(target))
}
