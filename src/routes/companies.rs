use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::extractors::JsonBody;
use crate::response::{created, ok, paginated, AppError};
use crate::routes::PageQuery;
use crate::state::AppState;
use crate::store::operations::companies::Company;
use crate::validation::validate_name;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_companies).post(create_company))
        .route(
            "/:id",
            get(get_company).put(update_company).delete(delete_company),
        )
}

async fn list_companies(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let (rows, total) =
        state
            .store()
            .list_companies(page.limit(), page.offset(), page.query())?;
    Ok(paginated(rows, total as u64, page.page(), page.per_page()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompanyRequest {
    name: String,
    address: Option<String>,
    phone: Option<String>,
}

async fn create_company(
    _auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CompanyRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    if let Err(msg) = validate_name(&req.name) {
        return Err(AppError::bad_request("COMPANY_INVALID_NAME", msg));
    }

    let now = Utc::now();
    let company = Company {
        id: uuid::Uuid::new_v4().to_string(),
        name: req.name.trim().to_string(),
        address: req.address,
        phone: req.phone,
        created_at: now,
        updated_at: now,
    };
    state.store().create_company(&company)?;
    Ok(created(company))
}

async fn get_company(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let company = state
        .store()
        .get_company(&company_id)?
        .ok_or_else(|| AppError::not_found(&format!("Company not found: {company_id}")))?;
    Ok(ok(company))
}

async fn update_company(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(company_id): Path<String>,
    JsonBody(req): JsonBody<CompanyRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    if let Err(msg) = validate_name(&req.name) {
        return Err(AppError::bad_request("COMPANY_INVALID_NAME", msg));
    }

    let mut company = state
        .store()
        .get_company(&company_id)?
        .ok_or_else(|| AppError::not_found(&format!("Company not found: {company_id}")))?;

    company.name = req.name.trim().to_string();
    company.address = req.address;
    company.phone = req.phone;
    company.updated_at = Utc::now();

    state.store().update_company(&company)?;
    Ok(ok(company))
}

async fn delete_company(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(company_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    state.store().delete_company(&company_id)?;
    Ok(ok(serde_json::json!({ "deleted": true })))
}
