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
use crate::store::operations::contacts::Contact;
use crate::validation::{is_valid_email, validate_name};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_contacts).post(create_contact))
        .route(
            "/:id",
            get(get_contact).put(update_contact).delete(delete_contact),
        )
}

async fn list_contacts(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let (rows, total) = state
        .store()
        .list_contacts(page.limit(), page.offset(), page.query())?;
    Ok(paginated(rows, total as u64, page.page(), page.per_page()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContactRequest {
    name: String,
    company_id: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    position: Option<String>,
}

fn validate_contact(req: &ContactRequest, state: &AppState) -> Result<(), AppError> {
    if let Err(msg) = validate_name(&req.name) {
        return Err(AppError::bad_request("CONTACT_INVALID_NAME", msg));
    }
    if let Some(email) = &req.email {
        if !is_valid_email(email) {
            return Err(AppError::bad_request(
                "CONTACT_INVALID_EMAIL",
                "Invalid email format",
            ));
        }
    }
    if let Some(company_id) = &req.company_id {
        if state.store().get_company(company_id)?.is_none() {
            return Err(AppError::bad_request(
                "CONTACT_UNKNOWN_COMPANY",
                "Referenced company does not exist",
            ));
        }
    }
    Ok(())
}

async fn create_contact(
    _auth: AuthUser,
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ContactRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    validate_contact(&req, &state)?;

    let now = Utc::now();
    let contact = Contact {
        id: uuid::Uuid::new_v4().to_string(),
        company_id: req.company_id,
        name: req.name.trim().to_string(),
        email: req.email,
        phone: req.phone,
        position: req.position,
        created_at: now,
        updated_at: now,
    };
    state.store().create_contact(&contact)?;
    Ok(created(contact))
}

async fn get_contact(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(contact_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let contact = state
        .store()
        .get_contact(&contact_id)?
        .ok_or_else(|| AppError::not_found(&format!("Contact not found: {contact_id}")))?;
    Ok(ok(contact))
}

async fn update_contact(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(contact_id): Path<String>,
    JsonBody(req): JsonBody<ContactRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    validate_contact(&req, &state)?;

    let mut contact = state
        .store()
        .get_contact(&contact_id)?
        .ok_or_else(|| AppError::not_found(&format!("Contact not found: {contact_id}")))?;

    contact.name = req.name.trim().to_string();
    contact.company_id = req.company_id;
    contact.email = req.email;
    contact.phone = req.phone;
    contact.position = req.position;
    contact.updated_at = Utc::now();

    state.store().update_contact(&contact)?;
    Ok(ok(contact))
}

async fn delete_contact(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(contact_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    state.store().delete_contact(&contact_id)?;
    Ok(ok(serde_json::json!({ "deleted": true })))
}
