mod common;

use axum::http::Method;

use common::app::spawn_test_app;
use common::auth::seed_user_and_login;
use common::http::{authed, response_json, assert_json_error, assert_status_ok_json};
use crm_backend::store::operations::users::Role;

#[tokio::test]
async fn create_defaults_assignee_to_caller() {
    let test_app = spawn_test_app().await;
    let (sales_id, token) =
        seed_user_and_login(&test_app.app, &test_app.state, Role::Sales).await;

    let response = authed(
        &test_app.app,
        Method::POST,
        "/api/activities",
        Some(serde_json::json!({ "title": "Visit PT Jaya", "category": "Kanvasing" })),
        &token,
    )
    .await;
    let (status, _headers, body) = response_json(response).await;
    assert_eq!(status, 201);
    assert_eq!(body["data"]["assignedTo"], sales_id.as_str());
    assert_eq!(body["data"]["status"], "pending");
}

#[tokio::test]
async fn sales_cannot_assign_to_others() {
    let test_app = spawn_test_app().await;
    let (_sales_id, token) =
        seed_user_and_login(&test_app.app, &test_app.state, Role::Sales).await;
    let (other_id, _) = common::auth::seed_user(&test_app.state, Role::Sales);

    let response = authed(
        &test_app.app,
        Method::POST,
        "/api/activities",
        Some(serde_json::json!({
            "title": "Visit",
            "category": "Followup",
            "assignedTo": other_id,
        })),
        &token,
    )
    .await;
    let (status, _headers, body) = response_json(response).await;
    assert_eq!(status, 403);
    assert_json_error(&body, "FORBIDDEN");
}

#[tokio::test]
async fn gl_assigns_to_team_member() {
    let test_app = spawn_test_app().await;
    let (_gl_id, token) = seed_user_and_login(&test_app.app, &test_app.state, Role::Gl).await;
    let (sales_id, _) = common::auth::seed_user(&test_app.state, Role::Sales);

    let response = authed(
        &test_app.app,
        Method::POST,
        "/api/activities",
        Some(serde_json::json!({
            "title": "Offer draft",
            "category": "Penawaran",
            "assignedTo": sales_id,
        })),
        &token,
    )
    .await;
    let (status, _headers, body) = response_json(response).await;
    assert_eq!(status, 201);
    assert_eq!(body["data"]["assignedTo"], sales_id.as_str());
}

#[tokio::test]
async fn unknown_assignee_or_deal_is_rejected() {
    let test_app = spawn_test_app().await;
    let (_gl_id, token) = seed_user_and_login(&test_app.app, &test_app.state, Role::Gl).await;

    let response = authed(
        &test_app.app,
        Method::POST,
        "/api/activities",
        Some(serde_json::json!({
            "title": "Visit",
            "category": "Kanvasing",
            "assignedTo": "ghost",
        })),
        &token,
    )
    .await;
    let (status, _headers, body) = response_json(response).await;
    assert_eq!(status, 400);
    assert_json_error(&body, "ACTIVITY_UNKNOWN_ASSIGNEE");

    let response = authed(
        &test_app.app,
        Method::POST,
        "/api/activities",
        Some(serde_json::json!({
            "title": "Visit",
            "category": "Kanvasing",
            "dealId": "ghost-deal",
        })),
        &token,
    )
    .await;
    let (status, _headers, body) = response_json(response).await;
    assert_eq!(status, 400);
    assert_json_error(&body, "ACTIVITY_UNKNOWN_DEAL");
}

#[tokio::test]
async fn complete_marks_and_is_idempotent() {
    let test_app = spawn_test_app().await;
    let (_sales_id, token) =
        seed_user_and_login(&test_app.app, &test_app.state, Role::Sales).await;

    let response = authed(
        &test_app.app,
        Method::POST,
        "/api/activities",
        Some(serde_json::json!({ "title": "Call back", "category": "Followup" })),
        &token,
    )
    .await;
    let (_status, _headers, body) = response_json(response).await;
    let activity_id = body["data"]["id"].as_str().unwrap().to_string();

    let response = authed(
        &test_app.app,
        Method::POST,
        &format!("/api/activities/{activity_id}/complete"),
        None,
        &token,
    )
    .await;
    let (status, _headers, body) = response_json(response).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["status"], "completed");
    let first_completed_at = body["data"]["completedAt"].clone();

    let response = authed(
        &test_app.app,
        Method::POST,
        &format!("/api/activities/{activity_id}/complete"),
        None,
        &token,
    )
    .await;
    let (status, _headers, body) = response_json(response).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["completedAt"], first_completed_at);
}

#[tokio::test]
async fn list_filters_by_status() {
    let test_app = spawn_test_app().await;
    let (_sales_id, token) =
        seed_user_and_login(&test_app.app, &test_app.state, Role::Sales).await;

    let mut completed_id = String::new();
    for i in 0..3 {
        let response = authed(
            &test_app.app,
            Method::POST,
            "/api/activities",
            Some(serde_json::json!({ "title": format!("Task {i}"), "category": "Kanvasing" })),
            &token,
        )
        .await;
        let (_status, _headers, body) = response_json(response).await;
        completed_id = body["data"]["id"].as_str().unwrap().to_string();
    }

    let response = authed(
        &test_app.app,
        Method::POST,
        &format!("/api/activities/{completed_id}/complete"),
        None,
        &token,
    )
    .await;
    assert_eq!(response.status(), 200);

    let response = authed(
        &test_app.app,
        Method::GET,
        "/api/activities?status=completed",
        None,
        &token,
    )
    .await;
    let (status, _headers, body) = response_json(response).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["data"][0]["id"], completed_id.as_str());

    let response = authed(
        &test_app.app,
        Method::GET,
        "/api/activities?status=pending",
        None,
        &token,
    )
    .await;
    let (_status, _headers, body) = response_json(response).await;
    assert_eq!(body["data"]["total"], 2);
}

#[tokio::test]
async fn sales_cannot_list_another_users_activities() {
    let test_app = spawn_test_app().await;
    let (_sales_id, token) =
        seed_user_and_login(&test_app.app, &test_app.state, Role::Sales).await;
    let (other_id, _) = common::auth::seed_user(&test_app.state, Role::Sales);

    let response = authed(
        &test_app.app,
        Method::GET,
        &format!("/api/activities?assignedTo={other_id}"),
        None,
        &token,
    )
    .await;
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn cancelled_activity_cannot_complete() {
    let test_app = spawn_test_app().await;
    let (sales_id, token) =
        seed_user_and_login(&test_app.app, &test_app.state, Role::Sales).await;

    use crm_backend::kpi::categories::TaskCategory;
    use crm_backend::store::operations::activities::{ActivityRecord, ActivityStatus};

    let now = chrono::Utc::now();
    let activity_id = uuid::Uuid::new_v4().to_string();
    test_app
        .state
        .store()
        .create_activity(&ActivityRecord {
            id: activity_id.clone(),
            title: "Dropped".to_string(),
            assigned_to: sales_id,
            category: TaskCategory::Lainnya,
            status: ActivityStatus::Cancelled,
            deal_id: None,
            due_date: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        })
        .unwrap();

    let response = authed(
        &test_app.app,
        Method::POST,
        &format!("/api/activities/{activity_id}/complete"),
        None,
        &token,
    )
    .await;
    let (status, _headers, body) = response_json(response).await;
    assert_eq!(status, 400);
    assert_json_error(&body, "VALIDATION_ERROR");
}

#[tokio::test]
async fn completing_updates_kpi_snapshots() {
    let test_app = spawn_test_app().await;
    let (sales_id, token) =
        seed_user_and_login(&test_app.app, &test_app.state, Role::Sales).await;

    let response = authed(
        &test_app.app,
        Method::POST,
        "/api/activities",
        Some(serde_json::json!({ "title": "Send quote", "category": "Penawaran" })),
        &token,
    )
    .await;
    let (_status, _headers, body) = response_json(response).await;
    let activity_id = body["data"]["id"].as_str().unwrap().to_string();

    let response = authed(
        &test_app.app,
        Method::POST,
        &format!("/api/activities/{activity_id}/complete"),
        None,
        &token,
    )
    .await;
    assert_eq!(response.status(), 200);

    // the hook runs on a detached task; poll briefly for the snapshot
    let today = chrono::Utc::now().date_naive();
    let mut snapshot = None;
    for _ in 0..50 {
        snapshot = test_app
            .state
            .store()
            .get_daily_snapshot(&sales_id, today)
            .unwrap();
        if snapshot.is_some() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    let snapshot = snapshot.expect("daily snapshot written by completion hook");
    assert_eq!(snapshot.counts.penawaran, 1);
}
