mod common;

use axum::http::Method;
use chrono::{Datelike, TimeZone, Utc};

use common::app::spawn_test_app;
use common::auth::{admin_token, seed_user_and_login};
use common::fixtures::{seed_completed_activity, set_daily_target, thresholds};
use common::http::{authed, response_json, assert_json_error, assert_status_ok_json};
use crm_backend::kpi::categories::TaskCategory;
use crm_backend::store::operations::users::Role;

fn daily_target_body(k: u32, f: u32, p: u32, kt: u32, d: u32) -> serde_json::Value {
    serde_json::json!({
        "thresholds": {
            "kanvasing": k,
            "followup": f,
            "penawaran": p,
            "kesepakatanTarif": kt,
            "dealDo": d,
        }
    })
}

#[tokio::test]
async fn manager_replaces_target_and_reads_history() {
    let test_app = spawn_test_app().await;
    let (_manager_id, token) =
        seed_user_and_login(&test_app.app, &test_app.state, Role::Manager).await;

    let response = authed(
        &test_app.app,
        Method::PUT,
        "/api/kpi/targets/daily",
        Some(daily_target_body(5, 5, 1, 1, 1)),
        &token,
    )
    .await;
    let (status, _headers, body) = response_json(response).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["version"], 1);
    assert_eq!(body["data"]["isActive"], true);

    let response = authed(
        &test_app.app,
        Method::PUT,
        "/api/kpi/targets/daily",
        Some(daily_target_body(3, 3, 1, 0, 0)),
        &token,
    )
    .await;
    let (_status, _headers, body) = response_json(response).await;
    assert_eq!(body["data"]["version"], 2);

    let response = authed(
        &test_app.app,
        Method::GET,
        "/api/kpi/targets/daily",
        None,
        &token,
    )
    .await;
    let (status, _headers, body) = response_json(response).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["version"], 2);
    assert_eq!(body["data"]["thresholds"]["kanvasing"], 3);

    let response = authed(
        &test_app.app,
        Method::GET,
        "/api/kpi/targets/daily/history",
        None,
        &token,
    )
    .await;
    let (status, _headers, body) = response_json(response).await;
    assert_status_ok_json(status, &body);
    let history = body["data"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["isActive"], false);
    assert_eq!(history[1]["isActive"], true);
}

#[tokio::test]
async fn sales_cannot_change_targets() {
    let test_app = spawn_test_app().await;
    let (_sales_id, token) =
        seed_user_and_login(&test_app.app, &test_app.state, Role::Sales).await;

    let response = authed(
        &test_app.app,
        Method::PUT,
        "/api/kpi/targets/daily",
        Some(daily_target_body(1, 1, 1, 1, 1)),
        &token,
    )
    .await;
    let (status, _headers, body) = response_json(response).await;
    assert_eq!(status, 403);
    assert_json_error(&body, "FORBIDDEN");

    let response = authed(
        &test_app.app,
        Method::GET,
        "/api/kpi/targets/daily/history",
        None,
        &token,
    )
    .await;
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn unknown_period_type_is_rejected() {
    let test_app = spawn_test_app().await;
    let token = admin_token(&test_app.app).await;

    let response = authed(
        &test_app.app,
        Method::GET,
        "/api/kpi/targets/weekly",
        None,
        &token,
    )
    .await;
    let (status, _headers, body) = response_json(response).await;
    assert_eq!(status, 400);
    assert_json_error(&body, "INVALID_PERIOD");
}

#[tokio::test]
async fn sales_aggregates_own_daily_kpi() {
    let test_app = spawn_test_app().await;
    let (sales_id, token) =
        seed_user_and_login(&test_app.app, &test_app.state, Role::Sales).await;

    set_daily_target(&test_app.state, thresholds(1, 0, 0, 0, 0));
    let ts = Utc.with_ymd_and_hms(2026, 3, 7, 9, 0, 0).unwrap();
    seed_completed_activity(&test_app.state, &sales_id, TaskCategory::Kanvasing, ts);

    let response = authed(
        &test_app.app,
        Method::POST,
        "/api/kpi/aggregate/daily",
        Some(serde_json::json!({ "date": "2026-03-07" })),
        &token,
    )
    .await;
    let (status, _headers, body) = response_json(response).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["salesId"], sales_id.as_str());
    assert_eq!(body["data"]["counts"]["kanvasing"], 1);
    assert_eq!(body["data"]["status"], "Met");
}

#[tokio::test]
async fn sales_cannot_aggregate_for_others() {
    let test_app = spawn_test_app().await;
    let (_sales_id, token) =
        seed_user_and_login(&test_app.app, &test_app.state, Role::Sales).await;
    let (other_id, _) = common::auth::seed_user(&test_app.state, Role::Sales);

    let response = authed(
        &test_app.app,
        Method::POST,
        "/api/kpi/aggregate/daily",
        Some(serde_json::json!({ "salesId": other_id })),
        &token,
    )
    .await;
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn manager_aggregates_monthly_for_a_salesperson() {
    let test_app = spawn_test_app().await;
    let (_manager_id, token) =
        seed_user_and_login(&test_app.app, &test_app.state, Role::Manager).await;
    let (sales_id, _) = common::auth::seed_user(&test_app.state, Role::Sales);

    let ts = Utc.with_ymd_and_hms(2026, 3, 15, 9, 0, 0).unwrap();
    seed_completed_activity(&test_app.state, &sales_id, TaskCategory::Followup, ts);

    let response = authed(
        &test_app.app,
        Method::POST,
        "/api/kpi/aggregate/monthly",
        Some(serde_json::json!({ "salesId": sales_id, "year": 2026, "month": 3 })),
        &token,
    )
    .await;
    let (status, _headers, body) = response_json(response).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["counts"]["followup"], 1);
    // no monthly target configured, so the period cannot be met
    assert_eq!(body["data"]["status"], "NotMet");
}

#[tokio::test]
async fn run_all_requires_manager_and_reports_failures() {
    let test_app = spawn_test_app().await;
    let (sales_id, sales_token) =
        seed_user_and_login(&test_app.app, &test_app.state, Role::Sales).await;
    let (_manager_id, manager_token) =
        seed_user_and_login(&test_app.app, &test_app.state, Role::Manager).await;

    let ts = Utc.with_ymd_and_hms(2026, 3, 7, 9, 0, 0).unwrap();
    seed_completed_activity(&test_app.state, &sales_id, TaskCategory::Kanvasing, ts);
    // candidate with an activity but no user row fails inside the batch
    seed_completed_activity(&test_app.state, "ghost", TaskCategory::Kanvasing, ts);

    let payload = serde_json::json!({ "periodType": "daily", "date": "2026-03-07" });

    let response = authed(
        &test_app.app,
        Method::POST,
        "/api/kpi/aggregate/run-all",
        Some(payload.clone()),
        &sales_token,
    )
    .await;
    assert_eq!(response.status(), 403);

    let response = authed(
        &test_app.app,
        Method::POST,
        "/api/kpi/aggregate/run-all",
        Some(payload),
        &manager_token,
    )
    .await;
    let (status, _headers, body) = response_json(response).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["succeeded"], 1);
    assert_eq!(body["data"]["failed"], 1);
}

#[tokio::test]
async fn monthly_run_all_requires_year_and_month() {
    let test_app = spawn_test_app().await;
    let token = admin_token(&test_app.app).await;

    let response = authed(
        &test_app.app,
        Method::POST,
        "/api/kpi/aggregate/run-all",
        Some(serde_json::json!({ "periodType": "monthly" })),
        &token,
    )
    .await;
    let (status, _headers, body) = response_json(response).await;
    assert_eq!(status, 400);
    assert_json_error(&body, "INVALID_PERIOD");
}

#[tokio::test]
async fn sales_snapshot_reads_are_pinned_to_self() {
    let test_app = spawn_test_app().await;
    let (sales_id, token) =
        seed_user_and_login(&test_app.app, &test_app.state, Role::Sales).await;
    let (other_id, _) = common::auth::seed_user(&test_app.state, Role::Sales);

    let ts = Utc.with_ymd_and_hms(2026, 3, 7, 9, 0, 0).unwrap();
    seed_completed_activity(&test_app.state, &sales_id, TaskCategory::Kanvasing, ts);
    test_app
        .state
        .kpi()
        .aggregate_daily(&sales_id, Some(ts.date_naive()))
        .unwrap();

    // no salesId: pinned to the caller, single-snapshot shape
    let response = authed(
        &test_app.app,
        Method::GET,
        "/api/kpi/daily?date=2026-03-07",
        None,
        &token,
    )
    .await;
    let (status, _headers, body) = response_json(response).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["snapshot"]["salesId"], sales_id.as_str());

    // someone else's salesId: forbidden
    let response = authed(
        &test_app.app,
        Method::GET,
        &format!("/api/kpi/daily?date=2026-03-07&salesId={other_id}"),
        None,
        &token,
    )
    .await;
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn manager_reads_all_daily_snapshots() {
    let test_app = spawn_test_app().await;
    let (_manager_id, token) =
        seed_user_and_login(&test_app.app, &test_app.state, Role::Manager).await;

    let ts = Utc.with_ymd_and_hms(2026, 3, 7, 9, 0, 0).unwrap();
    for _ in 0..2 {
        let (sales_id, _) = common::auth::seed_user(&test_app.state, Role::Sales);
        seed_completed_activity(&test_app.state, &sales_id, TaskCategory::Followup, ts);
        test_app
            .state
            .kpi()
            .aggregate_daily(&sales_id, Some(ts.date_naive()))
            .unwrap();
    }

    let response = authed(
        &test_app.app,
        Method::GET,
        "/api/kpi/daily?date=2026-03-07",
        None,
        &token,
    )
    .await;
    let (status, _headers, body) = response_json(response).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["snapshots"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn daily_range_lists_own_snapshots() {
    let test_app = spawn_test_app().await;
    let (sales_id, token) =
        seed_user_and_login(&test_app.app, &test_app.state, Role::Sales).await;

    for day in [5, 7, 20] {
        let ts = Utc.with_ymd_and_hms(2026, 3, day, 9, 0, 0).unwrap();
        seed_completed_activity(&test_app.state, &sales_id, TaskCategory::Kanvasing, ts);
        test_app
            .state
            .kpi()
            .aggregate_daily(&sales_id, Some(ts.date_naive()))
            .unwrap();
    }

    let response = authed(
        &test_app.app,
        Method::GET,
        "/api/kpi/daily?from=2026-03-01&to=2026-03-10",
        None,
        &token,
    )
    .await;
    let (status, _headers, body) = response_json(response).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["salesId"], sales_id.as_str());
    assert_eq!(body["data"]["snapshots"].as_array().unwrap().len(), 2);

    let response = authed(
        &test_app.app,
        Method::GET,
        "/api/kpi/daily?from=2026-03-10&to=2026-03-01",
        None,
        &token,
    )
    .await;
    let (status, _headers, body) = response_json(response).await;
    assert_eq!(status, 400);
    assert_json_error(&body, "INVALID_PERIOD");
}

#[tokio::test]
async fn monthly_defaults_to_current_period() {
    let test_app = spawn_test_app().await;
    let (sales_id, token) =
        seed_user_and_login(&test_app.app, &test_app.state, Role::Sales).await;

    let now = Utc::now();
    test_app
        .state
        .kpi()
        .aggregate_monthly(&sales_id, now.year(), now.month())
        .unwrap();

    let response = authed(&test_app.app, Method::GET, "/api/kpi/monthly", None, &token).await;
    let (status, _headers, body) = response_json(response).await;
    assert_status_ok_json(status, &body);
    assert_eq!(body["data"]["year"], now.year());
    assert_eq!(body["data"]["month"], now.month());
    assert_eq!(body["data"]["snapshot"]["salesId"], sales_id.as_str());
}
