use chrono::{DateTime, Utc};

use crm_backend::kpi::categories::{CategoryThresholds, TaskCategory};
use crm_backend::kpi::period::PeriodType;
use crm_backend::state::AppState;
use crm_backend::store::operations::activities::{ActivityRecord, ActivityStatus};

/// Seed an already-completed activity directly in the store.
pub fn seed_completed_activity(
    state: &AppState,
    assigned_to: &str,
    category: TaskCategory,
    completed_at: DateTime<Utc>,
) -> String {
    let id = uuid::Uuid::new_v4().to_string();
    let now = Utc::now();
    state
        .store()
        .create_activity(&ActivityRecord {
            id: id.clone(),
            title: format!("Seeded {category:?}"),
            assigned_to: assigned_to.to_string(),
            category,
            status: ActivityStatus::Completed,
            deal_id: None,
            due_date: None,
            completed_at: Some(completed_at),
            created_at: now,
            updated_at: now,
        })
        .expect("seed activity");
    id
}

pub fn thresholds(k: u32, f: u32, p: u32, kt: u32, d: u32) -> CategoryThresholds {
    CategoryThresholds {
        kanvasing: k,
        followup: f,
        penawaran: p,
        kesepakatan_tarif: kt,
        deal_do: d,
    }
}

pub fn set_daily_target(state: &AppState, t: CategoryThresholds) {
    state
        .store()
        .replace_active_target(PeriodType::Daily, t)
        .expect("set daily target");
}

pub fn set_monthly_target(state: &AppState, t: CategoryThresholds) {
    state
        .store()
        .replace_active_target(PeriodType::Monthly, t)
        .expect("set monthly target");
}
