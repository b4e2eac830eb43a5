use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use thiserror::Error;

use crate::constants::MAX_BULK_RUN_USERS;
use crate::kpi::period::{day_window, month_window, year_month_of, PeriodType};
use crate::store::operations::kpi_snapshots::{KpiSnapshot, KpiStatus, SnapshotPeriod};
use crate::store::{Store, StoreError};

#[derive(Debug, Error)]
pub enum KpiError {
    #[error("user not found: {0}")]
    UserNotFound(String),
    #[error("invalid period: {0}")]
    InvalidPeriod(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<KpiError> for crate::response::AppError {
    fn from(value: KpiError) -> Self {
        match value {
            KpiError::UserNotFound(id) => {
                crate::response::AppError::not_found(&format!("User not found: {id}"))
            }
            KpiError::InvalidPeriod(msg) => {
                crate::response::AppError::bad_request("INVALID_PERIOD", &msg)
            }
            KpiError::Store(se) => se.into(),
        }
    }
}

/// Period selector for a bulk run.
#[derive(Debug, Clone, Copy)]
pub enum BulkPeriod {
    Daily(NaiveDate),
    Monthly { year: i32, month: u32 },
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUserResult {
    pub user_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRunSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BulkUserResult>,
}

/// Computes and persists KPI snapshots. Each invocation is a self-contained
/// read-aggregate-write: no caching, no locking. Concurrent runs for the same
/// `(user, period)` race benignly at the store, where the last computed view
/// wins; a snapshot is a pure function of the activity rows it reads.
pub struct KpiEngine {
    store: Arc<Store>,
}

impl KpiEngine {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Aggregate one user's completed activities for one calendar date and
    /// upsert the daily snapshot. `date` defaults to the current UTC day.
    pub fn aggregate_daily(
        &self,
        user_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<KpiSnapshot, KpiError> {
        let date = date.unwrap_or_else(|| Utc::now().date_naive());
        let (start, end) = day_window(date);
        self.aggregate_window(
            user_id,
            start,
            end,
            SnapshotPeriod::Daily { date },
            PeriodType::Daily,
        )
    }

    /// Aggregate one user's completed activities for one calendar month and
    /// upsert the monthly snapshot.
    pub fn aggregate_monthly(
        &self,
        user_id: &str,
        year: i32,
        month: u32,
    ) -> Result<KpiSnapshot, KpiError> {
        let (start, end) = month_window(year, month)
            .ok_or_else(|| KpiError::InvalidPeriod(format!("{year}-{month:02}")))?;
        self.aggregate_window(
            user_id,
            start,
            end,
            SnapshotPeriod::Monthly { year, month },
            PeriodType::Monthly,
        )
    }

    fn aggregate_window(
        &self,
        user_id: &str,
        start: chrono::DateTime<Utc>,
        end: chrono::DateTime<Utc>,
        period: SnapshotPeriod,
        period_type: PeriodType,
    ) -> Result<KpiSnapshot, KpiError> {
        let user = self
            .store
            .get_user_by_id(user_id)?
            .ok_or_else(|| KpiError::UserNotFound(user_id.to_string()))?;

        let counts = self
            .store
            .count_completed_by_category(user_id, start, end)?;

        // No configured target reads as "requirements not satisfied",
        // never as "no requirement".
        let status = match self.store.find_active_target(period_type)? {
            Some(target) if counts.meets(&target.thresholds) => KpiStatus::Met,
            _ => KpiStatus::NotMet,
        };

        let snapshot = KpiSnapshot {
            sales_id: user.id,
            sales_name: user.name,
            period,
            counts,
            status,
        };
        self.store.upsert_kpi_snapshot(&snapshot)?;
        Ok(snapshot)
    }

    /// Recompute the daily and monthly snapshots touched by a completed
    /// activity. Invoked from the completion hook; also safe to call
    /// directly (idempotent).
    pub fn on_activity_completed(&self, activity_id: &str, user_id: &str) -> Result<(), KpiError> {
        let activity = self
            .store
            .get_activity_by_id(activity_id)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "activity".to_string(),
                key: activity_id.to_string(),
            })?;

        let completed_at = activity.completed_at.unwrap_or_else(Utc::now);
        let date = completed_at.date_naive();
        let (year, month) = year_month_of(completed_at);

        self.aggregate_daily(user_id, Some(date))?;
        self.aggregate_monthly(user_id, year, month)?;
        Ok(())
    }

    /// Run one period's aggregation for every candidate user: everyone ever
    /// assigned an activity or who ever created a deal. Sequential; per-user
    /// failures are recorded and never abort the batch.
    pub fn run_for_all_users(&self, period: BulkPeriod) -> Result<BulkRunSummary, KpiError> {
        let candidates = self.store.find_kpi_candidate_ids()?;
        if candidates.len() > MAX_BULK_RUN_USERS {
            tracing::warn!(
                count = candidates.len(),
                limit = MAX_BULK_RUN_USERS,
                "Candidate set exceeds bulk run limit, truncating"
            );
        }

        let mut results = Vec::with_capacity(candidates.len());
        for user_id in candidates.into_iter().take(MAX_BULK_RUN_USERS) {
            let outcome = match period {
                BulkPeriod::Daily(date) => self.aggregate_daily(&user_id, Some(date)).map(|_| ()),
                BulkPeriod::Monthly { year, month } => {
                    self.aggregate_monthly(&user_id, year, month).map(|_| ())
                }
            };
            match outcome {
                Ok(()) => results.push(BulkUserResult {
                    user_id,
                    success: true,
                    error: None,
                }),
                Err(e) => {
                    tracing::warn!(user_id = %user_id, error = %e, "Bulk KPI aggregation failed for user");
                    results.push(BulkUserResult {
                        user_id,
                        success: false,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let succeeded = results.iter().filter(|r| r.success).count();
        let failed = results.len() - succeeded;
        Ok(BulkRunSummary {
            succeeded,
            failed,
            results,
        })
    }
}

/// Fire-and-forget recomputation after an activity completes. Runs on a
/// detached task with its own error channel: failures are logged and
/// swallowed, so completing an activity never fails because KPI bookkeeping
/// did.
pub fn spawn_completion_hook(engine: Arc<KpiEngine>, activity_id: String, user_id: String) {
    tokio::spawn(async move {
        if let Err(e) = engine.on_activity_completed(&activity_id, &user_id) {
            tracing::warn!(
                activity_id = %activity_id,
                user_id = %user_id,
                error = %e,
                "KPI recomputation after completion failed"
            );
        }
    });
}
