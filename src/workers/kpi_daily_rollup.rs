use chrono::Utc;

use crate::kpi::engine::{BulkPeriod, KpiEngine};

/// Nightly rollup covering the UTC day that just ended.
pub async fn run(engine: &KpiEngine) {
    let today = Utc::now().date_naive();
    let Some(yesterday) = today.pred_opt() else {
        tracing::error!(date = %today, "kpi_daily_rollup: no previous day");
        return;
    };

    tracing::debug!(date = %yesterday, "kpi_daily_rollup: start");
    match engine.run_for_all_users(BulkPeriod::Daily(yesterday)) {
        Ok(summary) => tracing::info!(
            date = %yesterday,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "kpi_daily_rollup: done"
        ),
        Err(e) => tracing::error!(error=%e, date = %yesterday, "kpi_daily_rollup failed"),
    }
}
