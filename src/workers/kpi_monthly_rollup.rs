use chrono::{Datelike, Utc};

use crate::kpi::engine::{BulkPeriod, KpiEngine};

/// First-of-month rollup covering the calendar month that just ended.
pub async fn run(engine: &KpiEngine) {
    let today = Utc::now().date_naive();
    let (year, month) = if today.month() == 1 {
        (today.year() - 1, 12)
    } else {
        (today.year(), today.month() - 1)
    };

    tracing::debug!(year, month, "kpi_monthly_rollup: start");
    match engine.run_for_all_users(BulkPeriod::Monthly { year, month }) {
        Ok(summary) => tracing::info!(
            year,
            month,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "kpi_monthly_rollup: done"
        ),
        Err(e) => tracing::error!(error=%e, year, month, "kpi_monthly_rollup failed"),
    }
}
