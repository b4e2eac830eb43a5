pub mod categories;
pub mod engine;
pub mod period;

pub use engine::{BulkPeriod, BulkRunSummary, BulkUserResult, KpiEngine, KpiError};
