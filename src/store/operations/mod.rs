pub mod activities;
pub mod comments;
pub mod companies;
pub mod contacts;
pub mod deals;
pub mod kpi_snapshots;
pub mod kpi_targets;
pub mod leads;
pub mod sessions;
pub mod users;
