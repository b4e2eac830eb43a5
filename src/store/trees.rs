pub const USERS: &str = "users";
pub const SESSIONS: &str = "sessions";
pub const COMPANIES: &str = "companies";
pub const CONTACTS: &str = "contacts";
pub const LEADS: &str = "leads";
pub const DEALS: &str = "deals";
pub const ACTIVITIES: &str = "activities";
pub const ACTIVITY_IDS: &str = "activity_ids";
pub const COMMENTS: &str = "comments";
pub const KPI_TARGETS: &str = "kpi_targets";
pub const KPI_DAILY: &str = "kpi_daily";
pub const KPI_MONTHLY: &str = "kpi_monthly";
pub const META: &str = "meta";
