use chrono::NaiveDate;

pub fn user_key(user_id: &str) -> String {
    user_id.to_string()
}

pub fn user_email_index_key(email: &str) -> String {
    format!("email:{}", email.to_lowercase())
}

pub fn session_key(token_hash: &str) -> String {
    token_hash.to_string()
}

pub fn company_key(company_id: &str) -> String {
    company_id.to_string()
}

pub fn contact_key(contact_id: &str) -> String {
    contact_id.to_string()
}

pub fn lead_key(lead_id: &str) -> String {
    lead_id.to_string()
}

pub fn deal_key(deal_id: &str) -> String {
    deal_id.to_string()
}

// Activities are keyed by assignee so per-salesperson scans are a prefix walk.
pub fn activity_key(assigned_to: &str, activity_id: &str) -> String {
    format!("{}:{}", assigned_to, activity_id)
}

pub fn activity_prefix(assigned_to: &str) -> String {
    format!("{}:", assigned_to)
}

pub fn comment_key(entity_id: &str, comment_id: &str) -> String {
    format!("{}:{}", entity_id, comment_id)
}

pub fn comment_prefix(entity_id: &str) -> String {
    format!("{}:", entity_id)
}

pub fn kpi_target_key(period_type: &str, version: u32) -> String {
    format!("{}:{:010}", period_type, version)
}

pub fn kpi_target_prefix(period_type: &str) -> String {
    format!("{}:", period_type)
}

/// Pointer row holding the highest version ever assigned for a period type.
/// It outlives deactivation so versions stay monotonic and history rows are
/// never overwritten. History scans over the prefix must skip this row.
pub fn kpi_target_latest_key(period_type: &str) -> String {
    format!("{}:latest", period_type)
}

pub fn kpi_daily_key(sales_id: &str, date: NaiveDate) -> String {
    format!("{}:{}", sales_id, date.format("%Y-%m-%d"))
}

pub fn kpi_daily_prefix(sales_id: &str) -> String {
    format!("{}:", sales_id)
}

pub fn kpi_monthly_key(sales_id: &str, year: i32, month: u32) -> String {
    format!("{}:{:04}-{:02}", sales_id, year, month)
}
