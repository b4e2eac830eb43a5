/// Maximum reply nesting level for comments (0 = top-level).
/// A reply whose level would exceed this is rejected at creation time,
/// so the read path never needs a depth check.
pub const MAX_REPLY_LEVEL: u8 = 3;

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Maximum page size for list endpoints.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Default page size for activity listings.
pub const DEFAULT_PAGE_SIZE_ACTIVITIES: u64 = 50;

/// Session lifetime in hours; cleanup worker drops rows older than this.
pub const SESSION_TTL_HOURS: i64 = 24;

/// Maximum number of users a single bulk KPI run will process.
/// Guards against an unbounded scan if the user population ever grows
/// past what sequential per-user aggregation can handle.
pub const MAX_BULK_RUN_USERS: usize = 10_000;
