// Server configuration
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: &str = "3000";
pub const DEFAULT_DATA_PATH: &str = "data";
pub const DEFAULT_LOG_FILTER: &str = "my_finance_server=info,tower_http=info";

// Session configuration
pub const SESSION_NAME: &str = "finance_session";
pub const SESSION_EXPIRY_DAYS: i64 = 3;
pub const SESSION_MAX_AGE_DAYS: i64 = 30;
pub const MIN_SESSION_SECRET_LENGTH: usize = 64;

// Session keys
pub const SESSION_USER_ID: &str = "user_id";
pub const SESSION_USERNAME: &str = "username";
pub const SESSION_ESTABLISHED_AT: &str = "established_at";

// Recurring generation
pub const DEFAULT_RECURRING_INTERVAL_SECS: u64 = 3600;
pub const MAX_OCCURRENCES_PER_RUN: usize = 1000;

// Database limits and defaults
pub const DEFAULT_CATEGORIES_LIMIT: u32 = 100;
pub const DEFAULT_TRANSACTIONS_LIMIT: u32 = 500;
pub const MAX_LIMIT: u32 = 1000;
pub const MAX_OFFSET: u32 = 1_000_000;
pub const DB_BUSY_TIMEOUT_MS: u64 = 5000;

// Snapshot cache
pub const SNAPSHOT_IDLE_SECS: u64 = 30 * 60;

// Validation limits
pub const MAX_CATEGORY_NAME_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 500;
pub const MAX_USERNAME_LENGTH: usize = 50;
pub const MIN_USERNAME_LENGTH: usize = 4;
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_AMOUNT: f64 = 1_000_000_000.0;
pub const MIN_TRANSACTION_DATE: &str = "2000-01-01";
pub const MAX_FUTURE_YEARS: i32 = 1;

// Aggregation
pub const ALERT_WARNING_THRESHOLD: f64 = 80.0;
pub const ALERT_EXCEEDED_THRESHOLD: f64 = 100.0;
pub const DEFAULT_TOP_CATEGORIES: usize = 5;
pub const DEFAULT_SERIES_MONTHS: usize = 6;
pub const MAX_SERIES_MONTHS: usize = 120;
pub const CURRENCY_SYMBOL: &str = "৳";

// Error messages
pub const ERR_DATABASE_ACCESS: &str = "Database access error";
pub const ERR_DATABASE_OPERATION: &str = "Database operation failed";
pub const ERR_INVALID_SESSION: &str = "Invalid session";
pub const ERR_UNAUTHORIZED: &str = "Not logged in";
pub const ERR_SESSION_EXPIRED: &str = "Session expired";
