pub const WHEEL_CONFIG_ID: &str = "default";

pub const DEFAULT_HISTORY_LIMIT: i64 = 25;
pub const MAX_HISTORY_LIMIT: i64 = 100;
pub const MAX_CLIENT_REQUEST_ID_LEN: usize = 128;

pub const MISSING_REQUEST_ID_ERROR: &str = "client_request_id is required";
pub const REQUEST_ID_TOO_LONG_ERROR: &str = "client_request_id must be at most 128 characters";
pub const INVALID_LIMIT_ERROR: &str = "limit must be a positive integer";
