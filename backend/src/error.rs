use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::fmt;
use time::OffsetDateTime;

use crate::store::{rfc3339, StoreError};

#[derive(Debug)]
pub enum SpinError {
    Unauthenticated,
    InvalidArgument(String),
    ConfigInvalid(String),
    CooldownActive { next_allowed_at: OffsetDateTime },
    StoreUnavailable,
}

impl fmt::Display for SpinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpinError::Unauthenticated => write!(f, "Sign in required"),
            SpinError::InvalidArgument(message) => write!(f, "{}", message),
            SpinError::ConfigInvalid(message) => write!(f, "{}", message),
            SpinError::CooldownActive { next_allowed_at } => {
                write!(f, "Cooldown active until {}", rfc3339(*next_allowed_at))
            }
            SpinError::StoreUnavailable => {
                write!(f, "Temporary storage failure, please retry")
            }
        }
    }
}

impl std::error::Error for SpinError {}

// Storage details never reach the caller. The store logs the underlying
// failure; a conflict that survives the retry loop is just "unavailable".
impl From<StoreError> for SpinError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict | StoreError::Unavailable(_) => SpinError::StoreUnavailable,
        }
    }
}

impl IntoResponse for SpinError {
    fn into_response(self) -> axum::response::Response {
        let (status, kind) = match &self {
            SpinError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            SpinError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "invalid_argument"),
            SpinError::ConfigInvalid(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_invalid"),
            SpinError::CooldownActive { .. } => (StatusCode::TOO_MANY_REQUESTS, "cooldown_active"),
            SpinError::StoreUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable"),
        };

        let mut body = json!({
            "error": {
                "kind": kind,
                "message": self.to_string(),
            }
        });
        if let SpinError::CooldownActive { next_allowed_at } = &self {
            body["error"]["next_allowed_at"] = json!(rfc3339(*next_allowed_at));
        }

        (status, Json(body)).into_response()
    }
}
