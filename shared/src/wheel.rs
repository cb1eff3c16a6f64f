use serde::{Serialize, Deserialize};

use crate::constants::{
    MAX_CLIENT_REQUEST_ID_LEN, MISSING_REQUEST_ID_ERROR, REQUEST_ID_TOO_LONG_ERROR,
};

pub const WHEEL_SEGMENTS: usize = 8;

/// One slice of the wheel. Weight 0 keeps a prize visible but unwinnable.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Segment {
    pub label: String,
    pub weight: i32,
    pub color: String,
}

/// Operator-managed wheel layout plus the per-user spin cooldown.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WheelConfig {
    pub segments: Vec<Segment>,
    pub cooldown_seconds: i64,
}

impl WheelConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.segments.len() != WHEEL_SEGMENTS {
            return Err(format!(
                "wheel config must have exactly {} segments, found {}",
                WHEEL_SEGMENTS,
                self.segments.len()
            ));
        }
        if self.cooldown_seconds < 0 {
            return Err("wheel config cooldown_seconds must be non-negative".to_string());
        }
        Ok(())
    }
}

// === API Types ===

#[derive(Debug, Serialize, Deserialize)]
pub struct SpinRequest {
    pub client_request_id: String,
}

/// What a spin (or a replay of one) hands back to the caller.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SpinResult {
    pub spin_id: String,
    pub prize_label: String,
    pub prize_index: i32,
    pub next_allowed_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SpinHistoryEntry {
    pub spin_id: String,
    pub prize_label: String,
    pub prize_index: i32,
    pub created_at: String,
}

pub fn validate_client_request_id(id: &str) -> Result<(), &'static str> {
    if id.is_empty() {
        return Err(MISSING_REQUEST_ID_ERROR);
    }
    if id.len() > MAX_CLIENT_REQUEST_ID_LEN {
        return Err(REQUEST_ID_TOO_LONG_ERROR);
    }
    Ok(())
}
