use async_trait::async_trait;
use std::fmt;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use shared::wheel::{SpinResult, WheelConfig};

pub mod postgres;

#[cfg(test)]
pub mod memory;

/// Per-user cooldown gate. Absent fields mean the user has never spun.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserState {
    pub last_spin_at: Option<OffsetDateTime>,
    pub next_allowed_at: Option<OffsetDateTime>,
}

/// One committed spin, as kept in the append-only history.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinRecord {
    pub spin_id: Uuid,
    pub prize_label: String,
    pub prize_index: i32,
    pub created_at: OffsetDateTime,
}

/// The stored answer for a client_request_id, replayed verbatim on retries.
#[derive(Debug, Clone, PartialEq)]
pub struct IdempotencyRecord {
    pub created_at: OffsetDateTime,
    pub result: SpinResult,
}

/// Everything the spin decision needs, read under the transaction's locks.
/// `now` and `spin_id` are assigned by the store, never by the caller.
#[derive(Debug, Clone)]
pub struct SpinTxnSnapshot {
    pub now: OffsetDateTime,
    pub spin_id: Uuid,
    pub user_state: UserState,
    pub request: Option<IdempotencyRecord>,
}

/// What the decision wants done with the transaction.
#[derive(Debug, Clone)]
pub enum SpinTxnPlan {
    /// This request id already has an answer. Write nothing.
    Replay(SpinResult),
    /// Cooldown still running. Write nothing.
    Reject { next_allowed_at: OffsetDateTime },
    /// Fresh spin. All three writes commit together or not at all.
    Commit(SpinCommit),
}

#[derive(Debug, Clone)]
pub struct SpinCommit {
    pub record: SpinRecord,
    pub state: UserState,
    pub request: IdempotencyRecord,
}

#[derive(Debug, Clone)]
pub enum SpinTxnOutcome {
    Committed(SpinResult),
    Replayed(SpinResult),
    CooldownActive { next_allowed_at: OffsetDateTime },
}

#[derive(Debug)]
pub enum StoreError {
    /// The transaction lost a race and was rolled back. Safe to retry.
    Conflict,
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Conflict => write!(f, "storage transaction conflict"),
            StoreError::Unavailable(message) => write!(f, "storage unavailable: {}", message),
        }
    }
}

impl std::error::Error for StoreError {}

pub type SpinDecider<'a> = &'a (dyn Fn(SpinTxnSnapshot) -> SpinTxnPlan + Send + Sync);

/// Storage behind the wheel. `run_spin_txn` is the only mutation path for
/// spins: it reads a consistent snapshot, asks `decide` what to do, and
/// applies the resulting plan atomically.
#[async_trait]
pub trait SpinStore: Send + Sync {
    async fn wheel_config(&self) -> Result<Option<WheelConfig>, StoreError>;

    async fn put_wheel_config(&self, config: &WheelConfig) -> Result<(), StoreError>;

    /// Fast-path lookup used before opening a transaction.
    async fn idempotency_record(
        &self,
        user_id: Uuid,
        client_request_id: &str,
    ) -> Result<Option<IdempotencyRecord>, StoreError>;

    async fn spin_history(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<SpinRecord>, StoreError>;

    async fn run_spin_txn(
        &self,
        user_id: Uuid,
        client_request_id: &str,
        decide: SpinDecider<'_>,
    ) -> Result<SpinTxnOutcome, StoreError>;
}

pub fn rfc3339(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_else(|_| ts.to_string())
}
