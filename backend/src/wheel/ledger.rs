use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use shared::constants::{DEFAULT_HISTORY_LIMIT, INVALID_LIMIT_ERROR, MAX_HISTORY_LIMIT};
use shared::wheel::{validate_client_request_id, SpinHistoryEntry, SpinResult, WheelConfig};

use super::{cooldown, selector};
use crate::error::SpinError;
use crate::store::{
    rfc3339, IdempotencyRecord, SpinCommit, SpinRecord, SpinStore, SpinTxnOutcome, SpinTxnPlan,
    SpinTxnSnapshot, StoreError, UserState,
};

const MAX_SPIN_TXN_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(25);

/// Coordinates one user's spins: idempotency replay, cooldown gate and
/// weighted draw, all resolved inside a single store transaction.
#[derive(Clone)]
pub struct SpinLedger {
    store: Arc<dyn SpinStore>,
}

impl SpinLedger {
    pub fn new(store: Arc<dyn SpinStore>) -> Self {
        Self { store }
    }

    pub async fn spin(
        &self,
        user_id: Uuid,
        client_request_id: &str,
    ) -> Result<SpinResult, SpinError> {
        let client_request_id = client_request_id.trim();
        validate_client_request_id(client_request_id)
            .map_err(|msg| SpinError::InvalidArgument(msg.to_string()))?;

        // Fast path: a finished request answers from the stored result
        // without opening a transaction.
        if let Some(existing) = self
            .store
            .idempotency_record(user_id, client_request_id)
            .await?
        {
            info!(
                "🔁 Wheel replay - User: {}, Request: {}",
                user_id, client_request_id
            );
            return Ok(existing.result);
        }

        let config = self
            .store
            .wheel_config()
            .await?
            .ok_or_else(|| SpinError::ConfigInvalid("wheel config is missing".to_string()))?;
        config.validate().map_err(SpinError::ConfigInvalid)?;

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self
                .store
                .run_spin_txn(user_id, client_request_id, &|txn| decide_spin(&config, txn))
                .await
            {
                Ok(SpinTxnOutcome::Committed(result)) => {
                    info!(
                        "🎡 Wheel spin - User: {}, Prize: {} (segment {})",
                        user_id, result.prize_label, result.prize_index
                    );
                    return Ok(result);
                }
                Ok(SpinTxnOutcome::Replayed(result)) => {
                    info!(
                        "🔁 Wheel replay - User: {}, Request: {}",
                        user_id, client_request_id
                    );
                    return Ok(result);
                }
                Ok(SpinTxnOutcome::CooldownActive { next_allowed_at }) => {
                    info!(
                        "🚫 Wheel cooldown - User: {}, Until: {}",
                        user_id,
                        rfc3339(next_allowed_at)
                    );
                    return Err(SpinError::CooldownActive { next_allowed_at });
                }
                Err(StoreError::Conflict) if attempt < MAX_SPIN_TXN_ATTEMPTS => {
                    warn!(
                        "Wheel spin conflict - User: {}, attempt {}/{}",
                        user_id, attempt, MAX_SPIN_TXN_ATTEMPTS
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(StoreError::Conflict) => return Err(SpinError::StoreUnavailable),
                Err(err) => return Err(err.into()),
            }
        }
    }

    pub async fn history(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> Result<Vec<SpinHistoryEntry>, SpinError> {
        let limit = effective_history_limit(limit)?;
        let records = self.store.spin_history(user_id, limit).await?;
        Ok(records.iter().map(history_entry).collect())
    }
}

/// The per-transaction decision. Pure: everything it needs is in the
/// snapshot, everything it wants done is in the returned plan.
fn decide_spin(config: &WheelConfig, txn: SpinTxnSnapshot) -> SpinTxnPlan {
    // A stored answer wins over everything, cooldown included.
    if let Some(existing) = txn.request {
        return SpinTxnPlan::Replay(existing.result);
    }

    if let Some(gate) = txn.user_state.next_allowed_at {
        if !cooldown::is_allowed(txn.now, Some(gate)) {
            return SpinTxnPlan::Reject {
                next_allowed_at: gate,
            };
        }
    }

    let prize_index = selector::pick_weighted_index(&config.segments);
    let prize = &config.segments[prize_index];
    let gate = cooldown::next_allowed_at(txn.now, config.cooldown_seconds);

    let result = SpinResult {
        spin_id: txn.spin_id.to_string(),
        prize_label: prize.label.clone(),
        prize_index: prize_index as i32,
        next_allowed_at: rfc3339(gate),
    };

    SpinTxnPlan::Commit(SpinCommit {
        record: SpinRecord {
            spin_id: txn.spin_id,
            prize_label: prize.label.clone(),
            prize_index: prize_index as i32,
            created_at: txn.now,
        },
        state: UserState {
            last_spin_at: Some(txn.now),
            next_allowed_at: Some(gate),
        },
        request: IdempotencyRecord {
            created_at: txn.now,
            result,
        },
    })
}

fn effective_history_limit(limit: Option<i64>) -> Result<i64, SpinError> {
    match limit {
        None => Ok(DEFAULT_HISTORY_LIMIT),
        Some(n) if n < 1 => Err(SpinError::InvalidArgument(INVALID_LIMIT_ERROR.to_string())),
        Some(n) => Ok(n.min(MAX_HISTORY_LIMIT)),
    }
}

fn history_entry(record: &SpinRecord) -> SpinHistoryEntry {
    SpinHistoryEntry {
        spin_id: record.spin_id.to_string(),
        prize_label: record.prize_label.clone(),
        prize_index: record.prize_index,
        created_at: rfc3339(record.created_at),
    }
}
