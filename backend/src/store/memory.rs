use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use shared::wheel::WheelConfig;

use super::{
    IdempotencyRecord, SpinDecider, SpinRecord, SpinStore, SpinTxnOutcome, SpinTxnPlan,
    SpinTxnSnapshot, StoreError, UserState,
};

/// In-memory store with a hand-driven clock. Every trait method takes the
/// one mutex, so each call is as atomic as a real transaction.
pub struct MemorySpinStore {
    inner: Mutex<Inner>,
}

struct Inner {
    now: OffsetDateTime,
    config: Option<WheelConfig>,
    users: HashMap<Uuid, UserDoc>,
}

#[derive(Default)]
struct UserDoc {
    state: UserState,
    spins: Vec<SpinRecord>,
    requests: HashMap<String, IdempotencyRecord>,
}

impl MemorySpinStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                now: OffsetDateTime::now_utc(),
                config: None,
                users: HashMap::new(),
            }),
        }
    }

    pub fn now(&self) -> OffsetDateTime {
        self.inner.lock().unwrap().now
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut inner = self.inner.lock().unwrap();
        inner.now += Duration::seconds(secs);
    }

    pub fn user_state(&self, user_id: Uuid) -> UserState {
        let inner = self.inner.lock().unwrap();
        inner
            .users
            .get(&user_id)
            .map(|doc| doc.state.clone())
            .unwrap_or_default()
    }

    pub fn spin_count(&self, user_id: Uuid) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.users.get(&user_id).map_or(0, |doc| doc.spins.len())
    }

    pub fn request_count(&self, user_id: Uuid) -> usize {
        let inner = self.inner.lock().unwrap();
        inner
            .users
            .get(&user_id)
            .map_or(0, |doc| doc.requests.len())
    }
}

#[async_trait]
impl SpinStore for MemorySpinStore {
    async fn wheel_config(&self) -> Result<Option<WheelConfig>, StoreError> {
        Ok(self.inner.lock().unwrap().config.clone())
    }

    async fn put_wheel_config(&self, config: &WheelConfig) -> Result<(), StoreError> {
        self.inner.lock().unwrap().config = Some(config.clone());
        Ok(())
    }

    async fn idempotency_record(
        &self,
        user_id: Uuid,
        client_request_id: &str,
    ) -> Result<Option<IdempotencyRecord>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .get(&user_id)
            .and_then(|doc| doc.requests.get(client_request_id))
            .cloned())
    }

    async fn spin_history(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<SpinRecord>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut spins = inner
            .users
            .get(&user_id)
            .map(|doc| doc.spins.clone())
            .unwrap_or_default();
        spins.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        spins.truncate(limit as usize);
        Ok(spins)
    }

    async fn run_spin_txn(
        &self,
        user_id: Uuid,
        client_request_id: &str,
        decide: SpinDecider<'_>,
    ) -> Result<SpinTxnOutcome, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let now = inner.now;
        let doc = inner.users.entry(user_id).or_default();

        let snapshot = SpinTxnSnapshot {
            now,
            spin_id: Uuid::new_v4(),
            user_state: doc.state.clone(),
            request: doc.requests.get(client_request_id).cloned(),
        };

        match decide(snapshot) {
            SpinTxnPlan::Replay(result) => Ok(SpinTxnOutcome::Replayed(result)),
            SpinTxnPlan::Reject { next_allowed_at } => {
                Ok(SpinTxnOutcome::CooldownActive { next_allowed_at })
            }
            SpinTxnPlan::Commit(commit) => {
                doc.spins.push(commit.record);
                doc.state.last_spin_at = commit.state.last_spin_at;
                doc.state.next_allowed_at = commit.state.next_allowed_at;
                let result = commit.request.result.clone();
                doc.requests
                    .insert(client_request_id.to_string(), commit.request);
                Ok(SpinTxnOutcome::Committed(result))
            }
        }
    }
}
