use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use shared::constants::WHEEL_CONFIG_ID;
use shared::wheel::{Segment, SpinResult, WheelConfig};

use super::{
    IdempotencyRecord, SpinDecider, SpinRecord, SpinStore, SpinTxnOutcome, SpinTxnPlan,
    SpinTxnSnapshot, StoreError, UserState,
};

#[derive(Clone)]
pub struct PgSpinStore {
    pool: PgPool,
}

impl PgSpinStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Serialization failures, deadlocks, and unique-key races all mean the same
// thing to the caller: roll back and retry the whole transaction.
fn classify(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if let Some(code) = db_err.code() {
            if code == "40001" || code == "40P01" || code == "23505" {
                return StoreError::Conflict;
            }
        }
    }
    tracing::error!("postgres store error: {}", err);
    StoreError::Unavailable(err.to_string())
}

#[derive(sqlx::FromRow)]
struct ConfigRow {
    segments: Json<Vec<Segment>>,
    cooldown_seconds: i64,
}

#[derive(sqlx::FromRow)]
struct UserStateRow {
    last_spin_at: Option<OffsetDateTime>,
    next_allowed_at: Option<OffsetDateTime>,
}

#[derive(sqlx::FromRow)]
struct RequestRow {
    created_at: OffsetDateTime,
    result: Json<SpinResult>,
}

#[derive(sqlx::FromRow)]
struct SpinRow {
    spin_id: Uuid,
    prize_label: String,
    prize_index: i32,
    created_at: OffsetDateTime,
}

impl From<UserStateRow> for UserState {
    fn from(row: UserStateRow) -> Self {
        UserState {
            last_spin_at: row.last_spin_at,
            next_allowed_at: row.next_allowed_at,
        }
    }
}

impl From<RequestRow> for IdempotencyRecord {
    fn from(row: RequestRow) -> Self {
        IdempotencyRecord {
            created_at: row.created_at,
            result: row.result.0,
        }
    }
}

impl From<SpinRow> for SpinRecord {
    fn from(row: SpinRow) -> Self {
        SpinRecord {
            spin_id: row.spin_id,
            prize_label: row.prize_label,
            prize_index: row.prize_index,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl SpinStore for PgSpinStore {
    async fn wheel_config(&self) -> Result<Option<WheelConfig>, StoreError> {
        let row: Option<ConfigRow> = sqlx::query_as(
            "SELECT segments, cooldown_seconds FROM wheel_config WHERE id = $1",
        )
        .bind(WHEEL_CONFIG_ID)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        Ok(row.map(|row| WheelConfig {
            segments: row.segments.0,
            cooldown_seconds: row.cooldown_seconds,
        }))
    }

    async fn put_wheel_config(&self, config: &WheelConfig) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO wheel_config (id, segments, cooldown_seconds, updated_at)
             VALUES ($1, $2, $3, now())
             ON CONFLICT (id) DO UPDATE
             SET segments = EXCLUDED.segments,
                 cooldown_seconds = EXCLUDED.cooldown_seconds,
                 updated_at = now()",
        )
        .bind(WHEEL_CONFIG_ID)
        .bind(Json(&config.segments))
        .bind(config.cooldown_seconds)
        .execute(&self.pool)
        .await
        .map_err(classify)?;

        Ok(())
    }

    async fn idempotency_record(
        &self,
        user_id: Uuid,
        client_request_id: &str,
    ) -> Result<Option<IdempotencyRecord>, StoreError> {
        let row: Option<RequestRow> = sqlx::query_as(
            "SELECT created_at, result FROM wheel_requests
             WHERE user_id = $1 AND client_request_id = $2",
        )
        .bind(user_id)
        .bind(client_request_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(classify)?;

        Ok(row.map(IdempotencyRecord::from))
    }

    async fn spin_history(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<SpinRecord>, StoreError> {
        let rows: Vec<SpinRow> = sqlx::query_as(
            "SELECT spin_id, prize_label, prize_index, created_at FROM wheel_spins
             WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;

        Ok(rows.into_iter().map(SpinRecord::from).collect())
    }

    async fn run_spin_txn(
        &self,
        user_id: Uuid,
        client_request_id: &str,
        decide: SpinDecider<'_>,
    ) -> Result<SpinTxnOutcome, StoreError> {
        let mut tx = self.pool.begin().await.map_err(classify)?;

        // Make sure the user row exists, then lock it. The lock serializes
        // every spin for this user, so the re-read below sees any request
        // record a racing transaction committed first.
        sqlx::query(
            "INSERT INTO wheel_user_state (user_id) VALUES ($1)
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await
        .map_err(classify)?;

        let state_row: UserStateRow = sqlx::query_as(
            "SELECT last_spin_at, next_allowed_at FROM wheel_user_state
             WHERE user_id = $1
             FOR UPDATE",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(classify)?;

        let request_row: Option<RequestRow> = sqlx::query_as(
            "SELECT created_at, result FROM wheel_requests
             WHERE user_id = $1 AND client_request_id = $2",
        )
        .bind(user_id)
        .bind(client_request_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(classify)?;

        // Server-assigned timestamp; client clocks are never trusted.
        let now: OffsetDateTime = sqlx::query_scalar("SELECT now()")
            .fetch_one(&mut *tx)
            .await
            .map_err(classify)?;

        let snapshot = SpinTxnSnapshot {
            now,
            spin_id: Uuid::new_v4(),
            user_state: state_row.into(),
            request: request_row.map(IdempotencyRecord::from),
        };

        match decide(snapshot) {
            SpinTxnPlan::Replay(result) => {
                tx.rollback().await.map_err(classify)?;
                Ok(SpinTxnOutcome::Replayed(result))
            }
            SpinTxnPlan::Reject { next_allowed_at } => {
                tx.rollback().await.map_err(classify)?;
                Ok(SpinTxnOutcome::CooldownActive { next_allowed_at })
            }
            SpinTxnPlan::Commit(commit) => {
                sqlx::query(
                    "INSERT INTO wheel_spins (spin_id, user_id, prize_label, prize_index, created_at)
                     VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(commit.record.spin_id)
                .bind(user_id)
                .bind(&commit.record.prize_label)
                .bind(commit.record.prize_index)
                .bind(commit.record.created_at)
                .execute(&mut *tx)
                .await
                .map_err(classify)?;

                sqlx::query(
                    "UPDATE wheel_user_state
                     SET last_spin_at = $2, next_allowed_at = $3
                     WHERE user_id = $1",
                )
                .bind(user_id)
                .bind(commit.state.last_spin_at)
                .bind(commit.state.next_allowed_at)
                .execute(&mut *tx)
                .await
                .map_err(classify)?;

                sqlx::query(
                    "INSERT INTO wheel_requests (user_id, client_request_id, created_at, result)
                     VALUES ($1, $2, $3, $4)",
                )
                .bind(user_id)
                .bind(client_request_id)
                .bind(commit.request.created_at)
                .bind(Json(&commit.request.result))
                .execute(&mut *tx)
                .await
                .map_err(classify)?;

                let result = commit.request.result;
                tx.commit().await.map_err(classify)?;
                Ok(SpinTxnOutcome::Committed(result))
            }
        }
    }
}
