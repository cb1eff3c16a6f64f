use axum::{
    debug_handler,
    extract::{Extension, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use shared::wheel::{SpinHistoryEntry, SpinRequest, SpinResult};

use crate::auth::middleware::UserId;
use crate::error::SpinError;
use crate::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/spin", post(spin_wheel))
        .route("/history", get(get_history))
        .layer(axum::middleware::from_fn(crate::auth::middleware::require_auth))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<i64>,
}

#[debug_handler]
async fn spin_wheel(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    Json(request): Json<SpinRequest>,
) -> Result<Json<SpinResult>, SpinError> {
    let result = state
        .ledger
        .spin(user_id.0, &request.client_request_id)
        .await?;
    Ok(Json(result))
}

#[debug_handler]
async fn get_history(
    State(state): State<AppState>,
    Extension(user_id): Extension<UserId>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<SpinHistoryEntry>>, SpinError> {
    let entries = state.ledger.history(user_id.0, query.limit).await?;
    Ok(Json(entries))
}
