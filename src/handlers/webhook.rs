//! Inbound webhook endpoint.
//!
//! Response contract toward Shwary: 400 on a malformed payload (no
//! retry expected), 500 when the reference re-query failed (retry
//! later), 200 once accepted whether or not anything changed.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::Transaction;
use crate::error::AppError;
use crate::ports::RepositoryError;
use crate::AppState;

pub async fn webhook(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    // The payload is parsed by hand: a malformed body must answer 400
    // before any state is touched.
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|_| AppError::Validation("Invalid JSON".to_string()))?;

    let shwary_id = payload.get("id").and_then(Value::as_str).unwrap_or("");
    let claimed_status = payload.get("status").and_then(Value::as_str).unwrap_or("");

    if shwary_id.is_empty() || claimed_status.is_empty() {
        return Err(AppError::Validation("Missing id or status".to_string()));
    }

    tracing::info!(%shwary_id, claimed = claimed_status, "webhook received");

    state
        .service
        .reconcile_webhook(shwary_id, claimed_status)
        .await?;

    Ok((StatusCode::OK, "OK"))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Transaction>, AppError> {
    let txn = state.repository.get_by_id(id).await.map_err(|e| match e {
        RepositoryError::NotFound(_) => AppError::NotFound(format!("Transaction {id} not found")),
        other => AppError::Repository(other),
    })?;

    Ok(Json(txn))
}
