//! Bridge handlers
use alloy::primitives::{Address, TxHash, U256};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
};
use relay_ops::BridgeSubmission;
use serde::{Serialize, Serializer};

use crate::handlers::common::{error_response, failure_response, ApiError};
use crate::state::AppState;

fn serialize_decimal<S: Serializer>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(value) => serializer.serialize_str(&value.to_string()),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeResponse {
    pub success: bool,
    pub destination_tx_hash: TxHash,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_tx_hash: Option<TxHash>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_decimal")]
    pub payout_amount: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
}

fn body(payload: Result<Json<BridgeSubmission>, JsonRejection>) -> Result<BridgeSubmission, ApiError> {
    payload
        .map(|Json(submission)| submission)
        .map_err(|rejection| error_response(StatusCode::BAD_REQUEST, "BAD_REQUEST", rejection.body_text()))
}

/// POST /bridge/a-to-b
pub async fn bridge_a_to_b(
    State(state): State<AppState>,
    payload: Result<Json<BridgeSubmission>, JsonRejection>,
) -> Result<Json<BridgeResponse>, ApiError> {
    let submission = body(payload)?;
    let receipt = state.orchestrator.process_a_to_b(&submission).await.map_err(failure_response)?;

    Ok(Json(BridgeResponse {
        success: true,
        destination_tx_hash: receipt.outcome.tx_hash,
        source_tx_hash: receipt.request.source_tx_hash,
        payout_amount: None,
        to: None,
    }))
}

/// POST /bridge/b-to-a
pub async fn bridge_b_to_a(
    State(state): State<AppState>,
    payload: Result<Json<BridgeSubmission>, JsonRejection>,
) -> Result<Json<BridgeResponse>, ApiError> {
    let submission = body(payload)?;
    let receipt = state.orchestrator.process_b_to_a(&submission).await.map_err(failure_response)?;

    Ok(Json(BridgeResponse {
        success: true,
        destination_tx_hash: receipt.outcome.tx_hash,
        source_tx_hash: receipt.request.source_tx_hash,
        payout_amount: receipt.payout_amount,
        to: Some(receipt.request.user),
    }))
}
