//! Balance handler
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use relay_chain::{AssetBalance, BalanceError};
use tracing::warn;

use crate::handlers::common::{error_response, ApiError};
use crate::state::AppState;

/// GET /balance/{asset}/{address}
pub async fn get_balance(
    State(state): State<AppState>,
    Path((asset, address)): Path<(String, String)>,
) -> Result<Json<AssetBalance>, ApiError> {
    match state.balances.get_balance(&asset, &address).await {
        Ok(balance) => Ok(Json(balance)),
        Err(BalanceError::UnknownAsset(asset)) => Err(error_response(
            StatusCode::NOT_FOUND,
            "UNKNOWN_ASSET",
            format!("unknown asset {}, expected one of {}", asset, state.balances.symbols().join(", ")),
        )),
        Err(BalanceError::NotFound(address)) => Err(error_response(
            StatusCode::BAD_REQUEST,
            "BAD_REQUEST",
            format!("invalid address {}", address),
        )),
        Err(BalanceError::Relay(e)) => {
            warn!(%asset, %address, error = %e, "balance lookup failed");
            Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, "CHAIN_ERROR", e.to_string()))
        }
    }
}
