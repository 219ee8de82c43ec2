use axum::{http::StatusCode, response::Json};
use relay_types::BridgeFailure;
use serde::Serialize;

/// Error response format shared by handlers
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub message: String,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_tx_hash: Option<String>,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn error_response(status: StatusCode, error: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: error.to_string(),
            message: message.into(),
            timestamp: chrono::Utc::now().timestamp(),
            destination_tx_hash: None,
        }),
    )
}

impl From<BridgeFailure> for ErrorResponse {
    fn from(failure: BridgeFailure) -> Self {
        Self {
            success: false,
            error: failure.kind.as_str().to_string(),
            message: failure.detail,
            timestamp: chrono::Utc::now().timestamp(),
            destination_tx_hash: failure.previous_tx_hash.map(|hash| hash.to_string()),
        }
    }
}

pub fn failure_response(failure: BridgeFailure) -> ApiError {
    let status = StatusCode::from_u16(failure.kind.status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(failure.into()))
}
