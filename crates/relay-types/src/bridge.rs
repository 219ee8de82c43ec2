//! Bridge request data model and the protocol-level error taxonomy.

use std::fmt;

use alloy::primitives::{Address, Bytes, TxHash, B256, U256};
use serde::{Deserialize, Serialize};

use crate::{RelayError, Result};

/// Which way value moves. Determines the debited/credited asset and the
/// typed-data domain used for verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BridgeDirection {
    /// Native asset on chain A in, mirrored token minted on chain B.
    AToB,
    /// Mirrored token burned on chain B, native asset paid out on chain A.
    BToA,
}

impl BridgeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AToB => "A_TO_B",
            Self::BToA => "B_TO_A",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "A_TO_B" => Some(Self::AToB),
            "B_TO_A" => Some(Self::BToA),
            _ => None,
        }
    }
}

impl fmt::Display for BridgeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// EIP-712 domain. Must match exactly between signing and recovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedDataDomain {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

/// A validated, immutable bridge request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeRequest {
    pub user: Address,
    /// Smallest unit of the source asset. Always > 0.
    pub amount: U256,
    pub nonce: U256,
    /// Raw signature bytes as submitted; length is checked at recovery.
    pub signature: Bytes,
    pub direction: BridgeDirection,
    /// Proof of the source-chain debit, recorded for audit only.
    pub source_tx_hash: Option<B256>,
}

impl BridgeRequest {
    pub fn new(
        user: Address,
        amount: U256,
        nonce: U256,
        signature: Bytes,
        direction: BridgeDirection,
        source_tx_hash: Option<B256>,
    ) -> Result<Self> {
        if amount.is_zero() {
            return Err(RelayError::InvalidAmount {
                label: "amount".into(),
                value: "0".into(),
            });
        }
        Ok(Self { user, amount, nonce, signature, direction, source_tx_hash })
    }
}

/// Integer exchange rate: `destination = floor(source * numerator / denominator)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeRate {
    numerator: U256,
    denominator: U256,
}

impl ExchangeRate {
    pub fn new(numerator: U256, denominator: U256) -> Result<Self> {
        if denominator.is_zero() {
            return Err(RelayError::InvalidRate("denominator must be non-zero".into()));
        }
        if numerator.is_zero() {
            return Err(RelayError::InvalidRate("numerator must be non-zero".into()));
        }
        Ok(Self { numerator, denominator })
    }

    pub fn numerator(&self) -> U256 {
        self.numerator
    }

    pub fn denominator(&self) -> U256 {
        self.denominator
    }
}

impl Default for ExchangeRate {
    /// 0.018 units of chain-A asset per unit of chain-B token.
    fn default() -> Self {
        Self { numerator: U256::from(18), denominator: U256::from(1000) }
    }
}

/// Why a signature was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureFailure {
    /// Bytes are not a recoverable 65-byte signature.
    Malformed,
    /// Recovered signer differs from the claimed user.
    SignerMismatch,
    /// The request names a domain other than the one configured.
    DomainMismatch,
}

/// Protocol-level failure kinds returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    BadRequest,
    BadSignature,
    NonceReused,
    AmountTooSmall,
    InsufficientReserves,
    ChainError,
}

impl ErrorKind {
    /// HTTP status the kind maps to.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::BadSignature => 401,
            Self::InsufficientReserves => 402,
            Self::NonceReused => 409,
            Self::AmountTooSmall => 400,
            Self::ChainError => 500,
        }
    }

    /// Everything detected before a chain mutation can be resubmitted with a
    /// corrected request. A chain error after reservation cannot.
    pub fn is_retriable(&self) -> bool {
        !matches!(self, Self::ChainError)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::BadSignature => "BAD_SIGNATURE",
            Self::NonceReused => "NONCE_REUSED",
            Self::AmountTooSmall => "AMOUNT_TOO_SMALL",
            Self::InsufficientReserves => "INSUFFICIENT_RESERVES",
            Self::ChainError => "CHAIN_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A terminal failure: the kind plus a human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeFailure {
    pub kind: ErrorKind,
    pub detail: String,
    pub signature_failure: Option<SignatureFailure>,
    /// Destination transaction of an earlier execution, for replays of
    /// already-committed requests.
    pub previous_tx_hash: Option<TxHash>,
}

impl BridgeFailure {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self { kind, detail: detail.into(), signature_failure: None, previous_tx_hash: None }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, detail)
    }

    pub fn bad_signature(reason: SignatureFailure, detail: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::BadSignature,
            detail: detail.into(),
            signature_failure: Some(reason),
            previous_tx_hash: None,
        }
    }
}

impl fmt::Display for BridgeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

impl std::error::Error for BridgeFailure {}

/// Per-request outcome handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_tx_hash: Option<TxHash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
}

impl ExecutionResult {
    pub fn committed(tx_hash: TxHash) -> Self {
        Self { success: true, destination_tx_hash: Some(tx_hash), error: None }
    }

    pub fn failed(kind: ErrorKind) -> Self {
        Self { success: false, destination_tx_hash: None, error: Some(kind) }
    }
}

/// Request lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestState {
    Received,
    Validated,
    SignatureOk,
    NonceReserved,
    Executing,
    Committed,
    Rejected,
    ExecutionFailed,
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::Rejected | Self::ExecutionFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_rejects_zero_amount() {
        let result = BridgeRequest::new(
            Address::ZERO,
            U256::ZERO,
            U256::from(1),
            Bytes::new(),
            BridgeDirection::AToB,
            None,
        );
        assert!(matches!(result, Err(RelayError::InvalidAmount { .. })));
    }

    #[test]
    fn test_exchange_rate_rejects_zero_denominator() {
        assert!(ExchangeRate::new(U256::from(18), U256::ZERO).is_err());
        assert!(ExchangeRate::new(U256::ZERO, U256::from(1000)).is_err());
        assert_eq!(ExchangeRate::default().numerator(), U256::from(18));
    }

    #[test]
    fn test_error_kind_status_taxonomy() {
        assert_eq!(ErrorKind::BadRequest.status_code(), 400);
        assert_eq!(ErrorKind::BadSignature.status_code(), 401);
        assert_eq!(ErrorKind::InsufficientReserves.status_code(), 402);
        assert_eq!(ErrorKind::NonceReused.status_code(), 409);
        assert_eq!(ErrorKind::ChainError.status_code(), 500);
        assert!(ErrorKind::AmountTooSmall.is_retriable());
        assert!(!ErrorKind::ChainError.is_retriable());
    }

    #[test]
    fn test_direction_serializes_as_screaming_snake() {
        let json = serde_json::to_string(&BridgeDirection::BToA).unwrap();
        assert_eq!(json, "\"B_TO_A\"");
        assert_eq!(BridgeDirection::parse("A_TO_B"), Some(BridgeDirection::AToB));
        assert_eq!(BridgeDirection::parse("sideways"), None);
    }

    #[test]
    fn test_execution_result_json_shape() {
        let committed = serde_json::to_value(ExecutionResult::committed(TxHash::repeat_byte(1))).unwrap();
        assert_eq!(committed["success"], true);
        assert!(committed["destinationTxHash"].as_str().unwrap().starts_with("0x0101"));
        assert!(committed.get("error").is_none());

        let failed = serde_json::to_value(ExecutionResult::failed(ErrorKind::ChainError)).unwrap();
        assert_eq!(failed, serde_json::json!({"success": false, "error": "CHAIN_ERROR"}));
    }

    #[test]
    fn test_terminal_states() {
        assert!(RequestState::Committed.is_terminal());
        assert!(RequestState::ExecutionFailed.is_terminal());
        assert!(!RequestState::NonceReserved.is_terminal());
    }
}
