//! Structural validation of raw bridge submissions.
//!
//! Numeric fields accept a base-10 string or a JSON integer. Anything else
//! (floats, negatives, hex, missing) is a bad request. Signature bytes are
//! only hex-decoded here; their length is checked at recovery.

use alloy::primitives::{Address, Bytes, U256};
use relay_types::{
    hex_to_bytes, parse_address, parse_decimal_u256, parse_hash, BridgeDirection, BridgeFailure,
    BridgeRequest,
};
use serde::Deserialize;
use serde_json::Value;

/// Request body as received, before any validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeSubmission {
    pub user: Option<Value>,
    pub amount: Option<Value>,
    pub nonce: Option<Value>,
    pub signature: Option<Value>,
    #[serde(alias = "ethTxHash")]
    pub source_tx_hash: Option<Value>,
    pub chain_id: Option<Value>,
}

/// A structurally valid request plus the chain id the client claims to
/// have signed for, if it sent one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSubmission {
    pub request: BridgeRequest,
    pub claimed_chain_id: Option<ClaimedChainId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimedChainId {
    Known(u64),
    /// Parsed but wider than 64 bits, so it cannot match any domain.
    OutOfRange,
}

impl ClaimedChainId {
    pub fn matches(&self, chain_id: u64) -> bool {
        matches!(self, Self::Known(id) if *id == chain_id)
    }
}

/// Parse a non-negative integer given as a decimal string or JSON integer.
///
/// JSON integers are limited to 64 bits; anything wider must be sent as a
/// decimal string.
pub fn parse_numeric(value: Option<&Value>, label: &str) -> Result<U256, BridgeFailure> {
    match value {
        Some(Value::String(text)) => {
            parse_decimal_u256(text, label).map_err(|e| BridgeFailure::bad_request(e.to_string()))
        }
        Some(Value::Number(number)) => {
            if let Some(value) = number.as_u64() {
                return Ok(U256::from(value));
            }
            let detail = match number.as_f64() {
                _ if number.is_i64() => format!("{} must not be negative: {}", label, number),
                Some(float) if float.fract() == 0.0 && float >= u64::MAX as f64 => format!(
                    "{} exceeds the 64-bit JSON integer range, send it as a decimal string",
                    label
                ),
                _ => format!("{} must be an integer: {}", label, number),
            };
            Err(BridgeFailure::bad_request(detail))
        }
        _ => Err(BridgeFailure::bad_request(format!("missing or invalid type for {}", label))),
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    match value {
        Some(Value::String(text)) if !text.trim().is_empty() => Some(text.trim()),
        _ => None,
    }
}

impl BridgeSubmission {
    /// Validate every field and build the immutable request.
    pub fn parse(&self, direction: BridgeDirection) -> Result<ParsedSubmission, BridgeFailure> {
        let amount = parse_numeric(self.amount.as_ref(), "amount")?;
        let nonce = parse_numeric(self.nonce.as_ref(), "nonce")?;

        let (Some(user), Some(signature)) =
            (non_empty_str(self.user.as_ref()), non_empty_str(self.signature.as_ref()))
        else {
            return Err(BridgeFailure::bad_request("missing required fields"));
        };

        let user = parse_address(user)
            .map_err(|_| BridgeFailure::bad_request("invalid user address"))?;
        let signature = hex_to_bytes(signature)
            .map_err(|_| BridgeFailure::bad_request("signature is not hex"))?;

        let source_tx_hash = match self.source_tx_hash.as_ref() {
            None => None,
            Some(Value::String(text)) if text.trim().is_empty() => None,
            Some(Value::String(text)) => Some(
                parse_hash(text).map_err(|_| BridgeFailure::bad_request("invalid sourceTxHash"))?,
            ),
            Some(_) => return Err(BridgeFailure::bad_request("invalid sourceTxHash")),
        };

        let claimed_chain_id = match self.chain_id.as_ref() {
            None => None,
            value => {
                let id = parse_numeric(value, "chainId")?;
                Some(u64::try_from(id).map_or(ClaimedChainId::OutOfRange, ClaimedChainId::Known))
            }
        };

        let request = BridgeRequest::new(
            user,
            amount,
            nonce,
            Bytes::from(signature),
            direction,
            source_tx_hash,
        )
        .map_err(|_| BridgeFailure::bad_request("amount must be greater than zero"))?;

        Ok(ParsedSubmission { request, claimed_chain_id })
    }

    /// Best-effort user and amount for rejection notices on unparseable
    /// submissions.
    pub fn peek(&self) -> (Option<Address>, U256) {
        let user = non_empty_str(self.user.as_ref()).and_then(|u| parse_address(u).ok());
        let amount = parse_numeric(self.amount.as_ref(), "amount").unwrap_or_default();
        (user, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_types::ErrorKind;
    use serde_json::json;

    const USER: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";

    fn submission(body: Value) -> BridgeSubmission {
        serde_json::from_value(body).unwrap()
    }

    fn valid_body() -> Value {
        json!({
            "user": USER,
            "amount": "1000000000000000000",
            "nonce": 7,
            "signature": format!("0x{}", "11".repeat(65)),
        })
    }

    #[test]
    fn test_parses_string_and_integer_numbers() {
        let parsed = submission(valid_body()).parse(BridgeDirection::AToB).unwrap();
        assert_eq!(parsed.request.amount, U256::from(1_000_000_000_000_000_000u64));
        assert_eq!(parsed.request.nonce, U256::from(7u64));
        assert_eq!(parsed.request.signature.len(), 65);
        assert_eq!(parsed.request.user, parse_address(USER).unwrap());
        assert_eq!(parsed.claimed_chain_id, None);
    }

    #[test]
    fn test_rejects_bad_numbers() {
        for amount in [json!("12abc"), json!("-5"), json!(1.5), json!(-3), json!(true), json!("")] {
            let mut body = valid_body();
            body["amount"] = amount.clone();
            let err = submission(body).parse(BridgeDirection::AToB).unwrap_err();
            assert_eq!(err.kind, ErrorKind::BadRequest, "amount {}", amount);
        }
    }

    #[test]
    fn test_wide_json_integer_asks_for_string() {
        let mut body = valid_body();
        body["amount"] = serde_json::from_str("18446744073709551616").unwrap();
        let err = submission(body).parse(BridgeDirection::AToB).unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadRequest);
        assert!(err.detail.contains("decimal string"), "{}", err.detail);

        let mut body = valid_body();
        body["amount"] = json!("18446744073709551616");
        let parsed = submission(body).parse(BridgeDirection::AToB).unwrap();
        assert_eq!(parsed.request.amount, U256::from(u64::MAX) + U256::from(1));

        let err = parse_numeric(Some(&json!(-3)), "nonce").unwrap_err();
        assert!(err.detail.contains("negative"));
        let err = parse_numeric(Some(&json!(1.5)), "nonce").unwrap_err();
        assert!(err.detail.contains("must be an integer"));
    }

    #[test]
    fn test_rejects_zero_amount() {
        let mut body = valid_body();
        body["amount"] = json!("0");
        let err = submission(body).parse(BridgeDirection::BToA).unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadRequest);
        assert!(err.detail.contains("greater than zero"));
    }

    #[test]
    fn test_missing_fields() {
        for field in ["user", "signature", "nonce", "amount"] {
            let mut body = valid_body();
            body.as_object_mut().unwrap().remove(field);
            let err = submission(body).parse(BridgeDirection::AToB).unwrap_err();
            assert_eq!(err.kind, ErrorKind::BadRequest, "missing {}", field);
        }
    }

    #[test]
    fn test_invalid_address() {
        let mut body = valid_body();
        body["user"] = json!("0x1234");
        let err = submission(body).parse(BridgeDirection::AToB).unwrap_err();
        assert_eq!(err.detail, "invalid user address");
    }

    #[test]
    fn test_source_tx_hash_and_legacy_alias() {
        let hash = format!("0x{}", "ab".repeat(32));
        let mut body = valid_body();
        body["ethTxHash"] = json!(hash);
        let parsed = submission(body).parse(BridgeDirection::AToB).unwrap();
        assert_eq!(parsed.request.source_tx_hash, Some(parse_hash(&hash).unwrap()));

        let mut body = valid_body();
        body["sourceTxHash"] = json!("0xdeadbeef");
        assert!(submission(body).parse(BridgeDirection::AToB).is_err());

        let mut body = valid_body();
        body["sourceTxHash"] = json!("");
        assert_eq!(submission(body).parse(BridgeDirection::AToB).unwrap().request.source_tx_hash, None);
    }

    #[test]
    fn test_claimed_chain_id() {
        let mut body = valid_body();
        body["chainId"] = json!(20250511);
        let parsed = submission(body).parse(BridgeDirection::BToA).unwrap();
        assert_eq!(parsed.claimed_chain_id, Some(ClaimedChainId::Known(20250511)));
        assert!(parsed.claimed_chain_id.unwrap().matches(20250511));

        let mut body = valid_body();
        body["chainId"] = json!("340282366920938463463374607431768211456");
        let parsed = submission(body).parse(BridgeDirection::BToA).unwrap();
        assert_eq!(parsed.claimed_chain_id, Some(ClaimedChainId::OutOfRange));
        assert!(!parsed.claimed_chain_id.unwrap().matches(1));
    }

    #[test]
    fn test_peek_best_effort() {
        let (user, amount) = submission(json!({"user": USER, "amount": "abc"})).peek();
        assert_eq!(user, Some(parse_address(USER).unwrap()));
        assert_eq!(amount, U256::ZERO);
    }
}
