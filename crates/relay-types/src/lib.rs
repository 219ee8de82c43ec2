use alloy::primitives::{Address, B256, U256};
use thiserror::Error;

pub mod bridge;

pub use bridge::{
    BridgeDirection, BridgeFailure, BridgeRequest, ErrorKind, ExchangeRate, ExecutionResult,
    RequestState, SignatureFailure, TypedDataDomain,
};

/// Relayer error types.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid numeric string for {label}: \"{value}\"")]
    InvalidAmount { label: String, value: String },

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("converted amount rounds to zero")]
    ConversionUnderflow,

    #[error("converted amount does not fit in 256 bits")]
    ConversionOverflow,

    #[error("invalid exchange rate: {0}")]
    InvalidRate(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("chain error: {0}")]
    Chain(String),

    #[error("notification failed: {0}")]
    Notify(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;

/// Parse a hex string (with or without 0x) to bytes.
pub fn hex_to_bytes(hex_str: &str) -> Result<Vec<u8>> {
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    hex::decode(hex_str).map_err(|e| RelayError::InvalidHex(e.to_string()))
}

/// Convert bytes to a 0x-prefixed hex string.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Parse a 20-byte account address. Any hex casing is accepted; the
/// checksum is not enforced.
pub fn parse_address(input: &str) -> Result<Address> {
    let trimmed = input.trim();
    let body = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| RelayError::InvalidAddress(trimmed.to_string()))?;

    if body.len() != 40 {
        return Err(RelayError::InvalidAddress(trimmed.to_string()));
    }

    let bytes = hex::decode(body).map_err(|_| RelayError::InvalidAddress(trimmed.to_string()))?;
    Ok(Address::from_slice(&bytes))
}

/// Parse a 0x-prefixed 32-byte hash (transaction hashes, digests).
pub fn parse_hash(input: &str) -> Result<B256> {
    let bytes = hex_to_bytes(input.trim())?;
    if bytes.len() != 32 || !input.trim().starts_with("0x") {
        return Err(RelayError::InvalidHex(format!(
            "expected 0x-prefixed 32-byte hash, got \"{}\"",
            input.trim()
        )));
    }
    Ok(B256::from_slice(&bytes))
}

/// Parse an unsigned base-10 integer that must fit in 256 bits.
///
/// Leading/trailing whitespace is ignored; signs, decimal points, exponents
/// and hex prefixes are rejected.
pub fn parse_decimal_u256(input: &str, label: &str) -> Result<U256> {
    let text = input.trim();
    let invalid = || RelayError::InvalidAmount {
        label: label.to_string(),
        value: text.to_string(),
    };

    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    U256::from_str_radix(text, 10).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address_accepts_any_casing() {
        let lower = parse_address("0x2c7536e3605d9c16a7a3d7b1898e529396a65c23").unwrap();
        let checksummed = parse_address("0x2c7536E3605D9C16a7a3D7b1898e529396a65c23").unwrap();
        assert_eq!(lower, checksummed);
    }

    #[test]
    fn test_parse_address_rejects_malformed() {
        for bad in ["", "0x", "2c7536e3605d9c16a7a3d7b1898e529396a65c23", "0x1234", "0xzz7536e3605d9c16a7a3d7b1898e529396a65c23"] {
            assert!(parse_address(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_parse_decimal_u256() {
        assert_eq!(parse_decimal_u256(" 42 ", "nonce").unwrap(), U256::from(42));
        assert_eq!(parse_decimal_u256("0", "amount").unwrap(), U256::ZERO);

        let max = "115792089237316195423570985008687907853269984665640564039457584007913129639935";
        assert_eq!(parse_decimal_u256(max, "amount").unwrap(), U256::MAX);
    }

    #[test]
    fn test_parse_decimal_u256_rejects_non_decimal() {
        let too_big = "115792089237316195423570985008687907853269984665640564039457584007913129639936";
        for bad in ["", "-1", "+1", "1.5", "1e18", "0x10", "ten", too_big] {
            let err = parse_decimal_u256(bad, "amount").unwrap_err();
            assert!(matches!(err, RelayError::InvalidAmount { .. }), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_parse_hash_requires_32_bytes() {
        let hash = format!("0x{}", "ab".repeat(32));
        assert!(parse_hash(&hash).is_ok());
        assert!(parse_hash("0xabcd").is_err());
        assert!(parse_hash(&"ab".repeat(32)).is_err());
    }
}
