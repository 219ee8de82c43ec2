//! Signing and signer recovery over the typed-data digest.
//!
//! Recovery is pure math: it returns whichever address the signature
//! recovers to under the given domain. Deciding whether that address is
//! acceptable is the caller's job.

use alloy::primitives::{Address, Signature, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use relay_types::{RelayError, Result, TypedDataDomain};

use crate::typed_data::{self, BridgeMessage};

/// Result of checking a signature against an expected signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub valid: bool,
    pub recovered: Address,
    pub digest: B256,
    pub domain_separator: B256,
}

/// Sign a bridge message under `domain` (client side).
///
/// Returns a 65-byte `r || s || v` signature with `v` in {27, 28}.
pub fn sign_request(
    domain: &TypedDataDomain,
    message: &BridgeMessage,
    signer: &PrivateKeySigner,
) -> Result<Signature> {
    let digest = typed_data::digest(domain, message);
    signer
        .sign_hash_sync(&digest)
        .map_err(|e| RelayError::Other(format!("signing failed: {}", e)))
}

/// Recover the address that produced `signature` over the bridge message.
///
/// Fails with `MalformedSignature` only if the bytes are not a recoverable
/// 65-byte signature.
pub fn recover_signer(
    domain: &TypedDataDomain,
    message: &BridgeMessage,
    signature: &[u8],
) -> Result<Address> {
    let sig = Signature::from_raw(signature)
        .map_err(|e| RelayError::MalformedSignature(e.to_string()))?;
    let digest = typed_data::digest(domain, message);
    sig.recover_address_from_prehash(&digest)
        .map_err(|e| RelayError::MalformedSignature(e.to_string()))
}

/// Recover the signer and compare it with `expected`.
pub fn verify_request(
    domain: &TypedDataDomain,
    message: &BridgeMessage,
    signature: &[u8],
    expected: Address,
) -> Result<Verification> {
    let recovered = recover_signer(domain, message, signature)?;
    Ok(Verification {
        valid: recovered == expected,
        recovered,
        digest: typed_data::digest(domain, message),
        domain_separator: typed_data::domain_separator(domain),
    })
}
