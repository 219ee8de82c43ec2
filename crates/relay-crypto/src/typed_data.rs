//! EIP-712 structured-data hashing for the `Bridge` message.
//!
//! digest = keccak256(0x19 || 0x01 || domainSeparator || structHash)
//!
//! domainSeparator = keccak256(
//!     typeHash(EIP712Domain) || keccak256(name) || keccak256(version)
//!     || uint256(chainId) || address(verifyingContract)
//! )
//!
//! structHash = keccak256(typeHash(Bridge) || address(user) || uint256(amount) || uint256(nonce))
//!
//! Field order and type tags are fixed; any change breaks every signature
//! produced by existing clients.

use alloy::primitives::B256;
use alloy::sol;
use alloy::sol_types::{eip712_domain, Eip712Domain, SolStruct};
use relay_types::{BridgeRequest, TypedDataDomain};

sol! {
    /// The signed fields of a bridge request.
    #[derive(Debug, Copy, PartialEq, Eq)]
    struct Bridge {
        address user;
        uint256 amount;
        uint256 nonce;
    }
}

pub type BridgeMessage = Bridge;

impl From<&BridgeRequest> for BridgeMessage {
    fn from(request: &BridgeRequest) -> Self {
        Self { user: request.user, amount: request.amount, nonce: request.nonce }
    }
}

pub fn eip712(domain: &TypedDataDomain) -> Eip712Domain {
    eip712_domain! {
        name: domain.name.clone(),
        version: domain.version.clone(),
        chain_id: domain.chain_id,
        verifying_contract: domain.verifying_contract,
    }
}

/// Hash of the EIP-712 domain.
pub fn domain_separator(domain: &TypedDataDomain) -> B256 {
    eip712(domain).separator()
}

/// Hash of the `Bridge` struct.
pub fn struct_hash(message: &BridgeMessage) -> B256 {
    message.eip712_hash_struct()
}

/// The 32-byte digest that is signed.
pub fn digest(domain: &TypedDataDomain, message: &BridgeMessage) -> B256 {
    message.eip712_signing_hash(&eip712(domain))
}
