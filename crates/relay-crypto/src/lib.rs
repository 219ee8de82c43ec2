//! Typed-data hashing, signing and signer recovery for bridge requests.
//!
//! - `typed_data`: EIP-712 domain separator, struct hash and signing digest
//! - `signer`: client-side signing and server-side signer recovery

pub mod signer;
pub mod typed_data;

pub use signer::{recover_signer, sign_request, verify_request, Verification};
pub use typed_data::{digest, domain_separator, struct_hash, BridgeMessage};
