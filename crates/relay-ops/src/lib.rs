//! End-to-end bridge orchestration: intake, verification, nonce
//! reservation, execution, audit and notification.
//!
//! Coordinates between the crypto, rate, store, chain and notify crates to
//! relay one request at a time per call. Concurrency control lives entirely
//! in the nonce registry.

pub mod intake;
pub mod orchestrator;

pub use intake::{parse_numeric, BridgeSubmission, ClaimedChainId, ParsedSubmission};
pub use orchestrator::{BridgeConfig, BridgeOrchestrator, BridgeReceipt};
