//! Replay-protection and audit storage for the relayer.
//!
//! Defines the `NonceRegistry` and `AuditLog` traits that every backend must
//! implement. `MemoryNonceRegistry`/`MemoryAuditLog` serve tests and ephemeral
//! runs; `SqliteStore` is the durable backend and implements both traits;
//! `CachedNonceRegistry` puts a positive cache in front of a durable registry.

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use relay_types::{BridgeDirection, BridgeRequest, Result};
use serde::{Deserialize, Serialize};

pub mod cached;
pub mod memory;
pub mod sqlite;

pub use cached::CachedNonceRegistry;
pub use memory::{MemoryAuditLog, MemoryNonceRegistry};
pub use sqlite::SqliteStore;

/// Unix seconds.
pub(crate) fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// The authoritative set of consumed (user, nonce) pairs.
///
/// `try_consume` is the only way a pair is recorded and must be atomic: of
/// any number of concurrent calls for the same pair, exactly one returns
/// `true`. Calls for different pairs must not serialize on each other.
#[async_trait]
pub trait NonceRegistry: Send + Sync {
    // --- Lifecycle ---
    async fn init(&self) -> Result<()> { Ok(()) }
    async fn close(&self) -> Result<()> { Ok(()) }

    /// Mark the pair consumed. `true` iff it was previously unconsumed.
    async fn try_consume(&self, user: Address, nonce: U256) -> Result<bool>;

    async fn is_consumed(&self, user: Address, nonce: U256) -> Result<bool>;
}

/// Final outcome of a request that reached execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditOutcome {
    Committed,
    ExecutionFailed,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Committed => "COMMITTED",
            Self::ExecutionFailed => "EXECUTION_FAILED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "COMMITTED" => Some(Self::Committed),
            "EXECUTION_FAILED" => Some(Self::ExecutionFailed),
            _ => None,
        }
    }
}

/// One row of the operator-facing audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// Assigned by the log on append; 0 before that.
    pub id: i64,
    pub user: Address,
    pub amount: U256,
    pub nonce: U256,
    pub direction: BridgeDirection,
    pub outcome: AuditOutcome,
    pub source_tx_hash: Option<TxHash>,
    pub destination_tx_hash: Option<TxHash>,
    pub payout_amount: Option<U256>,
    pub reason: Option<String>,
    pub recorded_at: i64,
}

impl AuditEntry {
    pub fn new(request: &BridgeRequest, outcome: AuditOutcome) -> Self {
        Self {
            id: 0,
            user: request.user,
            amount: request.amount,
            nonce: request.nonce,
            direction: request.direction,
            outcome,
            source_tx_hash: request.source_tx_hash,
            destination_tx_hash: None,
            payout_amount: None,
            reason: None,
            recorded_at: now_secs(),
        }
    }

    pub fn with_destination_tx(mut self, tx_hash: TxHash) -> Self {
        self.destination_tx_hash = Some(tx_hash);
        self
    }

    pub fn with_payout(mut self, payout: U256) -> Self {
        self.payout_amount = Some(payout);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Query for listing audit entries. Empty filter lists everything.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub user: Option<Address>,
    pub outcome: Option<AuditOutcome>,
    pub direction: Option<BridgeDirection>,
    pub limit: Option<usize>,
}

impl AuditFilter {
    pub fn failures() -> Self {
        Self { outcome: Some(AuditOutcome::ExecutionFailed), ..Self::default() }
    }

    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.user.map_or(true, |user| entry.user == user)
            && self.outcome.map_or(true, |outcome| entry.outcome == outcome)
            && self.direction.map_or(true, |direction| entry.direction == direction)
    }
}

/// Append-only record of executed requests, oldest first.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Store the entry and return it with its assigned id.
    async fn append(&self, entry: AuditEntry) -> Result<AuditEntry>;

    async fn list(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>>;

    /// Most recent committed entry for the pair, if any.
    async fn find_committed(&self, user: Address, nonce: U256) -> Result<Option<AuditEntry>>;
}
