//! In-memory backends (for testing and ephemeral use).
//!
//! Nothing here survives a restart; production wiring uses `SqliteStore`.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use relay_types::Result;
use tokio::sync::RwLock;

use crate::{now_secs, AuditEntry, AuditFilter, AuditLog, AuditOutcome, NonceRegistry};

/// Consumed nonces held in a sharded map.
///
/// Test-and-mark goes through the entry API, so it runs under the shard's
/// write lock and only pairs hashing to the same shard contend.
#[derive(Debug, Default)]
pub struct MemoryNonceRegistry {
    consumed: DashMap<(Address, U256), i64>,
}

impl MemoryNonceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.consumed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty()
    }
}

#[async_trait]
impl NonceRegistry for MemoryNonceRegistry {
    async fn try_consume(&self, user: Address, nonce: U256) -> Result<bool> {
        match self.consumed.entry((user, nonce)) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(now_secs());
                Ok(true)
            }
        }
    }

    async fn is_consumed(&self, user: Address, nonce: U256) -> Result<bool> {
        Ok(self.consumed.contains_key(&(user, nonce)))
    }
}

/// Audit entries kept in a vector, ids assigned sequentially from 1.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn append(&self, mut entry: AuditEntry) -> Result<AuditEntry> {
        let mut entries = self.entries.write().await;
        entry.id = entries.len() as i64 + 1;
        entries.push(entry.clone());
        Ok(entry)
    }

    async fn list(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        let entries = self.entries.read().await;
        let limit = filter.limit.unwrap_or(usize::MAX);
        Ok(entries
            .iter()
            .filter(|e| filter.matches(e))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_committed(&self, user: Address, nonce: U256) -> Result<Option<AuditEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .rev()
            .find(|e| e.user == user && e.nonce == nonce && e.outcome == AuditOutcome::Committed)
            .cloned())
    }
}
