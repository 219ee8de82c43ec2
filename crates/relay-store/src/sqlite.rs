//! Durable SQLite backend for the nonce registry and the audit log.
//!
//! Schema (created by `migrate`):
//! - `consumed_nonces(user, nonce, consumed_at)`, primary key `(user, nonce)`
//! - `audit_log(id, user, amount, nonce, direction, outcome, source_tx_hash,
//!   destination_tx_hash, payout_amount, reason, recorded_at)`
//!
//! Addresses and hashes are stored as lowercase 0x-hex, 256-bit integers as
//! base-10 text.

use std::str::FromStr;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use relay_types::{
    bytes_to_hex, parse_address, parse_decimal_u256, parse_hash, BridgeDirection, RelayError,
    Result,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};

use crate::{now_secs, AuditEntry, AuditFilter, AuditLog, AuditOutcome, NonceRegistry};

const MAX_CONNECTIONS: u32 = 8;

const AUDIT_COLUMNS: &str = "id, user, amount, nonce, direction, outcome, source_tx_hash, \
     destination_tx_hash, payout_amount, reason, recorded_at";

fn storage_error(e: sqlx::Error) -> RelayError {
    RelayError::Storage(e.to_string())
}

fn address_key(address: &Address) -> String {
    bytes_to_hex(address.as_slice())
}

/// SQLite-backed store implementing both `NonceRegistry` and `AuditLog`.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url`.
    ///
    /// `:memory:` databases are confined to one connection that never idles
    /// out, otherwise every pooled connection would see its own database.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(storage_error)?
            .create_if_missing(true);

        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
        } else {
            SqlitePoolOptions::new()
                .max_connections(MAX_CONNECTIONS)
                .connect_with(options)
                .await
        }
        .map_err(storage_error)?;

        info!(url = %url, "opened sqlite store");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables and indexes if they do not exist.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS consumed_nonces (
                user TEXT NOT NULL,
                nonce TEXT NOT NULL,
                consumed_at INTEGER NOT NULL,
                PRIMARY KEY (user, nonce)
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user TEXT NOT NULL,
                amount TEXT NOT NULL,
                nonce TEXT NOT NULL,
                direction TEXT NOT NULL,
                outcome TEXT NOT NULL,
                source_tx_hash TEXT,
                destination_tx_hash TEXT,
                payout_amount TEXT,
                reason TEXT,
                recorded_at INTEGER NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_audit_log_user_nonce ON audit_log (user, nonce)")
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        debug!("sqlite schema ready");
        Ok(())
    }
}

#[async_trait]
impl NonceRegistry for SqliteStore {
    async fn init(&self) -> Result<()> {
        self.migrate().await
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }

    async fn try_consume(&self, user: Address, nonce: U256) -> Result<bool> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO consumed_nonces (user, nonce, consumed_at) VALUES (?1, ?2, ?3)",
        )
        .bind(address_key(&user))
        .bind(nonce.to_string())
        .bind(now_secs())
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn is_consumed(&self, user: Address, nonce: U256) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM consumed_nonces WHERE user = ?1 AND nonce = ?2")
            .bind(address_key(&user))
            .bind(nonce.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(row.is_some())
    }
}

fn optional_hash(value: Option<String>) -> Result<Option<alloy::primitives::TxHash>> {
    value.as_deref().map(parse_hash).transpose()
}

fn row_to_entry(row: &SqliteRow) -> Result<AuditEntry> {
    let user: String = row.try_get("user").map_err(storage_error)?;
    let amount: String = row.try_get("amount").map_err(storage_error)?;
    let nonce: String = row.try_get("nonce").map_err(storage_error)?;
    let direction: String = row.try_get("direction").map_err(storage_error)?;
    let outcome: String = row.try_get("outcome").map_err(storage_error)?;
    let payout: Option<String> = row.try_get("payout_amount").map_err(storage_error)?;

    Ok(AuditEntry {
        id: row.try_get("id").map_err(storage_error)?,
        user: parse_address(&user)?,
        amount: parse_decimal_u256(&amount, "amount")?,
        nonce: parse_decimal_u256(&nonce, "nonce")?,
        direction: BridgeDirection::parse(&direction)
            .ok_or_else(|| RelayError::Storage(format!("unknown direction {}", direction)))?,
        outcome: AuditOutcome::parse(&outcome)
            .ok_or_else(|| RelayError::Storage(format!("unknown outcome {}", outcome)))?,
        source_tx_hash: optional_hash(row.try_get("source_tx_hash").map_err(storage_error)?)?,
        destination_tx_hash: optional_hash(
            row.try_get("destination_tx_hash").map_err(storage_error)?,
        )?,
        payout_amount: payout
            .as_deref()
            .map(|p| parse_decimal_u256(p, "payout_amount"))
            .transpose()?,
        reason: row.try_get("reason").map_err(storage_error)?,
        recorded_at: row.try_get("recorded_at").map_err(storage_error)?,
    })
}

#[async_trait]
impl AuditLog for SqliteStore {
    async fn append(&self, mut entry: AuditEntry) -> Result<AuditEntry> {
        let result = sqlx::query(
            r"
            INSERT INTO audit_log (
                user, amount, nonce, direction, outcome, source_tx_hash,
                destination_tx_hash, payout_amount, reason, recorded_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(address_key(&entry.user))
        .bind(entry.amount.to_string())
        .bind(entry.nonce.to_string())
        .bind(entry.direction.as_str())
        .bind(entry.outcome.as_str())
        .bind(entry.source_tx_hash.map(|h| bytes_to_hex(h.as_slice())))
        .bind(entry.destination_tx_hash.map(|h| bytes_to_hex(h.as_slice())))
        .bind(entry.payout_amount.map(|p| p.to_string()))
        .bind(entry.reason.clone())
        .bind(entry.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        entry.id = result.last_insert_rowid();
        Ok(entry)
    }

    async fn list(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        // LIMIT -1 is unbounded in SQLite.
        let limit = filter.limit.map(|l| l as i64).unwrap_or(-1);
        let sql = format!(
            "SELECT {} FROM audit_log \
             WHERE (?1 IS NULL OR user = ?1) \
               AND (?2 IS NULL OR outcome = ?2) \
               AND (?3 IS NULL OR direction = ?3) \
             ORDER BY id ASC LIMIT ?4",
            AUDIT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(filter.user.as_ref().map(address_key))
            .bind(filter.outcome.map(|o| o.as_str()))
            .bind(filter.direction.map(|d| d.as_str()))
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn find_committed(&self, user: Address, nonce: U256) -> Result<Option<AuditEntry>> {
        let sql = format!(
            "SELECT {} FROM audit_log \
             WHERE user = ?1 AND nonce = ?2 AND outcome = ?3 \
             ORDER BY id DESC LIMIT 1",
            AUDIT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(address_key(&user))
            .bind(nonce.to_string())
            .bind(AuditOutcome::Committed.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        row.as_ref().map(row_to_entry).transpose()
    }
}
