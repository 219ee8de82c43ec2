//! In-process `ChainClient` for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use alloy::primitives::{Address, Bytes, TxHash, B256, U256};
use async_trait::async_trait;
use relay_types::{RelayError, Result};

use crate::{ChainClient, TxOutcome};

/// A write the mock accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentTx {
    Native { to: Address, value: U256, tx_hash: TxHash },
    Call { contract: Address, calldata: Bytes, tx_hash: TxHash },
}

impl SentTx {
    pub fn tx_hash(&self) -> TxHash {
        match self {
            Self::Native { tx_hash, .. } | Self::Call { tx_hash, .. } => *tx_hash,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poison) => poison.into_inner(),
    }
}

/// Mock chain with in-memory balances. Native transfers debit the signer.
pub struct MockChainClient {
    chain_id: u64,
    signer: Address,
    native: Mutex<HashMap<Address, U256>>,
    tokens: Mutex<HashMap<(Address, Address), U256>>,
    decimals: Mutex<HashMap<Address, u8>>,
    decimals_calls: AtomicUsize,
    sent: Mutex<Vec<SentTx>>,
    next_tx: AtomicU64,
    fail_writes: AtomicBool,
    write_delay: Option<Duration>,
}

impl MockChainClient {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            signer: Address::repeat_byte(0xee),
            native: Mutex::new(HashMap::new()),
            tokens: Mutex::new(HashMap::new()),
            decimals: Mutex::new(HashMap::new()),
            decimals_calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
            next_tx: AtomicU64::new(1),
            fail_writes: AtomicBool::new(false),
            write_delay: None,
        }
    }

    /// Creates a mock whose writes all fail with a chain error.
    pub fn failing(chain_id: u64) -> Self {
        let mock = Self::new(chain_id);
        mock.set_fail_writes(true);
        mock
    }

    pub fn with_signer(mut self, signer: Address) -> Self {
        self.signer = signer;
        self
    }

    pub fn with_token(self, token: Address, decimals: u8) -> Self {
        lock(&self.decimals).insert(token, decimals);
        self
    }

    /// Delay every write, to widen race windows in concurrency tests.
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    pub fn set_native_balance(&self, address: Address, balance: U256) {
        lock(&self.native).insert(address, balance);
    }

    pub fn set_token_balance(&self, token: Address, holder: Address, balance: U256) {
        lock(&self.tokens).insert((token, holder), balance);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentTx> {
        lock(&self.sent).clone()
    }

    pub fn decimals_calls(&self) -> usize {
        self.decimals_calls.load(Ordering::SeqCst)
    }

    async fn write(&self, record: impl FnOnce(TxHash) -> SentTx) -> Result<TxOutcome> {
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RelayError::Chain("execution reverted".into()));
        }
        let n = self.next_tx.fetch_add(1, Ordering::SeqCst);
        let tag: U256 = (U256::from(self.chain_id) << 64) | U256::from(n);
        let tx_hash = B256::from(tag.to_be_bytes::<32>());
        lock(&self.sent).push(record(tx_hash));
        Ok(TxOutcome { tx_hash, block_number: Some(n) })
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn signer_address(&self) -> Address {
        self.signer
    }

    async fn native_balance(&self, address: Address) -> Result<U256> {
        Ok(lock(&self.native).get(&address).copied().unwrap_or_default())
    }

    async fn token_balance(&self, token: Address, holder: Address) -> Result<U256> {
        Ok(lock(&self.tokens).get(&(token, holder)).copied().unwrap_or_default())
    }

    async fn token_decimals(&self, token: Address) -> Result<u8> {
        self.decimals_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.decimals)
            .get(&token)
            .copied()
            .ok_or_else(|| RelayError::Chain(format!("no contract at {}", token)))
    }

    async fn transfer_native(&self, to: Address, value: U256) -> Result<TxOutcome> {
        let outcome = self.write(|tx_hash| SentTx::Native { to, value, tx_hash }).await?;
        let mut native = lock(&self.native);
        let own = native.entry(self.signer).or_default();
        *own = own.saturating_sub(value);
        *native.entry(to).or_default() += value;
        Ok(outcome)
    }

    async fn send_call(&self, contract: Address, calldata: Bytes) -> Result<TxOutcome> {
        self.write(|tx_hash| SentTx::Call { contract, calldata, tx_hash }).await
    }
}
