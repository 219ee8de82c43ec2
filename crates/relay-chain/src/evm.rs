//! alloy-backed `ChainClient`.
//!
//! Submission from the wallet is serialized: the lock is held from nonce
//! filling until the node has accepted the transaction, so concurrent
//! requests never race on the transport-level nonce. Confirmation waiting
//! happens after the lock is released.

use std::time::Duration;

use alloy::network::{EthereumWallet, ReceiptResponse, TransactionBuilder};
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use relay_types::{RelayError, Result};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::bindings::IERC20;
use crate::{ChainClient, TxOutcome};

/// Confirmation and timeout policy for writes.
#[derive(Debug, Clone, Copy)]
pub struct EvmChainSettings {
    pub chain_id: u64,
    pub required_confirmations: u64,
    pub receipt_timeout: Duration,
}

impl EvmChainSettings {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            required_confirmations: 1,
            receipt_timeout: Duration::from_secs(120),
        }
    }
}

pub struct EvmChainClient {
    provider: DynProvider,
    signer: Address,
    settings: EvmChainSettings,
    submit_lock: Mutex<()>,
}

fn chain_error(context: &str, e: impl std::fmt::Display) -> RelayError {
    RelayError::Chain(format!("{}: {}", context, e))
}

impl EvmChainClient {
    /// Wrap an existing provider. `signer` must be the address the provider's
    /// wallet signs with.
    pub fn new(provider: DynProvider, signer: Address, settings: EvmChainSettings) -> Self {
        Self { provider, signer, settings, submit_lock: Mutex::new(()) }
    }

    /// Connect to `rpc_url` with a local signing wallet and check that the
    /// node serves the expected chain.
    pub async fn connect(
        rpc_url: &str,
        signer: PrivateKeySigner,
        settings: EvmChainSettings,
    ) -> Result<Self> {
        let address = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect(rpc_url)
            .await
            .map_err(|e| chain_error("connect", e))?
            .erased();

        let reported = provider.get_chain_id().await.map_err(|e| chain_error("eth_chainId", e))?;
        if reported != settings.chain_id {
            return Err(RelayError::Config(format!(
                "rpc {} serves chain {}, expected {}",
                rpc_url, reported, settings.chain_id
            )));
        }

        info!(chain_id = settings.chain_id, signer = %address, "chain client connected");
        Ok(Self::new(provider, address, settings))
    }

    async fn submit(&self, tx: TransactionRequest) -> Result<TxOutcome> {
        let pending = {
            let _guard = self.submit_lock.lock().await;
            self.provider
                .send_transaction(tx)
                .await
                .map_err(|e| chain_error("submit", e))?
        };

        let tx_hash = *pending.tx_hash();
        info!(chain_id = self.settings.chain_id, %tx_hash, "transaction submitted");

        let receipt = pending
            .with_required_confirmations(self.settings.required_confirmations)
            .with_timeout(Some(self.settings.receipt_timeout))
            .get_receipt()
            .await
            .map_err(|e| chain_error(&format!("receipt for {}", tx_hash), e))?;

        if !ReceiptResponse::status(&receipt) {
            warn!(chain_id = self.settings.chain_id, %tx_hash, "transaction reverted");
            return Err(RelayError::Chain(format!("transaction {} reverted", tx_hash)));
        }

        info!(
            chain_id = self.settings.chain_id,
            %tx_hash,
            block = ?receipt.block_number,
            "transaction confirmed"
        );
        Ok(TxOutcome { tx_hash: receipt.transaction_hash, block_number: receipt.block_number })
    }
}

#[async_trait]
impl ChainClient for EvmChainClient {
    fn chain_id(&self) -> u64 {
        self.settings.chain_id
    }

    fn signer_address(&self) -> Address {
        self.signer
    }

    async fn native_balance(&self, address: Address) -> Result<U256> {
        self.provider
            .get_balance(address)
            .await
            .map_err(|e| chain_error("eth_getBalance", e))
    }

    async fn token_balance(&self, token: Address, holder: Address) -> Result<U256> {
        IERC20::new(token, self.provider.clone())
            .balanceOf(holder)
            .call()
            .await
            .map_err(|e| chain_error("balanceOf", e))
    }

    async fn token_decimals(&self, token: Address) -> Result<u8> {
        IERC20::new(token, self.provider.clone())
            .decimals()
            .call()
            .await
            .map_err(|e| chain_error("decimals", e))
    }

    async fn transfer_native(&self, to: Address, value: U256) -> Result<TxOutcome> {
        debug!(%to, %value, "sending native transfer");
        let tx = TransactionRequest::default()
            .with_from(self.signer)
            .with_to(to)
            .with_value(value);
        self.submit(tx).await
    }

    async fn send_call(&self, contract: Address, calldata: Bytes) -> Result<TxOutcome> {
        debug!(%contract, len = calldata.len(), "sending contract call");
        let tx = TransactionRequest::default()
            .with_from(self.signer)
            .with_to(contract)
            .with_input(calldata);
        self.submit(tx).await
    }
}
