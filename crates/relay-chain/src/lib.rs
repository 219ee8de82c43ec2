//! Chain access for the relayer: the `ChainClient` transport contract, its
//! alloy-backed implementation and the read-only balance service.
//!
//! - `evm`: `EvmChainClient`, one wallet on one chain, writes serialized
//! - `balance`: asset-symbol lookups used by the HTTP surface and the
//!   payout solvency guard
//! - `bindings`: `sol!` ABIs for the bridge mint and ERC-20 reads

pub mod balance;
pub mod bindings;
pub mod evm;
#[cfg(any(test, feature = "test-support"))]
pub mod mock;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;
use relay_types::Result;
use serde::{Deserialize, Serialize};

pub use balance::{AssetBalance, BalanceError, BalanceService};
pub use bindings::bridge_mint_calldata;
pub use evm::{EvmChainClient, EvmChainSettings};

/// A write accepted by the chain and confirmed as successful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOutcome {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
}

/// Stateless transport to one chain, bound to one signing wallet.
///
/// Writes return only once the transaction has the configured number of
/// confirmations and a success status. Reverts, RPC failures and receipt
/// timeouts are all `RelayError::Chain`.
#[async_trait]
pub trait ChainClient: Send + Sync {
    fn chain_id(&self) -> u64;

    /// Address of the wallet that signs writes.
    fn signer_address(&self) -> Address;

    /// Native balance; unknown accounts are zero.
    async fn native_balance(&self, address: Address) -> Result<U256>;

    async fn token_balance(&self, token: Address, holder: Address) -> Result<U256>;

    async fn token_decimals(&self, token: Address) -> Result<u8>;

    /// Send `value` of the native asset from the signer to `to`.
    async fn transfer_native(&self, to: Address, value: U256) -> Result<TxOutcome>;

    /// Call `contract` with `calldata` from the signer.
    async fn send_call(&self, contract: Address, calldata: Bytes) -> Result<TxOutcome>;
}
