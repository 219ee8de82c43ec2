//! Read-only balance lookups by asset symbol.
//!
//! Symbols are matched case-insensitively. A native asset has fixed
//! decimals; a token asset reads `decimals()` from its contract once and
//! caches it. A well-formed address with no history reads as zero.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use relay_types::{parse_address, RelayError};
use serde::{Serialize, Serializer};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::ChainClient;

#[derive(Debug, thiserror::Error)]
pub enum BalanceError {
    #[error("unknown asset: {0}")]
    UnknownAsset(String),
    #[error("malformed address: {0}")]
    NotFound(String),
    #[error(transparent)]
    Relay(#[from] RelayError),
}

fn serialize_decimal<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

/// Balance in smallest units plus the asset's decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AssetBalance {
    #[serde(serialize_with = "serialize_decimal")]
    pub balance: U256,
    pub decimals: u8,
}

enum AssetSource {
    Native { decimals: u8 },
    Token { token: Address, decimals: OnceCell<u8> },
}

struct Asset {
    chain: Arc<dyn ChainClient>,
    source: AssetSource,
}

#[derive(Default)]
pub struct BalanceService {
    assets: HashMap<String, Asset>,
}

impl BalanceService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the native asset of `chain` under `symbol`.
    pub fn with_native(mut self, symbol: &str, chain: Arc<dyn ChainClient>, decimals: u8) -> Self {
        self.assets.insert(
            symbol.to_ascii_lowercase(),
            Asset { chain, source: AssetSource::Native { decimals } },
        );
        self
    }

    /// Register the ERC-20 at `token` on `chain` under `symbol`.
    pub fn with_token(mut self, symbol: &str, chain: Arc<dyn ChainClient>, token: Address) -> Self {
        self.assets.insert(
            symbol.to_ascii_lowercase(),
            Asset { chain, source: AssetSource::Token { token, decimals: OnceCell::new() } },
        );
        self
    }

    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<_> = self.assets.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    fn asset(&self, symbol: &str) -> Result<&Asset, BalanceError> {
        self.assets
            .get(&symbol.to_ascii_lowercase())
            .ok_or_else(|| BalanceError::UnknownAsset(symbol.to_string()))
    }

    /// Balance of `address` in `asset`.
    pub async fn get_balance(&self, asset: &str, address: &str) -> Result<AssetBalance, BalanceError> {
        let asset = self.asset(asset)?;
        let holder = parse_address(address).map_err(|_| BalanceError::NotFound(address.to_string()))?;
        self.balance_of(asset, holder).await
    }

    /// Native balance of the wallet that signs writes on `asset`'s chain.
    pub async fn signer_balance(&self, asset: &str) -> Result<AssetBalance, BalanceError> {
        let asset = self.asset(asset)?;
        self.balance_of(asset, asset.chain.signer_address()).await
    }

    async fn balance_of(&self, asset: &Asset, holder: Address) -> Result<AssetBalance, BalanceError> {
        match &asset.source {
            AssetSource::Native { decimals } => Ok(AssetBalance {
                balance: asset.chain.native_balance(holder).await?,
                decimals: *decimals,
            }),
            AssetSource::Token { token, decimals } => {
                let balance = asset.chain.token_balance(*token, holder).await?;
                let decimals = *decimals
                    .get_or_try_init(|| async {
                        debug!(%token, "fetching token decimals");
                        asset.chain.token_decimals(*token).await
                    })
                    .await?;
                Ok(AssetBalance { balance, decimals })
            }
        }
    }
}
