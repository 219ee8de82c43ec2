//! Process configuration: a public `config.toml` plus a `secrets.toml`.
//!
//! Both are parsed once at start and assembled into [`Ctx`]. Nothing in it
//! changes at runtime.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use clap::{Parser, Subcommand};
use relay_chain::EvmChainSettings;
use relay_types::{ExchangeRate, TypedDataDomain};
use serde::Deserialize;
use tracing::Level;

const DEFAULT_DATABASE_URL: &str = "sqlite://relay.db?mode=rwc";
const DEFAULT_DECIMALS: u8 = 18;

#[derive(Parser, Debug)]
#[command(name = "relay-server")]
#[command(about = "Two-chain mirror-asset bridge relayer")]
#[command(version)]
pub struct Env {
    /// Path to plaintext TOML configuration file
    #[arg(long, env = "RELAY_CONFIG", default_value = "config.toml")]
    pub config_file: PathBuf,
    /// Path to TOML secrets file
    #[arg(long, env = "RELAY_SECRETS", default_value = "secrets.toml")]
    pub secrets_file: PathBuf,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the HTTP relayer (default)
    Serve,
    /// Print audit log entries as JSON lines
    Audit {
        /// Only list requests that failed after their nonce was reserved
        #[arg(long)]
        failures_only: bool,
        /// Restrict to one user address
        #[arg(long)]
        user: Option<Address>,
        /// Maximum number of entries
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Load and validate both files, print a summary and exit
    ValidateConfig,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

#[derive(Debug, Deserialize)]
struct Config {
    log_level: Option<LogLevel>,
    log_format: Option<LogFormat>,
    database_url: Option<String>,
    #[serde(default)]
    server: ServerConfig,
    chain_a: ChainConfig,
    chain_b: ChainConfig,
    domains: DomainsConfig,
    #[serde(default)]
    rate: RateConfig,
    #[serde(default)]
    notifier: NotifierConfig,
}

#[derive(Debug, Default, Deserialize)]
struct ServerConfig {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct ChainConfig {
    rpc_url: String,
    chain_id: u64,
    asset_symbol: String,
    decimals: Option<u8>,
    required_confirmations: Option<u64>,
    receipt_timeout_secs: Option<u64>,
    token_address: Option<Address>,
    bridge_contract: Option<Address>,
}

#[derive(Debug, Deserialize)]
struct DomainsConfig {
    a_to_b: TypedDataDomain,
    b_to_a: TypedDataDomain,
}

#[derive(Debug, Deserialize)]
struct RateConfig {
    numerator: u64,
    denominator: u64,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self { numerator: 18, denominator: 1000 }
    }
}

#[derive(Debug, Default, Deserialize)]
struct NotifierConfig {
    timeout_ms: Option<u64>,
}

#[derive(Deserialize)]
struct Secrets {
    chain_a_payout_key: String,
    chain_b_minter_key: String,
    webhook_url: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid exchange rate: {0}")]
    InvalidRate(String),
    #[error("chain A and chain B both use asset symbol {0:?}")]
    DuplicateAssetSymbol(String),
    #[error("{0} is not a valid secp256k1 private key")]
    InvalidPrivateKey(&'static str),
    #[error("chain_b.{0} is required")]
    MissingChainB(&'static str),
    #[error("domains.{direction}.chain_id {chain_id} does not match {expected}")]
    DomainChainMismatch {
        direction: &'static str,
        chain_id: u64,
        expected: String,
    },
}

/// One chain's connection settings.
#[derive(Debug, Clone)]
pub struct ChainCtx {
    pub rpc_url: String,
    pub asset_symbol: String,
    /// Decimals of the bridged asset, used to format notifications.
    pub decimals: u8,
    pub settings: EvmChainSettings,
}

impl ChainCtx {
    fn from_config(config: &ChainConfig) -> Self {
        let mut settings = EvmChainSettings::new(config.chain_id);
        if let Some(confirmations) = config.required_confirmations {
            settings.required_confirmations = confirmations;
        }
        if let Some(secs) = config.receipt_timeout_secs {
            settings.receipt_timeout = Duration::from_secs(secs);
        }
        Self {
            rpc_url: config.rpc_url.clone(),
            asset_symbol: config.asset_symbol.clone(),
            decimals: config.decimals.unwrap_or(DEFAULT_DECIMALS),
            settings,
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.settings.chain_id
    }
}

/// Runtime context assembled from config and secrets.
#[derive(Clone)]
pub struct Ctx {
    pub log_level: LogLevel,
    pub log_format: LogFormat,
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub chain_a: ChainCtx,
    pub chain_b: ChainCtx,
    /// Mirrored token on chain B.
    pub token_address: Address,
    /// Contract on chain B whose mint is called for A→B requests.
    pub bridge_contract: Address,
    pub a_to_b_domain: TypedDataDomain,
    pub b_to_a_domain: TypedDataDomain,
    pub rate: ExchangeRate,
    pub payout_key: PrivateKeySigner,
    pub minter_key: PrivateKeySigner,
    pub webhook_url: Option<String>,
    pub notifier_timeout_ms: u64,
}

impl fmt::Debug for Ctx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ctx")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("chain_a", &self.chain_a)
            .field("chain_b", &self.chain_b)
            .field("payout_wallet", &self.payout_key.address())
            .field("minter_wallet", &self.minter_key.address())
            .finish_non_exhaustive()
    }
}

impl Ctx {
    pub fn load_files(config: &Path, secrets: &Path) -> Result<Self, ConfigError> {
        let read = |path: &Path| {
            std::fs::read_to_string(path)
                .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })
        };
        Self::from_toml(&read(config)?, &read(secrets)?)
    }

    pub fn from_toml(config_toml: &str, secrets_toml: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(config_toml)?;
        let secrets: Secrets = toml::from_str(secrets_toml)?;

        let rate = ExchangeRate::new(
            U256::from(config.rate.numerator),
            U256::from(config.rate.denominator),
        )
        .map_err(|e| ConfigError::InvalidRate(e.to_string()))?;

        if config.chain_a.asset_symbol.eq_ignore_ascii_case(&config.chain_b.asset_symbol) {
            return Err(ConfigError::DuplicateAssetSymbol(config.chain_a.asset_symbol));
        }

        // Both directions are signed against the bridge contract on chain B.
        let chain_a_id = config.chain_a.chain_id;
        let chain_b_id = config.chain_b.chain_id;
        if config.domains.a_to_b.chain_id != chain_b_id {
            return Err(ConfigError::DomainChainMismatch {
                direction: "a_to_b",
                chain_id: config.domains.a_to_b.chain_id,
                expected: format!("chain_b.chain_id {}", chain_b_id),
            });
        }
        let b_to_a_id = config.domains.b_to_a.chain_id;
        if b_to_a_id != chain_a_id && b_to_a_id != chain_b_id {
            return Err(ConfigError::DomainChainMismatch {
                direction: "b_to_a",
                chain_id: b_to_a_id,
                expected: format!("chain_a.chain_id {} or chain_b.chain_id {}", chain_a_id, chain_b_id),
            });
        }

        let token_address = config
            .chain_b
            .token_address
            .ok_or(ConfigError::MissingChainB("token_address"))?;
        let bridge_contract = config
            .chain_b
            .bridge_contract
            .ok_or(ConfigError::MissingChainB("bridge_contract"))?;

        let payout_key: PrivateKeySigner = secrets
            .chain_a_payout_key
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidPrivateKey("chain_a_payout_key"))?;
        let minter_key: PrivateKeySigner = secrets
            .chain_b_minter_key
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidPrivateKey("chain_b_minter_key"))?;

        let webhook_url = secrets.webhook_url.filter(|url| !url.trim().is_empty());

        Ok(Self {
            log_level: config.log_level.unwrap_or_default(),
            log_format: config.log_format.unwrap_or_default(),
            database_url: config.database_url.unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            host: config.server.host.unwrap_or_else(|| "0.0.0.0".to_string()),
            port: config.server.port.unwrap_or(3005),
            chain_a: ChainCtx::from_config(&config.chain_a),
            chain_b: ChainCtx::from_config(&config.chain_b),
            token_address,
            bridge_contract,
            a_to_b_domain: config.domains.a_to_b,
            b_to_a_domain: config.domains.b_to_a,
            rate,
            payout_key,
            minter_key,
            webhook_url,
            notifier_timeout_ms: config.notifier.timeout_ms.unwrap_or(10_000),
        })
    }

    /// Human-readable summary without secrets.
    pub fn summary(&self) -> String {
        format!(
            "listen {}:{}\n\
             database {}\n\
             chain A {} ({}) via {}, payout wallet {}\n\
             chain B {} ({}) via {}, minter wallet {}\n\
             token {} bridge {}\n\
             rate {}/{}\n\
             webhook {}",
            self.host,
            self.port,
            self.database_url,
            self.chain_a.chain_id(),
            self.chain_a.asset_symbol,
            self.chain_a.rpc_url,
            self.payout_key.address(),
            self.chain_b.chain_id(),
            self.chain_b.asset_symbol,
            self.chain_b.rpc_url,
            self.minter_key.address(),
            self.token_address,
            self.bridge_contract,
            self.rate.numerator(),
            self.rate.denominator(),
            if self.webhook_url.is_some() { "enabled" } else { "disabled" },
        )
    }
}
