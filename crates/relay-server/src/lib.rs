//! HTTP surface, configuration and process wiring for the relayer.

pub mod config;
pub mod handlers;
pub mod router;
pub mod state;
pub mod telemetry;

use std::sync::Arc;

use relay_chain::{BalanceService, ChainClient, EvmChainClient};
use relay_notify::{NoopNotifier, Notifier, WebhookNotifier};
use relay_ops::{BridgeConfig, BridgeOrchestrator};
use relay_store::{AuditLog, CachedNonceRegistry, NonceRegistry, SqliteStore};
use relay_types::Result;
use tracing::{info, warn};

pub use config::{Command, Ctx, Env};
pub use router::create_router;
pub use state::AppState;

/// Externally owned dependencies of the orchestrator.
pub struct Collaborators {
    pub chain_a: Arc<dyn ChainClient>,
    pub chain_b: Arc<dyn ChainClient>,
    pub registry: Arc<dyn NonceRegistry>,
    pub audit: Arc<dyn AuditLog>,
    pub notifier: Arc<dyn Notifier>,
}

/// Build the handler state around already-constructed collaborators.
pub fn build_state(ctx: &Ctx, collaborators: Collaborators) -> AppState {
    let Collaborators { chain_a, chain_b, registry, audit, notifier } = collaborators;

    let config = BridgeConfig {
        a_to_b_domain: ctx.a_to_b_domain.clone(),
        b_to_a_domain: ctx.b_to_a_domain.clone(),
        rate: ctx.rate,
        bridge_contract: ctx.bridge_contract,
        asset_a: ctx.chain_a.asset_symbol.clone(),
        asset_b: ctx.chain_b.asset_symbol.clone(),
        decimals_a: ctx.chain_a.decimals,
        decimals_b: ctx.chain_b.decimals,
    };

    let balances = BalanceService::new()
        .with_native(&ctx.chain_a.asset_symbol, chain_a.clone(), ctx.chain_a.decimals)
        .with_token(&ctx.chain_b.asset_symbol, chain_b.clone(), ctx.token_address);

    AppState {
        chain_a_id: chain_a.chain_id(),
        chain_b_id: chain_b.chain_id(),
        orchestrator: Arc::new(BridgeOrchestrator::new(
            config, chain_a, chain_b, registry, audit, notifier,
        )),
        balances: Arc::new(balances),
    }
}

/// Open the durable store with its schema in place.
pub async fn open_store(ctx: &Ctx) -> Result<Arc<SqliteStore>> {
    let store = Arc::new(SqliteStore::connect(&ctx.database_url).await?);
    store.migrate().await?;
    Ok(store)
}

/// Connect to both chains and the store, and assemble the state.
pub async fn connect(ctx: &Ctx) -> Result<(AppState, Arc<SqliteStore>)> {
    let store = open_store(ctx).await?;

    let chain_a: Arc<dyn ChainClient> = Arc::new(
        EvmChainClient::connect(&ctx.chain_a.rpc_url, ctx.payout_key.clone(), ctx.chain_a.settings)
            .await?,
    );
    let chain_b: Arc<dyn ChainClient> = Arc::new(
        EvmChainClient::connect(&ctx.chain_b.rpc_url, ctx.minter_key.clone(), ctx.chain_b.settings)
            .await?,
    );

    let notifier: Arc<dyn Notifier> = match &ctx.webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url, Some(ctx.notifier_timeout_ms))),
        None => {
            warn!("no webhook_url configured, notifications disabled");
            Arc::new(NoopNotifier)
        }
    };

    let state = build_state(
        ctx,
        Collaborators {
            chain_a,
            chain_b,
            registry: Arc::new(CachedNonceRegistry::new(store.clone())),
            audit: store.clone(),
            notifier,
        },
    );

    match state.balances.signer_balance(&ctx.chain_a.asset_symbol).await {
        Ok(reserves) => info!(
            wallet = %ctx.payout_key.address(),
            balance = %reserves.balance,
            "payout wallet reserves"
        ),
        Err(e) => warn!(error = %e, "could not read payout wallet reserves"),
    }

    Ok((state, store))
}
