use std::sync::Arc;

use relay_chain::BalanceService;
use relay_ops::BridgeOrchestrator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<BridgeOrchestrator>,
    pub balances: Arc<BalanceService>,
    pub chain_a_id: u64,
    pub chain_b_id: u64,
}
