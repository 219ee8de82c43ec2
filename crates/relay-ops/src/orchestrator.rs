//! The two directional bridge state machines.
//!
//! A→B: validate → verify signature (A→B domain) → reserve nonce
//!      → call the bridge contract's mint on chain B (1:1) → audit → notify
//!
//! B→A: validate → check claimed chain id → verify signature (B→A domain)
//!      → replay pre-check → convert at the fixed rate → solvency check of
//!      the payout wallet on chain A → reserve nonce → native transfer on
//!      chain A → audit → notify
//!
//! The solvency check counts payouts that were approved but have not settled
//! yet, so concurrent B→A requests cannot together promise more than the
//! payout wallet holds.
//!
//! The nonce is reserved with a single atomic `try_consume` before any
//! destination transaction is submitted. Once reserved, a request ends
//! either COMMITTED or EXECUTION_FAILED; a failed execution keeps its nonce
//! and is left in the audit log for an operator.

use std::sync::{Arc, Mutex, MutexGuard};

use alloy::primitives::{Address, U256};
use relay_chain::{bridge_mint_calldata, ChainClient, TxOutcome};
use relay_crypto::{verify_request, BridgeMessage};
use relay_notify::{dispatch, Notification, Notifier};
use relay_store::{AuditEntry, AuditLog, AuditOutcome, NonceRegistry};
use relay_types::{
    BridgeDirection, BridgeFailure, BridgeRequest, ErrorKind, ExchangeRate, ExecutionResult,
    RelayError, RequestState, SignatureFailure, TypedDataDomain,
};
use tracing::{error, info, warn};

use crate::intake::{BridgeSubmission, ClaimedChainId};

/// Fixed wiring supplied at process start.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub a_to_b_domain: TypedDataDomain,
    pub b_to_a_domain: TypedDataDomain,
    pub rate: ExchangeRate,
    /// Contract on chain B whose `bridgeToPGirls` mints the mirrored token.
    pub bridge_contract: Address,
    /// Display names and decimals used in notifications.
    pub asset_a: String,
    pub asset_b: String,
    pub decimals_a: u8,
    pub decimals_b: u8,
}

/// A committed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeReceipt {
    pub request: BridgeRequest,
    pub outcome: TxOutcome,
    /// Chain-A amount paid out (B→A only).
    pub payout_amount: Option<U256>,
}

impl BridgeReceipt {
    pub fn execution_result(&self) -> ExecutionResult {
        ExecutionResult::committed(self.outcome.tx_hash)
    }
}

pub struct BridgeOrchestrator {
    config: BridgeConfig,
    /// Chain A client; its wallet pays out B→A requests.
    chain_a: Arc<dyn ChainClient>,
    /// Chain B client; its wallet calls the bridge mint.
    chain_b: Arc<dyn ChainClient>,
    registry: Arc<dyn NonceRegistry>,
    audit: Arc<dyn AuditLog>,
    notifier: Arc<dyn Notifier>,
    payouts: PayoutLedger,
}

/// Payouts approved against the chain-A wallet that have not settled.
#[derive(Default)]
struct PayoutLedger {
    /// Serializes balance check and claim.
    check: tokio::sync::Mutex<()>,
    in_flight: Mutex<U256>,
}

impl PayoutLedger {
    fn total(&self) -> MutexGuard<'_, U256> {
        match self.in_flight.lock() {
            Ok(guard) => guard,
            Err(poison) => poison.into_inner(),
        }
    }

    fn claim(&self, amount: U256) -> PayoutClaim<'_> {
        *self.total() += amount;
        PayoutClaim { ledger: self, amount }
    }
}

/// Releases its amount from the ledger when dropped.
struct PayoutClaim<'a> {
    ledger: &'a PayoutLedger,
    amount: U256,
}

impl Drop for PayoutClaim<'_> {
    fn drop(&mut self) {
        let mut total = self.ledger.total();
        let remaining = total.saturating_sub(self.amount);
        *total = remaining;
    }
}

fn log_state(request: &BridgeRequest, state: RequestState) {
    info!(
        user = %request.user,
        nonce = %request.nonce,
        direction = %request.direction,
        state = ?state,
        "bridge request"
    );
}

impl BridgeOrchestrator {
    pub fn new(
        config: BridgeConfig,
        chain_a: Arc<dyn ChainClient>,
        chain_b: Arc<dyn ChainClient>,
        registry: Arc<dyn NonceRegistry>,
        audit: Arc<dyn AuditLog>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            chain_a,
            chain_b,
            registry,
            audit,
            notifier,
            payouts: PayoutLedger::default(),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn domain(&self, direction: BridgeDirection) -> &TypedDataDomain {
        match direction {
            BridgeDirection::AToB => &self.config.a_to_b_domain,
            BridgeDirection::BToA => &self.config.b_to_a_domain,
        }
    }

    /// Decimals of the asset debited in `direction`.
    fn source_decimals(&self, direction: BridgeDirection) -> u8 {
        match direction {
            BridgeDirection::AToB => self.config.decimals_a,
            BridgeDirection::BToA => self.config.decimals_b,
        }
    }

    fn assets(&self, direction: BridgeDirection) -> (String, String) {
        match direction {
            BridgeDirection::AToB => (self.config.asset_a.clone(), self.config.asset_b.clone()),
            BridgeDirection::BToA => (self.config.asset_b.clone(), self.config.asset_a.clone()),
        }
    }

    /// Native asset on chain A → mirrored token minted on chain B.
    pub async fn process_a_to_b(
        &self,
        submission: &BridgeSubmission,
    ) -> Result<BridgeReceipt, BridgeFailure> {
        let request = self.admit(submission, BridgeDirection::AToB)?;

        self.reserve(&request).await?;

        let calldata = bridge_mint_calldata(request.user, request.amount);
        let result = self.chain_b.send_call(self.config.bridge_contract, calldata).await;
        self.finish(request, result, None).await
    }

    /// Mirrored token burned on chain B → native asset paid out on chain A.
    pub async fn process_b_to_a(
        &self,
        submission: &BridgeSubmission,
    ) -> Result<BridgeReceipt, BridgeFailure> {
        let request = self.admit(submission, BridgeDirection::BToA)?;

        // Cheap replay answer before reading balances; `reserve` stays the
        // authority.
        match self.registry.is_consumed(request.user, request.nonce).await {
            Ok(true) => {
                let failure = self.replay_failure(&request).await;
                return Err(self.reject_request(&request, failure));
            }
            Ok(false) => {}
            Err(e) => warn!(error = %e, "replay pre-check failed, relying on reservation"),
        }

        let payout = match relay_rate::convert(request.amount, &self.config.rate) {
            Ok(payout) => payout,
            Err(RelayError::ConversionUnderflow) => {
                let failure = BridgeFailure::new(ErrorKind::AmountTooSmall, "amount too small");
                return Err(self.reject_request(&request, failure));
            }
            Err(e) => {
                return Err(self.reject_request(&request, BridgeFailure::bad_request(e.to_string())));
            }
        };

        let claim = self.claim_payout(&request, payout).await?;

        self.reserve(&request).await?;

        let result = self.chain_a.transfer_native(request.user, payout).await;
        drop(claim);
        self.finish(request, result, Some(payout)).await
    }

    /// Check the payout wallet covers `payout` on top of every unsettled
    /// payout, and hold it until the transfer is done.
    async fn claim_payout(
        &self,
        request: &BridgeRequest,
        payout: U256,
    ) -> Result<PayoutClaim<'_>, BridgeFailure> {
        let _check = self.payouts.check.lock().await;

        let reserves = match self.chain_a.native_balance(self.chain_a.signer_address()).await {
            Ok(balance) => balance,
            Err(e) => {
                let failure = BridgeFailure::new(ErrorKind::ChainError, format!("reserve check failed: {}", e));
                return Err(self.reject_request(request, failure));
            }
        };
        let pending = *self.payouts.total();
        if reserves.saturating_sub(pending) < payout {
            let failure = BridgeFailure::new(
                ErrorKind::InsufficientReserves,
                format!(
                    "payout wallet holds {} with {} pending, payout needs {}",
                    reserves, pending, payout
                ),
            );
            return Err(self.reject_request(request, failure));
        }

        Ok(self.payouts.claim(payout))
    }

    /// RECEIVED → VALIDATED → SIGNATURE_OK.
    fn admit(
        &self,
        submission: &BridgeSubmission,
        direction: BridgeDirection,
    ) -> Result<BridgeRequest, BridgeFailure> {
        info!(direction = %direction, state = ?RequestState::Received, "bridge request");

        let parsed = submission
            .parse(direction)
            .map_err(|failure| self.reject_unparsed(submission, direction, failure))?;
        let request = parsed.request;
        log_state(&request, RequestState::Validated);

        let domain = self.domain(direction);
        if let Some(claimed) = parsed.claimed_chain_id {
            if !claimed.matches(domain.chain_id) {
                let detail = match claimed {
                    ClaimedChainId::Known(id) => {
                        format!("wrong chainId: expected {}, got {}", domain.chain_id, id)
                    }
                    ClaimedChainId::OutOfRange => {
                        format!("wrong chainId: expected {}", domain.chain_id)
                    }
                };
                let failure = BridgeFailure::bad_signature(SignatureFailure::DomainMismatch, detail);
                return Err(self.reject_request(&request, failure));
            }
        }

        let message = BridgeMessage::from(&request);
        match verify_request(domain, &message, &request.signature, request.user) {
            Ok(verification) if verification.valid => {}
            Ok(verification) => {
                let failure = BridgeFailure::bad_signature(
                    SignatureFailure::SignerMismatch,
                    format!("signature verification failed: recovered {}", verification.recovered),
                );
                return Err(self.reject_request(&request, failure));
            }
            Err(e) => {
                let failure = BridgeFailure::bad_signature(SignatureFailure::Malformed, e.to_string());
                return Err(self.reject_request(&request, failure));
            }
        }

        log_state(&request, RequestState::SignatureOk);
        Ok(request)
    }

    /// SIGNATURE_OK → NONCE_RESERVED.
    async fn reserve(&self, request: &BridgeRequest) -> Result<(), BridgeFailure> {
        match self.registry.try_consume(request.user, request.nonce).await {
            Ok(true) => {
                log_state(request, RequestState::NonceReserved);
                Ok(())
            }
            Ok(false) => {
                let failure = self.replay_failure(request).await;
                Err(self.reject_request(request, failure))
            }
            Err(e) => {
                let failure =
                    BridgeFailure::new(ErrorKind::ChainError, format!("nonce registry unavailable: {}", e));
                Err(self.reject_request(request, failure))
            }
        }
    }

    /// EXECUTING → COMMITTED | EXECUTION_FAILED.
    async fn finish(
        &self,
        request: BridgeRequest,
        result: relay_types::Result<TxOutcome>,
        payout: Option<U256>,
    ) -> Result<BridgeReceipt, BridgeFailure> {
        log_state(&request, RequestState::Executing);
        let (from, to) = self.assets(request.direction);
        let decimals = self.source_decimals(request.direction);

        match result {
            Ok(outcome) => {
                let mut entry = AuditEntry::new(&request, AuditOutcome::Committed)
                    .with_destination_tx(outcome.tx_hash);
                if let Some(payout) = payout {
                    entry = entry.with_payout(payout);
                }
                if let Err(e) = self.audit.append(entry).await {
                    error!(
                        user = %request.user,
                        nonce = %request.nonce,
                        tx_hash = %outcome.tx_hash,
                        error = %e,
                        "committed request missing from audit log"
                    );
                }

                info!(
                    user = %request.user,
                    nonce = %request.nonce,
                    direction = %request.direction,
                    state = ?RequestState::Committed,
                    tx_hash = %outcome.tx_hash,
                    "bridge request"
                );
                dispatch(
                    self.notifier.clone(),
                    Notification::Completed {
                        user: request.user,
                        from,
                        to,
                        amount: request.amount,
                        decimals,
                        source_tx_hash: request.source_tx_hash,
                        relayer_tx_hash: outcome.tx_hash,
                    },
                );
                Ok(BridgeReceipt { request, outcome, payout_amount: payout })
            }
            Err(e) => {
                let reason = e.to_string();
                let mut entry =
                    AuditEntry::new(&request, AuditOutcome::ExecutionFailed).with_reason(reason.clone());
                if let Some(payout) = payout {
                    entry = entry.with_payout(payout);
                }
                if let Err(audit_err) = self.audit.append(entry).await {
                    error!(error = %audit_err, "failed to audit execution failure");
                }

                error!(
                    user = %request.user,
                    nonce = %request.nonce,
                    direction = %request.direction,
                    amount = %request.amount,
                    state = ?RequestState::ExecutionFailed,
                    reason = %reason,
                    "bridge execution failed after nonce reservation; needs operator resolution"
                );
                dispatch(
                    self.notifier.clone(),
                    Notification::Failed {
                        user: Some(request.user),
                        from,
                        to,
                        amount: request.amount,
                        decimals,
                        error: reason.clone(),
                    },
                );
                Err(BridgeFailure::new(ErrorKind::ChainError, reason))
            }
        }
    }

    /// Answer for a nonce that is already consumed.
    async fn replay_failure(&self, request: &BridgeRequest) -> BridgeFailure {
        match self.audit.find_committed(request.user, request.nonce).await {
            Ok(Some(entry)) => BridgeFailure {
                previous_tx_hash: entry.destination_tx_hash,
                ..BridgeFailure::new(ErrorKind::NonceReused, "already processed")
            },
            Ok(None) => BridgeFailure::new(ErrorKind::NonceReused, "nonce already used"),
            Err(e) => {
                warn!(error = %e, "audit lookup failed during replay check");
                BridgeFailure::new(ErrorKind::NonceReused, "nonce already used")
            }
        }
    }

    /// → REJECTED.
    fn reject_request(&self, request: &BridgeRequest, failure: BridgeFailure) -> BridgeFailure {
        self.rejected(Some(request.user), request.amount, request.direction, failure)
    }

    /// → REJECTED for a submission that never became a request.
    fn reject_unparsed(
        &self,
        submission: &BridgeSubmission,
        direction: BridgeDirection,
        failure: BridgeFailure,
    ) -> BridgeFailure {
        let (user, amount) = submission.peek();
        self.rejected(user, amount, direction, failure)
    }

    fn rejected(
        &self,
        user: Option<Address>,
        amount: U256,
        direction: BridgeDirection,
        failure: BridgeFailure,
    ) -> BridgeFailure {
        let (from, to) = self.assets(direction);
        let decimals = self.source_decimals(direction);
        warn!(
            user = ?user,
            direction = %direction,
            state = ?RequestState::Rejected,
            kind = %failure.kind,
            detail = %failure.detail,
            "bridge request rejected"
        );
        dispatch(
            self.notifier.clone(),
            Notification::Failed { user, from, to, amount, decimals, error: failure.detail.clone() },
        );
        failure
    }
}
