use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use alloy::primitives::{Address, TxHash};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    contract::ClaimContract,
    error::ClaimError,
    network::{Network, NetworkSelection, Token},
    session::Session,
};

const STATUS_CHANNEL_CAPACITY: usize = 32;

/// One claim attempt as chosen by the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClaimRequest {
    pub network: Network,
    pub token: Token,
}

/// Status line shown to the user. Every transition of an attempt is broadcast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClaimStatus {
    Idle,
    Checking,
    Rejected(ClaimError),
    Estimating,
    Submitting,
    Pending(TxHash),
    Confirmed(TxHash),
    Reverted(TxHash),
    Failed(ClaimError),
}

impl ClaimStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ClaimStatus::Rejected(_)
                | ClaimStatus::Confirmed(_)
                | ClaimStatus::Reverted(_)
                | ClaimStatus::Failed(_)
        )
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClaimStatus::Idle => f.write_str("Ready to claim."),
            ClaimStatus::Checking => f.write_str("Initiating claim..."),
            ClaimStatus::Estimating => f.write_str("Estimating gas..."),
            ClaimStatus::Submitting => f.write_str("Sending claim transaction..."),
            ClaimStatus::Pending(tx_hash) => write!(f, "Transaction submitted: {tx_hash}"),
            ClaimStatus::Confirmed(tx_hash) => write!(f, "Claim successful! TX: {tx_hash}"),
            ClaimStatus::Reverted(tx_hash) => write!(
                f,
                "Transaction {tx_hash} reverted. You may not be eligible or token is not allowed."
            ),
            ClaimStatus::Rejected(err) | ClaimStatus::Failed(err) => write!(f, "{err}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    Success {
        tx_hash: TxHash,
        block_number: Option<u64>,
    },
    Failure(ClaimError),
}

impl ClaimOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ClaimOutcome::Success { .. })
    }

    pub fn tx_hash(&self) -> Option<TxHash> {
        match self {
            ClaimOutcome::Success { tx_hash, .. } => Some(*tx_hash),
            ClaimOutcome::Failure(err) => err.tx_hash(),
        }
    }
}

/// Claim contract and token addresses on one network.
pub struct Deployment<C> {
    pub contract: Arc<C>,
    pub tokens: HashMap<Token, Address>,
}

impl<C> Deployment<C> {
    pub fn new(contract: Arc<C>, tokens: HashMap<Token, Address>) -> Self {
        Self { contract, tokens }
    }

    pub fn token_address(&self, token: Token) -> Option<Address> {
        self.tokens.get(&token).copied()
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ClaimPolicy {
    pub fallback_gas_limit: u64,
    pub confirmation_timeout: Duration,
}

impl From<&Config> for ClaimPolicy {
    fn from(config: &Config) -> Self {
        Self {
            fallback_gas_limit: config.fallback_gas_limit,
            confirmation_timeout: config.confirmation_timeout(),
        }
    }
}

/// Holds the in-flight latch for one attempt. Subscribers always end on `Idle`,
/// and an attempt dropped before it finishes is reported as cancelled.
struct InFlight<'a, C> {
    claimer: &'a Claimer<C>,
    finished: bool,
}

impl<'a, C> InFlight<'a, C> {
    fn acquire(claimer: &'a Claimer<C>) -> Option<Self> {
        claimer
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight {
                claimer,
                finished: false,
            })
    }

    fn finish(mut self, terminal: ClaimStatus) {
        self.claimer.publish(terminal);
        self.finished = true;
    }
}

impl<C> Drop for InFlight<'_, C> {
    fn drop(&mut self) {
        let tx_hash = self.claimer.take_pending();
        if !self.finished {
            tracing::warn!("Claim attempt dropped before it finished");
            self.claimer
                .publish(ClaimStatus::Failed(ClaimError::Cancelled { tx_hash }));
        }

        self.claimer.in_flight.store(false, Ordering::Release);
        self.claimer.publish(ClaimStatus::Idle);
    }
}

pub struct Claimer<C> {
    deployments: HashMap<Network, Deployment<C>>,
    policy: ClaimPolicy,
    in_flight: AtomicBool,
    pending: Mutex<Option<TxHash>>,
    status: broadcast::Sender<ClaimStatus>,
}

impl<C> Claimer<C> {
    pub fn subscribe(&self) -> broadcast::Receiver<ClaimStatus> {
        self.status.subscribe()
    }

    pub fn is_claiming(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn publish(&self, status: ClaimStatus) {
        tracing::debug!("Claim status: {status:?}");
        if let ClaimStatus::Pending(tx_hash) = status {
            if let Ok(mut pending) = self.pending.lock() {
                *pending = Some(tx_hash);
            }
        }
        // Nobody listening is fine
        let _ = self.status.send(status);
    }

    fn take_pending(&self) -> Option<TxHash> {
        self.pending.lock().ok().and_then(|mut pending| pending.take())
    }
}

impl<C: ClaimContract> Claimer<C> {
    pub fn new(deployments: HashMap<Network, Deployment<C>>, policy: ClaimPolicy) -> Self {
        let (status, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);

        Self {
            deployments,
            policy,
            in_flight: AtomicBool::new(false),
            pending: Mutex::new(None),
            status,
        }
    }

    /// Whether the submit action should be enabled for this session.
    pub fn can_submit(&self, session: &Session) -> bool {
        session.is_ready()
            && session
                .network()
                .network()
                .is_some_and(|network| self.deployments.contains_key(&network))
            && !self.is_claiming()
    }

    /// Runs the pre-checks, submits one claim and waits for it to be mined.
    ///
    /// The latest session is read at the start and again just before the
    /// claim is sent, so a chain switch or disconnect during the pre-checks
    /// stops the claim. At most one attempt runs at a time; a concurrent call
    /// is rejected with [`ClaimError::AlreadyInProgress`]. `cancel` aborts
    /// before submission or stops the confirmation wait.
    pub async fn attempt_claim(
        &self,
        sessions: &watch::Receiver<Session>,
        request: &ClaimRequest,
        cancel: &CancellationToken,
    ) -> ClaimOutcome {
        let Some(in_flight) = InFlight::acquire(self) else {
            tracing::warn!("Claim requested while another one is in flight");
            return ClaimOutcome::Failure(ClaimError::AlreadyInProgress);
        };

        self.publish(ClaimStatus::Checking);

        let outcome = self.run(sessions, request, cancel).await;

        let terminal = match &outcome {
            ClaimOutcome::Success { tx_hash, .. } => ClaimStatus::Confirmed(*tx_hash),
            ClaimOutcome::Failure(ClaimError::Reverted {
                tx_hash: Some(tx_hash),
            }) => ClaimStatus::Reverted(*tx_hash),
            ClaimOutcome::Failure(err) if err.is_precheck() => ClaimStatus::Rejected(err.clone()),
            ClaimOutcome::Failure(err) => ClaimStatus::Failed(err.clone()),
        };

        match &terminal {
            ClaimStatus::Confirmed(_) => tracing::info!("{terminal}"),
            ClaimStatus::Rejected(_) => tracing::warn!("{terminal}"),
            _ => tracing::error!("{terminal}"),
        }

        in_flight.finish(terminal);

        outcome
    }

    async fn run(
        &self,
        sessions: &watch::Receiver<Session>,
        request: &ClaimRequest,
        cancel: &CancellationToken,
    ) -> ClaimOutcome {
        let session = *sessions.borrow();
        let (deployment, token_address) = match self.check_session(&session, request) {
            Ok(resolved) => resolved,
            Err(err) => return ClaimOutcome::Failure(err),
        };
        let contract = deployment.contract.as_ref();

        if let Err(err) = self.precheck(contract, token_address).await {
            return ClaimOutcome::Failure(err);
        }

        self.publish(ClaimStatus::Estimating);
        let gas_limit = match contract.estimate_claim_gas(token_address).await {
            Ok(gas_limit) => gas_limit,
            Err(e) => {
                tracing::warn!(
                    "Gas estimation failed, using fallback {}: {e}",
                    self.policy.fallback_gas_limit
                );
                self.policy.fallback_gas_limit
            }
        };

        if cancel.is_cancelled() {
            return ClaimOutcome::Failure(ClaimError::Cancelled { tx_hash: None });
        }
        // The wallet may have moved while the checks were running
        let session = *sessions.borrow();
        if let Err(err) = self.check_session(&session, request) {
            return ClaimOutcome::Failure(err);
        }

        self.publish(ClaimStatus::Submitting);
        tracing::info!(
            "Claiming {} ({token_address}) on {} with gas limit {gas_limit}",
            request.token,
            request.network
        );
        let tx_hash = match contract.send_claim(token_address, gas_limit).await {
            Ok(tx_hash) => tx_hash,
            Err(e) => return ClaimOutcome::Failure(e.into()),
        };

        self.publish(ClaimStatus::Pending(tx_hash));
        tracing::info!(
            "Transaction submitted: {}",
            request.network.tx_url(tx_hash)
        );

        self.confirm(contract, tx_hash, cancel).await
    }

    fn check_session(
        &self,
        session: &Session,
        request: &ClaimRequest,
    ) -> Result<(&Deployment<C>, Address), ClaimError> {
        if !session.is_ready() {
            return Err(ClaimError::NotConnected);
        }

        let network = match session.network() {
            NetworkSelection::Supported(network) => network,
            NetworkSelection::Unsupported(chain_id) => {
                return Err(ClaimError::UnsupportedNetwork { chain_id })
            }
        };
        if network != request.network {
            return Err(ClaimError::WrongNetwork {
                expected: request.network,
                actual: network,
            });
        }

        let deployment = self
            .deployments
            .get(&network)
            .ok_or(ClaimError::UnsupportedNetwork {
                chain_id: session.chain_id,
            })?;
        let token_address = deployment
            .token_address(request.token)
            .ok_or(ClaimError::TokenUnavailable {
                token: request.token,
            })?;

        Ok((deployment, token_address))
    }

    async fn precheck(&self, contract: &C, token_address: Address) -> Result<(), ClaimError> {
        if contract.is_paused().await? {
            return Err(ClaimError::ContractPaused);
        }

        if !contract.is_token_allowed(token_address).await? {
            return Err(ClaimError::TokenNotAllowed);
        }

        Ok(())
    }

    async fn confirm(
        &self,
        contract: &C,
        tx_hash: TxHash,
        cancel: &CancellationToken,
    ) -> ClaimOutcome {
        let timeout = self.policy.confirmation_timeout;

        let receipt = tokio::select! {
            _ = cancel.cancelled() => {
                return ClaimOutcome::Failure(ClaimError::Cancelled { tx_hash: Some(tx_hash) });
            }
            res = tokio::time::timeout(timeout, contract.await_confirmation(tx_hash)) => res,
        };

        match receipt {
            Ok(Ok(receipt)) if receipt.success => ClaimOutcome::Success {
                tx_hash: receipt.tx_hash,
                block_number: receipt.block_number,
            },
            Ok(Ok(receipt)) => ClaimOutcome::Failure(ClaimError::Reverted {
                tx_hash: Some(receipt.tx_hash),
            }),
            Ok(Err(e)) => ClaimOutcome::Failure(e.into()),
            Err(_) => ClaimOutcome::Failure(ClaimError::ConfirmationTimeout {
                tx_hash,
                secs: timeout.as_secs(),
            }),
        }
    }
}
