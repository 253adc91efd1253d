pub mod landing;
pub mod swap;

use crate::aggregator::{QuoteError, QuoteProvider};
use crate::gateway::{ChainGateway, GatewayError};
use crate::models::RequestError;
use crate::relay::bundle::DEFAULT_TIP_LAMPORTS;
use crate::relay::{BundleRelay, RelayError};
use crate::retry::RetryPolicy;
use crate::tx_builder::{BuildError, TransactionBuilder};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use solana_sdk::signature::{Keypair, Signature};
use thiserror::Error;

pub const DEFAULT_MAX_OUTER_RETRIES: u32 = 5;
pub const DEFAULT_SIMULATION_ATTEMPTS: u32 = 5;

#[derive(Debug, Error)]
pub enum SwapError {
    #[error(transparent)]
    InvalidRequest(#[from] RequestError),
    #[error("No trading routes found")]
    RouteUnavailable,
    #[error("Failed to get swap instructions: {0}")]
    InstructionFetchFailed(String),
    #[error("Aggregator request failed: {0}")]
    Aggregator(QuoteError),
    #[error("Simulation failed after {attempts} attempts: {last_error}")]
    SimulationExhausted { attempts: u32, last_error: String },
    #[error("Error building transaction: {0}")]
    Build(BuildError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("Relay unavailable: {0}")]
    RelayUnavailable(reqwest::Error),
    #[error("Relay error: {0}")]
    Relay(RelayError),
    #[error("Bundle {bundle_id} did not land after {checks} status checks")]
    LandingExhausted { bundle_id: String, checks: u32 },
    #[error("Amount {amount} does not fit in base units with {decimals} decimals")]
    AmountOverflow { amount: Decimal, decimals: u8 },
}

impl From<QuoteError> for SwapError {
    fn from(e: QuoteError) -> Self {
        match e {
            QuoteError::NoRoute => SwapError::RouteUnavailable,
            QuoteError::InstructionFetch(message) => SwapError::InstructionFetchFailed(message),
            other => SwapError::Aggregator(other),
        }
    }
}

impl From<BuildError> for SwapError {
    fn from(e: BuildError) -> Self {
        match e {
            BuildError::SimulationExhausted {
                attempts,
                last_error,
            } => SwapError::SimulationExhausted {
                attempts,
                last_error,
            },
            BuildError::Gateway(e) => SwapError::Gateway(e),
            other => SwapError::Build(other),
        }
    }
}

impl From<RelayError> for SwapError {
    fn from(e: RelayError) -> Self {
        match e {
            RelayError::Unavailable(e) => SwapError::RelayUnavailable(e),
            RelayError::Gateway(e) => SwapError::Gateway(e),
            other => SwapError::Relay(other),
        }
    }
}

/// Where an outer attempt got to. Logged alongside any failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptStage {
    Quoting,
    InstructionsFetched,
    Simulated,
    Budgeted,
    Signed,
    BundleSubmitted,
    Landed,
    LandingExhausted,
}

impl fmt::Display for AttemptStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapConfirmation {
    pub signature: Signature,
    pub bundle_id: String,
    pub landed_slot: Option<u64>,
    /// Outer attempts used, including the successful one
    pub attempts: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SwapOutcome {
    Landed(SwapConfirmation),
    /// The payer cannot cover rent for the accounts the swap creates.
    Skipped { attempt: u32 },
}

#[derive(Clone, Debug)]
pub struct ExecutorSettings {
    pub tip_lamports: u64,
    /// `max_attempts` is replaced by the request's retry budget
    pub outer_retry: RetryPolicy,
    pub simulation_retry: RetryPolicy,
    pub landing_poll: RetryPolicy,
    /// Older blockhashes are refetched before the final build
    pub blockhash_max_age: Duration,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        ExecutorSettings {
            tip_lamports: DEFAULT_TIP_LAMPORTS,
            outer_retry: RetryPolicy::fixed(DEFAULT_MAX_OUTER_RETRIES, Duration::from_secs(2)),
            simulation_retry: RetryPolicy::fixed(
                DEFAULT_SIMULATION_ATTEMPTS,
                Duration::from_secs(1),
            ),
            landing_poll: RetryPolicy::fixed(3, Duration::from_secs(15)),
            blockhash_max_age: Duration::from_secs(30),
        }
    }
}

#[derive(Clone)]
pub struct SwapExecutor {
    /// Read-only chain access
    pub gateway: Arc<dyn ChainGateway>,
    /// Routing aggregator
    pub quotes: Arc<dyn QuoteProvider>,
    /// Bundle relay
    pub relay: Arc<dyn BundleRelay>,
    /// Wallet paying for and signing the swap and the tip
    pub signer: Arc<Keypair>,
    pub tx_builder: TransactionBuilder,
    pub settings: ExecutorSettings,
}

impl SwapExecutor {
    pub fn new(
        gateway: Arc<dyn ChainGateway>,
        quotes: Arc<dyn QuoteProvider>,
        relay: Arc<dyn BundleRelay>,
        signer: Arc<Keypair>,
        settings: ExecutorSettings,
    ) -> Self {
        SwapExecutor {
            tx_builder: TransactionBuilder::new(Arc::clone(&gateway)),
            gateway,
            quotes,
            relay,
            signer,
            settings,
        }
    }
}
