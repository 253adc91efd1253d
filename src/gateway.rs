use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSimulateTransactionConfig;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::VersionedTransaction;
use spl_token_2022::extension::StateWithExtensions;
use spl_token_2022::state::Mint;
use thiserror::Error;

pub type AccountData = Vec<u8>;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("RPC error: {0}")]
    ClientError(#[from] solana_rpc_client_api::client_error::Error),
    #[error("Account not found: {0}")]
    AccountNotFound(Pubkey),
    #[error("Account {0} is not a token mint")]
    NotAMint(Pubkey),
}

#[derive(Clone, Copy, Debug)]
pub struct RecentBlockhash {
    pub hash: Hash,
    pub last_valid_block_height: u64,
    pub fetched_at: Instant,
}

impl RecentBlockhash {
    pub fn new(hash: Hash, last_valid_block_height: u64) -> Self {
        RecentBlockhash {
            hash,
            last_valid_block_height,
            fetched_at: Instant::now(),
        }
    }

    /// Whether the hash is young enough to still be accepted by the relay.
    pub fn is_fresh(&self, max_age: Duration) -> bool {
        self.fetched_at.elapsed() < max_age
    }
}

#[derive(Clone, Debug, Default)]
pub struct SimulationResult {
    pub units_consumed: Option<u64>,
    /// Debug rendering of the transaction error, if the simulation failed
    pub err: Option<String>,
    pub logs: Option<Vec<String>>,
}

/// Read-only view of the chain. Implementations never retry; callers own the
/// retry policy.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    async fn latest_blockhash(
        &self,
        commitment: CommitmentConfig,
    ) -> Result<RecentBlockhash, GatewayError>;

    async fn account_data(&self, key: &Pubkey) -> Result<Option<AccountData>, GatewayError>;

    async fn mint_decimals(&self, mint: &Pubkey) -> Result<u8, GatewayError>;

    /// Per-slot prioritization fees, oldest slot first.
    async fn recent_prioritization_fees(&self) -> Result<Vec<u64>, GatewayError>;

    async fn simulate(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<SimulationResult, GatewayError>;
}

pub struct RpcGateway {
    rpc_client: Arc<RpcClient>,
}

impl RpcGateway {
    pub fn new(rpc_client: Arc<RpcClient>) -> Self {
        RpcGateway { rpc_client }
    }
}

#[async_trait]
impl ChainGateway for RpcGateway {
    async fn latest_blockhash(
        &self,
        commitment: CommitmentConfig,
    ) -> Result<RecentBlockhash, GatewayError> {
        let (hash, last_valid_block_height) = self
            .rpc_client
            .get_latest_blockhash_with_commitment(commitment)
            .await?;
        Ok(RecentBlockhash::new(hash, last_valid_block_height))
    }

    async fn account_data(&self, key: &Pubkey) -> Result<Option<AccountData>, GatewayError> {
        let response = self
            .rpc_client
            .get_account_with_commitment(key, CommitmentConfig::confirmed())
            .await?;
        Ok(response.value.map(|account| account.data))
    }

    async fn mint_decimals(&self, mint: &Pubkey) -> Result<u8, GatewayError> {
        let data = self
            .account_data(mint)
            .await?
            .ok_or(GatewayError::AccountNotFound(*mint))?;
        decode_mint_decimals(&data).ok_or(GatewayError::NotAMint(*mint))
    }

    async fn recent_prioritization_fees(&self) -> Result<Vec<u64>, GatewayError> {
        let mut fees = self.rpc_client.get_recent_prioritization_fees(&[]).await?;
        fees.sort_by_key(|fee| fee.slot);
        Ok(fees.into_iter().map(|fee| fee.prioritization_fee).collect())
    }

    async fn simulate(
        &self,
        transaction: &VersionedTransaction,
    ) -> Result<SimulationResult, GatewayError> {
        let result = self
            .rpc_client
            .simulate_transaction_with_config(
                transaction,
                RpcSimulateTransactionConfig {
                    sig_verify: false,
                    replace_recent_blockhash: true,
                    commitment: Some(CommitmentConfig::confirmed()),
                    ..Default::default()
                },
            )
            .await?
            .value;
        Ok(SimulationResult {
            units_consumed: result.units_consumed,
            err: result.err.map(|err| format!("{:?}", err)),
            logs: result.logs,
        })
    }
}

/// Reads the decimals of a legacy SPL or Token-2022 mint account.
pub fn decode_mint_decimals(data: &[u8]) -> Option<u8> {
    StateWithExtensions::<Mint>::unpack(data)
        .ok()
        .map(|state| state.base.decimals)
}
