use super::{BundleRelay, BundleStatus, RelayError};
use crate::gateway::ChainGateway;

use log::{error, info};
use rand::Rng;
use serde::Serialize;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::signer::Signer;
use solana_sdk::system_instruction;
use solana_sdk::transaction::{Transaction, VersionedTransaction};

pub const DEFAULT_TIP_LAMPORTS: u64 = 10_000;

/// A tip transfer and the swap it pays for, encoded for the relay.
#[derive(Clone, Debug)]
pub struct Bundle {
    /// base58 wire transactions: tip first, swap second
    pub transactions: [String; 2],
    pub tip_account: Pubkey,
    pub swap_signature: Signature,
}

impl Bundle {
    pub fn tip_transaction(&self) -> &str {
        &self.transactions[0]
    }

    pub fn swap_transaction(&self) -> &str {
        &self.transactions[1]
    }
}

pub fn encode_transaction<T: Serialize>(transaction: &T) -> Result<String, bincode::Error> {
    Ok(bs58::encode(bincode::serialize(transaction)?).into_string())
}

pub async fn build_bundle(
    relay: &dyn BundleRelay,
    gateway: &dyn ChainGateway,
    swap_transaction: &VersionedTransaction,
    signer: &Keypair,
    tip_lamports: u64,
) -> Result<Bundle, RelayError> {
    let swap_signature = *swap_transaction
        .signatures
        .first()
        .ok_or(RelayError::UnsignedTransaction)?;

    let tip_accounts = relay.get_tip_accounts().await.map_err(|e| {
        error!("Error getting tip accounts: {}", e);
        e
    })?;
    if tip_accounts.is_empty() {
        return Err(RelayError::NoTipAccounts);
    }
    let tip_account = tip_accounts[rand::thread_rng().gen_range(0..tip_accounts.len())];

    let blockhash = gateway
        .latest_blockhash(CommitmentConfig::finalized())
        .await?;
    let tip_transaction = Transaction::new_signed_with_payer(
        &[system_instruction::transfer(
            &signer.pubkey(),
            &tip_account,
            tip_lamports,
        )],
        Some(&signer.pubkey()),
        &[signer],
        blockhash.hash,
    );

    info!("Encoding bundle transactions...");
    let transactions = [
        encode_transaction(&tip_transaction)?,
        encode_transaction(swap_transaction)?,
    ];
    info!("Bundle created, tipping {} lamports to {}", tip_lamports, tip_account);

    Ok(Bundle {
        transactions,
        tip_account,
        swap_signature,
    })
}

/// Status lookup that never fails: relay errors are logged and read as "no status yet".
pub async fn poll_status(relay: &dyn BundleRelay, bundle_id: &str) -> Option<BundleStatus> {
    match relay.get_bundle_status(bundle_id).await {
        Ok(Some(status)) => Some(status),
        Ok(None) => {
            info!("No status found for bundle ID: {}", bundle_id);
            None
        }
        Err(e) => {
            error!("Error checking bundle status: {}", e);
            None
        }
    }
}
