pub mod instructions;

use crate::gateway::{ChainGateway, GatewayError, SimulationResult};
use crate::retry::RetryPolicy;

use std::sync::Arc;

use futures::future::join_all;
use log::{debug, error, info, warn};
use solana_sdk::address_lookup_table::state::AddressLookupTable;
use solana_sdk::address_lookup_table::AddressLookupTableAccount;
use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::{v0, CompileError, VersionedMessage};
use solana_sdk::pubkey::{ParsePubkeyError, Pubkey};
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::transaction::VersionedTransaction;
use thiserror::Error;

/// Protocol defined: The default compute units set for a transaction
pub const DEFAULT_INSTRUCTION_COMPUTE_UNIT: u32 = 200_000;
/// Protocol defined: The most compute units a transaction may request
pub const MAX_COMPUTE_UNIT_LIMIT: u32 = 1_400_000;
/// Simulation errors containing this are not worth retrying
pub const RENT_INSUFFICIENCY_MARKER: &str = "InsufficientFundsForRent";

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid pubkey {value}: {source}")]
    InvalidPubkey {
        value: String,
        #[source]
        source: ParsePubkeyError,
    },
    #[error("Invalid instruction data: {0}")]
    InvalidData(#[from] base64::DecodeError),
    #[error("Failed to compile transaction message: {0}")]
    Compile(#[from] CompileError),
    #[error(transparent)]
    SignerError(#[from] solana_sdk::signer::SignerError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("Simulation failed after {attempts} attempts: {last_error}")]
    SimulationExhausted { attempts: u32, last_error: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComputeBudget {
    pub unit_limit: u32,
    pub micro_lamport_price: u64,
}

impl ComputeBudget {
    /// Limit first, then price.
    pub fn instructions(&self) -> [Instruction; 2] {
        [
            ComputeBudgetInstruction::set_compute_unit_limit(self.unit_limit),
            ComputeBudgetInstruction::set_compute_unit_price(self.micro_lamport_price),
        ]
    }
}

/// Outcome of simulation-driven calibration of the compute-unit limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Calibration {
    UnitLimit(u32),
    InsufficientFundsForRent,
}

/// Simulated consumption plus a 20% buffer, rounded up.
pub fn buffered_unit_limit(units_consumed: u64) -> u32 {
    let buffered = (units_consumed as u128 * 6).div_ceil(5);
    u32::try_from(buffered)
        .unwrap_or(u32::MAX)
        .min(MAX_COMPUTE_UNIT_LIMIT)
}

#[derive(Clone)]
pub struct TransactionBuilder {
    gateway: Arc<dyn ChainGateway>,
}

impl TransactionBuilder {
    pub fn new(gateway: Arc<dyn ChainGateway>) -> Self {
        TransactionBuilder { gateway }
    }

    /// Fetches all tables at once. Absent or undecodable tables are dropped.
    pub async fn resolve_lookup_tables(&self, keys: &[Pubkey]) -> Vec<AddressLookupTableAccount> {
        let lookups = keys.iter().map(|key| async move {
            match self.gateway.account_data(key).await {
                Ok(Some(data)) => match AddressLookupTable::deserialize(&data) {
                    Ok(table) => Some(AddressLookupTableAccount {
                        key: *key,
                        addresses: table.addresses.to_vec(),
                    }),
                    Err(e) => {
                        warn!("Failed to decode lookup table {}: {}", key, e);
                        None
                    }
                },
                Ok(None) => {
                    warn!("Lookup table {} not found", key);
                    None
                }
                Err(e) => {
                    warn!("Failed to fetch lookup table {}: {}", key, e);
                    None
                }
            }
        });
        let tables: Vec<_> = join_all(lookups).await.into_iter().flatten().collect();
        debug!("Resolved {}/{} lookup tables", tables.len(), keys.len());
        tables
    }

    /// Simulates the unbudgeted instruction set and derives the unit limit
    /// from its consumption. Rent insufficiency ends calibration immediately.
    pub async fn calibrate_compute_budget(
        &self,
        instructions: &[Instruction],
        payer: &Pubkey,
        lookup_tables: &[AddressLookupTableAccount],
        blockhash: Hash,
        policy: &RetryPolicy,
    ) -> Result<Calibration, BuildError> {
        info!("Simulating transaction to estimate compute units...");
        let message = compile_message(payer, instructions, lookup_tables, blockhash)?;
        let transaction = VersionedTransaction {
            signatures: vec![
                Signature::default();
                message.header().num_required_signatures as usize
            ],
            message,
        };

        let mut last_error = String::from("no simulation attempted");
        for attempt in 0..policy.max_attempts {
            match self.gateway.simulate(&transaction).await {
                Ok(SimulationResult {
                    err: None,
                    units_consumed,
                    ..
                }) => {
                    let unit_limit = match units_consumed {
                        Some(units) => {
                            info!("Simulation successful. Units consumed: {}", units);
                            buffered_unit_limit(units)
                        }
                        None => {
                            warn!("Simulation did not report consumed units");
                            DEFAULT_INSTRUCTION_COMPUTE_UNIT
                        }
                    };
                    return Ok(Calibration::UnitLimit(unit_limit));
                }
                Ok(SimulationResult { err: Some(err), logs, .. }) => {
                    error!("Simulation error: {}", err);
                    if let Some(logs) = logs {
                        error!("Simulation logs: {:#?}", logs);
                    }
                    last_error = format!("Simulation failed: {}", err);
                }
                Err(e) => last_error = e.to_string(),
            }

            error!("Error during simulation: {}", last_error);
            if last_error.contains(RENT_INSUFFICIENCY_MARKER) {
                return Ok(Calibration::InsufficientFundsForRent);
            }
            if attempt + 1 < policy.max_attempts {
                info!("Retrying simulation (attempt {})...", attempt + 2);
                policy.wait(attempt).await;
            }
        }

        error!("Max retries reached. Simulation failed.");
        Err(BuildError::SimulationExhausted {
            attempts: policy.max_attempts,
            last_error,
        })
    }

    pub fn build_signed_transaction(
        &self,
        instructions: &[Instruction],
        payer: &Pubkey,
        lookup_tables: &[AddressLookupTableAccount],
        blockhash: Hash,
        budget: &ComputeBudget,
        signer: &Keypair,
    ) -> Result<VersionedTransaction, BuildError> {
        let mut final_instructions = Vec::with_capacity(instructions.len() + 2);
        final_instructions.extend(budget.instructions());
        final_instructions.extend_from_slice(instructions);
        let message = compile_message(payer, &final_instructions, lookup_tables, blockhash)?;
        Ok(VersionedTransaction::try_new(message, &[signer])?)
    }
}

fn compile_message(
    payer: &Pubkey,
    instructions: &[Instruction],
    lookup_tables: &[AddressLookupTableAccount],
    blockhash: Hash,
) -> Result<VersionedMessage, BuildError> {
    Ok(VersionedMessage::V0(v0::Message::try_compile(
        payer,
        instructions,
        lookup_tables,
        blockhash,
    )?))
}
