//! In-memory stand-ins for the chain, the aggregator and the relay.

use crate::aggregator::{QuoteError, QuoteProvider};
use crate::gateway::{AccountData, ChainGateway, GatewayError, RecentBlockhash, SimulationResult};
use crate::models::{Quote, RawAccountMeta, RawInstruction, RawInstructionSet};
use crate::relay::bundle::Bundle;
use crate::relay::{BundleRelay, BundleState, BundleStatus, RelayError};

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde_json::json;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::system_instruction;
use solana_sdk::transaction::VersionedTransaction;

pub const LANDED_SLOT: u64 = 280_000_000;

/// Setup, swap and cleanup instructions a payer can sign alone.
pub fn swap_instruction_set(payer: &Pubkey) -> RawInstructionSet {
    let transfer = system_instruction::transfer(payer, &Pubkey::new_unique(), 1_000);
    let raw = |program_id: Pubkey, data: &[u8]| RawInstruction {
        program_id: program_id.to_string(),
        accounts: vec![],
        data: BASE64_STANDARD.encode(data),
    };
    RawInstructionSet {
        setup_instructions: vec![raw(Pubkey::new_unique(), &[1])],
        swap_instruction: RawInstruction {
            program_id: transfer.program_id.to_string(),
            accounts: transfer
                .accounts
                .iter()
                .map(|meta| RawAccountMeta {
                    pubkey: meta.pubkey.to_string(),
                    is_signer: meta.is_signer,
                    is_writable: meta.is_writable,
                })
                .collect(),
            data: BASE64_STANDARD.encode(&transfer.data),
        },
        cleanup_instruction: Some(raw(Pubkey::new_unique(), &[2])),
        address_lookup_table_addresses: vec![],
    }
}

#[derive(Default)]
pub struct FakeGateway {
    pub accounts: HashMap<Pubkey, AccountData>,
    pub decimals: HashMap<Pubkey, u8>,
    pub fees: Vec<u64>,
    /// Served in order; a successful 100k-unit simulation once drained
    pub simulations: Mutex<VecDeque<SimulationResult>>,
    pub simulate_calls: AtomicU32,
    /// Every blockhash handed out, with the commitment it was asked for
    pub blockhashes: Mutex<Vec<(CommitmentConfig, Hash)>>,
}

impl FakeGateway {
    pub fn push_simulation(&self, result: SimulationResult) {
        self.simulations.lock().unwrap().push_back(result);
    }

    pub fn blockhashes_at(&self, commitment: CommitmentConfig) -> Vec<Hash> {
        self.blockhashes
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == commitment)
            .map(|(_, hash)| *hash)
            .collect()
    }

    pub fn consumed(units: u64) -> SimulationResult {
        SimulationResult {
            units_consumed: Some(units),
            ..Default::default()
        }
    }

    pub fn failed(err: &str) -> SimulationResult {
        SimulationResult {
            err: Some(err.to_string()),
            logs: Some(vec!["Program log: failed".to_string()]),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ChainGateway for FakeGateway {
    async fn latest_blockhash(
        &self,
        commitment: CommitmentConfig,
    ) -> Result<RecentBlockhash, GatewayError> {
        let hash = Hash::new_unique();
        self.blockhashes.lock().unwrap().push((commitment, hash));
        Ok(RecentBlockhash::new(hash, 1_000))
    }

    async fn account_data(&self, key: &Pubkey) -> Result<Option<AccountData>, GatewayError> {
        Ok(self.accounts.get(key).cloned())
    }

    async fn mint_decimals(&self, mint: &Pubkey) -> Result<u8, GatewayError> {
        Ok(self.decimals.get(mint).copied().unwrap_or(6))
    }

    async fn recent_prioritization_fees(&self) -> Result<Vec<u64>, GatewayError> {
        Ok(self.fees.clone())
    }

    async fn simulate(
        &self,
        _transaction: &VersionedTransaction,
    ) -> Result<SimulationResult, GatewayError> {
        self.simulate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .simulations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Self::consumed(100_000)))
    }
}

pub struct FakeQuotes {
    no_route: bool,
    instructions: RawInstructionSet,
    pub quote_calls: AtomicU32,
    pub instruction_calls: AtomicU32,
    pub amounts: Mutex<Vec<u64>>,
    pub slippages: Mutex<Vec<u16>>,
}

impl FakeQuotes {
    pub fn new(payer: &Pubkey, no_route: bool) -> Self {
        FakeQuotes {
            no_route,
            instructions: swap_instruction_set(payer),
            quote_calls: AtomicU32::default(),
            instruction_calls: AtomicU32::default(),
            amounts: Mutex::default(),
            slippages: Mutex::default(),
        }
    }
}

#[async_trait]
impl QuoteProvider for FakeQuotes {
    async fn get_quote(
        &self,
        _input_mint: &Pubkey,
        _output_mint: &Pubkey,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<Quote, QuoteError> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        self.amounts.lock().unwrap().push(amount);
        self.slippages.lock().unwrap().push(slippage_bps);
        let response = if self.no_route {
            json!({ "error": "Could not find any route" })
        } else {
            json!({ "outAmount": "6500000", "routePlan": [{ "percent": 100 }] })
        };
        Quote::from_response(response).ok_or(QuoteError::NoRoute)
    }

    async fn get_swap_instructions(
        &self,
        _quote: &Quote,
        _payer: &Pubkey,
    ) -> Result<RawInstructionSet, QuoteError> {
        self.instruction_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.instructions.clone())
    }
}

pub struct ScriptedRelay {
    pub tip_accounts: Vec<Pubkey>,
    pub tip_accounts_error: bool,
    pub send_error: bool,
    pub status_error: bool,
    /// Served in order; `None` once drained
    pub statuses: Mutex<VecDeque<Option<BundleState>>>,
    pub tip_calls: AtomicU32,
    pub send_calls: AtomicU32,
    pub poll_calls: AtomicU32,
    pub polled: Mutex<Vec<String>>,
    pub sent: Mutex<Vec<[String; 2]>>,
}

impl Default for ScriptedRelay {
    fn default() -> Self {
        ScriptedRelay {
            tip_accounts: (0..8).map(|_| Pubkey::new_unique()).collect(),
            tip_accounts_error: false,
            send_error: false,
            status_error: false,
            statuses: Mutex::default(),
            tip_calls: AtomicU32::default(),
            send_calls: AtomicU32::default(),
            poll_calls: AtomicU32::default(),
            polled: Mutex::default(),
            sent: Mutex::default(),
        }
    }
}

impl ScriptedRelay {
    pub fn with_statuses(statuses: Vec<Option<BundleState>>) -> Self {
        ScriptedRelay {
            statuses: Mutex::new(statuses.into()),
            ..Default::default()
        }
    }

    pub fn polled_ids(&self) -> Vec<String> {
        self.polled.lock().unwrap().clone()
    }

    pub fn sent_bundles(&self) -> Vec<[String; 2]> {
        self.sent.lock().unwrap().clone()
    }

    fn rpc_error(method: &str) -> RelayError {
        RelayError::Rpc {
            method: method.to_string(),
            message: "scripted failure".to_string(),
        }
    }
}

#[async_trait]
impl BundleRelay for ScriptedRelay {
    async fn get_tip_accounts(&self) -> Result<Vec<Pubkey>, RelayError> {
        self.tip_calls.fetch_add(1, Ordering::SeqCst);
        if self.tip_accounts_error {
            return Err(Self::rpc_error("getTipAccounts"));
        }
        Ok(self.tip_accounts.clone())
    }

    async fn send_bundle(&self, bundle: &Bundle) -> Result<String, RelayError> {
        let n = self.send_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.send_error {
            return Err(Self::rpc_error("sendBundle"));
        }
        self.sent.lock().unwrap().push(bundle.transactions.clone());
        Ok(format!("bundle-{}", n))
    }

    async fn get_bundle_status(&self, bundle_id: &str) -> Result<Option<BundleStatus>, RelayError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        self.polled.lock().unwrap().push(bundle_id.to_string());
        if self.status_error {
            return Err(Self::rpc_error("getInflightBundleStatuses"));
        }
        let next = self.statuses.lock().unwrap().pop_front().flatten();
        Ok(next.map(|status| BundleStatus {
            bundle_id: bundle_id.to_string(),
            status,
            landed_slot: (status == BundleState::Landed).then_some(LANDED_SLOT),
        }))
    }
}
