use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

pub const MAX_SLIPPAGE_BPS: u16 = 10_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Invalid amount: {0}. Amount must be a positive number.")]
    NonPositiveAmount(Decimal),
    #[error("Invalid slippage: {0}. Slippage must be a number between 0 and 10000.")]
    SlippageOutOfRange(u16),
    #[error("Invalid max retries: {0}. Max retries must be a positive integer.")]
    NoRetryBudget(u32),
}

/// One swap as asked for by the caller. `amount` is in human units of the input mint.
#[derive(Clone, Debug)]
pub struct SwapRequest {
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    pub amount: Decimal,
    pub slippage_bps: u16,
    pub max_outer_retries: u32,
}

impl SwapRequest {
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.amount <= Decimal::ZERO {
            return Err(RequestError::NonPositiveAmount(self.amount));
        }
        if self.slippage_bps > MAX_SLIPPAGE_BPS {
            return Err(RequestError::SlippageOutOfRange(self.slippage_bps));
        }
        if self.max_outer_retries < 1 {
            return Err(RequestError::NoRetryBudget(self.max_outer_retries));
        }
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteParams {
    pub input_mint: String,
    pub output_mint: String,
    pub amount: u64,
    pub slippage_bps: u16,
}

/// The aggregator's route description, kept verbatim so it can be handed back
/// when requesting instructions.
#[derive(Clone, Debug, Serialize)]
#[serde(transparent)]
pub struct Quote(Value);

impl Quote {
    /// Accepts a quote response only if it carries a non-empty route plan.
    pub fn from_response(response: Value) -> Option<Quote> {
        let has_route = match response.get("routePlan") {
            Some(Value::Array(steps)) => !steps.is_empty(),
            Some(Value::Null) | None => false,
            Some(_) => true,
        };
        has_route.then_some(Quote(response))
    }

    pub fn route_steps(&self) -> usize {
        self.0
            .get("routePlan")
            .and_then(Value::as_array)
            .map_or(1, Vec::len)
    }

    pub fn out_amount(&self) -> Option<&str> {
        self.0.get("outAmount").and_then(Value::as_str)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapInstructionsRequest<'a> {
    pub quote_response: &'a Quote,
    pub user_public_key: String,
    #[serde(rename = "wrapUnwrapSOL")]
    pub wrap_unwrap_sol: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInstructionSet {
    #[serde(default)]
    pub setup_instructions: Vec<RawInstruction>,
    pub swap_instruction: RawInstruction,
    pub cleanup_instruction: Option<RawInstruction>,
    #[serde(default)]
    pub address_lookup_table_addresses: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInstruction {
    pub program_id: String,
    pub accounts: Vec<RawAccountMeta>,
    /// base64-encoded instruction data
    pub data: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAccountMeta {
    pub pubkey: String,
    pub is_signer: bool,
    pub is_writable: bool,
}
