use crate::models::{Quote, QuoteParams, RawInstructionSet, SwapInstructionsRequest};

use async_trait::async_trait;
use serde_json::Value;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

pub const DEFAULT_AGGREGATOR_URL: &str = "https://quote-api.jup.ag/v6";

const GET_QUOTE: &str = "/quote";
const POST_SWAP_INSTRUCTIONS: &str = "/swap-instructions";

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Query(#[from] serde_qs::Error),
    #[error("No trading routes found")]
    NoRoute,
    #[error("Failed to get swap instructions: {0}")]
    InstructionFetch(String),
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn get_quote(
        &self,
        input_mint: &Pubkey,
        output_mint: &Pubkey,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<Quote, QuoteError>;

    async fn get_swap_instructions(
        &self,
        quote: &Quote,
        payer: &Pubkey,
    ) -> Result<RawInstructionSet, QuoteError>;
}

pub struct AggregatorClient {
    base_url: String,
    http: reqwest::Client,
}

impl AggregatorClient {
    pub fn new(base_url: String) -> Self {
        AggregatorClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl QuoteProvider for AggregatorClient {
    async fn get_quote(
        &self,
        input_mint: &Pubkey,
        output_mint: &Pubkey,
        amount: u64,
        slippage_bps: u16,
    ) -> Result<Quote, QuoteError> {
        let params = QuoteParams {
            input_mint: input_mint.to_string(),
            output_mint: output_mint.to_string(),
            amount,
            slippage_bps,
        };
        let url = format!(
            "{}{}?{}",
            self.base_url,
            GET_QUOTE,
            serde_qs::to_string(&params)?
        );
        let json = self.http.get(&url).send().await?.json::<Value>().await?;
        if let Some(error) = json.get("error") {
            log::warn!("Quote request returned an error: {}", error);
        }
        Quote::from_response(json).ok_or(QuoteError::NoRoute)
    }

    async fn get_swap_instructions(
        &self,
        quote: &Quote,
        payer: &Pubkey,
    ) -> Result<RawInstructionSet, QuoteError> {
        let url = format!("{}{}", self.base_url, POST_SWAP_INSTRUCTIONS);
        let json = self
            .http
            .post(&url)
            .json(&SwapInstructionsRequest {
                quote_response: quote,
                user_public_key: payer.to_string(),
                wrap_unwrap_sol: true,
            })
            .send()
            .await?
            .json::<Value>()
            .await?;

        match json.get("error") {
            _ if json.is_null() => Err(QuoteError::InstructionFetch("Unknown error".to_string())),
            Some(Value::String(message)) => Err(QuoteError::InstructionFetch(message.clone())),
            Some(error) if !error.is_null() => {
                Err(QuoteError::InstructionFetch(error.to_string()))
            }
            _ => Ok(serde_json::from_value(json)?),
        }
    }
}
