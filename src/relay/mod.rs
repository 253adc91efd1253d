pub mod bundle;

use crate::gateway::GatewayError;
use bundle::Bundle;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

pub const DEFAULT_RELAY_URL: &str = "https://mainnet.block-engine.jito.wtf/api/v1/bundles";

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Relay request failed: {0}")]
    Unavailable(#[from] reqwest::Error),
    #[error("{method} error: {message}")]
    Rpc { method: String, message: String },
    #[error("{method} error: Invalid response")]
    InvalidResponse { method: String },
    #[error("Failed to get tip accounts")]
    NoTipAccounts,
    #[error("Failed to encode bundle transaction: {0}")]
    Encode(#[from] bincode::Error),
    #[error("Swap transaction is not signed")]
    UnsignedTransaction,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum BundleState {
    Pending,
    Landed,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct BundleStatus {
    pub bundle_id: String,
    pub status: BundleState,
    pub landed_slot: Option<u64>,
}

/// The relay's JSON-RPC surface. Each call is one-shot.
#[async_trait]
pub trait BundleRelay: Send + Sync {
    async fn get_tip_accounts(&self) -> Result<Vec<Pubkey>, RelayError>;

    /// Returns the relay-assigned bundle id.
    async fn send_bundle(&self, bundle: &Bundle) -> Result<String, RelayError>;

    /// `None` when the relay has no record of the bundle.
    async fn get_bundle_status(&self, bundle_id: &str) -> Result<Option<BundleStatus>, RelayError>;
}

pub struct JitoRelayClient {
    url: String,
    http: reqwest::Client,
}

impl JitoRelayClient {
    pub fn new(url: String) -> Self {
        JitoRelayClient {
            url,
            http: reqwest::Client::new(),
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, RelayError> {
        let mut json = self
            .http
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": method,
                "params": params
            }))
            .send()
            .await?
            .json::<Value>()
            .await?;

        if let Some(error) = json
            .get_mut("error")
            .map(Value::take)
            .filter(|err| !err.is_null())
        {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            Err(RelayError::Rpc {
                method: method.to_string(),
                message,
            })
        } else if let Some(result) = json.get_mut("result").map(|res| res.take()) {
            Ok(result)
        } else {
            Err(RelayError::InvalidResponse {
                method: method.to_string(),
            })
        }
    }

    fn invalid(method: &str) -> RelayError {
        RelayError::InvalidResponse {
            method: method.to_string(),
        }
    }
}

#[async_trait]
impl BundleRelay for JitoRelayClient {
    async fn get_tip_accounts(&self) -> Result<Vec<Pubkey>, RelayError> {
        const METHOD: &str = "getTipAccounts";
        let result = self.call(METHOD, json!([])).await?;
        let accounts: Vec<String> =
            serde_json::from_value(result).map_err(|_| Self::invalid(METHOD))?;
        accounts
            .iter()
            .map(|account| account.parse().map_err(|_| Self::invalid(METHOD)))
            .collect()
    }

    async fn send_bundle(&self, bundle: &Bundle) -> Result<String, RelayError> {
        const METHOD: &str = "sendBundle";
        let result = self.call(METHOD, json!([bundle.transactions])).await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Self::invalid(METHOD))
    }

    async fn get_bundle_status(&self, bundle_id: &str) -> Result<Option<BundleStatus>, RelayError> {
        const METHOD: &str = "getInflightBundleStatuses";
        let result = self.call(METHOD, json!([[bundle_id]])).await?;
        match result.get("value").and_then(|value| value.get(0)) {
            None | Some(Value::Null) => Ok(None),
            Some(status) => serde_json::from_value(status.clone())
                .map(Some)
                .map_err(|_| Self::invalid(METHOD)),
        }
    }
}
