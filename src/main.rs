use anyhow::{anyhow, Context};
use clap::Parser;
use jito_swap::aggregator::{AggregatorClient, DEFAULT_AGGREGATOR_URL};
use jito_swap::executor::{ExecutorSettings, SwapExecutor, SwapOutcome, DEFAULT_MAX_OUTER_RETRIES};
use jito_swap::gateway::RpcGateway;
use jito_swap::models::SwapRequest;
use jito_swap::relay::bundle::DEFAULT_TIP_LAMPORTS;
use jito_swap::relay::{JitoRelayClient, DEFAULT_RELAY_URL};
use rust_decimal::Decimal;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{read_keypair_file, Keypair};
use solana_sdk::signer::Signer;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[clap(version, about, long_about = None)]
pub struct Opts {
    #[clap(long, env, help = "Solana cluster RPC-URL")]
    rpc_url: String,

    #[clap(
        long,
        env,
        default_value = DEFAULT_AGGREGATOR_URL,
        help = "Swap aggregator base URL"
    )]
    aggregator_url: String,

    #[clap(
        long,
        env,
        default_value = DEFAULT_RELAY_URL,
        help = "Jito block engine bundles endpoint"
    )]
    relay_url: String,

    #[clap(long, env, help = "Path to a keypair file")]
    keypair_path: Option<String>,

    #[clap(
        long,
        env,
        hide_env_values = true,
        help = "Wallet secret key as a JSON byte array, used when no keypair path is given"
    )]
    wallet_private_key: Option<String>,

    #[clap(long, env, help = "Mint being sold")]
    input_mint: Pubkey,

    #[clap(long, env, help = "Mint being bought")]
    output_mint: Pubkey,

    #[clap(long, env, help = "Amount to sell, in whole tokens")]
    amount: Decimal,

    #[clap(long, env, default_value_t = 100, help = "Base slippage in basis points")]
    slippage_bps: u16,

    #[clap(
        long,
        env,
        default_value_t = DEFAULT_MAX_OUTER_RETRIES,
        help = "Attempts before giving up"
    )]
    max_retries: u32,

    #[clap(
        long,
        env,
        default_value_t = DEFAULT_TIP_LAMPORTS,
        help = "Bundle tip in lamports"
    )]
    tip_lamports: u64,
}

fn load_signer(opts: &Opts) -> anyhow::Result<Keypair> {
    if let Some(path) = &opts.keypair_path {
        return read_keypair_file(path)
            .map_err(|e| anyhow!("Failed to read keypair {}: {}", path, e));
    }
    let secret = opts
        .wallet_private_key
        .as_deref()
        .ok_or_else(|| anyhow!("Either KEYPAIR_PATH or WALLET_PRIVATE_KEY must be set"))?;
    let bytes: Vec<u8> =
        serde_json::from_str(secret).context("WALLET_PRIVATE_KEY is not a JSON byte array")?;
    Keypair::from_bytes(&bytes).map_err(|e| anyhow!("Invalid wallet secret key: {}", e))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();
    let opts = Opts::parse();

    let signer = Arc::new(load_signer(&opts)?);
    log::info!("Wallet: {}", signer.pubkey());

    let rpc_client = Arc::new(RpcClient::new_with_commitment(
        opts.rpc_url.clone(),
        CommitmentConfig::confirmed(),
    ));
    let executor = SwapExecutor::new(
        Arc::new(RpcGateway::new(rpc_client)),
        Arc::new(AggregatorClient::new(opts.aggregator_url.clone())),
        Arc::new(JitoRelayClient::new(opts.relay_url.clone())),
        signer,
        ExecutorSettings {
            tip_lamports: opts.tip_lamports,
            ..Default::default()
        },
    );

    let request = SwapRequest {
        input_mint: opts.input_mint,
        output_mint: opts.output_mint,
        amount: opts.amount,
        slippage_bps: opts.slippage_bps,
        max_outer_retries: opts.max_retries,
    };

    match executor.swap(&request).await? {
        SwapOutcome::Landed(confirmation) => {
            match confirmation.landed_slot {
                Some(slot) => println!("Swap landed in slot {}", slot),
                None => println!("Swap landed"),
            }
            println!("Bundle ID: {}", confirmation.bundle_id);
            println!("Signature: {}", confirmation.signature);
            println!("https://solscan.io/tx/{}", confirmation.signature);
        }
        SwapOutcome::Skipped { attempt } => {
            println!("Swap skipped on attempt {}: insufficient funds for rent", attempt + 1);
        }
    }

    Ok(())
}
