use jito_swap::aggregator::{AggregatorClient, QuoteProvider, DEFAULT_AGGREGATOR_URL};
use solana_sdk::{pubkey, pubkey::Pubkey};

const MINT_1: Pubkey = pubkey!("So11111111111111111111111111111111111111112");
const MINT_2: Pubkey = pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let base_path =
        std::env::var("AGGREGATOR_URL").unwrap_or_else(|_| DEFAULT_AGGREGATOR_URL.to_string());
    log::info!("Base path: {}", base_path);

    let client = AggregatorClient::new(base_path);
    let quote = client.get_quote(&MINT_1, &MINT_2, 1_000_000_000, 100).await?;

    log::info!(
        "{} route step(s), out amount {}",
        quote.route_steps(),
        quote.out_amount().unwrap_or("?")
    );
    log::info!("Quote response: {:#}", quote.as_value());
    Ok(())
}
