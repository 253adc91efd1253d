use super::landing::await_landing;
use super::{AttemptStage, SwapConfirmation, SwapError, SwapExecutor, SwapOutcome};
use crate::models::{SwapRequest, MAX_SLIPPAGE_BPS};
use crate::priofee::sample_priority_fee;
use crate::relay::bundle::build_bundle;
use crate::tx_builder::instructions::{lookup_table_keys, ordered_instructions};
use crate::tx_builder::{Calibration, ComputeBudget};

use log::{error, info, warn};
use rust_decimal::prelude::{MathematicalOps, ToPrimitive};
use rust_decimal::Decimal;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signer::Signer;

/// `base × (1 + attempt × 0.5)`, capped at 100%.
pub fn widened_slippage_bps(base_bps: u16, attempt: u32) -> u16 {
    let widened = base_bps as u64 * (2 + attempt as u64) / 2;
    widened.min(MAX_SLIPPAGE_BPS as u64) as u16
}

/// Converts a human amount into the mint's base units, truncating any excess precision.
pub fn scale_amount(amount: Decimal, decimals: u8) -> Result<u64, SwapError> {
    Decimal::TEN
        .checked_powu(decimals as u64)
        .and_then(|factor| amount.checked_mul(factor))
        .and_then(|scaled| scaled.trunc().to_u64())
        .ok_or(SwapError::AmountOverflow { amount, decimals })
}

enum AttemptOutcome {
    Landed(SwapConfirmation),
    Skipped,
}

impl SwapExecutor {
    /// Runs the whole pipeline, retrying from a fresh quote on any failure until
    /// the request's retry budget is spent.
    pub async fn swap(&self, request: &SwapRequest) -> Result<SwapOutcome, SwapError> {
        request.validate()?;
        let policy = self
            .settings
            .outer_retry
            .with_max_attempts(request.max_outer_retries);

        let mut attempt = 0;
        loop {
            info!(
                "========== INITIATING SWAP (attempt {}/{}) ==========",
                attempt + 1,
                policy.max_attempts
            );
            let mut stage = AttemptStage::Quoting;
            match self.run_attempt(request, attempt, &mut stage).await {
                Ok(AttemptOutcome::Landed(confirmation)) => {
                    info!("Swap executed successfully! Signature: {}", confirmation.signature);
                    return Ok(SwapOutcome::Landed(confirmation));
                }
                Ok(AttemptOutcome::Skipped) => {
                    warn!("Insufficient funds for rent. Skipping this swap.");
                    return Ok(SwapOutcome::Skipped { attempt });
                }
                Err(e) => {
                    error!(
                        "Error executing swap (attempt {}/{}, stage {}): {}",
                        attempt + 1,
                        policy.max_attempts,
                        stage,
                        e
                    );
                    attempt += 1;
                    if attempt >= policy.max_attempts {
                        error!("Failed to execute swap after {} attempts.", policy.max_attempts);
                        return Err(e);
                    }
                    info!("Retrying in {:?}...", policy.delay_for(attempt - 1));
                    policy.wait(attempt - 1).await;
                }
            }
        }
    }

    async fn run_attempt(
        &self,
        request: &SwapRequest,
        attempt: u32,
        stage: &mut AttemptStage,
    ) -> Result<AttemptOutcome, SwapError> {
        let payer = self.signer.pubkey();

        let input_decimals = self.gateway.mint_decimals(&request.input_mint).await?;
        let output_decimals = self.gateway.mint_decimals(&request.output_mint).await?;
        info!("Input token decimals: {}", input_decimals);
        info!("Output token decimals: {}", output_decimals);

        let amount = scale_amount(request.amount, input_decimals)?;
        let slippage_bps = widened_slippage_bps(request.slippage_bps, attempt);
        info!("Getting quote for {} base units at {} bps slippage...", amount, slippage_bps);
        let quote = self
            .quotes
            .get_quote(&request.input_mint, &request.output_mint, amount, slippage_bps)
            .await?;
        info!(
            "Quote received: {} route step(s), out amount {}",
            quote.route_steps(),
            quote.out_amount().unwrap_or("?")
        );

        let raw_instructions = self.quotes.get_swap_instructions(&quote, &payer).await?;
        *stage = AttemptStage::InstructionsFetched;
        let instructions = ordered_instructions(&raw_instructions)?;
        let lookup_tables = self
            .tx_builder
            .resolve_lookup_tables(&lookup_table_keys(&raw_instructions)?)
            .await;

        let mut blockhash = self
            .gateway
            .latest_blockhash(CommitmentConfig::confirmed())
            .await?;
        let unit_limit = match self
            .tx_builder
            .calibrate_compute_budget(
                &instructions,
                &payer,
                &lookup_tables,
                blockhash.hash,
                &self.settings.simulation_retry,
            )
            .await?
        {
            Calibration::UnitLimit(units) => units,
            Calibration::InsufficientFundsForRent => return Ok(AttemptOutcome::Skipped),
        };
        *stage = AttemptStage::Simulated;

        let priority_fee = sample_priority_fee(self.gateway.as_ref()).await?;
        let budget = ComputeBudget {
            unit_limit,
            micro_lamport_price: priority_fee.micro_lamports,
        };
        info!("Compute units: {}", budget.unit_limit);
        info!(
            "Priority fee: {} micro-lamports ({} SOL)",
            priority_fee.micro_lamports, priority_fee.sol_amount
        );
        *stage = AttemptStage::Budgeted;

        if !blockhash.is_fresh(self.settings.blockhash_max_age) {
            info!("Blockhash is stale, fetching a new one");
            blockhash = self
                .gateway
                .latest_blockhash(CommitmentConfig::confirmed())
                .await?;
        }
        let transaction = self.tx_builder.build_signed_transaction(
            &instructions,
            &payer,
            &lookup_tables,
            blockhash.hash,
            &budget,
            &self.signer,
        )?;
        *stage = AttemptStage::Signed;

        let bundle = build_bundle(
            self.relay.as_ref(),
            self.gateway.as_ref(),
            &transaction,
            &self.signer,
            self.settings.tip_lamports,
        )
        .await?;
        let bundle_id = self.relay.send_bundle(&bundle).await.map_err(|e| {
            error!("Error sending bundle: {}", e);
            e
        })?;
        info!("Bundle sent. Bundle ID: {}", bundle_id);
        *stage = AttemptStage::BundleSubmitted;

        match await_landing(
            self.relay.as_ref(),
            &bundle,
            bundle_id,
            &self.settings.landing_poll,
        )
        .await
        {
            Ok(landed) => {
                *stage = AttemptStage::Landed;
                Ok(AttemptOutcome::Landed(SwapConfirmation {
                    signature: bundle.swap_signature,
                    bundle_id: landed.bundle_id,
                    landed_slot: landed.landed_slot,
                    attempts: attempt + 1,
                }))
            }
            Err(e @ SwapError::LandingExhausted { .. }) => {
                *stage = AttemptStage::LandingExhausted;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}
