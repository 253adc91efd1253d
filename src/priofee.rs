use crate::gateway::{ChainGateway, GatewayError};

/// Used when the node has no prioritization-fee samples
pub const DEFAULT_PRIORITY_FEE_MICRO_LAMPORTS: u64 = 10_000;
/// How many of the most recent per-slot samples go into the average
pub const PRIORITY_FEE_SAMPLE_WINDOW: usize = 150;

const MICRO_LAMPORTS_PER_LAMPORT: f64 = 1_000_000.0;
const SOL_DISPLAY_DIVISOR: f64 = 1_000.0;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PriorityFee {
    /// Compute-unit price, in micro-lamports
    pub micro_lamports: u64,
    /// The same price rendered in SOL, for display only
    pub sol_amount: f64,
}

impl PriorityFee {
    pub fn new(micro_lamports: u64) -> Self {
        PriorityFee {
            micro_lamports,
            sol_amount: micro_lamports as f64 / MICRO_LAMPORTS_PER_LAMPORT / SOL_DISPLAY_DIVISOR,
        }
    }
}

/// Rounded-up mean of the last [`PRIORITY_FEE_SAMPLE_WINDOW`] samples.
pub fn average_priority_fee(samples: &[u64]) -> PriorityFee {
    if samples.is_empty() {
        return PriorityFee::new(DEFAULT_PRIORITY_FEE_MICRO_LAMPORTS);
    }
    let recent = &samples[samples.len().saturating_sub(PRIORITY_FEE_SAMPLE_WINDOW)..];
    let total: u128 = recent.iter().map(|fee| *fee as u128).sum();
    let count = recent.len() as u128;
    let average = total.div_ceil(count);
    PriorityFee::new(u64::try_from(average).unwrap_or(u64::MAX))
}

pub async fn sample_priority_fee(gateway: &dyn ChainGateway) -> Result<PriorityFee, GatewayError> {
    let samples = gateway.recent_prioritization_fees().await?;
    log::debug!("Got {} prioritization-fee samples", samples.len());
    Ok(average_priority_fee(&samples))
}
