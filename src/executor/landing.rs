use super::SwapError;
use crate::relay::bundle::{poll_status, Bundle};
use crate::relay::{BundleRelay, BundleState};
use crate::retry::RetryPolicy;

use log::{info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LandedBundle {
    pub bundle_id: String,
    pub landed_slot: Option<u64>,
}

/// Polls `bundle_id` until it lands or the policy runs out of checks. A failed
/// bundle is resubmitted as-is under a new id; pending or unknown statuses just
/// wait for the next check.
pub async fn await_landing(
    relay: &dyn BundleRelay,
    bundle: &Bundle,
    mut bundle_id: String,
    policy: &RetryPolicy,
) -> Result<LandedBundle, SwapError> {
    for check in 0..policy.max_attempts {
        info!(
            "Waiting {:?} before checking bundle status ({}/{})...",
            policy.delay_for(check),
            check + 1,
            policy.max_attempts
        );
        policy.wait(check).await;

        match poll_status(relay, &bundle_id).await {
            Some(status) if status.status == BundleState::Landed => {
                info!("Bundle finalized. Slot: {:?}", status.landed_slot);
                return Ok(LandedBundle {
                    bundle_id,
                    landed_slot: status.landed_slot,
                });
            }
            Some(status) if status.status == BundleState::Failed => {
                warn!("Bundle {} failed. Resubmitting...", bundle_id);
                bundle_id = relay.send_bundle(bundle).await?;
                info!("New Bundle ID: {}", bundle_id);
            }
            status => info!(
                "Bundle not finalized. Status: {}",
                status.map_or("unknown".to_string(), |s| format!("{:?}", s.status))
            ),
        }
    }

    Err(SwapError::LandingExhausted {
        bundle_id,
        checks: policy.max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedRelay, LANDED_SLOT};
    use solana_sdk::pubkey::Pubkey;
    use solana_sdk::signature::Signature;
    use std::sync::atomic::Ordering;

    fn bundle() -> Bundle {
        Bundle {
            transactions: ["tip".to_string(), "swap".to_string()],
            tip_account: Pubkey::new_unique(),
            swap_signature: Signature::default(),
        }
    }

    #[tokio::test]
    async fn resubmits_once_after_failure_then_lands() {
        let relay = ScriptedRelay::with_statuses(vec![
            Some(BundleState::Pending),
            Some(BundleState::Failed),
            Some(BundleState::Landed),
            Some(BundleState::Landed),
        ]);

        let landed = await_landing(
            &relay,
            &bundle(),
            "bundle-0".to_string(),
            &RetryPolicy::immediate(3),
        )
        .await
        .unwrap();

        assert_eq!(relay.send_calls.load(Ordering::SeqCst), 1);
        assert_eq!(relay.poll_calls.load(Ordering::SeqCst), 3);
        assert_eq!(landed.bundle_id, "bundle-1");
        assert_eq!(landed.landed_slot, Some(LANDED_SLOT));
        assert_eq!(
            relay.polled_ids(),
            vec!["bundle-0".to_string(), "bundle-0".to_string(), "bundle-1".to_string()]
        );
    }

    #[tokio::test]
    async fn resubmits_the_same_bundle() {
        let relay = ScriptedRelay::with_statuses(vec![
            Some(BundleState::Failed),
            Some(BundleState::Landed),
        ]);
        let bundle = bundle();

        await_landing(&relay, &bundle, "bundle-0".to_string(), &RetryPolicy::immediate(3))
            .await
            .unwrap();
        assert_eq!(relay.sent_bundles(), vec![bundle.transactions.clone()]);
    }

    #[tokio::test]
    async fn unknown_and_missing_statuses_do_not_resubmit() {
        let relay = ScriptedRelay::with_statuses(vec![
            None,
            Some(BundleState::Unknown),
            Some(BundleState::Pending),
        ]);

        let err = await_landing(
            &relay,
            &bundle(),
            "bundle-0".to_string(),
            &RetryPolicy::immediate(3),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, SwapError::LandingExhausted { checks: 3, .. }));
        assert_eq!(relay.send_calls.load(Ordering::SeqCst), 0);
        assert_eq!(relay.poll_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn polling_errors_keep_the_loop_alive() {
        let relay = ScriptedRelay {
            status_error: true,
            ..Default::default()
        };

        let err = await_landing(
            &relay,
            &bundle(),
            "bundle-0".to_string(),
            &RetryPolicy::immediate(2),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SwapError::LandingExhausted { checks: 2, .. }));
        assert_eq!(relay.poll_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn resubmission_errors_propagate() {
        let relay = ScriptedRelay {
            send_error: true,
            ..ScriptedRelay::with_statuses(vec![Some(BundleState::Failed)])
        };

        let err = await_landing(
            &relay,
            &bundle(),
            "bundle-0".to_string(),
            &RetryPolicy::immediate(3),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SwapError::Relay(_)));
        assert_eq!(relay.poll_calls.load(Ordering::SeqCst), 1);
    }
}
