//! Portfolio rebalancing between chains.
//!
//! The filler spends inventory on destination chains and accumulates escrow
//! on source chains; a periodic cycle moves funds back through an external
//! bridge adapter. The adapter family (burn-and-mint, OFT, exchange
//! withdrawal) is abstracted behind [`Rebalancer`]; the orchestration here
//! is deliberately thin.

use {
    crate::domain::{Stable, eth::U256},
    async_trait::async_trait,
    chain::ChainTag,
};

/// Predicted cost and bounds of a transfer.
#[derive(Clone, Debug)]
pub struct EstimateResult {
    pub fee: U256,
    pub min_amount: U256,
    pub max_amount: U256,
    pub expected_received: U256,
}

/// Outcome of a performed (or replayed) transfer.
#[derive(Clone, Debug)]
pub struct TransferResult {
    pub success: bool,
    pub transaction: Option<String>,
    pub amount_sent: U256,
    pub amount_received: Option<U256>,
    pub native_fee: U256,
    pub source: ChainTag,
    pub dest: ChainTag,
    pub coin: Option<Stable>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Rebalancer: Send + Sync {
    async fn estimate(
        &self,
        source: ChainTag,
        dest: ChainTag,
        amount: U256,
        coin: Option<Stable>,
    ) -> anyhow::Result<EstimateResult>;

    async fn send(
        &self,
        source: ChainTag,
        dest: ChainTag,
        amount: U256,
        coin: Option<Stable>,
    ) -> anyhow::Result<TransferResult>;

    /// Replays a failed transfer where the adapter supports it.
    async fn retry(&self, failed: &TransferResult) -> anyhow::Result<TransferResult>;
}

/// A configured transfer the periodic cycle attempts.
#[derive(Clone, Debug)]
pub struct TransferPlan {
    pub source: ChainTag,
    pub dest: ChainTag,
    pub amount: U256,
    pub coin: Option<Stable>,
}

#[derive(Debug, Default, Eq, PartialEq)]
pub struct CycleOutcome {
    pub succeeded: usize,
    pub failed: usize,
}

/// Runs one rebalancing cycle over the configured plans: estimate, send,
/// count. Failures are logged and do not stop the cycle.
pub async fn run_cycle(rebalancer: &dyn Rebalancer, plans: &[TransferPlan]) -> CycleOutcome {
    let mut outcome = CycleOutcome::default();
    for plan in plans {
        match rebalancer
            .estimate(plan.source, plan.dest, plan.amount, plan.coin)
            .await
        {
            Ok(estimate) => tracing::debug!(
                source = %plan.source,
                dest = %plan.dest,
                amount = %plan.amount,
                fee = %estimate.fee,
                expected = %estimate.expected_received,
                "rebalance estimated"
            ),
            Err(err) => {
                tracing::warn!(source = %plan.source, dest = %plan.dest, ?err, "estimate failed");
                outcome.failed += 1;
                continue;
            }
        }
        match rebalancer
            .send(plan.source, plan.dest, plan.amount, plan.coin)
            .await
        {
            Ok(result) if result.success => {
                tracing::info!(
                    source = %plan.source,
                    dest = %plan.dest,
                    sent = %result.amount_sent,
                    transaction = ?result.transaction,
                    "rebalance transfer sent"
                );
                outcome.succeeded += 1;
            }
            Ok(result) => {
                tracing::warn!(source = %plan.source, dest = %plan.dest, ?result, "transfer failed");
                outcome.failed += 1;
            }
            Err(err) => {
                tracing::warn!(source = %plan.source, dest = %plan.dest, ?err, "transfer errored");
                outcome.failed += 1;
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> TransferPlan {
        TransferPlan {
            source: ChainTag::Evm(80002),
            dest: ChainTag::Evm(97),
            amount: U256::from(1_000_000u64),
            coin: Some(Stable::Usdc),
        }
    }

    fn ok_estimate() -> EstimateResult {
        EstimateResult {
            fee: U256::from(100u64),
            min_amount: U256::from(1u64),
            max_amount: U256::from(10_000_000u64),
            expected_received: U256::from(999_900u64),
        }
    }

    #[tokio::test]
    async fn counts_successes_and_failures() {
        let mut rebalancer = MockRebalancer::new();
        rebalancer.expect_estimate().returning(|_, _, _, _| Ok(ok_estimate()));
        rebalancer.expect_send().returning(|source, dest, amount, coin| {
            Ok(TransferResult {
                success: amount < U256::from(2_000_000u64),
                transaction: Some("0x01".into()),
                amount_sent: amount,
                amount_received: None,
                native_fee: U256::ZERO,
                source,
                dest,
                coin,
            })
        });

        let mut large = plan();
        large.amount = U256::from(5_000_000u64);
        let outcome = run_cycle(&rebalancer, &[plan(), large]).await;
        assert_eq!(outcome, CycleOutcome { succeeded: 1, failed: 1 });
    }

    #[tokio::test]
    async fn estimate_failure_skips_the_send() {
        let mut rebalancer = MockRebalancer::new();
        rebalancer
            .expect_estimate()
            .returning(|_, _, _, _| Err(anyhow::anyhow!("bridge down")));
        // No `send` expectation: sending after a failed estimate panics.

        let outcome = run_cycle(&rebalancer, &[plan()]).await;
        assert_eq!(outcome, CycleOutcome { succeeded: 0, failed: 1 });
    }
}
