//! The same-token strategy: deliver the same stable asset the user escrowed
//! (USDC for USDC, USDT for USDT), keeping the spread the basis-point
//! schedule allows plus whatever remains of the order's relayer fees after
//! gas.

use {
    super::StrategyError,
    crate::{
        bid_store::BidStore,
        config::ChainSet,
        coordinator::Coordinator,
        domain::{Execution, Order, eth::ExecutionId, eth::U256},
        onchain::{Onchain, ValueError},
        policy::BpsPolicy,
    },
    number::BPS_DENOMINATOR,
    rust_decimal::Decimal,
    std::sync::Arc,
};

#[derive(Clone)]
pub struct SameTokenStrategy(Arc<Inner>);

struct Inner {
    onchain: Arc<dyn Onchain>,
    chains: ChainSet,
    bps: BpsPolicy,
    bid_store: Arc<BidStore>,
}

impl SameTokenStrategy {
    pub fn new(
        onchain: Arc<dyn Onchain>,
        chains: ChainSet,
        bps: BpsPolicy,
        bid_store: Arc<BidStore>,
    ) -> Self {
        Self(Arc::new(Inner {
            onchain,
            chains,
            bps,
            bid_store,
        }))
    }

    pub async fn can_fill(&self, order: &Order) -> bool {
        if order.inputs.is_empty() || order.inputs.len() != order.output.assets.len() {
            return false;
        }
        for (input, output) in order.inputs.iter().zip(&order.output.assets) {
            let Some(source_symbol) = self.0.chains.stable(&order.source, &input.token) else {
                return false;
            };
            let Some(dest_symbol) = self.0.chains.stable(&order.dest, &output.token) else {
                return false;
            };
            if source_symbol != dest_symbol {
                return false;
            }
        }
        // A commitment that already settled makes the fill a no-op; don't
        // waste an execution slot on it.
        match self.0.onchain.order_filled(order).await {
            Ok(true) => {
                tracing::debug!(commitment = %order.commitment, "order already filled");
                false
            }
            Ok(false) => true,
            Err(err) => {
                tracing::warn!(commitment = %order.commitment, ?err, "filled check failed");
                true
            }
        }
    }

    pub async fn calculate_profitability(&self, order: &Order) -> Decimal {
        match self.profitability(order).await {
            Ok(profit) => profit,
            Err(err) => {
                tracing::debug!(commitment = %order.commitment, ?err, "evaluation failed");
                Decimal::ZERO
            }
        }
    }

    async fn profitability(&self, order: &Order) -> anyhow::Result<Decimal> {
        let usd = match self.0.onchain.usd_value(order).await {
            Ok(usd) => usd,
            Err(ValueError::UnsupportedToken { chain, token }) => {
                tracing::debug!(commitment = %order.commitment, %chain, %token, "unsupported token");
                return Ok(Decimal::ZERO);
            }
            Err(err) => return Err(err.into()),
        };
        let bps = U256::from(self.0.bps.bps(usd));
        let denominator = U256::from(BPS_DENOMINATOR);

        let source_fee_token = self.0.onchain.fee_token(order.source).await?;
        let dest_fee_token = self.0.onchain.fee_token(order.dest).await?;

        // Spread margin per leg, accumulated in destination fee-token
        // decimals.
        let mut slippage = U256::ZERO;
        for (input, output) in order.inputs.iter().zip(&order.output.assets) {
            let input_decimals = self
                .0
                .onchain
                .token_decimals(order.source, input.token)
                .await;
            let output_decimals = self
                .0
                .onchain
                .token_decimals(order.dest, output.token)
                .await;
            let converted = number::adjust_decimals(input.amount, input_decimals, output_decimals);
            let filler_max = converted * (denominator - bps) / denominator;
            if output.amount > filler_max {
                // The user demands more than the bps schedule lets us pay.
                tracing::debug!(
                    commitment = %order.commitment,
                    promised = %output.amount,
                    max = %filler_max,
                    "promised output exceeds the bps margin"
                );
                return Ok(Decimal::ZERO);
            }
            let margin = filler_max - output.amount;
            slippage += number::adjust_decimals(margin, output_decimals, dest_fee_token.decimals);
        }

        let estimate = self.0.onchain.estimate_gas(order).await;
        let fee_profit_source = order.fees.saturating_sub(estimate.total_cost_in_fee_token);
        let fee_profit = number::adjust_decimals(
            fee_profit_source,
            source_fee_token.decimals,
            dest_fee_token.decimals,
        );

        Ok(number::to_decimal(
            fee_profit + slippage,
            dest_fee_token.decimals,
        )?)
    }

    pub async fn execute_order(
        &self,
        order: &Order,
        coordinator: Option<&dyn Coordinator>,
    ) -> Result<Execution, StrategyError> {
        self.0.onchain.approve_tokens_if_needed(order).await?;

        let Some(coordinator) = coordinator else {
            let execution = self
                .0
                .onchain
                .fill_order_direct(order, order.output.assets.clone())
                .await?;
            return Ok(execution);
        };

        let bid = self.0.onchain.prepare_bid(order).await?;
        match coordinator.submit_bid(bid.commitment, bid.user_op).await {
            Ok(outcome) => {
                self.0.bid_store.record_outcome(order.commitment, &outcome);
                Ok(Execution {
                    success: outcome.success,
                    id: ExecutionId::Extrinsic(outcome.extrinsic_hash),
                })
            }
            Err(err) => {
                self.0.bid_store.record_failure(order.commitment);
                Err(StrategyError::Other(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            coordinator::{BidOutcome, MockCoordinator},
            domain::eth::{Address, B256, Bytes, FeeToken, GasEstimate},
            onchain::{MockOnchain, PreparedBid},
            policy::PolicyPoint,
            strategy::fixtures,
        },
        chain::ChainTag,
    };

    fn bps_50() -> BpsPolicy {
        BpsPolicy::new(&[
            PolicyPoint {
                amount: 0.0,
                value: 50.0,
            },
            PolicyPoint {
                amount: 1_000_000.0,
                value: 50.0,
            },
        ])
        .unwrap()
    }

    fn fee_token() -> FeeToken {
        FeeToken {
            address: Address::repeat_byte(0xfe),
            decimals: 18,
        }
    }

    fn estimate(total_cost: u128) -> GasEstimate {
        GasEstimate {
            total_cost_in_fee_token: U256::from(total_cost),
            dispatch_fee: U256::ZERO,
            native_dispatch_fee: U256::ZERO,
            call_gas_limit: U256::from(200_000u64),
            verification_gas_limit: U256::from(500_000u64),
            pre_verification_gas: U256::from(100_000u64),
            max_fee_per_gas: U256::from(2_000_000_000u64),
            max_priority_fee_per_gas: U256::from(1_000_000_000u64),
        }
    }

    /// USDC on 97 to USDC on 80002, 1 USDC escrowed, 0.994 promised,
    /// 1.0 fee-token units of fees.
    fn usdc_order() -> crate::domain::Order {
        fixtures::order(
            97,
            80002,
            &[(fixtures::usdc(), 1_000_000, fixtures::usdc(), 994_000)],
            1_000_000_000_000_000_000,
        )
    }

    fn onchain_for_evaluation(gas_cost: u128) -> MockOnchain {
        let mut onchain = MockOnchain::new();
        onchain
            .expect_usd_value()
            .returning(|_| Ok(Decimal::ONE));
        onchain.expect_fee_token().returning(|_| Ok(fee_token()));
        onchain.expect_token_decimals().returning(|_, _| 6);
        onchain
            .expect_estimate_gas()
            .returning(move |_| estimate(gas_cost));
        onchain.expect_order_filled().returning(|_| Ok(false));
        onchain
    }

    fn strategy(onchain: MockOnchain) -> SameTokenStrategy {
        SameTokenStrategy::new(
            Arc::new(onchain),
            fixtures::chains(),
            bps_50(),
            Arc::new(BidStore::new()),
        )
    }

    #[tokio::test]
    async fn fills_matching_stable_pairs_only() {
        let strategy = strategy(onchain_for_evaluation(0));
        assert!(strategy.can_fill(&usdc_order()).await);

        // USDC in, USDT out.
        let crossed = fixtures::order(
            97,
            80002,
            &[(fixtures::usdc(), 1_000_000, fixtures::usdt(), 994_000)],
            0,
        );
        assert!(!strategy.can_fill(&crossed).await);

        // Unknown token on the input side.
        let unknown = fixtures::order(
            97,
            80002,
            &[(B256::repeat_byte(0x99), 1_000_000, fixtures::usdc(), 994_000)],
            0,
        );
        assert!(!strategy.can_fill(&unknown).await);

        // Mismatched leg counts.
        let mut lopsided = usdc_order();
        lopsided.output.assets.clear();
        assert!(!strategy.can_fill(&lopsided).await);
    }

    #[tokio::test]
    async fn already_filled_orders_are_rejected() {
        let mut onchain = MockOnchain::new();
        onchain.expect_order_filled().returning(|_| Ok(true));
        let strategy = strategy(onchain);
        assert!(!strategy.can_fill(&usdc_order()).await);
    }

    #[tokio::test]
    async fn profitability_is_slippage_margin_plus_fee_surplus() {
        // Gas cost 0.4 against 1.0 of fees: fee profit 0.6. Slippage:
        // 1_000_000 * 9950 / 10000 - 994_000 = 1_000 (USDC-6) = 0.001.
        let strategy = strategy(onchain_for_evaluation(400_000_000_000_000_000));
        let profit = strategy.calculate_profitability(&usdc_order()).await;
        assert_eq!(profit, Decimal::new(601, 3));
    }

    #[tokio::test]
    async fn gas_cost_above_fees_still_leaves_the_slippage_margin() {
        let strategy = strategy(onchain_for_evaluation(3_000_000_000_000_000_000));
        let profit = strategy.calculate_profitability(&usdc_order()).await;
        assert_eq!(profit, Decimal::new(1, 3));
    }

    #[tokio::test]
    async fn rejects_when_the_user_demands_more_than_bps_allows() {
        // filler_max = 995_000; the user wants 999_999.
        let order = fixtures::order(
            97,
            80002,
            &[(fixtures::usdc(), 1_000_000, fixtures::usdc(), 999_999)],
            1_000_000_000_000_000_000,
        );
        let strategy = strategy(onchain_for_evaluation(0));
        assert_eq!(
            strategy.calculate_profitability(&order).await,
            Decimal::ZERO
        );
    }

    #[tokio::test]
    async fn promised_output_never_exceeds_the_bps_bound() {
        // Exactly at the bound is accepted with zero slippage margin.
        let order = fixtures::order(
            97,
            80002,
            &[(fixtures::usdc(), 1_000_000, fixtures::usdc(), 995_000)],
            1_000_000_000_000_000_000,
        );
        let strategy = strategy(onchain_for_evaluation(1_000_000_000_000_000_000));
        assert_eq!(
            strategy.calculate_profitability(&order).await,
            Decimal::ZERO
        );
    }

    #[tokio::test]
    async fn unsupported_tokens_evaluate_to_zero() {
        let mut onchain = MockOnchain::new();
        onchain.expect_usd_value().returning(|order| {
            Err(ValueError::UnsupportedToken {
                chain: ChainTag::Evm(97),
                token: order.inputs[0].token,
            })
        });
        let strategy = strategy(onchain);
        assert_eq!(
            strategy.calculate_profitability(&usdc_order()).await,
            Decimal::ZERO
        );
    }

    #[tokio::test]
    async fn direct_execution_fills_once_on_the_destination() {
        let mut onchain = MockOnchain::new();
        onchain
            .expect_approve_tokens_if_needed()
            .times(1)
            .returning(|_| Ok(()));
        onchain
            .expect_fill_order_direct()
            .times(1)
            .returning(|_, _| {
                Ok(Execution {
                    success: true,
                    id: ExecutionId::Transaction(B256::repeat_byte(0x77)),
                })
            });
        let strategy = strategy(onchain);
        let execution = strategy.execute_order(&usdc_order(), None).await.unwrap();
        assert!(execution.success);
        assert_eq!(
            execution.id,
            ExecutionId::Transaction(B256::repeat_byte(0x77))
        );
    }

    #[tokio::test]
    async fn bid_execution_submits_and_persists_the_outcome() {
        let order = usdc_order();
        let commitment = order.commitment;

        let mut onchain = MockOnchain::new();
        onchain
            .expect_approve_tokens_if_needed()
            .returning(|_| Ok(()));
        onchain.expect_prepare_bid().times(1).returning(move |_| {
            Ok(PreparedBid {
                commitment,
                user_op: Bytes::from(vec![0x01]),
            })
        });
        let mut coordinator = MockCoordinator::new();
        coordinator.expect_submit_bid().times(1).returning(|_, _| {
            Ok(BidOutcome {
                success: true,
                extrinsic_hash: "0xext".into(),
                block_hash: "0xblock".into(),
            })
        });

        let bid_store = Arc::new(BidStore::new());
        let strategy = SameTokenStrategy::new(
            Arc::new(onchain),
            fixtures::chains(),
            bps_50(),
            Arc::clone(&bid_store),
        );
        let execution = strategy
            .execute_order(&order, Some(&coordinator))
            .await
            .unwrap();
        assert!(execution.success);
        assert_eq!(execution.id, ExecutionId::Extrinsic("0xext".into()));

        let bid = bid_store.get(&commitment).unwrap();
        assert!(bid.accepted);
        assert_eq!(bid.extrinsic_hash.as_deref(), Some("0xext"));
    }

    #[tokio::test]
    async fn failed_bid_submission_is_recorded_and_surfaced() {
        let order = usdc_order();
        let commitment = order.commitment;

        let mut onchain = MockOnchain::new();
        onchain
            .expect_approve_tokens_if_needed()
            .returning(|_| Ok(()));
        onchain.expect_prepare_bid().returning(move |_| {
            Ok(PreparedBid {
                commitment,
                user_op: Bytes::new(),
            })
        });
        let mut coordinator = MockCoordinator::new();
        coordinator
            .expect_submit_bid()
            .returning(|_, _| Err(anyhow::anyhow!("coordinator unreachable")));

        let bid_store = Arc::new(BidStore::new());
        let strategy = SameTokenStrategy::new(
            Arc::new(onchain),
            fixtures::chains(),
            bps_50(),
            Arc::clone(&bid_store),
        );
        assert!(
            strategy
                .execute_order(&order, Some(&coordinator))
                .await
                .is_err()
        );
        let bid = bid_store.get(&commitment).unwrap();
        assert!(!bid.accepted);
        assert!(bid.extrinsic_hash.is_none());
    }
}
