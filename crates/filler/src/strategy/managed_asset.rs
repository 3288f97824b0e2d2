//! The managed-asset swap strategy: same-chain orders exchanging the
//! configured managed asset against USDC/USDT at the policy price. Output
//! sizing is budgeted (per-order USD cap) and bounded by live wallet
//! balances; execution always goes through the coordinator as an ERC-7821
//! batch bid.

use {
    super::StrategyError,
    crate::{
        bid_store::BidStore,
        cache::FillerCache,
        config::ChainSet,
        coordinator::Coordinator,
        domain::{
            AssetKind,
            Execution,
            Order,
            TokenAmount,
            eth::{self, B256, ExecutionId, U256},
            order::PlannedOutput,
        },
        onchain::{Onchain, fill_options_with},
        policy::PricePolicy,
    },
    alloy::sol_types::SolCall,
    anyhow::Context,
    contracts::IERC20,
    rust_decimal::Decimal,
    std::{
        collections::{BTreeMap, HashMap},
        sync::Arc,
    },
};

#[derive(Clone)]
pub struct ManagedAssetStrategy(Arc<Inner>);

struct Inner {
    onchain: Arc<dyn Onchain>,
    cache: Arc<FillerCache>,
    chains: ChainSet,
    price: PricePolicy,
    /// The filler's per-order willingness in USD.
    max_order_usd: Decimal,
    bid_store: Arc<BidStore>,
}

struct Leg {
    /// Stable-side USD value of the leg.
    usd: Decimal,
    output_token: B256,
    /// Whether the filler pays out the managed asset (stable was escrowed).
    to_managed: bool,
}

impl ManagedAssetStrategy {
    pub fn new(
        onchain: Arc<dyn Onchain>,
        cache: Arc<FillerCache>,
        chains: ChainSet,
        price: PricePolicy,
        max_order_usd: Decimal,
        bid_store: Arc<BidStore>,
    ) -> Self {
        Self(Arc::new(Inner {
            onchain,
            cache,
            chains,
            price,
            max_order_usd,
            bid_store,
        }))
    }

    pub async fn can_fill(&self, order: &Order) -> bool {
        if order.source != order.dest {
            return false;
        }
        if order.inputs.is_empty() || order.inputs.len() != order.output.assets.len() {
            return false;
        }
        order
            .inputs
            .iter()
            .zip(&order.output.assets)
            .all(|(input, output)| {
                let input_kind = self.0.chains.classify(&order.source, &input.token);
                let output_kind = self.0.chains.classify(&order.dest, &output.token);
                matches!(
                    (input_kind, output_kind),
                    (Some(AssetKind::Stable(_)), Some(AssetKind::Managed))
                        | (Some(AssetKind::Managed), Some(AssetKind::Stable(_)))
                )
            })
    }

    pub async fn calculate_profitability(&self, order: &Order) -> Decimal {
        match self.evaluate(order).await {
            Ok(Some(allocated_usd)) => allocated_usd,
            Ok(None) => Decimal::ZERO,
            Err(err) => {
                tracing::debug!(commitment = %order.commitment, ?err, "evaluation failed");
                Decimal::ZERO
            }
        }
    }

    /// Sizes the outputs the filler would deliver. Returns the allocated USD
    /// when at least one leg ends up non-zero, caching the planned outputs
    /// by commitment for execution.
    async fn evaluate(&self, order: &Order) -> anyhow::Result<Option<Decimal>> {
        let chain = order.dest;

        let mut order_usd = Decimal::ZERO;
        let mut legs = Vec::with_capacity(order.inputs.len());
        for (input, output) in order.inputs.iter().zip(&order.output.assets) {
            let input_kind = self
                .0
                .chains
                .classify(&order.source, &input.token)
                .context("unclassified input token")?;
            let leg = match input_kind {
                AssetKind::Stable(_) => {
                    let decimals = self.0.onchain.token_decimals(order.source, input.token).await;
                    Leg {
                        usd: number::to_decimal(input.amount, decimals)?,
                        output_token: output.token,
                        to_managed: true,
                    }
                }
                AssetKind::Managed => {
                    let decimals = self.0.onchain.token_decimals(chain, output.token).await;
                    Leg {
                        usd: number::to_decimal(output.amount, decimals)?,
                        output_token: output.token,
                        to_managed: false,
                    }
                }
            };
            order_usd += leg.usd;
            legs.push(leg);
        }

        let capped = order_usd.min(self.0.max_order_usd);
        let price = self.0.price.price_usd(capped);
        anyhow::ensure!(price > Decimal::ZERO, "policy price must be positive");

        // Greedy allocation of the capped budget, leg order as given.
        // Balances are fetched once per token and drawn down across legs.
        let mut remaining = capped;
        let mut balances: HashMap<B256, U256> = HashMap::new();
        let mut planned = Vec::new();
        let mut allocated = Decimal::ZERO;
        for leg in legs {
            if remaining <= Decimal::ZERO {
                break;
            }
            let leg_usd = leg.usd.min(remaining);
            let decimals = self.0.onchain.token_decimals(chain, leg.output_token).await;
            let policy_amount = if leg.to_managed {
                number::from_decimal(leg_usd / price, decimals)?
            } else {
                number::from_decimal(leg_usd, decimals)?
            };

            let available = match balances.get(&leg.output_token) {
                Some(balance) => *balance,
                None => {
                    let balance = self
                        .0
                        .onchain
                        .balance_of(chain, leg.output_token)
                        .await
                        .unwrap_or_default();
                    balances.insert(leg.output_token, balance);
                    balance
                }
            };
            let final_amount = policy_amount.min(available);
            balances.insert(leg.output_token, available - final_amount);
            if final_amount.is_zero() {
                continue;
            }
            remaining -= leg_usd;
            allocated += leg_usd;
            planned.push(PlannedOutput {
                token: leg.output_token,
                amount: final_amount,
                decimals,
            });
        }

        if planned.is_empty() {
            return Ok(None);
        }
        self.0
            .cache
            .set_planned_outputs(order.commitment, planned);
        Ok(Some(allocated))
    }

    pub async fn execute_order(
        &self,
        order: &Order,
        coordinator: Option<&dyn Coordinator>,
    ) -> Result<Execution, StrategyError> {
        let coordinator = coordinator.ok_or(StrategyError::CoordinatorRequired)?;
        let planned = self
            .0
            .cache
            .planned_outputs(&order.commitment)
            .ok_or(StrategyError::PlanMissing(order.commitment))?;

        let config = self
            .0
            .chains
            .get(&order.dest)
            .with_context(|| format!("chain {} is not configured", order.dest))?;
        let gateway = config.gateway;
        let estimate = self.0.onchain.estimate_gas(order).await;
        let fee_token = self.0.onchain.fee_token(order.dest).await?;

        // Allowance requirement per ERC-20: planned outputs of the token,
        // plus the execution cost for the fee token.
        let mut required = BTreeMap::<eth::Address, U256>::new();
        for output in &planned {
            if eth::is_native(&output.token) {
                continue;
            }
            let address = eth::to_bytes20(output.token)
                .map_err(crate::onchain::OnchainError::from)?;
            *required.entry(address).or_default() += output.amount;
        }
        if fee_token.address != eth::Address::ZERO {
            *required.entry(fee_token.address).or_default() += estimate.total_cost_in_fee_token;
        }

        let mut calls = Vec::new();
        for (token, total) in required {
            let allowance = self.0.onchain.allowance(order.dest, token, gateway).await?;
            if allowance >= total {
                continue;
            }
            calls.push(contracts::Call {
                to: token,
                value: U256::ZERO,
                data: IERC20::approveCall {
                    spender: gateway,
                    amount: U256::MAX,
                }
                .abi_encode()
                .into(),
            });
        }

        let outputs: Vec<TokenAmount> = planned
            .iter()
            .map(|output| TokenAmount {
                token: output.token,
                amount: output.amount,
            })
            .collect();
        let native_value = outputs
            .iter()
            .filter(|output| eth::is_native(&output.token))
            .fold(U256::ZERO, |acc, output| acc + output.amount)
            + estimate.native_dispatch_fee;
        let options = fill_options_with(
            estimate.dispatch_fee,
            estimate.native_dispatch_fee,
            &outputs,
        );
        calls.push(contracts::Call {
            to: gateway,
            value: native_value,
            data: contracts::IIntentGateway::fillOrderCall {
                order: order.to_sol(),
                options,
            }
            .abi_encode()
            .into(),
        });

        let bid = self.0.onchain.prepare_batch_bid(order, calls).await?;
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
