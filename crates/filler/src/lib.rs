//! A filler for a cross-chain intent protocol.
//!
//! Users escrow input tokens on a source chain together with the outputs
//! they want delivered on a destination chain. This crate discovers those
//! orders from gateway events, waits out a value-dependent number of source
//! confirmations, evaluates profitability against the configured policy
//! curves and live balances, and executes the winning strategy: a direct
//! `fillOrder` on the destination gateway, or a signed bid through the
//! coordinator when the destination runs in solver-selection mode. A
//! periodic task rebalances inventory between chains through external
//! bridge adapters.
//!
//! The crate is library-shaped: the embedding host parses configuration,
//! supplies the external collaborators ([`coordinator::Coordinator`],
//! [`rebalance::Rebalancer`], optionally an
//! [`onchain::GasPriceOracle`]) and consumes the [`events::Events`] stream.

pub mod bid_store;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod events;
pub mod metrics;
pub mod monitor;
pub mod onchain;
pub mod policy;
pub mod rebalance;
pub mod registry;
pub mod scheduler;
pub mod strategy;

use {
    crate::{
        bid_store::BidStore,
        cache::FillerCache,
        config::{ChainSet, Config},
        coordinator::Coordinator,
        events::Events,
        monitor::EventMonitor,
        onchain::{Ethereum, GasPriceOracle, Onchain},
        policy::{BpsPolicy, ConfirmationPolicy, PricePolicy},
        rebalance::{Rebalancer, TransferPlan},
        registry::ClientRegistry,
        scheduler::{Scheduler, SchedulerConfig},
        strategy::{ManagedAssetStrategy, SameTokenStrategy, Strategy},
    },
    alloy::signers::local::PrivateKeySigner,
    anyhow::Context,
    rust_decimal::Decimal,
    std::sync::Arc,
};

/// Collaborators the core treats as external: the host constructs concrete
/// clients/adapters and hands them in.
#[derive(Default)]
pub struct External {
    pub private_key: Option<PrivateKeySigner>,
    pub coordinator: Option<Arc<dyn Coordinator>>,
    pub rebalancer: Option<Arc<dyn Rebalancer>>,
    pub gas_price_oracle: Option<Arc<dyn GasPriceOracle>>,
    pub rebalance_plans: Vec<TransferPlan>,
}

/// The assembled service.
pub struct Filler {
    scheduler: Scheduler,
    events: Events,
}

impl Filler {
    /// Validates the configuration, warms the on-chain caches and wires the
    /// pipeline. Nothing runs until [`Filler::start`].
    pub async fn new(config: Config, external: External) -> anyhow::Result<Self> {
        let bps = BpsPolicy::new(&config.filler_bps.points).context("filler-bps")?;
        let confirmation_policies = config
            .confirmation_policy
            .iter()
            .map(|(chain_id, curve)| {
                let policy = ConfirmationPolicy::new(&curve.points)
                    .with_context(|| format!("confirmation-policy.{chain_id}"))?;
                Ok((*chain_id, policy))
            })
            .collect::<anyhow::Result<_>>()?;

        let cache = Arc::new(FillerCache::new(config.cache_ttl));
        let registry = Arc::new(ClientRegistry::new(external.private_key));
        let chains = ChainSet::new(config.chains.clone());
        let onchain: Arc<dyn Onchain> = Arc::new(
            Ethereum::new(
                Arc::clone(&registry),
                Arc::clone(&cache),
                chains.clone(),
                external.gas_price_oracle,
                config.gas_estimate_fallback,
                config.filled_mapping_slot,
            )
            .await,
        );

        let bid_store = Arc::new(BidStore::new());
        let mut strategies = vec![Strategy::SameToken(SameTokenStrategy::new(
            Arc::clone(&onchain),
            chains.clone(),
            bps,
            Arc::clone(&bid_store),
        ))];
        if let Some(price_policy) = &config.price_policy {
            let price = PricePolicy::new(&price_policy.points).context("price-policy")?;
            let max_order_usd = config
                .max_order_usd
                .and_then(Decimal::from_f64_retain)
                .context("price-policy requires max-order-usd")?;
            strategies.push(Strategy::ManagedAsset(ManagedAssetStrategy::new(
                Arc::clone(&onchain),
                Arc::clone(&cache),
                chains.clone(),
                price,
                max_order_usd,
                Arc::clone(&bid_store),
            )));
        }

        let events = Events::new();
        let monitor = EventMonitor::from_config(&chains, &registry, events.clone())?;
        let scheduler = Scheduler::new(
            SchedulerConfig {
                max_concurrent_orders: config.max_concurrent_orders,
                watch_only: config.watch_only.iter().copied().collect(),
                confirmation_policies,
                rebalance_plans: external.rebalance_plans,
            },
            monitor,
            onchain,
            cache,
            strategies,
            external.coordinator,
            external.rebalancer,
            events.clone(),
        );

        Ok(Self { scheduler, events })
    }

    /// The event stream (`NewOrder` / `OrderDetected` / `OrderFilled`).
    pub fn events(&self) -> &Events {
        &self.events
    }

    pub fn start(&self) {
        self.scheduler.start();
    }

    /// Graceful shutdown; in-flight scans and executions run to completion.
    /// Callers with a hard deadline can wrap this in a timeout.
    pub async fn stop(&self) {
        self.scheduler.stop().await;
    }
}
