//! The scheduler: admission of discovered orders, confirmation waiting,
//! strategy evaluation, and serialized dispatch per destination chain.
//!
//! Two queue tiers shape the concurrency. A global semaphore bounds how many
//! orders are analyzed at once; analysis for different orders proceeds in
//! parallel and its completion order is unconstrained. Execution, by
//! contrast, is strictly serial per destination chain (see
//! [`queue::SerialQueues`]), so at most one fill or bid is in flight against
//! any chain at any time.

pub mod queue;

use {
    crate::{
        cache::FillerCache,
        coordinator::Coordinator,
        domain::Order,
        events::{Events, FillerEvent},
        metrics::Metrics,
        monitor::EventMonitor,
        onchain::Onchain,
        policy::ConfirmationPolicy,
        rebalance::{self, Rebalancer, TransferPlan},
        strategy::Strategy,
    },
    futures::FutureExt,
    self::queue::SerialQueues,
    rust_decimal::Decimal,
    std::{
        collections::{HashMap, HashSet},
        sync::Arc,
        time::Duration,
    },
    tokio::{
        sync::{Semaphore, broadcast, watch},
        task::JoinHandle,
    },
    tracing::Instrument,
};

const CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_millis(300);
const REBALANCE_INITIAL_DELAY: Duration = Duration::from_secs(30);
const REBALANCE_INTERVAL: Duration = Duration::from_secs(5 * 60);

pub struct SchedulerConfig {
    pub max_concurrent_orders: usize,
    /// Destination chain ids that are observed but never executed.
    pub watch_only: HashSet<u64>,
    /// Confirmation requirement per source chain id.
    pub confirmation_policies: HashMap<u64, ConfirmationPolicy>,
    pub rebalance_plans: Vec<TransferPlan>,
}

pub struct Scheduler {
    inner: Arc<Inner>,
    monitor: EventMonitor,
    shutdown: watch::Sender<bool>,
    tasks: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

struct Inner {
    onchain: Arc<dyn Onchain>,
    cache: Arc<FillerCache>,
    strategies: Vec<Strategy>,
    coordinator: Option<Arc<dyn Coordinator>>,
    rebalancer: Option<Arc<dyn Rebalancer>>,
    rebalance_plans: Vec<TransferPlan>,
    events: Events,
    confirmation_policies: HashMap<u64, ConfirmationPolicy>,
    watch_only: HashSet<u64>,
    max_concurrent_orders: usize,
    admission_gate: Arc<Semaphore>,
    queues: tokio::sync::Mutex<SerialQueues>,
}

impl Scheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: SchedulerConfig,
        monitor: EventMonitor,
        onchain: Arc<dyn Onchain>,
        cache: Arc<FillerCache>,
        strategies: Vec<Strategy>,
        coordinator: Option<Arc<dyn Coordinator>>,
        rebalancer: Option<Arc<dyn Rebalancer>>,
        events: Events,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                onchain,
                cache,
                strategies,
                coordinator,
                rebalancer,
                rebalance_plans: config.rebalance_plans,
                events,
                confirmation_policies: config.confirmation_policies,
                watch_only: config.watch_only,
                max_concurrent_orders: config.max_concurrent_orders,
                admission_gate: Arc::new(Semaphore::new(config.max_concurrent_orders)),
                queues: tokio::sync::Mutex::new(SerialQueues::new()),
            }),
            monitor,
            shutdown,
            tasks: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Starts the monitor, the admission loop and the rebalancing timer.
    pub fn start(&self) {
        let mut tasks = self.tasks.lock().unwrap();
        tasks.push(tokio::spawn(admission_loop(
            Arc::clone(&self.inner),
            self.inner.events.subscribe(),
            self.shutdown.subscribe(),
        )));
        if self.inner.rebalancer.is_some() {
            tasks.push(tokio::spawn(rebalance_loop(
                Arc::clone(&self.inner),
                self.shutdown.subscribe(),
            )));
        }
        self.monitor.start();
    }

    /// Graceful shutdown: stops the monitor, cancels the timers, waits for
    /// all in-flight analysis and execution to finish, then disconnects the
    /// coordinator.
    pub async fn stop(&self) {
        self.monitor.stop().await;
        let _ = self.shutdown.send(true);
        for task in std::mem::take(&mut *self.tasks.lock().unwrap()) {
            if let Err(err) = task.await {
                tracing::error!(?err, "scheduler task panicked");
            }
        }
        // Holding every permit means no analysis closure is running.
        let _permits = self
            .inner
            .admission_gate
            .acquire_many(self.inner.max_concurrent_orders as u32)
            .await;
        self.inner.queues.lock().await.shutdown().await;
        if let Some(coordinator) = &self.inner.coordinator {
            coordinator.disconnect().await;
        }
    }
}

async fn admission_loop(
    inner: Arc<Inner>,
    mut events: broadcast::Receiver<FillerEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let event = tokio::select! {
            _ = shutdown.changed() => break,
            event = events.recv() => event,
        };
        match event {
            Ok(FillerEvent::NewOrder(order)) => {
                let permit = tokio::select! {
                    _ = shutdown.changed() => break,
                    permit = Arc::clone(&inner.admission_gate).acquire_owned() => permit,
                };
                let Ok(permit) = permit else { break };
                let inner = Arc::clone(&inner);
                let commitment = order.commitment;
                tokio::spawn(
                    async move {
                        process_order(&inner, order).await;
                        drop(permit);
                    }
                    .instrument(tracing::info_span!("order", %commitment)),
                );
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "admission fell behind, orders were dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// The global-queue closure: one admitted order from flag checks to
/// dispatch. Never propagates errors past the queue boundary.
async fn process_order(inner: &Arc<Inner>, order: Arc<Order>) {
    let metrics = Metrics::get();

    // The flag is a cache-only read here; when it is missing (never fetched
    // or swept) the order is dropped and a refresh is kicked off for the
    // ones that follow.
    let Some(solver_selection) = inner.cache.solver_selection(&order.dest) else {
        tracing::warn!(dest = %order.dest, "solver-selection flag not cached, dropping order");
        metrics
            .orders_skipped
            .with_label_values(&["flag-uninitialized"])
            .inc();
        let refresh = Arc::clone(inner);
        let dest = order.dest;
        tokio::spawn(async move {
            if let Err(err) = refresh.onchain.solver_selection(dest).await {
                tracing::warn!(%dest, ?err, "failed to refresh solver-selection flag");
            }
        });
        return;
    };

    if solver_selection && inner.coordinator.is_none() {
        tracing::warn!(
            dest = %order.dest,
            "destination requires solver selection but no coordinator is configured, dropping"
        );
        metrics
            .orders_skipped
            .with_label_values(&["coordinator-missing"])
            .inc();
        return;
    }

    let usd = match inner.onchain.usd_value(&order).await {
        Ok(usd) => usd,
        Err(err) => {
            // Not priceable in stables; the confirmation policy sees zero
            // and the strategies decide what to make of the order.
            tracing::debug!(?err, "order not stable-priceable, using zero USD");
            Decimal::ZERO
        }
    };
    let required = inner
        .confirmation_policies
        .get(&order.source.id())
        .map(|policy| policy.confirmations(usd))
        .unwrap_or(1);

    let (_, choice) = tokio::join!(
        wait_for_confirmations(inner, &order, required),
        evaluate(inner, &order),
    );

    let Some((strategy, profitability)) = choice else {
        return;
    };
    tracing::info!(
        strategy = strategy.name(),
        %profitability,
        dest = %order.dest,
        "dispatching order for execution"
    );
    let job_inner = Arc::clone(inner);
    let job_order = Arc::clone(&order);
    inner.queues.lock().await.enqueue(
        order.dest.id(),
        async move { execute(job_inner, job_order, strategy, solver_selection).await }.boxed(),
    );
}

/// Polls the source chain until the order's placing transaction has the
/// required confirmations. Transient failures are retried indefinitely; the
/// order's on-chain deadline is the outer bound.
async fn wait_for_confirmations(inner: &Inner, order: &Order, required: u64) {
    loop {
        match inner
            .onchain
            .confirmations(order.source, order.transaction_hash)
            .await
        {
            Ok(confirmations) if confirmations >= required => return,
            Ok(confirmations) => {
                tracing::trace!(confirmations, required, "waiting for confirmations")
            }
            Err(err) => tracing::debug!(?err, "confirmation poll failed, retrying"),
        }
        tokio::time::sleep(CONFIRMATION_POLL_INTERVAL).await;
    }
}

/// Runs every strategy and picks the most profitable one. Watch-only
/// destinations short-circuit to an `OrderDetected` event.
async fn evaluate(inner: &Inner, order: &Arc<Order>) -> Option<(Strategy, Decimal)> {
    if inner.watch_only.contains(&order.dest.id()) {
        tracing::info!(dest = %order.dest, "watch-only destination, observing order");
        Metrics::get()
            .orders_skipped
            .with_label_values(&["watch-only"])
            .inc();
        inner
            .events
            .publish(FillerEvent::OrderDetected(Arc::clone(order)));
        return None;
    }

    let mut best: Option<(Strategy, Decimal)> = None;
    for strategy in &inner.strategies {
        if !strategy.can_fill(order).await {
            continue;
        }
        let profitability = strategy.calculate_profitability(order).await;
        if profitability <= Decimal::ZERO {
            continue;
        }
        if best
            .as_ref()
            .is_none_or(|(_, previous)| profitability > *previous)
        {
            best = Some((strategy.clone(), profitability));
        }
    }
    if best.is_none() {
        tracing::debug!("no strategy is profitable for the order");
        Metrics::get()
            .orders_skipped
            .with_label_values(&["unprofitable"])
            .inc();
    }
    best
}

/// The serial-queue closure: execute and report. Errors are logged and the
/// queue drains on.
async fn execute(inner: Arc<Inner>, order: Arc<Order>, strategy: Strategy, solver_selection: bool) {
    let coordinator = if solver_selection {
        inner.coordinator.clone()
    } else {
        None
    };
    match strategy.execute_order(&order, coordinator.as_deref()).await {
        Ok(execution) if execution.success => {
            tracing::info!(transaction = %execution.id, "order filled");
            Metrics::get().orders_filled.inc();
            inner.events.publish(FillerEvent::OrderFilled {
                commitment: order.commitment,
                transaction: execution.id,
            });
        }
        Ok(execution) => {
            tracing::warn!(transaction = %execution.id, "execution landed but did not take effect");
        }
        Err(err) => {
            tracing::warn!(dest = %order.dest, ?err, "execution failed");
        }
    }
}

/// Fires 30 s after start, then every 5 min.
async fn rebalance_loop(inner: Arc<Inner>, mut shutdown: watch::Receiver<bool>) {
    let Some(rebalancer) = inner.rebalancer.clone() else {
        return;
    };
    tokio::select! {
        _ = shutdown.changed() => return,
        _ = tokio::time::sleep(REBALANCE_INITIAL_DELAY) => {}
    }
    loop {
        let outcome = rebalance::run_cycle(rebalancer.as_ref(), &inner.rebalance_plans).await;
        tracing::info!(
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            "rebalancing cycle finished"
        );
        tokio::select! {
            _ = shutdown.changed() => return,
            _ = tokio::time::sleep(REBALANCE_INTERVAL) => {}
        }
    }
}
