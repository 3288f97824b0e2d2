//! The event monitor: one scanner task per configured chain, each on a one
//! second tick, publishing reconstructed orders into the filler's event
//! stream.

pub mod scanner;

pub use self::scanner::{ChainReader, MAX_BLOCK_RANGE, RpcReader, Scanner};

use {
    crate::{config::ChainSet, events::Events, registry::ClientRegistry},
    std::{
        sync::{Arc, Mutex},
        time::Duration,
    },
    tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior},
    tracing::Instrument,
};

const SCAN_INTERVAL: Duration = Duration::from_secs(1);

pub struct EventMonitor {
    scanners: Vec<Arc<Scanner>>,
    events: Events,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl EventMonitor {
    pub fn new(scanners: Vec<Scanner>, events: Events) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            scanners: scanners.into_iter().map(Arc::new).collect(),
            events,
            shutdown,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Builds one RPC-backed scanner per configured chain.
    pub fn from_config(
        chains: &ChainSet,
        registry: &ClientRegistry,
        events: Events,
    ) -> anyhow::Result<Self> {
        let known: Vec<_> = chains.tags().collect();
        let scanners = chains
            .iter()
            .map(|config| {
                let clients = registry.get(config)?;
                let reader = RpcReader::new(clients.public, config.gateway);
                Ok(Scanner::new(config.tag(), Arc::new(reader), known.clone()))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self::new(scanners, events))
    }

    /// Spawns the scan timers.
    pub fn start(&self) {
        let mut tasks = self.tasks.lock().unwrap();
        for scanner in &self.scanners {
            let scanner = Arc::clone(scanner);
            let events = self.events.clone();
            let mut shutdown = self.shutdown.subscribe();
            let chain = scanner.chain();
            let task = tokio::spawn(
                async move {
                    let mut ticks = tokio::time::interval(SCAN_INTERVAL);
                    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
                    loop {
                        tokio::select! {
                            _ = shutdown.changed() => break,
                            _ = ticks.tick() => scanner.tick(&events).await,
                        }
                    }
                }
                .instrument(tracing::info_span!("scanner", chain = %chain)),
            );
            tasks.push(task);
        }
    }

    /// Graceful stop: cancels the timers, then observes every in-flight scan
    /// to completion. Scans are never aborted mid-range.
    pub async fn stop(&self) {
        let _ = self.shutdown.send(true);
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap());
        for task in tasks {
            if let Err(err) = task.await {
                tracing::error!(?err, "scanner task panicked");
            }
        }
        for scanner in &self.scanners {
            scanner.drain().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::{scanner::MockChainReader, *},
        chain::ChainTag,
    };

    #[tokio::test(start_paused = true)]
    async fn started_scanners_tick_and_stop_drains_them() {
        let mut reader = MockChainReader::new();
        reader.expect_block_number().returning(|| Ok(100));
        reader.expect_order_placed_logs().returning(|_, _| Ok(vec![]));

        let scanner = Scanner::new(ChainTag::Evm(97), Arc::new(reader), [ChainTag::Evm(97)]);
        let monitor = EventMonitor::new(vec![scanner], Events::new());
        monitor.start();

        // Let a few ticks elapse, then stop; stop must observe the scans
        // out and join the task.
        tokio::time::sleep(Duration::from_secs(3)).await;
        monitor.stop().await;
        assert!(monitor.tasks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stop_before_start_is_a_no_op() {
        let monitor = EventMonitor::new(Vec::new(), Events::new());
        monitor.stop().await;
    }
}
