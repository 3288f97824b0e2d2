use prometheus::{IntCounter, IntCounterVec};

#[derive(prometheus_metric_storage::MetricStorage, Clone, Debug)]
#[metric(subsystem = "filler")]
pub struct Metrics {
    /// Orders reconstructed from chain events.
    pub orders_seen: IntCounter,

    /// Orders whose execution succeeded.
    pub orders_filled: IntCounter,

    /// Orders dropped before execution, by reason.
    #[metric(labels("reason"))]
    pub orders_skipped: IntCounterVec,

    /// Failed block scans, per source chain.
    #[metric(labels("chain"))]
    pub scan_errors: IntCounterVec,
}

impl Metrics {
    pub fn get() -> &'static Self {
        Self::instance(observe::metrics::get_storage_registry())
            .expect("unexpected error getting metrics instance")
    }
}
