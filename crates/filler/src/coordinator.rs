//! The coordinator seam of the solver-selection path.
//!
//! The coordinator is an external protocol component (a substrate chain
//! reached over websocket) that ranks solver bids. The filler only needs to
//! submit an encoded user operation under an order commitment and to hang
//! up on shutdown; the concrete wire client lives outside the core.

use {
    crate::domain::eth::{B256, Bytes},
    async_trait::async_trait,
    url::Url,
};

/// The coordinator's answer to a submitted bid.
#[derive(Clone, Debug)]
pub struct BidOutcome {
    pub success: bool,
    pub extrinsic_hash: String,
    pub block_hash: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Coordinator: Send + Sync {
    async fn submit_bid(&self, commitment: B256, user_op: Bytes) -> anyhow::Result<BidOutcome>;

    /// Closes the underlying connection. Called once, on scheduler shutdown.
    async fn disconnect(&self);
}

/// Connection parameters of the coordinator path. Presence of this config
/// is what switches the scheduler into accepting solver-selection orders.
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    pub ws_url: Url,
    pub substrate_private_key: String,
    /// Optional bundler endpoint for user-op submission.
    pub bundler_url: Option<Url>,
}
