//! Record of submitted bids, keyed by order commitment.
//!
//! The commitment is globally unique, so a duplicate admission of the same
//! order overwrites its own record instead of producing a second bid entry.
//! The store is process-local; durable crash recovery is the contract's
//! concern (a repeated fill of a settled commitment is a no-op on chain).

use {
    crate::{coordinator::BidOutcome, domain::eth::B256},
    std::{collections::HashMap, sync::Mutex},
};

#[derive(Clone, Debug)]
pub struct SubmittedBid {
    pub commitment: B256,
    /// Set when the coordinator acknowledged the bid.
    pub extrinsic_hash: Option<String>,
    pub block_hash: Option<String>,
    pub accepted: bool,
}

#[derive(Debug, Default)]
pub struct BidStore(Mutex<HashMap<B256, SubmittedBid>>);

impl BidStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a bid the coordinator answered.
    pub fn record_outcome(&self, commitment: B256, outcome: &BidOutcome) {
        self.insert(SubmittedBid {
            commitment,
            extrinsic_hash: Some(outcome.extrinsic_hash.clone()),
            block_hash: Some(outcome.block_hash.clone()),
            accepted: outcome.success,
        });
    }

    /// Records a bid whose submission failed before an acknowledgement.
    pub fn record_failure(&self, commitment: B256) {
        self.insert(SubmittedBid {
            commitment,
            extrinsic_hash: None,
            block_hash: None,
            accepted: false,
        });
    }

    pub fn get(&self, commitment: &B256) -> Option<SubmittedBid> {
        self.0.lock().unwrap().get(commitment).cloned()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().unwrap().is_empty()
    }

    fn insert(&self, bid: SubmittedBid) {
        self.0.lock().unwrap().insert(bid.commitment, bid);
    }
}
