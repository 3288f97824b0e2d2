//! Process-local cache with time-bounded entries.
//!
//! Every lookup the filler repeats on the hot path (gas estimates, fee-token
//! metadata, per-byte fees, token decimals, the solver-selection flag,
//! planned filler outputs) goes through one of the typed keyspaces below.
//! The cache never returns stale data, never blocks on I/O, and hands out
//! owned copies so callers cannot mutate stored records.

use {
    crate::domain::{
        eth::{B256, FeeToken, GasEstimate, U256},
        order::PlannedOutput,
    },
    chain::ChainTag,
    std::{
        collections::HashMap,
        hash::Hash,
        sync::Mutex,
        time::{Duration, Instant},
    },
    thiserror::Error,
};

pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct Entry<V> {
    value: V,
    created_at: Instant,
}

/// A map whose entries expire `ttl` after they were written. All operations
/// take one briefly-held lock.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the entry iff it exists and is still fresh.
    pub fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.lock().unwrap();
        let entry = entries.get(key)?;
        is_fresh(entry.created_at, self.ttl, Instant::now()).then(|| entry.value.clone())
    }

    /// Writes the entry with `created_at = now` and opportunistically drops
    /// everything that has expired.
    pub fn set(&self, key: K, value: V) {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|_, entry| is_fresh(entry.created_at, self.ttl, now));
        entries.insert(
            key,
            Entry {
                value,
                created_at: now,
            },
        );
    }

    /// Drops all entries whose age exceeds the TTL.
    pub fn sweep(&self) {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|_, entry| is_fresh(entry.created_at, self.ttl, now));
    }

    #[cfg(test)]
    fn set_with_created_at(&self, key: K, value: V, created_at: Instant) {
        self.entries.lock().unwrap().insert(
            key,
            Entry {
                value,
                created_at,
            },
        );
    }
}

/// An entry aged exactly to the TTL is no longer fresh.
fn is_fresh(created_at: Instant, ttl: Duration, now: Instant) -> bool {
    now.saturating_duration_since(created_at) < ttl
}

#[derive(Debug, Error, Eq, PartialEq)]
#[error("gas estimate has a non-positive total cost")]
pub struct InvalidGasEstimate;

/// All keyspaces shared across the contract layer, the scheduler and the
/// strategies. One instance per scheduler.
#[derive(Debug)]
pub struct FillerCache {
    gas_estimates: TtlCache<B256, GasEstimate>,
    fee_tokens: TtlCache<ChainTag, FeeToken>,
    per_byte_fees: TtlCache<(ChainTag, ChainTag), U256>,
    token_decimals: TtlCache<(ChainTag, B256), u8>,
    solver_selection: TtlCache<ChainTag, bool>,
    planned_outputs: TtlCache<B256, Vec<PlannedOutput>>,
}

impl FillerCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            gas_estimates: TtlCache::new(ttl),
            fee_tokens: TtlCache::new(ttl),
            per_byte_fees: TtlCache::new(ttl),
            token_decimals: TtlCache::new(ttl),
            solver_selection: TtlCache::new(ttl),
            planned_outputs: TtlCache::new(ttl),
        }
    }

    pub fn gas_estimate(&self, commitment: &B256) -> Option<GasEstimate> {
        self.gas_estimates.get(commitment)
    }

    /// A zero total cost means the estimate was assembled wrong; storing it
    /// would poison every later profitability read.
    pub fn set_gas_estimate(
        &self,
        commitment: B256,
        estimate: GasEstimate,
    ) -> Result<(), InvalidGasEstimate> {
        if estimate.total_cost_in_fee_token.is_zero() {
            return Err(InvalidGasEstimate);
        }
        self.gas_estimates.set(commitment, estimate);
        Ok(())
    }

    pub fn fee_token(&self, chain: &ChainTag) -> Option<FeeToken> {
        self.fee_tokens.get(chain)
    }

    pub fn set_fee_token(&self, chain: ChainTag, fee_token: FeeToken) {
        self.fee_tokens.set(chain, fee_token);
    }

    pub fn per_byte_fee(&self, source: &ChainTag, dest: &ChainTag) -> Option<U256> {
        self.per_byte_fees.get(&(*source, *dest))
    }

    pub fn set_per_byte_fee(&self, source: ChainTag, dest: ChainTag, fee: U256) {
        self.per_byte_fees.set((source, dest), fee);
    }

    pub fn token_decimals(&self, chain: &ChainTag, token: &B256) -> Option<u8> {
        self.token_decimals.get(&(*chain, *token))
    }

    pub fn set_token_decimals(&self, chain: ChainTag, token: B256, decimals: u8) {
        self.token_decimals.set((chain, token), decimals);
    }

    pub fn solver_selection(&self, chain: &ChainTag) -> Option<bool> {
        self.solver_selection.get(chain)
    }

    pub fn set_solver_selection(&self, chain: ChainTag, enabled: bool) {
        self.solver_selection.set(chain, enabled);
    }

    pub fn planned_outputs(&self, commitment: &B256) -> Option<Vec<PlannedOutput>> {
        self.planned_outputs.get(commitment)
    }

    pub fn set_planned_outputs(&self, commitment: B256, outputs: Vec<PlannedOutput>) {
        self.planned_outputs.set(commitment, outputs);
    }
}

impl Default for FillerCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
