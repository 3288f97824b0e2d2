//! Filler configuration.
//!
//! These structs are the deserialized form of the filler's TOML
//! configuration; file loading and CLI plumbing belong to the embedding
//! host.

use {
    crate::{
        domain::{
            AssetKind,
            Stable,
            eth::{Address, B256, to_bytes20},
        },
        policy::{PolicyPoint, PricePoint},
    },
    chain::ChainTag,
    serde::{Deserialize, Serialize},
    std::{collections::HashMap, time::Duration},
    url::Url,
};

fn default_max_concurrent_orders() -> usize {
    5
}

fn default_cache_ttl() -> Duration {
    Duration::from_secs(60)
}

/// Conservative gas-limit stand-in when live estimation fails.
fn default_gas_estimate_fallback() -> u64 {
    6_000_000
}

/// Storage slot of the gateway's `filled` mapping. Upstream deployments have
/// disagreed on this value (5 vs. 2); confirm against the deployed contract
/// before overriding.
fn default_filled_mapping_slot() -> u64 {
    5
}

/// TOML table keys are always strings, so a `HashMap<u64, _>` field needs an
/// explicit string-to-u64 parse on the way in.
fn deserialize_u64_keyed_map<'de, D, V>(deserializer: D) -> Result<HashMap<u64, V>, D::Error>
where
    D: serde::Deserializer<'de>,
    V: Deserialize<'de>,
{
    HashMap::<String, V>::deserialize(deserializer)?
        .into_iter()
        .map(|(key, value)| {
            key.parse::<u64>()
                .map(|key| (key, value))
                .map_err(serde::de::Error::custom)
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Concurrency cap of the global analysis queue.
    #[serde(default = "default_max_concurrent_orders")]
    pub max_concurrent_orders: usize,

    #[serde(with = "humantime_serde", default = "default_cache_ttl")]
    pub cache_ttl: Duration,

    #[serde(default = "default_gas_estimate_fallback")]
    pub gas_estimate_fallback: u64,

    #[serde(default = "default_filled_mapping_slot")]
    pub filled_mapping_slot: u64,

    /// Destination chain ids that are observed but never executed.
    #[serde(default)]
    pub watch_only: Vec<u64>,

    /// Per-source-chain confirmation requirement, as curve points over the
    /// order's USD value.
    #[serde(default, deserialize_with = "deserialize_u64_keyed_map")]
    pub confirmation_policy: HashMap<u64, CurveConfig>,

    /// The filler's fee margin schedule, as curve points over USD value.
    pub filler_bps: CurveConfig,

    /// Price curve of the managed asset; enables the managed-asset swap
    /// strategy.
    #[serde(default)]
    pub price_policy: Option<PriceCurveConfig>,

    /// Per-order USD cap of the managed-asset swap strategy.
    #[serde(default)]
    pub max_order_usd: Option<f64>,

    /// Coordinator endpoint; together with `substrate-private-key` this
    /// enables the bid path.
    #[serde(default)]
    pub hyperbridge_ws_url: Option<Url>,

    #[serde(default)]
    pub substrate_private_key: Option<String>,

    /// Bundler endpoint used for user-op submission on the bid path.
    #[serde(default)]
    pub bundler_url: Option<Url>,

    pub chains: Vec<ChainConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct CurveConfig {
    pub points: Vec<PolicyPoint>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PriceCurveConfig {
    pub points: Vec<PricePoint>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub rpc_url: Url,
    /// The intent gateway: orders are placed and filled here.
    pub gateway: Address,
    /// The host contract: fee token and per-byte fee queries.
    pub host: Address,
    /// Entry point for the account-abstraction bid path.
    #[serde(default)]
    pub entry_point: Option<Address>,
    pub usdc: Address,
    pub usdt: Address,
    /// The managed (non-stable) asset traded by the swap strategy, if any.
    #[serde(default)]
    pub managed: Option<Address>,
}

impl ChainConfig {
    pub fn tag(&self) -> ChainTag {
        ChainTag::Evm(self.chain_id)
    }
}

/// The configured chains, indexed by tag, with asset-classification helpers
/// used by the strategies.
#[derive(Debug, Clone, Default)]
pub struct ChainSet(HashMap<ChainTag, ChainConfig>);

impl ChainSet {
    pub fn new(chains: impl IntoIterator<Item = ChainConfig>) -> Self {
        Self(
            chains
                .into_iter()
                .map(|chain| (chain.tag(), chain))
                .collect(),
        )
    }

    pub fn get(&self, tag: &ChainTag) -> Option<&ChainConfig> {
        self.0.get(tag)
    }

    pub fn tags(&self) -> impl Iterator<Item = ChainTag> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainConfig> {
        self.0.values()
    }

    pub fn contains(&self, tag: &ChainTag) -> bool {
        self.0.contains_key(tag)
    }

    /// Resolves the stable symbol of a token on a chain, if it is one of the
    /// chain's configured USDC/USDT addresses.
    pub fn stable(&self, tag: &ChainTag, token: &B256) -> Option<Stable> {
        let chain = self.get(tag)?;
        let address = to_bytes20(*token).ok()?;
        if address == chain.usdc {
            Some(Stable::Usdc)
        } else if address == chain.usdt {
            Some(Stable::Usdt)
        } else {
            None
        }
    }

    /// Classifies a token on a chain as stable, managed, or neither.
    pub fn classify(&self, tag: &ChainTag, token: &B256) -> Option<AssetKind> {
        if let Some(stable) = self.stable(tag, token) {
            return Some(AssetKind::Stable(stable));
        }
        let chain = self.get(tag)?;
        let address = to_bytes20(*token).ok()?;
        (Some(address) == chain.managed).then_some(AssetKind::Managed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_minimal_config_applies_defaults() {
        let toml = r#"
        filler-bps = { points = [{ amount = 0.0, value = 50.0 }, { amount = 10000.0, value = 10.0 }] }
        chains = []
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.max_concurrent_orders, 5);
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.gas_estimate_fallback, 6_000_000);
        assert_eq!(config.filled_mapping_slot, 5);
        assert!(config.watch_only.is_empty());
        assert!(config.hyperbridge_ws_url.is_none());
    }

    #[test]
    fn deserialize_full_chain_entry() {
        let toml = r#"
        cache-ttl = "30s"
        max-concurrent-orders = 8
        watch-only = [80002]
        filler-bps = { points = [{ amount = 0.0, value = 50.0 }, { amount = 10000.0, value = 10.0 }] }

        [confirmation-policy.97]
        points = [{ amount = 100.0, value = 1.0 }, { amount = 10000.0, value = 10.0 }]

        [[chains]]
        chain-id = 97
        rpc-url = "http://localhost:8545"
        gateway = "0x000000000000000000000000000000000000dEaD"
        host = "0x000000000000000000000000000000000000bEEF"
        usdc = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
        usdt = "0xdAC17F958D2ee523a2206206994597C13D831ec7"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.cache_ttl, Duration::from_secs(30));
        assert_eq!(config.max_concurrent_orders, 8);
        assert_eq!(config.watch_only, vec![80002]);
        assert_eq!(config.chains.len(), 1);
        assert_eq!(config.chains[0].tag(), ChainTag::Evm(97));
        assert!(config.confirmation_policy.contains_key(&97));
    }

    #[test]
    fn chain_set_classifies_configured_assets() {
        use crate::domain::eth::to_bytes32;

        let toml = r#"
        chain-id = 97
        rpc-url = "http://localhost:8545"
        gateway = "0x000000000000000000000000000000000000dEaD"
        host = "0x000000000000000000000000000000000000bEEF"
        usdc = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"
        usdt = "0xdAC17F958D2ee523a2206206994597C13D831ec7"
        managed = "0x1111111111111111111111111111111111111111"
        "#;
        let chain: ChainConfig = toml::from_str(toml).unwrap();
        let tag = chain.tag();
        let usdc = to_bytes32(chain.usdc);
        let managed = to_bytes32(chain.managed.unwrap());
        let set = ChainSet::new([chain]);

        assert_eq!(set.classify(&tag, &usdc), Some(AssetKind::Stable(Stable::Usdc)));
        assert_eq!(set.classify(&tag, &managed), Some(AssetKind::Managed));
        assert_eq!(set.classify(&tag, &B256::repeat_byte(0x99)), None);
        // Native asset is neither stable nor managed.
        assert_eq!(set.classify(&tag, &B256::ZERO), None);
    }
}
