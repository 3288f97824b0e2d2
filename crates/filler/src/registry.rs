//! Per-chain RPC client singletons.
//!
//! Client construction is not free (connection pools, retry state), so the
//! registry builds one public provider per chain id on first access and
//! hands out clones afterwards. When a private key is configured, a wallet
//! provider bound to that key is built alongside. First writer wins; there
//! are no further ordering guarantees.

use {
    crate::config::ChainConfig,
    alloy::{
        network::EthereumWallet,
        primitives::Address,
        providers::{DynProvider, Provider, ProviderBuilder},
        rpc::client::RpcClient,
        signers::local::PrivateKeySigner,
        transports::{
            http::{Http, reqwest},
            layers::RetryBackoffLayer,
        },
    },
    anyhow::Context,
    std::{
        collections::HashMap,
        sync::RwLock,
        time::Duration,
    },
};

const RPC_TIMEOUT: Duration = Duration::from_secs(30);
const RPC_RETRIES: u32 = 3;
const RPC_RETRY_DELAY_MS: u64 = 1_000;
/// Throughput hint for the retry layer's rate limiting.
const RPC_COMPUTE_UNITS_PER_SECOND: u64 = 330;

#[derive(Clone)]
pub struct ChainClients {
    pub public: DynProvider,
    /// Present when the registry was constructed with a private key.
    pub wallet: Option<DynProvider>,
}

pub struct ClientRegistry {
    signer: Option<PrivateKeySigner>,
    clients: RwLock<HashMap<u64, ChainClients>>,
}

impl ClientRegistry {
    pub fn new(signer: Option<PrivateKeySigner>) -> Self {
        Self {
            signer,
            clients: RwLock::new(HashMap::new()),
        }
    }

    /// The filler's own address, when a key is configured.
    pub fn signer_address(&self) -> Option<Address> {
        self.signer.as_ref().map(|signer| signer.address())
    }

    /// Returns the clients for a chain, constructing them on first access.
    pub fn get(&self, chain: &ChainConfig) -> anyhow::Result<ChainClients> {
        if let Some(clients) = self.clients.read().unwrap().get(&chain.chain_id) {
            return Ok(clients.clone());
        }

        // Built outside the lock; a concurrent first access for the same
        // chain wastes one construction, the map keeps the first insert.
        let built = self.build(chain)?;
        let mut clients = self.clients.write().unwrap();
        Ok(clients
            .entry(chain.chain_id)
            .or_insert(built)
            .clone())
    }

    fn build(&self, chain: &ChainConfig) -> anyhow::Result<ChainClients> {
        let http = reqwest::Client::builder()
            .timeout(RPC_TIMEOUT)
            .build()
            .context("failed to build http client")?;

        let rpc_client = |url| {
            RpcClient::builder()
                .layer(RetryBackoffLayer::new(
                    RPC_RETRIES,
                    RPC_RETRY_DELAY_MS,
                    RPC_COMPUTE_UNITS_PER_SECOND,
                ))
                .transport(Http::with_client(http.clone(), url), false)
        };

        let public = ProviderBuilder::new()
            .connect_client(rpc_client(chain.rpc_url.clone()))
            .erased();

        let wallet = self
            .signer
            .as_ref()
            .map(|signer| {
                ProviderBuilder::new()
                    .wallet(EthereumWallet::from(signer.clone()))
                    .connect_client(rpc_client(chain.rpc_url.clone()))
                    .erased()
            });

        Ok(ChainClients { public, wallet })
    }
}
