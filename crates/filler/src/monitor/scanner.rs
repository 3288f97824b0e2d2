//! Per-chain block scanner: reads `OrderPlaced` logs in bounded ranges,
//! reconstructs complete orders (pulling the event-omitted fields out of the
//! originating `placeOrder` calldata) and publishes them.

use {
    crate::{
        domain::{Order, OrderOutput, Predispatch, TokenAmount, eth::{B256, Bytes}},
        events::{Events, FillerEvent},
        metrics::Metrics,
    },
    alloy::{
        consensus::Transaction as _,
        primitives::{Address, keccak256},
        providers::{DynProvider, Provider},
        rpc::types::{Filter, Log},
        sol_types::{SolCall, SolEvent},
    },
    anyhow::Context,
    async_trait::async_trait,
    chain::ChainTag,
    contracts::IIntentGateway,
    std::{collections::HashMap, sync::Arc},
};

/// Upper bound on the number of blocks requested in one log query. Catch-up
/// after downtime proceeds in chunks of this size, one per tick.
pub const MAX_BLOCK_RANGE: u64 = 1_000;

/// The chain reads a scanner performs. Production goes through
/// [`RpcReader`]; tests substitute a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn block_number(&self) -> anyhow::Result<u64>;

    async fn order_placed_logs(&self, from: u64, to: u64) -> anyhow::Result<Vec<Log>>;

    /// Calldata of the transaction, for recovering order fields the event
    /// does not carry.
    async fn transaction_input(&self, transaction: B256) -> anyhow::Result<Bytes>;
}

pub struct RpcReader {
    provider: DynProvider,
    gateway: Address,
}

impl RpcReader {
    pub fn new(provider: DynProvider, gateway: Address) -> Self {
        Self { provider, gateway }
    }
}

#[async_trait]
impl ChainReader for RpcReader {
    async fn block_number(&self) -> anyhow::Result<u64> {
        self.provider
            .get_block_number()
            .await
            .context("get_block_number")
    }

    async fn order_placed_logs(&self, from: u64, to: u64) -> anyhow::Result<Vec<Log>> {
        let filter = Filter::new()
            .address(self.gateway)
            .event_signature(IIntentGateway::OrderPlaced::SIGNATURE_HASH)
            .from_block(from)
            .to_block(to);
        self.provider.get_logs(&filter).await.context("get_logs")
    }

    async fn transaction_input(&self, transaction: B256) -> anyhow::Result<Bytes> {
        let transaction = self
            .provider
            .get_transaction_by_hash(transaction)
            .await
            .context("get_transaction_by_hash")?
            .context("transaction not found")?;
        Ok(transaction.input().clone())
    }
}

struct ScanState {
    /// `None` until the first tick initializes it to `current - 1`.
    last_scanned: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
enum ReconstructError {
    #[error("destination topic {0} is not a configured chain")]
    UnknownDestination(B256),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub struct Scanner {
    chain: ChainTag,
    reader: Arc<dyn ChainReader>,
    /// Serializes scans per chain. Ticks `try_lock` it, so a scan stalled on
    /// a slow RPC makes later ticks no-ops instead of piling up.
    state: tokio::sync::Mutex<ScanState>,
    /// Destination chains are indexed as dynamic bytes, so the log only
    /// carries the keccak of the tag. Resolved against the configured set.
    known_chains: HashMap<B256, ChainTag>,
    /// keccak of this scanner's own tag, for sanity-checking the source
    /// topic.
    own_topic: B256,
}

impl Scanner {
    pub fn new(
        chain: ChainTag,
        reader: Arc<dyn ChainReader>,
        known_chains: impl IntoIterator<Item = ChainTag>,
    ) -> Self {
        Self {
            chain,
            reader,
            state: tokio::sync::Mutex::new(ScanState { last_scanned: None }),
            known_chains: known_chains
                .into_iter()
                .map(|tag| (keccak256(tag.wire_bytes()), tag))
                .collect(),
            own_topic: keccak256(chain.wire_bytes()),
        }
    }

    pub fn chain(&self) -> ChainTag {
        self.chain
    }

    /// One timer tick. Skips immediately when a scan is already running.
    pub async fn tick(&self, events: &Events) {
        let Ok(mut state) = self.state.try_lock() else {
            tracing::trace!(chain = %self.chain, "scan in flight, skipping tick");
            return;
        };
        if let Err(err) = self.scan(&mut state, events).await {
            Metrics::get()
                .scan_errors
                .with_label_values(&[&self.chain.to_string()])
                .inc();
            tracing::warn!(chain = %self.chain, ?err, "scan failed, range will be retried");
        }
    }

    /// Waits for any in-flight scan to finish.
    pub async fn drain(&self) {
        let _ = self.state.lock().await;
    }

    async fn scan(&self, state: &mut ScanState, events: &Events) -> anyhow::Result<()> {
        let current = self.reader.block_number().await?;
        let last = match state.last_scanned {
            Some(last) => last,
            None => {
                let initial = current.saturating_sub(1);
                state.last_scanned = Some(initial);
                initial
            }
        };
        if current <= last {
            return Ok(());
        }
        let from = last + 1;
        let to = current.min(from + MAX_BLOCK_RANGE);

        let logs = self.reader.order_placed_logs(from, to).await?;
        for log in logs {
            // An order whose destination we don't serve is rejected at the
            // order level; it must not poison the range.
            let order = match self.reconstruct(&log).await {
                Ok(order) => order,
                Err(ReconstructError::UnknownDestination(topic)) => {
                    tracing::warn!(?topic, "order targets an unconfigured destination, skipping");
                    continue;
                }
                Err(ReconstructError::Other(err)) => return Err(err),
            };
            tracing::info!(
                commitment = %order.commitment,
                source = %order.source,
                dest = %order.dest,
                block = log.block_number,
                "observed new order"
            );
            Metrics::get().orders_seen.inc();
            events.publish(FillerEvent::NewOrder(Arc::new(order)));
        }

        // Acknowledged only after every log in the range was processed; on
        // error the same range is retried next tick.
        state.last_scanned = Some(to);
        Ok(())
    }

    async fn reconstruct(&self, log: &Log) -> Result<Order, ReconstructError> {
        let event = IIntentGateway::OrderPlaced::decode_log(&log.inner)
            .context("decode OrderPlaced")?
            .data;
        if event.sourceChain != self.own_topic {
            return Err(anyhow::anyhow!("source topic does not match the scanned chain").into());
        }
        let dest = self
            .known_chains
            .get(&event.destChain)
            .copied()
            .ok_or(ReconstructError::UnknownDestination(event.destChain))?;
        let transaction_hash = log.transaction_hash.context("log without transaction hash")?;

        // `output.beneficiary`, `output.call` and `predispatch.call` are not
        // in the event; decode them out of the placing call.
        let input = self.reader.transaction_input(transaction_hash).await?;
        let placed = IIntentGateway::placeOrderCall::abi_decode(&input)
            .context("decode placeOrder calldata")?;

        let predispatch_assets: Vec<TokenAmount> = event
            .predispatchAssets
            .iter()
            .map(from_sol_amount)
            .collect();
        let predispatch_call = placed.order.predispatch.call.clone();
        let predispatch = (!predispatch_assets.is_empty() || !predispatch_call.is_empty())
            .then_some(Predispatch {
                assets: predispatch_assets,
                call: predispatch_call,
            });

        let mut order = Order {
            commitment: B256::ZERO,
            user: event.user,
            source: self.chain,
            dest,
            deadline: event.deadline,
            nonce: event.nonce,
            fees: event.fees,
            session: event.session,
            predispatch,
            inputs: event.inputs.iter().map(from_sol_amount).collect(),
            output: OrderOutput {
                beneficiary: placed.order.output.beneficiary,
                assets: event.outputs.iter().map(from_sol_amount).collect(),
                call: placed.order.output.call.clone(),
            },
            transaction_hash,
        };
        order.commitment = order.commitment();
        Ok(order)
    }
}

fn from_sol_amount(amount: &contracts::TokenAmount) -> TokenAmount {
    TokenAmount {
        token: amount.token,
        amount: amount.amount,
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        mockall::{Sequence, predicate::eq},
    };

    fn scanner(reader: MockChainReader) -> Scanner {
        Scanner::new(
            ChainTag::Evm(97),
            Arc::new(reader),
            [ChainTag::Evm(97), ChainTag::Evm(80002)],
        )
    }

    #[tokio::test]
    async fn catches_up_in_bounded_ranges_without_gaps() {
        // last_scanned = 100, current = 2100: the first scan takes
        // [101, 1101], the second [1102, 2100].
        let mut reader = MockChainReader::new();
        let mut seq = Sequence::new();
        reader
            .expect_block_number()
            .times(2)
            .returning(|| Ok(2_100));
        reader
            .expect_order_placed_logs()
            .with(eq(101), eq(1_101))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(vec![]));
        reader
            .expect_order_placed_logs()
            .with(eq(1_102), eq(2_100))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(vec![]));

        let scanner = scanner(reader);
        let events = Events::new();
        {
            let mut state = scanner.state.try_lock().unwrap();
            state.last_scanned = Some(100);
            scanner.scan(&mut state, &events).await.unwrap();
            assert_eq!(state.last_scanned, Some(1_101));
            scanner.scan(&mut state, &events).await.unwrap();
            assert_eq!(state.last_scanned, Some(2_100));
        }
    }

    #[tokio::test]
    async fn initializes_to_one_before_current() {
        let mut reader = MockChainReader::new();
        reader.expect_block_number().returning(|| Ok(500));
        reader
            .expect_order_placed_logs()
            .with(eq(500), eq(500))
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let scanner = scanner(reader);
        let events = Events::new();
        let mut state = scanner.state.try_lock().unwrap();
        scanner.scan(&mut state, &events).await.unwrap();
        assert_eq!(state.last_scanned, Some(500));
    }

    #[tokio::test]
    async fn does_not_advance_past_a_failing_range() {
        let mut reader = MockChainReader::new();
        reader.expect_block_number().returning(|| Ok(200));
        reader
            .expect_order_placed_logs()
            .returning(|_, _| Err(anyhow::anyhow!("rpc down")));

        let scanner = scanner(reader);
        let events = Events::new();
        let mut state = scanner.state.try_lock().unwrap();
        state.last_scanned = Some(100);
        assert!(scanner.scan(&mut state, &events).await.is_err());
        assert_eq!(state.last_scanned, Some(100));
    }

    #[tokio::test]
    async fn no_new_blocks_is_a_no_op() {
        let mut reader = MockChainReader::new();
        reader.expect_block_number().returning(|| Ok(100));
        // No get_logs expectation: requesting logs would fail the test.

        let scanner = scanner(reader);
        let events = Events::new();
        let mut state = scanner.state.try_lock().unwrap();
        state.last_scanned = Some(100);
        scanner.scan(&mut state, &events).await.unwrap();
        assert_eq!(state.last_scanned, Some(100));
    }

    #[tokio::test]
    async fn tick_skips_while_a_scan_holds_the_lock() {
        let reader = MockChainReader::new();
        // No expectations at all: any read during the skipped tick panics.
        let scanner = scanner(reader);
        let events = Events::new();
        let _held = scanner.state.try_lock().unwrap();
        scanner.tick(&events).await;
    }

    mod reconstruction {
        use {
            super::*,
            crate::{domain::eth::U256, events::FillerEvent},
            alloy::sol_types::SolEvent,
        };

        const GATEWAY: Address = Address::repeat_byte(0x6a);

        fn sol_amount(token: u8, amount: u64) -> contracts::TokenAmount {
            contracts::TokenAmount {
                token: B256::repeat_byte(token),
                amount: U256::from(amount),
            }
        }

        /// The order as the user placed it: this is what the gateway call
        /// carried and what the event partially mirrors.
        fn placed_order() -> contracts::Order {
            contracts::Order {
                user: B256::repeat_byte(0x11),
                sourceChain: b"EVM-97".to_vec().into(),
                destChain: b"EVM-80002".to_vec().into(),
                deadline: U256::from(1_000_000u64),
                nonce: U256::from(7u64),
                fees: U256::from(1_000_000_000_000_000_000u128),
                session: B256::ZERO,
                inputs: vec![sol_amount(0x41, 1_000_000)],
                output: contracts::OrderOutput {
                    beneficiary: B256::repeat_byte(0x22),
                    assets: vec![sol_amount(0x42, 994_000)],
                    call: vec![0xca, 0x11].into(),
                },
                predispatch: contracts::Predispatch {
                    assets: vec![],
                    call: vec![0xfe, 0xed].into(),
                },
            }
        }

        fn placed_log(tx_hash: B256) -> Log {
            let order = placed_order();
            let event = IIntentGateway::OrderPlaced {
                user: order.user,
                sourceChain: keccak256(b"EVM-97"),
                destChain: keccak256(b"EVM-80002"),
                deadline: order.deadline,
                nonce: order.nonce,
                fees: order.fees,
                session: order.session,
                inputs: order.inputs.clone(),
                outputs: order.output.assets.clone(),
                predispatchAssets: order.predispatch.assets.clone(),
            };
            Log {
                inner: alloy::primitives::Log {
                    address: GATEWAY,
                    data: event.encode_log_data(),
                },
                transaction_hash: Some(tx_hash),
                block_number: Some(120),
                ..Default::default()
            }
        }

        #[tokio::test]
        async fn recovers_calldata_only_fields_and_emits_the_order() {
            let tx_hash = B256::repeat_byte(0x55);
            let mut reader = MockChainReader::new();
            reader.expect_block_number().returning(|| Ok(120));
            reader
                .expect_order_placed_logs()
                .returning(move |_, _| Ok(vec![placed_log(tx_hash)]));
            reader
                .expect_transaction_input()
                .with(eq(tx_hash))
                .returning(|_| {
                    Ok(IIntentGateway::placeOrderCall {
                        order: placed_order(),
                    }
                    .abi_encode()
                    .into())
                });

            let scanner = scanner(reader);
            let events = Events::new();
            let mut receiver = events.subscribe();
            let mut state = scanner.state.try_lock().unwrap();
            state.last_scanned = Some(119);
            scanner.scan(&mut state, &events).await.unwrap();

            let FillerEvent::NewOrder(order) = receiver.try_recv().unwrap() else {
                panic!("expected a NewOrder event");
            };
            assert_eq!(order.source, ChainTag::Evm(97));
            assert_eq!(order.dest, ChainTag::Evm(80002));
            assert_eq!(order.user, B256::repeat_byte(0x11));
            assert_eq!(order.inputs.len(), 1);
            assert_eq!(order.inputs[0].amount, U256::from(1_000_000u64));
            assert_eq!(order.output.assets[0].amount, U256::from(994_000u64));
            // Fields only the calldata carries.
            assert_eq!(order.output.beneficiary, B256::repeat_byte(0x22));
            assert_eq!(order.output.call.as_ref(), &[0xca, 0x11]);
            let predispatch = order.predispatch.as_ref().unwrap();
            assert_eq!(predispatch.call.as_ref(), &[0xfe, 0xed]);
            assert!(predispatch.assets.is_empty());
            // The commitment is derived, not copied.
            assert_eq!(order.commitment, order.commitment());
            assert_eq!(order.transaction_hash, tx_hash);
        }

        #[tokio::test]
        async fn orders_to_unknown_destinations_are_skipped_not_retried() {
            let tx_hash = B256::repeat_byte(0x55);
            let mut reader = MockChainReader::new();
            reader.expect_block_number().returning(|| Ok(120));
            reader.expect_order_placed_logs().returning(move |_, _| {
                let mut log = placed_log(tx_hash);
                // Rewrite the destination topic to a chain we don't serve.
                let mut event = IIntentGateway::OrderPlaced::decode_log(&log.inner)
                    .unwrap()
                    .data;
                event.destChain = keccak256(b"EVM-1");
                log.inner.data = event.encode_log_data();
                Ok(vec![log])
            });
            // Reading the calldata for a skipped order would fail the test.

            let scanner = scanner(reader);
            let events = Events::new();
            let mut receiver = events.subscribe();
            let mut state = scanner.state.try_lock().unwrap();
            state.last_scanned = Some(119);
            scanner.scan(&mut state, &events).await.unwrap();
            // The order is dropped, the range is still acknowledged.
            assert!(receiver.try_recv().is_err());
            assert_eq!(state.last_scanned, Some(120));
        }

        #[tokio::test]
        async fn undecodable_calldata_fails_the_range_for_retry() {
            let tx_hash = B256::repeat_byte(0x55);
            let mut reader = MockChainReader::new();
            reader.expect_block_number().returning(|| Ok(120));
            reader
                .expect_order_placed_logs()
                .returning(move |_, _| Ok(vec![placed_log(tx_hash)]));
            reader
                .expect_transaction_input()
                .returning(|_| Ok(vec![0xde, 0xad].into()));

            let scanner = scanner(reader);
            let events = Events::new();
            let mut state = scanner.state.try_lock().unwrap();
            state.last_scanned = Some(119);
            assert!(scanner.scan(&mut state, &events).await.is_err());
            assert_eq!(state.last_scanned, Some(119));
        }
    }
}
