//! The contract interaction layer: everything the filler reads from or
//! writes to chains goes through the [`Onchain`] trait. The production
//! implementation is [`Ethereum`]; tests mock the trait at this seam.

pub mod userop;

use {
    crate::{
        cache::FillerCache,
        config::{ChainConfig, ChainSet},
        domain::{
            Execution,
            Order,
            TokenAmount,
            eth::{
                self,
                Address,
                B256,
                Bytes,
                ExecutionId,
                FeeToken,
                GasEstimate,
                U256,
            },
        },
        registry::ClientRegistry,
    },
    alloy::{
        primitives::keccak256,
        providers::{DynProvider, Provider},
        rpc::types::TransactionRequest,
        sol_types::{SolCall, SolValue},
    },
    anyhow::Context,
    async_trait::async_trait,
    chain::ChainTag,
    contracts::{IERC20, IERC7821, IEntryPoint, IHost, IIntentGateway},
    itertools::Itertools,
    rust_decimal::Decimal,
    std::{collections::HashMap, sync::Arc},
    thiserror::Error,
};

/// Native-asset decimal count; also the best-effort fallback when a token's
/// `decimals()` read fails.
const NATIVE_DECIMALS: u8 = 18;

/// Stand-in gas limits of the user-op verification phases; the bundler
/// re-estimates before inclusion.
const VERIFICATION_GAS_LIMIT: u64 = 500_000;
const PRE_VERIFICATION_GAS: u64 = 100_000;

/// Multiplier applied to the gas price of approval transactions to reduce
/// the risk of underpriced submissions.
const APPROVAL_GAS_PREMIUM_PERCENT: u64 = 120;

/// ERC-7821 mode for a plain batch of calls.
const BATCH_EXECUTION_MODE: [u8; 32] = {
    let mut mode = [0u8; 32];
    mode[0] = 0x01;
    mode
};

#[derive(Debug, Error)]
pub enum OnchainError {
    #[error("chain {0} is not configured")]
    UnknownChain(ChainTag),
    #[error("no wallet configured")]
    NoWallet,
    #[error("token is not a left-padded address")]
    BadToken(#[from] eth::BadAddressShape),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ValueError {
    #[error("unsupported token {token} on {chain} in valuation")]
    UnsupportedToken { chain: ChainTag, token: B256 },
    #[error("amount out of range: {0}")]
    Conversion(#[from] number::ConversionError),
    #[error(transparent)]
    Onchain(#[from] OnchainError),
}

#[derive(Debug, Error)]
pub enum BidError {
    /// Profitability evaluation must run (and cache an estimate) before a
    /// bid can be prepared.
    #[error("no gas estimate cached for {0}")]
    EstimateMissing(B256),
    #[error("chain {0} has no entry point configured")]
    NoEntryPoint(ChainTag),
    #[error(transparent)]
    Onchain(#[from] OnchainError),
}

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("fill transaction failed: {0}")]
    Failed(String),
    #[error(transparent)]
    Onchain(#[from] OnchainError),
}

/// A bid ready for coordinator submission.
#[derive(Clone, Debug)]
pub struct PreparedBid {
    pub commitment: B256,
    pub user_op: Bytes,
}

/// External gas-price source consulted for designated chains; the RPC's own
/// `eth_gasPrice` is the fallback.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GasPriceOracle: Send + Sync {
    fn covers(&self, chain: ChainTag) -> bool;
    async fn gas_price(&self, chain: ChainTag) -> anyhow::Result<U256>;
}

/// Chain access as the rest of the filler sees it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Onchain: Send + Sync {
    /// Decimals of a token on a chain. Best effort: the all-zero token is
    /// the native asset (18), and read failures fall back to 18 with a
    /// warning.
    async fn token_decimals(&self, chain: ChainTag, token: B256) -> u8;

    async fn fee_token(&self, chain: ChainTag) -> Result<FeeToken, OnchainError>;

    /// USD value of an order. Only USDC/USDT legs are priced (stable peg
    /// assumed); any other token yields `UnsupportedToken`.
    async fn usd_value(&self, order: &Order) -> Result<Decimal, ValueError>;

    /// Read-through gas estimate for filling the order. Live estimation
    /// failures fall back to a conservative constant; successful estimates
    /// are cached by commitment.
    async fn estimate_gas(&self, order: &Order) -> GasEstimate;

    /// Ensures the destination gateway is approved for every ERC-20 the
    /// fill will transfer. A no-op for tokens whose allowance already
    /// covers the required amount.
    async fn approve_tokens_if_needed(&self, order: &Order) -> Result<(), OnchainError>;

    async fn allowance(
        &self,
        chain: ChainTag,
        token: Address,
        spender: Address,
    ) -> Result<U256, OnchainError>;

    /// The filler wallet's balance of a token.
    async fn balance_of(&self, chain: ChainTag, token: B256) -> Result<U256, OnchainError>;

    /// Number of confirmations the transaction has on the chain; 0 while
    /// unmined.
    async fn confirmations(&self, chain: ChainTag, transaction: B256)
    -> Result<u64, OnchainError>;

    /// Reads the chain's solver-selection flag and refreshes the cache.
    async fn solver_selection(&self, chain: ChainTag) -> Result<bool, OnchainError>;

    /// Whether the order's commitment is already marked filled on the
    /// destination gateway.
    async fn order_filled(&self, order: &Order) -> Result<bool, OnchainError>;

    /// Builds and encodes the bid user operation for a plain fill.
    async fn prepare_bid(&self, order: &Order) -> Result<PreparedBid, BidError>;

    /// Builds and encodes the bid user operation for an ERC-7821 batch.
    async fn prepare_batch_bid(
        &self,
        order: &Order,
        calls: Vec<contracts::Call>,
    ) -> Result<PreparedBid, BidError>;

    /// Direct `fillOrder` on the destination gateway, retried once without
    /// the explicit gas override, awaited at one confirmation.
    async fn fill_order_direct(
        &self,
        order: &Order,
        outputs: Vec<TokenAmount>,
    ) -> Result<Execution, ExecuteError>;
}

pub struct Ethereum {
    registry: Arc<ClientRegistry>,
    cache: Arc<FillerCache>,
    chains: ChainSet,
    gas_oracle: Option<Arc<dyn GasPriceOracle>>,
    gas_fallback: u64,
    filled_slot: U256,
}

impl Ethereum {
    /// Constructs the layer and warms the cache: fee token and decimals for
    /// every configured chain, stable-token decimals, and the per-byte fee
    /// for every ordered chain pair. Sweeps reset these lazily; later reads
    /// re-populate.
    pub async fn new(
        registry: Arc<ClientRegistry>,
        cache: Arc<FillerCache>,
        chains: ChainSet,
        gas_oracle: Option<Arc<dyn GasPriceOracle>>,
        gas_fallback: u64,
        filled_slot: u64,
    ) -> Self {
        let this = Self {
            registry,
            cache,
            chains,
            gas_oracle,
            gas_fallback,
            filled_slot: U256::from(filled_slot),
        };
        this.warm_cache().await;
        this
    }

    async fn warm_cache(&self) {
        for config in self.chains.iter() {
            let tag = config.tag();
            if let Err(err) = self.fee_token(tag).await {
                tracing::warn!(chain = %tag, ?err, "failed to warm fee token");
            }
            if let Err(err) = self.solver_selection(tag).await {
                tracing::warn!(chain = %tag, ?err, "failed to warm solver-selection flag");
            }
            for stable in [config.usdc, config.usdt] {
                self.token_decimals(tag, eth::to_bytes32(stable)).await;
            }
        }
        for (source, dest) in self
            .chains
            .tags()
            .cartesian_product(self.chains.tags().collect::<Vec<_>>())
        {
            if source == dest {
                continue;
            }
            if let Err(err) = self.per_byte_fee(source, dest).await {
                tracing::warn!(%source, %dest, ?err, "failed to warm per-byte fee");
            }
        }
    }

    fn config(&self, chain: ChainTag) -> Result<&ChainConfig, OnchainError> {
        self.chains
            .get(&chain)
            .ok_or(OnchainError::UnknownChain(chain))
    }

    fn provider(&self, chain: ChainTag) -> Result<DynProvider, OnchainError> {
        let config = self.config(chain)?;
        Ok(self.registry.get(config)?.public)
    }

    fn wallet(&self, chain: ChainTag) -> Result<DynProvider, OnchainError> {
        let config = self.config(chain)?;
        self.registry
            .get(config)?
            .wallet
            .ok_or(OnchainError::NoWallet)
    }

    fn signer_address(&self) -> Result<Address, OnchainError> {
        self.registry.signer_address().ok_or(OnchainError::NoWallet)
    }

    /// Per-byte fee charged by `source`'s host for messages to `dest`,
    /// cached by the ordered pair.
    pub async fn per_byte_fee(
        &self,
        source: ChainTag,
        dest: ChainTag,
    ) -> Result<U256, OnchainError> {
        if let Some(fee) = self.cache.per_byte_fee(&source, &dest) {
            return Ok(fee);
        }
        let config = self.config(source)?;
        let host = IHost::new(config.host, self.provider(source)?);
        let fee = host
            .perByteFee(dest.wire_bytes().into())
            .call()
            .await
            .context("perByteFee")?;
        self.cache.set_per_byte_fee(source, dest, fee);
        Ok(fee)
    }

    async fn gas_price(&self, chain: ChainTag, provider: &DynProvider) -> u128 {
        if let Some(oracle) = &self.gas_oracle {
            if oracle.covers(chain) {
                match oracle.gas_price(chain).await {
                    Ok(price) => return price.to::<u128>(),
                    Err(err) => {
                        tracing::warn!(%chain, ?err, "gas oracle failed, falling back to rpc")
                    }
                }
            }
        }
        provider.get_gas_price().await.unwrap_or(1_000_000_000)
    }

    async fn approve_max(
        &self,
        chain: ChainTag,
        token: Address,
        spender: Address,
    ) -> Result<(), OnchainError> {
        let wallet = self.wallet(chain)?;
        let gas_price = self.gas_price(chain, &wallet).await;
        let bumped = gas_price * u128::from(APPROVAL_GAS_PREMIUM_PERCENT) / 100;
        let erc20 = IERC20::new(token, wallet);
        let receipt = erc20
            .approve(spender, U256::MAX)
            .gas_price(bumped)
            .send()
            .await
            .context("send approve")?
            .get_receipt()
            .await
            .context("approve receipt")?;
        tracing::debug!(
            %chain,
            %token,
            %spender,
            transaction = %receipt.transaction_hash,
            "approved gateway"
        );
        Ok(())
    }

    async fn try_estimate(&self, order: &Order) -> anyhow::Result<GasEstimate> {
        let dest = self.config(order.dest)?;
        let provider = self.provider(order.dest)?;
        let from = self.signer_address()?;

        let options = fill_options_with(U256::ZERO, U256::ZERO, &order.output.assets);
        let calldata = IIntentGateway::fillOrderCall {
            order: order.to_sol(),
            options,
        }
        .abi_encode();

        // The fill dispatches an acknowledgement back to the source; the
        // destination host charges per byte of the message body.
        let per_byte = self.per_byte_fee(order.dest, order.source).await?;
        let body_len = U256::from(order.to_sol().abi_encode().len());
        let dispatch_fee = per_byte * body_len;
        let dest_fee_token = self.fee_token(order.dest).await?;
        let native_dispatch_fee = if dest_fee_token.address == Address::ZERO {
            dispatch_fee
        } else {
            U256::ZERO
        };

        let tx = TransactionRequest::default()
            .from(from)
            .to(dest.gateway)
            .value(order.native_output_sum() + native_dispatch_fee)
            .input(Bytes::from(calldata).into());
        let gas = provider.estimate_gas(tx).await.context("estimate_gas")?;
        let fees = provider
            .estimate_eip1559_fees()
            .await
            .context("estimate_eip1559_fees")?;

        let gas_cost_native = U256::from(gas) * U256::from(fees.max_fee_per_gas);
        let source_fee_token = self.fee_token(order.source).await?;
        // Fee tokens are assumed at parity across chains; only the decimal
        // counts differ.
        let total_cost_in_fee_token = number::adjust_decimals(
            gas_cost_native,
            NATIVE_DECIMALS,
            source_fee_token.decimals,
        ) + number::adjust_decimals(
            dispatch_fee,
            dest_fee_token.decimals,
            source_fee_token.decimals,
        );

        Ok(GasEstimate {
            total_cost_in_fee_token: total_cost_in_fee_token.max(U256::from(1u64)),
            dispatch_fee,
            native_dispatch_fee,
            call_gas_limit: U256::from(gas),
            verification_gas_limit: U256::from(VERIFICATION_GAS_LIMIT),
            pre_verification_gas: U256::from(PRE_VERIFICATION_GAS),
            max_fee_per_gas: U256::from(fees.max_fee_per_gas),
            max_priority_fee_per_gas: U256::from(fees.max_priority_fee_per_gas),
        })
    }

    async fn fallback_estimate(&self, order: &Order) -> GasEstimate {
        let gas_price = match self.provider(order.dest) {
            Ok(provider) => self.gas_price(order.dest, &provider).await,
            Err(_) => 1_000_000_000,
        };
        let gas_cost_native = U256::from(self.gas_fallback) * U256::from(gas_price);
        let fee_decimals = self
            .cache
            .fee_token(&order.source)
            .map(|fee_token| fee_token.decimals)
            .unwrap_or(NATIVE_DECIMALS);
        GasEstimate {
            total_cost_in_fee_token: number::adjust_decimals(
                gas_cost_native,
                NATIVE_DECIMALS,
                fee_decimals,
            )
            .max(U256::from(1u64)),
            dispatch_fee: U256::ZERO,
            native_dispatch_fee: U256::ZERO,
            call_gas_limit: U256::from(self.gas_fallback),
            verification_gas_limit: U256::from(VERIFICATION_GAS_LIMIT),
            pre_verification_gas: U256::from(PRE_VERIFICATION_GAS),
            max_fee_per_gas: U256::from(gas_price),
            max_priority_fee_per_gas: U256::from(gas_price),
        }
    }

    async fn pack_user_op(
        &self,
        chain: ChainTag,
        call_data: Bytes,
        estimate: &GasEstimate,
    ) -> Result<Bytes, BidError> {
        let config = self.config(chain)?;
        let entry_point = config.entry_point.ok_or(BidError::NoEntryPoint(chain))?;
        let sender = self.signer_address()?;
        let nonce = IEntryPoint::new(entry_point, self.provider(chain)?)
            .getNonce(sender, alloy::primitives::aliases::U192::ZERO)
            .call()
            .await
            .context("getNonce")
            .map_err(OnchainError::from)?;
        let operation = userop::build(sender, nonce, call_data, estimate);
        Ok(userop::encode(&operation))
    }
}

#[async_trait]
impl Onchain for Ethereum {
    async fn token_decimals(&self, chain: ChainTag, token: B256) -> u8 {
        if eth::is_native(&token) {
            return NATIVE_DECIMALS;
        }
        if let Some(decimals) = self.cache.token_decimals(&chain, &token) {
            return decimals;
        }
        let read = async {
            let address = eth::to_bytes20(token)?;
            let provider = self.provider(chain)?;
            IERC20::new(address, provider)
                .decimals()
                .call()
                .await
                .context("decimals")
                .map_err(OnchainError::from)
        };
        match read.await {
            Ok(decimals) => {
                self.cache.set_token_decimals(chain, token, decimals);
                decimals
            }
            Err(err) => {
                tracing::warn!(%chain, %token, ?err, "decimals read failed, assuming 18");
                NATIVE_DECIMALS
            }
        }
    }

    async fn fee_token(&self, chain: ChainTag) -> Result<FeeToken, OnchainError> {
        if let Some(fee_token) = self.cache.fee_token(&chain) {
            return Ok(fee_token);
        }
        let config = self.config(chain)?;
        let provider = self.provider(chain)?;
        let address = IHost::new(config.host, provider.clone())
            .feeToken()
            .call()
            .await
            .context("feeToken")?;
        let decimals = if address == Address::ZERO {
            NATIVE_DECIMALS
        } else {
            IERC20::new(address, provider)
                .decimals()
                .call()
                .await
                .context("fee token decimals")?
        };
        let fee_token = FeeToken { address, decimals };
        self.cache.set_fee_token(chain, fee_token);
        self.cache
            .set_token_decimals(chain, eth::to_bytes32(address), decimals);
        Ok(fee_token)
    }

    async fn usd_value(&self, order: &Order) -> Result<Decimal, ValueError> {
        // Validate both sides; sum the escrowed (input) side.
        for asset in &order.output.assets {
            if self.chains.stable(&order.dest, &asset.token).is_none() {
                return Err(ValueError::UnsupportedToken {
                    chain: order.dest,
                    token: asset.token,
                });
            }
        }
        let mut total = Decimal::ZERO;
        for input in &order.inputs {
            if self.chains.stable(&order.source, &input.token).is_none() {
                return Err(ValueError::UnsupportedToken {
                    chain: order.source,
                    token: input.token,
                });
            }
            let decimals = self.token_decimals(order.source, input.token).await;
            total += number::to_decimal(input.amount, decimals)?;
        }
        Ok(total)
    }

    async fn estimate_gas(&self, order: &Order) -> GasEstimate {
        if let Some(estimate) = self.cache.gas_estimate(&order.commitment) {
            return estimate;
        }
        match self.try_estimate(order).await {
            Ok(estimate) => {
                if let Err(err) = self
                    .cache
                    .set_gas_estimate(order.commitment, estimate.clone())
                {
                    tracing::warn!(commitment = %order.commitment, ?err, "discarding estimate");
                }
                estimate
            }
            Err(err) => {
                tracing::warn!(
                    commitment = %order.commitment,
                    ?err,
                    "gas estimation failed, using conservative fallback"
                );
                self.fallback_estimate(order).await
            }
        }
    }

    async fn approve_tokens_if_needed(&self, order: &Order) -> Result<(), OnchainError> {
        let config = self.config(order.dest)?;

        // Deduplicated non-zero ERC-20 outputs plus the destination fee
        // token, with the total amount each needs to cover.
        let mut required = HashMap::<Address, U256>::new();
        for asset in &order.output.assets {
            if eth::is_native(&asset.token) || asset.amount.is_zero() {
                continue;
            }
            let address = eth::to_bytes20(asset.token)?;
            *required.entry(address).or_default() += asset.amount;
        }
        let fee_token = self.fee_token(order.dest).await?;
        if fee_token.address != Address::ZERO {
            let dispatch_fee = self
                .cache
                .gas_estimate(&order.commitment)
                .map(|estimate| estimate.dispatch_fee)
                .unwrap_or_default();
            *required.entry(fee_token.address).or_default() += dispatch_fee;
        }

        for (token, amount) in required {
            let current = self.allowance(order.dest, token, config.gateway).await?;
            if current >= amount {
                continue;
            }
            tracing::info!(chain = %order.dest, %token, "allowance below requirement, approving");
            self.approve_max(order.dest, token, config.gateway).await?;
        }
        Ok(())
    }

    async fn allowance(
        &self,
        chain: ChainTag,
        token: Address,
        spender: Address,
    ) -> Result<U256, OnchainError> {
        let owner = self.signer_address()?;
        let provider = self.provider(chain)?;
        Ok(IERC20::new(token, provider)
            .allowance(owner, spender)
            .call()
            .await
            .context("allowance")?)
    }

    async fn balance_of(&self, chain: ChainTag, token: B256) -> Result<U256, OnchainError> {
        let owner = self.signer_address()?;
        let provider = self.provider(chain)?;
        if eth::is_native(&token) {
            return Ok(provider
                .get_balance(owner)
                .await
                .context("get_balance")
                .map_err(OnchainError::from)?);
        }
        let address = eth::to_bytes20(token)?;
        Ok(IERC20::new(address, provider)
            .balanceOf(owner)
            .call()
            .await
            .context("balanceOf")?)
    }

    async fn confirmations(
        &self,
        chain: ChainTag,
        transaction: B256,
    ) -> Result<u64, OnchainError> {
        let provider = self.provider(chain)?;
        let receipt = provider
            .get_transaction_receipt(transaction)
            .await
            .context("get_transaction_receipt")?;
        let Some(mined_in) = receipt.and_then(|receipt| receipt.block_number) else {
            return Ok(0);
        };
        let current = provider
            .get_block_number()
            .await
            .context("get_block_number")?;
        Ok(current.saturating_sub(mined_in) + 1)
    }

    async fn solver_selection(&self, chain: ChainTag) -> Result<bool, OnchainError> {
        if let Some(enabled) = self.cache.solver_selection(&chain) {
            return Ok(enabled);
        }
        let config = self.config(chain)?;
        let enabled = IIntentGateway::new(config.gateway, self.provider(chain)?)
            .solverSelection()
            .call()
            .await
            .context("solverSelection")?;
        self.cache.set_solver_selection(chain, enabled);
        Ok(enabled)
    }

    async fn order_filled(&self, order: &Order) -> Result<bool, OnchainError> {
        let config = self.config(order.dest)?;
        let provider = self.provider(order.dest)?;
        // Mapping slot: keccak(commitment ++ slot index).
        let mut key = [0u8; 64];
        key[..32].copy_from_slice(order.commitment.as_slice());
        key[32..].copy_from_slice(&self.filled_slot.to_be_bytes::<32>());
        let slot = keccak256(key);
        let value = provider
            .get_storage_at(config.gateway, U256::from_be_bytes(slot.0))
            .await
            .context("get_storage_at")?;
        Ok(!value.is_zero())
    }

    async fn prepare_bid(&self, order: &Order) -> Result<PreparedBid, BidError> {
        let estimate = self
            .cache
            .gas_estimate(&order.commitment)
            .ok_or(BidError::EstimateMissing(order.commitment))?;
        let options = fill_options_with(
            estimate.dispatch_fee,
            estimate.native_dispatch_fee,
            &order.output.assets,
        );
        let calldata = IIntentGateway::fillOrderCall {
            order: order.to_sol(),
            options,
        }
        .abi_encode();
        let user_op = self
            .pack_user_op(order.dest, calldata.into(), &estimate)
            .await?;
        Ok(PreparedBid {
            commitment: order.commitment,
            user_op,
        })
    }

    async fn prepare_batch_bid(
        &self,
        order: &Order,
        calls: Vec<contracts::Call>,
    ) -> Result<PreparedBid, BidError> {
        let estimate = self
            .cache
            .gas_estimate(&order.commitment)
            .ok_or(BidError::EstimateMissing(order.commitment))?;
        let execution_data = calls.abi_encode();
        let calldata = IERC7821::executeCall {
            mode: B256::from(BATCH_EXECUTION_MODE),
            executionData: execution_data.into(),
        }
        .abi_encode();
        let user_op = self
            .pack_user_op(order.dest, calldata.into(), &estimate)
            .await?;
        Ok(PreparedBid {
            commitment: order.commitment,
            user_op,
        })
    }

    async fn fill_order_direct(
        &self,
        order: &Order,
        outputs: Vec<TokenAmount>,
    ) -> Result<Execution, ExecuteError> {
        let config = self.config(order.dest)?;
        let wallet = self.wallet(order.dest)?;
        let estimate = self.estimate_gas(order).await;
        let options = fill_options_with(
            estimate.dispatch_fee,
            estimate.native_dispatch_fee,
            &outputs,
        );
        let value = order.native_output_sum() + estimate.native_dispatch_fee;
        let gateway = IIntentGateway::new(config.gateway, wallet);
        let call = gateway.fillOrder(order.to_sol(), options).value(value);

        let with_gas = call
            .clone()
            .gas(estimate.call_gas_limit.to::<u64>())
            .max_fee_per_gas(estimate.max_fee_per_gas.to::<u128>())
            .max_priority_fee_per_gas(estimate.max_priority_fee_per_gas.to::<u128>());
        let pending = match with_gas.send().await {
            Ok(pending) => pending,
            Err(err) => {
                // One retry with the node's own gas defaults.
                tracing::warn!(
                    commitment = %order.commitment,
                    ?err,
                    "fill with explicit gas failed, retrying with node defaults"
                );
                call.send()
                    .await
                    .map_err(|err| ExecuteError::Failed(err.to_string()))?
            }
        };
        let receipt = pending
            .with_required_confirmations(1)
            .get_receipt()
            .await
            .map_err(|err| ExecuteError::Failed(err.to_string()))?;
        Ok(Execution {
            success: receipt.status(),
            id: ExecutionId::Transaction(receipt.transaction_hash),
        })
    }
}

/// Fill options from an estimate and the outputs the filler will deliver.
pub fn fill_options_with(
    dispatch_fee: U256,
    native_dispatch_fee: U256,
    outputs: &[TokenAmount],
) -> contracts::FillOptions {
    contracts::FillOptions {
        dispatchFee: dispatch_fee,
        nativeDispatchFee: native_dispatch_fee,
        outputs: outputs.iter().map(TokenAmount::to_sol).collect(),
    }
}
