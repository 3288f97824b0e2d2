//! Ethereum-flavored primitives shared across the filler.

pub use alloy::primitives::{Address, B256, Bytes, U256};
use thiserror::Error;

/// The all-zero token address designates a chain's native asset.
pub fn is_native(token: &B256) -> bool {
    *token == B256::ZERO
}

/// Left-pads a 20-byte contract address into its 32-byte wire form.
pub fn to_bytes32(address: Address) -> B256 {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_slice());
    B256::from(word)
}

/// Recovers a 20-byte address from its 32-byte left-padded wire form.
///
/// Values that are not left-padded (any of the leading 12 bytes set) are not
/// addresses and are rejected.
pub fn to_bytes20(word: B256) -> Result<Address, BadAddressShape> {
    if word[..12].iter().any(|byte| *byte != 0) {
        return Err(BadAddressShape(word));
    }
    Ok(Address::from_slice(&word[12..]))
}

#[derive(Debug, Error, Eq, PartialEq)]
#[error("not a left-padded 20-byte address: {0}")]
pub struct BadAddressShape(pub B256);

/// The token dispatch and relayer fees are denominated in on a chain, as
/// reported by the host contract.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FeeToken {
    pub address: Address,
    pub decimals: u8,
}

/// A gas estimate for filling one order, cached by commitment. The gas
/// limits and fee caps parameterize the bid user operation; the total cost
/// feeds profitability.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GasEstimate {
    /// The filler's all-in execution cost, in the source chain's fee token.
    pub total_cost_in_fee_token: U256,
    /// Cross-chain dispatch fee, in the destination chain's fee token.
    pub dispatch_fee: U256,
    /// Portion of the dispatch fee payable in the destination's native
    /// asset (non-zero only where the fee token is native).
    pub native_dispatch_fee: U256,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

/// Identifies a finished execution. Direct fills settle in an EVM
/// transaction; bid submissions settle in a coordinator extrinsic.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ExecutionId {
    Transaction(B256),
    Extrinsic(String),
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Transaction(hash) => write!(f, "{hash}"),
            Self::Extrinsic(hash) => f.write_str(hash),
        }
    }
}

/// Outcome of executing an order. `success == false` is a soft failure: the
/// execution made it on chain but did not take effect (e.g. a reverted fill).
#[derive(Clone, Debug)]
pub struct Execution {
    pub success: bool,
    pub id: ExecutionId,
}
