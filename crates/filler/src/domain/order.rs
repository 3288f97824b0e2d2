//! The order model: the unit of work flowing from the event monitor through
//! the scheduler into a strategy.

use {
    super::eth::{self, B256, Bytes, U256},
    alloy::primitives::keccak256,
    chain::ChainTag,
};

/// A token amount as carried by an order. The token is in its 32-byte
/// left-padded wire form; the all-zero value is the chain's native asset.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TokenAmount {
    pub token: B256,
    pub amount: U256,
}

/// The delivery the filler promises on the destination chain.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OrderOutput {
    pub beneficiary: B256,
    pub assets: Vec<TokenAmount>,
    /// Optional calldata executed on the beneficiary after the transfer.
    pub call: Bytes,
}

/// Extra assets and calldata executed on the destination before the fill.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Predispatch {
    pub assets: Vec<TokenAmount>,
    pub call: Bytes,
}

/// A cross-chain intent order.
///
/// `commitment` is the deterministic digest of all order content and the
/// primary key across chains, caches and the bid store. It must equal the
/// id reported on chain once set.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Order {
    pub commitment: B256,
    pub user: B256,
    pub source: ChainTag,
    pub dest: ChainTag,
    pub deadline: U256,
    pub nonce: U256,
    /// Relayer fees escrowed with the order, in the source chain's fee token.
    pub fees: U256,
    /// All-zero when the order is not bound to a session.
    pub session: B256,
    pub predispatch: Option<Predispatch>,
    pub inputs: Vec<TokenAmount>,
    pub output: OrderOutput,
    /// Hash of the transaction that emitted the `OrderPlaced` event. Not part
    /// of the commitment (it is provenance, not order content).
    pub transaction_hash: B256,
}

impl Order {
    /// Computes the canonical commitment digest: keccak over all order fields
    /// in fixed declaration order, with variable-length parts length-prefixed
    /// so field boundaries are unambiguous. Chains hash over their wire-form
    /// tag bytes (`EVM-<chainId>`), which keeps the digest computable from
    /// both the tag form and the numeric chain id.
    pub fn commitment(&self) -> B256 {
        let mut bytes = Vec::with_capacity(512);
        bytes.extend_from_slice(self.user.as_slice());
        encode_prefixed(&mut bytes, &self.source.wire_bytes());
        encode_prefixed(&mut bytes, &self.dest.wire_bytes());
        bytes.extend_from_slice(&self.deadline.to_be_bytes::<32>());
        bytes.extend_from_slice(&self.nonce.to_be_bytes::<32>());
        bytes.extend_from_slice(&self.fees.to_be_bytes::<32>());
        bytes.extend_from_slice(self.session.as_slice());
        encode_amounts(&mut bytes, &self.inputs);
        bytes.extend_from_slice(self.output.beneficiary.as_slice());
        encode_amounts(&mut bytes, &self.output.assets);
        encode_prefixed(&mut bytes, &self.output.call);
        let predispatch = self.predispatch.clone().unwrap_or_default();
        encode_amounts(&mut bytes, &predispatch.assets);
        encode_prefixed(&mut bytes, &predispatch.call);
        keccak256(&bytes)
    }

    /// Sum of output amounts payable in the destination's native asset.
    pub fn native_output_sum(&self) -> U256 {
        self.output
            .assets
            .iter()
            .filter(|asset| eth::is_native(&asset.token))
            .fold(U256::ZERO, |acc, asset| acc + asset.amount)
    }

    /// The order in the gateway's ABI form.
    pub fn to_sol(&self) -> contracts::Order {
        contracts::Order {
            user: self.user,
            sourceChain: self.source.wire_bytes().into(),
            destChain: self.dest.wire_bytes().into(),
            deadline: self.deadline,
            nonce: self.nonce,
            fees: self.fees,
            session: self.session,
            inputs: self.inputs.iter().map(TokenAmount::to_sol).collect(),
            output: contracts::OrderOutput {
                beneficiary: self.output.beneficiary,
                assets: self.output.assets.iter().map(TokenAmount::to_sol).collect(),
                call: self.output.call.clone(),
            },
            predispatch: match &self.predispatch {
                Some(predispatch) => contracts::Predispatch {
                    assets: predispatch.assets.iter().map(TokenAmount::to_sol).collect(),
                    call: predispatch.call.clone(),
                },
                None => contracts::Predispatch::default(),
            },
        }
    }
}

/// An output amount the filler has decided to deliver for one leg of an
/// order, sized during profitability evaluation and consumed at execution.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlannedOutput {
    pub token: B256,
    pub amount: U256,
    pub decimals: u8,
}

impl TokenAmount {
    pub fn to_sol(&self) -> contracts::TokenAmount {
        contracts::TokenAmount {
            token: self.token,
            amount: self.amount,
        }
    }
}

fn encode_prefixed(buffer: &mut Vec<u8>, data: &[u8]) {
    buffer.extend_from_slice(&(data.len() as u64).to_be_bytes());
    buffer.extend_from_slice(data);
}

fn encode_amounts(buffer: &mut Vec<u8>, amounts: &[TokenAmount]) {
    buffer.extend_from_slice(&(amounts.len() as u64).to_be_bytes());
    for amount in amounts {
        buffer.extend_from_slice(amount.token.as_slice());
        buffer.extend_from_slice(&amount.amount.to_be_bytes::<32>());
    }
}
