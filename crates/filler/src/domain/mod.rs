pub mod eth;
pub mod order;

pub use self::{
    eth::{Execution, ExecutionId},
    order::{Order, OrderOutput, Predispatch, TokenAmount},
};

/// The two stable assets the filler is willing to price in USD. Stable-peg
/// (1 token unit = 1 USD) is assumed for valuation.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Stable {
    Usdc,
    Usdt,
}

impl Stable {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Usdc => "USDC",
            Self::Usdt => "USDT",
        }
    }
}

/// How a token classifies on a given chain for strategy purposes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AssetKind {
    Stable(Stable),
    Managed,
}
