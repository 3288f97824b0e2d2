//! Fill strategies.
//!
//! A strategy answers three questions about an order: can it be filled at
//! all, how profitable is it, and how is it executed. The set is closed, so
//! dispatch goes through an enum instead of trait objects; the scheduler
//! evaluates every variant and executes the most profitable one.

pub mod managed_asset;
pub mod same_token;

pub use self::{managed_asset::ManagedAssetStrategy, same_token::SameTokenStrategy};

use {
    crate::{
        coordinator::Coordinator,
        domain::{Execution, Order, eth::B256},
        onchain::{BidError, ExecuteError, OnchainError},
    },
    rust_decimal::Decimal,
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("the bid path requires a coordinator")]
    CoordinatorRequired,
    /// Profitability evaluation caches the planned outputs; executing
    /// without them is a sequencing bug.
    #[error("no planned outputs cached for {0}")]
    PlanMissing(B256),
    #[error(transparent)]
    Bid(#[from] BidError),
    #[error(transparent)]
    Execute(#[from] ExecuteError),
    #[error(transparent)]
    Onchain(#[from] OnchainError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// The closed set of strategies the scheduler evaluates.
#[derive(Clone)]
pub enum Strategy {
    SameToken(SameTokenStrategy),
    ManagedAsset(ManagedAssetStrategy),
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SameToken(_) => "same-token",
            Self::ManagedAsset(_) => "managed-asset",
        }
    }

    /// Whether the strategy understands the order's shape at all.
    pub async fn can_fill(&self, order: &Order) -> bool {
        match self {
            Self::SameToken(strategy) => strategy.can_fill(order).await,
            Self::ManagedAsset(strategy) => strategy.can_fill(order).await,
        }
    }

    /// Expected profit in USD-style units; zero means "skip". Internal
    /// failures evaluate to zero rather than propagating.
    pub async fn calculate_profitability(&self, order: &Order) -> Decimal {
        match self {
            Self::SameToken(strategy) => strategy.calculate_profitability(order).await,
            Self::ManagedAsset(strategy) => strategy.calculate_profitability(order).await,
        }
    }

    pub async fn execute_order(
        &self,
        order: &Order,
        coordinator: Option<&dyn Coordinator>,
    ) -> Result<Execution, StrategyError> {
        match self {
            Self::SameToken(strategy) => strategy.execute_order(order, coordinator).await,
            Self::ManagedAsset(strategy) => strategy.execute_order(order, coordinator).await,
        }
    }
}
