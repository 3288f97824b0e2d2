//! Filler policy curves: piecewise-linear interpolation from a USD amount to
//! a policy value (required confirmations, basis points, managed-asset
//! price).
//!
//! Evaluation clamps to the end points outside the configured range; there is
//! no silent fallthrough to the last point. All arithmetic is done on
//! [`Decimal`] to keep repeated evaluations drift-free.

use {
    rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive},
    serde::{Deserialize, Serialize},
    thiserror::Error,
};

/// A single curve point as it appears in configuration.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PolicyPoint {
    pub amount: f64,
    pub value: f64,
}

/// A point of the managed-asset price curve.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PricePoint {
    pub amount: f64,
    pub price_usd: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum InvalidConfig {
    #[error("curve needs at least {required} points, got {got}")]
    NotEnoughPoints { required: usize, got: usize },
    #[error("curve amount is negative or not finite")]
    BadAmount,
    #[error("duplicate curve amount")]
    DuplicateAmount,
    #[error("integer curve value is negative or fractional")]
    BadIntegerValue,
    #[error("price curve value is not positive")]
    BadPrice,
}

#[derive(Clone, Debug)]
struct Point {
    amount: Decimal,
    value: Decimal,
}

/// Shared clamp-and-interpolate core.
#[derive(Clone, Debug)]
struct Curve {
    /// Sorted by `amount`, strictly increasing, non-empty.
    points: Vec<Point>,
}

impl Curve {
    fn new(points: Vec<Point>, required: usize) -> Result<Self, InvalidConfig> {
        if points.len() < required {
            return Err(InvalidConfig::NotEnoughPoints {
                required,
                got: points.len(),
            });
        }
        let mut points = points;
        points.sort_by(|a, b| a.amount.cmp(&b.amount));
        if points.windows(2).any(|pair| pair[0].amount == pair[1].amount) {
            return Err(InvalidConfig::DuplicateAmount);
        }
        Ok(Self { points })
    }

    fn value_at(&self, x: Decimal) -> Decimal {
        let first = self.points.first().expect("curve is non-empty");
        let last = self.points.last().expect("curve is non-empty");
        if x <= first.amount {
            return first.value;
        }
        if x >= last.amount {
            return last.value;
        }
        let bracket = self
            .points
            .windows(2)
            .find(|pair| pair[0].amount <= x && x <= pair[1].amount)
            .expect("x is inside the curve range");
        let (p1, p2) = (&bracket[0], &bracket[1]);
        p1.value + (x - p1.amount) / (p2.amount - p1.amount) * (p2.value - p1.value)
    }
}

fn decimal_amount(amount: f64) -> Result<Decimal, InvalidConfig> {
    let amount = Decimal::from_f64_retain(amount).ok_or(InvalidConfig::BadAmount)?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(InvalidConfig::BadAmount);
    }
    Ok(amount)
}

fn integer_points(points: &[PolicyPoint]) -> Result<Vec<Point>, InvalidConfig> {
    points
        .iter()
        .map(|point| {
            let value =
                Decimal::from_f64_retain(point.value).ok_or(InvalidConfig::BadIntegerValue)?;
            if value.is_sign_negative() && !value.is_zero() || value.fract() != Decimal::ZERO {
                return Err(InvalidConfig::BadIntegerValue);
            }
            Ok(Point {
                amount: decimal_amount(point.amount)?,
                value,
            })
        })
        .collect()
}

fn round_to_u64(value: Decimal) -> u64 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .to_u64()
        .unwrap_or(0)
}

/// Maps an order's USD value to the number of source-chain confirmations
/// required before execution.
#[derive(Clone, Debug)]
pub struct ConfirmationPolicy(Curve);

impl ConfirmationPolicy {
    pub fn new(points: &[PolicyPoint]) -> Result<Self, InvalidConfig> {
        Ok(Self(Curve::new(integer_points(points)?, 2)?))
    }

    pub fn confirmations(&self, usd: Decimal) -> u64 {
        round_to_u64(self.0.value_at(usd))
    }
}

/// Maps an order's USD value to the filler's fee margin in basis points.
#[derive(Clone, Debug)]
pub struct BpsPolicy(Curve);

impl BpsPolicy {
    pub fn new(points: &[PolicyPoint]) -> Result<Self, InvalidConfig> {
        Ok(Self(Curve::new(integer_points(points)?, 2)?))
    }

    pub fn bps(&self, usd: Decimal) -> u64 {
        round_to_u64(self.0.value_at(usd))
    }
}

/// Maps a USD amount to the managed asset's quoted price in USD.
#[derive(Clone, Debug)]
pub struct PricePolicy(Curve);

impl PricePolicy {
    pub fn new(points: &[PricePoint]) -> Result<Self, InvalidConfig> {
        let points = points
            .iter()
            .map(|point| {
                let price =
                    Decimal::from_f64_retain(point.price_usd).ok_or(InvalidConfig::BadPrice)?;
                if price <= Decimal::ZERO {
                    return Err(InvalidConfig::BadPrice);
                }
                Ok(Point {
                    amount: decimal_amount(point.amount)?,
                    value: price,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(Curve::new(points, 1)?))
    }

    pub fn price_usd(&self, usd: Decimal) -> Decimal {
        self.0.value_at(usd)
    }
}
