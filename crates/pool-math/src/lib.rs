//! Math engine for constant function market maker pools: invariants of
//! weighted and stable pools, spot prices, the price impact of joins and
//! exits, and the value of a pool's reserves.

#[cfg(test)]
macro_rules! bfp {
    ($s:expr) => {
        $s.parse::<$crate::math::fixed_point::Bfp>().unwrap()
    };
}
#[cfg(test)]
pub(crate) use bfp;

pub mod calculator;
pub mod conversions;
mod error;
pub mod liquidity;
pub mod math;
pub mod pool;
pub mod price_impact;
pub mod scaling;

pub use {
    calculator::{Calculator, ConvergencePolicy, Policy},
    error::Error,
    math::{Rounding, fixed_point::Bfp},
    pool::{PoolSnapshot, PoolType, TokenInfo},
    price_impact::{Mode, PriceImpact},
};
