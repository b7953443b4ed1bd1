//! Price impact of joins and exits: how far the BPT of an operation deviates
//! from a fee-less operation of the same value at the pool's current prices.

use {
    crate::{
        Error,
        conversions::{U256Ext as _, big_rational_to_big_decimal},
        math::{Rounding, fixed_point::Bfp, stable_math, weighted_math},
        pool::{Invariant, Pool},
        scaling,
    },
    bigdecimal::BigDecimal,
    num::{BigRational, One as _},
    serde_with::{DeserializeFromStr, SerializeDisplay},
    std::{fmt, str::FromStr},
};

/// Price impact as a signed ratio. Zero means no impact and positive values
/// mean that the caller receives less value than in a proportional operation.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr,
)]
pub struct PriceImpact(BigDecimal);

impl PriceImpact {
    /// Fractional digits of the ratio.
    pub const SCALE: i64 = 18;

    pub fn zero() -> Self {
        Self::default()
    }

    fn from_ratio(ratio: &BigRational) -> Self {
        Self(big_rational_to_big_decimal(ratio, Self::SCALE))
    }

    pub fn value(&self) -> &BigDecimal {
        &self.0
    }

    /// Non-negative impact for display.
    pub fn magnitude(&self) -> BigDecimal {
        self.0.abs()
    }

    /// Whether the impact reaches `threshold`, a policy value of the caller
    /// (see [`scaling::DEFAULT_HIGH_PRICE_IMPACT`]).
    pub fn is_high(&self, threshold: &BigDecimal) -> bool {
        &self.0 >= threshold
    }
}

impl fmt::Display for PriceImpact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.normalized(), f)
    }
}

impl FromStr for PriceImpact {
    type Err = bigdecimal::ParseBigDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Kind of pool operation whose impact gets measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Deposit of exactly the given amounts.
    Join,
    /// Withdrawal of exactly the given amounts.
    ExitExactOut,
    /// Burn of `bpt_in` for a proportional share of every token.
    ExitProportional { bpt_in: Bfp },
    /// Burn of `bpt_in` for a single token.
    ExitSingleAsset { token_index: usize, bpt_in: Bfp },
}

/// Computes the price impact of an operation on `pool`.
///
/// `amounts` are upscaled token amounts and are only read for [`Mode::Join`]
/// and [`Mode::ExitExactOut`]. The other modes derive the token amounts from
/// their BPT amount first, since the baseline is denominated in tokens.
pub fn price_impact(pool: &Pool, amounts: &[Bfp], mode: Mode) -> Result<PriceImpact, Error> {
    let (actual, amounts) = match mode {
        Mode::Join => (bpt_out(pool, amounts)?, amounts.to_vec()),
        Mode::ExitExactOut => (bpt_in(pool, amounts)?, amounts.to_vec()),
        Mode::ExitProportional { bpt_in } => {
            let amounts = weighted_math::calc_tokens_out_given_exact_bpt_in(
                &pool.balances,
                bpt_in,
                pool.total_supply,
            )?;
            (bpt_in, amounts)
        }
        Mode::ExitSingleAsset {
            token_index,
            bpt_in,
        } => {
            let mut amounts = vec![Bfp::zero(); pool.balances.len()];
            amounts[token_index] = token_out(pool, token_index, bpt_in)?;
            (bpt_in, amounts)
        }
    };

    let baseline = bpt_for_tokens_zero_price_impact(pool, &amounts)?;
    if baseline.is_zero() {
        return Ok(PriceImpact::zero());
    }
    let ratio = actual.as_uint256().to_big_rational() / baseline.as_uint256().to_big_rational();
    let impact = match mode {
        Mode::Join => BigRational::one() - ratio,
        _ => ratio - BigRational::one(),
    };
    tracing::trace!(?mode, %actual, %baseline, "price impact");
    Ok(PriceImpact::from_ratio(&impact))
}

pub(crate) fn bpt_out(pool: &Pool, amounts_in: &[Bfp]) -> Result<Bfp, Error> {
    check_amounts(pool, amounts_in)?;
    let bpt_out = match &pool.invariant {
        Invariant::Weighted { weights } => weighted_math::calc_bpt_out_given_exact_tokens_in(
            &pool.balances,
            weights,
            amounts_in,
            pool.total_supply,
            pool.swap_fee,
            Rounding::Down,
        )?,
        Invariant::Stable { amplification } => stable_math::calc_bpt_out_given_exact_tokens_in(
            *amplification,
            &pool.balances,
            amounts_in,
            pool.total_supply,
            pool.swap_fee,
            Rounding::Down,
        )?,
    };
    Ok(bpt_out)
}

pub(crate) fn bpt_in(pool: &Pool, amounts_out: &[Bfp]) -> Result<Bfp, Error> {
    check_amounts(pool, amounts_out)?;
    let bpt_in = match &pool.invariant {
        Invariant::Weighted { weights } => weighted_math::calc_bpt_in_given_exact_tokens_out(
            &pool.balances,
            weights,
            amounts_out,
            pool.total_supply,
            pool.swap_fee,
            Rounding::Up,
        )?,
        Invariant::Stable { amplification } => stable_math::calc_bpt_in_given_exact_tokens_out(
            *amplification,
            &pool.balances,
            amounts_out,
            pool.total_supply,
            pool.swap_fee,
            Rounding::Up,
        )?,
    };
    Ok(bpt_in)
}

pub(crate) fn token_out(pool: &Pool, token_index: usize, bpt_in: Bfp) -> Result<Bfp, Error> {
    if token_index >= pool.balances.len() {
        return Err(Error::InvalidTokenIndex(token_index));
    }
    let amount = match &pool.invariant {
        Invariant::Weighted { weights } => weighted_math::calc_token_out_given_exact_bpt_in(
            pool.balances[token_index],
            weights[token_index],
            bpt_in,
            pool.total_supply,
            pool.swap_fee,
            Rounding::Down,
        )?,
        Invariant::Stable { amplification } => stable_math::calc_token_out_given_exact_bpt_in(
            *amplification,
            &pool.balances,
            token_index,
            bpt_in,
            pool.total_supply,
            pool.swap_fee,
            Rounding::Down,
        )?,
    };
    Ok(amount)
}

fn check_amounts(pool: &Pool, amounts: &[Bfp]) -> Result<(), Error> {
    if amounts.len() != pool.balances.len() {
        return Err(Error::InvalidAmount(format!(
            "{} amounts for {} tokens",
            amounts.len(),
            pool.balances.len()
        )));
    }
    Ok(())
}

/// BPT a fee-less, proportional operation worth `amounts` would yield.
fn bpt_for_tokens_zero_price_impact(pool: &Pool, amounts: &[Bfp]) -> Result<Bfp, Error> {
    let baseline = match &pool.invariant {
        Invariant::Weighted { weights } => weighted_math::bpt_for_tokens_zero_price_impact(
            &pool.balances,
            weights,
            amounts,
            pool.total_supply,
        )?,
        Invariant::Stable { amplification } => {
            // The stable baseline works on balances and amounts in the tokens'
            // native decimals. Price rates stay applied to both so that they
            // are measured in the same unit as the invariant.
            let decimals = pool.decimals();
            let balances = pool
                .balances
                .iter()
                .zip(&decimals)
                .map(|(balance, decimals)| scaling::downscale(*balance, *decimals))
                .collect::<Result<Vec<_>, _>>()?;
            let amounts = amounts
                .iter()
                .zip(&decimals)
                .map(|(amount, decimals)| scaling::downscale(*amount, *decimals))
                .collect::<Result<Vec<_>, _>>()?;
            stable_math::bpt_for_tokens_zero_price_impact(
                &balances,
                &decimals,
                &amounts,
                pool.total_supply,
                *amplification,
            )?
        }
    };
    Ok(baseline)
}
