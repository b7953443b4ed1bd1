//! Total value of a pool's reserves in a reference currency.

use {
    crate::{
        Error,
        calculator::ConvergencePolicy,
        conversions::U256Ext as _,
        math::{fixed_point::Bfp, spot_price},
        pool::{Invariant, Pool},
    },
    alloy_primitives::{Address, U256},
    bigdecimal::BigDecimal,
    num::Zero as _,
    std::collections::HashMap,
};

const SCALE: i64 = 18;

/// Values the pool's reserves at `prices`, keyed by token address.
///
/// Tokens without a price are accounted for by extrapolating from the priced
/// ones: by weight for weighted pools and by spot price against the first
/// priced token for stable pools. Without any price the liquidity is zero.
pub fn total_liquidity(
    pool: &Pool,
    prices: &HashMap<Address, BigDecimal>,
    on_failure: ConvergencePolicy,
) -> Result<BigDecimal, Error> {
    let liquidity = match &pool.invariant {
        Invariant::Weighted { weights } => weighted(pool, weights, prices),
        Invariant::Stable { amplification } => {
            stable(pool, *amplification, prices, on_failure)?
        }
    };
    Ok(liquidity.with_scale(SCALE))
}

fn weighted(pool: &Pool, weights: &[Bfp], prices: &HashMap<Address, BigDecimal>) -> BigDecimal {
    let weight = |weight: &Bfp| weight.as_uint256().to_big_decimal(18);
    let total_weight = weights.iter().map(weight).sum::<BigDecimal>();

    let mut sum_value = BigDecimal::zero();
    let mut sum_weight = BigDecimal::zero();
    for (token, token_weight) in pool.tokens.iter().zip(weights) {
        let Some(price) = prices.get(&token.address) else {
            continue;
        };
        sum_value += &token.balance * price;
        sum_weight += weight(token_weight);
    }

    if sum_weight.is_zero() {
        return BigDecimal::zero();
    }
    sum_value / sum_weight * total_weight
}

fn stable(
    pool: &Pool,
    amplification: U256,
    prices: &HashMap<Address, BigDecimal>,
    on_failure: ConvergencePolicy,
) -> Result<BigDecimal, Error> {
    let Some((reference, reference_price)) = pool
        .tokens
        .iter()
        .enumerate()
        .find_map(|(index, token)| Some((index, prices.get(&token.address)?)))
    else {
        return Ok(BigDecimal::zero());
    };

    // The invariant is undefined once a reserve is empty.
    let drained = pool.balances.iter().any(Bfp::is_zero);
    let mut sum_value = BigDecimal::zero();
    for (index, token) in pool.tokens.iter().enumerate() {
        if let Some(price) = prices.get(&token.address) {
            sum_value += &token.balance * price;
            continue;
        }
        if drained {
            tracing::debug!(token = %token.address, "no spot price for drained pool");
            continue;
        }

        let spot_price = match spot_price::stable_spot_price(
            amplification,
            &pool.balances,
            index,
            reference,
        )
        .map_err(Error::from)
        {
            Ok(price) => price.as_uint256().to_big_decimal(18),
            Err(Error::InvariantConvergenceFailure(err))
                if on_failure == ConvergencePolicy::Degrade =>
            {
                tracing::warn!(?err, token = %token.address, "using neutral spot price");
                BigDecimal::from(1)
            }
            Err(err) => return Err(err),
        };

        // Spot prices relate rate adjusted balances, convert them back into
        // prices of the tokens themselves.
        let rate = |index: usize| pool.tokens[index].price_rate.as_uint256().to_big_decimal(18);
        let price = spot_price * rate(index) / rate(reference) * reference_price;
        sum_value += &token.balance * price;
    }

    Ok(sum_value)
}
