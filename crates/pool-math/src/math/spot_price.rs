//! Marginal prices between two tokens of a stable pool, derived from the
//! partial derivatives of the invariant at the current balances.
//!
//! This is a local linearization and not a trade simulation. It is meant for
//! valuing tokens without an external price, never for quoting swaps.

use {
    super::{Error, Rounding, fixed_point::Bfp, stable_math},
    crate::{conversions::U256Ext as _, scaling::AMP_PRECISION},
    alloy_primitives::U256,
    num::{BigInt, BigRational, Signed as _},
};

/// Price of `token_x` denominated in `token_y`.
///
/// With `a = 2A` and `b = D - a·D`:
///
/// `price = (2a·x·y + a·y² + b·y) / (2a·x·y + a·x² + b·x)`
///
/// `amp` is the adjusted amplification. Both sides of the fraction are scaled
/// by [`AMP_PRECISION`] so that the whole expression stays in integers.
pub fn stable_spot_price(
    amp: U256,
    balances: &[Bfp],
    token_x: usize,
    token_y: usize,
) -> Result<Bfp, Error> {
    let invariant = stable_math::calculate_invariant(amp, balances, Rounding::Up)?
        .as_uint256()
        .to_big_int();
    let x = balances[token_x].as_uint256().to_big_int();
    let y = balances[token_y].as_uint256().to_big_int();

    let a = amp.to_big_int() * 2;
    let b = &invariant * AMP_PRECISION.to_big_int() - &a * &invariant;
    let axy2 = &a * 2 * &x * &y;

    let derivative_x: BigInt = &axy2 + &a * &y * &y + &b * &y;
    let derivative_y: BigInt = axy2 + &a * &x * &x + &b * &x;
    if !derivative_y.is_positive() {
        return Err(Error::ZeroDivision);
    }
    if !derivative_x.is_positive() {
        tracing::debug!(token_x, token_y, "non-positive invariant derivative");
        return Ok(Bfp::zero());
    }

    let price = BigRational::new(derivative_x * BigInt::from(10).pow(18), derivative_y);
    U256::from_big_rational(&price)
        .map(Bfp::from_wei)
        .map_err(|_| Error::MulOverflow)
}

#[cfg(test)]
mod tests {
    use {super::*, crate::bfp};

    fn amp(value: u64) -> U256 {
        U256::from(value) * AMP_PRECISION
    }

    #[test]
    fn balanced_pool_trades_at_par() {
        let balances = vec![bfp!("1000000"), bfp!("1000000"), bfp!("1000000")];
        for (x, y) in [(0, 1), (1, 2), (2, 0)] {
            assert_eq!(
                stable_spot_price(amp(100), &balances, x, y).unwrap(),
                Bfp::one()
            );
        }
    }

    #[test]
    fn abundant_token_is_cheaper() {
        let balances = vec![bfp!("1500000"), bfp!("500000")];
        let x_in_y = stable_spot_price(amp(100), &balances, 0, 1).unwrap();
        let y_in_x = stable_spot_price(amp(100), &balances, 1, 0).unwrap();
        assert!(x_in_y < Bfp::one());
        assert!(y_in_x > Bfp::one());

        // Prices in opposite directions are reciprocal.
        let product = x_in_y.mul_down(y_in_x).unwrap();
        assert!(product <= Bfp::one());
        assert!(product >= bfp!("0.999999999999999990"));
    }

    #[test]
    fn higher_amplification_flattens_the_curve() {
        let balances = vec![bfp!("1500000"), bfp!("500000")];
        let low = stable_spot_price(amp(10), &balances, 0, 1).unwrap();
        let high = stable_spot_price(amp(1000), &balances, 0, 1).unwrap();
        assert!(low < high);
        assert!(high < Bfp::one());
    }

    #[test]
    fn propagates_invariant_failures() {
        let balances = vec![Bfp::one(), Bfp::zero()];
        assert_eq!(
            stable_spot_price(amp(100), &balances, 0, 1).unwrap_err(),
            Error::ZeroDivision
        );
    }
}
