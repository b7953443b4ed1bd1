//! Conversion of human readable token amounts into the 18 decimal fixed point
//! representation the pool math operates on, and back.
//!
//! Every conversion takes an explicit [`Rounding`]. Amounts flowing into the
//! pool are rounded up and amounts flowing out of it are rounded down.

use {
    crate::{
        Error,
        conversions::U256Ext as _,
        math::{
            BalU256 as _,
            Rounding,
            fixed_point::{Bfp, ONE_18},
        },
    },
    alloy_primitives::U256,
    bigdecimal::BigDecimal,
    num::Signed as _,
    std::str::FromStr,
};

/// The on-chain amplification parameter carries three more digits of
/// precision than its nominal value.
pub const AMP_PRECISION: U256 = U256::from_limbs([1_000, 0, 0, 0]);

/// Price impact from which a caller would usually warn about an operation
/// (1%). The engine never applies it on its own.
pub const DEFAULT_HIGH_PRICE_IMPACT: Bfp =
    Bfp::from_wei(U256::from_limbs([10_000_000_000_000_000, 0, 0, 0]));

pub const MAX_DECIMALS: u8 = 18;

/// Parses a human readable amount of a token with `decimals` decimals and
/// converts it into an upscaled fixed point amount, applying the token's
/// price rate and rounding up.
///
/// An empty amount is zero.
pub fn scale_in(amount: &str, decimals: u8, price_rate: Bfp) -> Result<Bfp, Error> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Ok(Bfp::zero());
    }
    let parsed =
        BigDecimal::from_str(amount).map_err(|_| Error::InvalidAmount(amount.to_owned()))?;
    scale_decimal_in(&parsed, decimals, price_rate)
}

/// Like [`scale_in`] for an already parsed amount.
pub fn scale_decimal_in(amount: &BigDecimal, decimals: u8, price_rate: Bfp) -> Result<Bfp, Error> {
    let invalid = || Error::InvalidAmount(amount.to_string());
    if amount.is_negative() {
        return Err(invalid());
    }
    let native = amount.with_scale(i64::from(decimals));
    if &native != amount {
        // More fractional digits than the token supports.
        return Err(invalid());
    }
    let (units, _) = native.as_bigint_and_exponent();
    let factor = scaling_factor(decimals)?;
    U256::from_big_int(&units)
        .ok()
        .and_then(|units| units.checked_mul(factor))
        .map(Bfp::from_wei)
        .ok_or_else(invalid)?
        .mul_up(price_rate)
        .map_err(|_| invalid())
}

/// Converts an upscaled fixed point amount back into a human readable amount
/// of a token with `decimals` decimals, undoing its price rate.
pub fn scale_out(
    amount: Bfp,
    decimals: u8,
    price_rate: Bfp,
    rounding: Rounding,
) -> Result<BigDecimal, Error> {
    let unrated = amount.div(price_rate, rounding)?;
    let native = unrated
        .as_uint256()
        .bdiv(scaling_factor(decimals)?, rounding)?;
    Ok(native.to_big_decimal(i64::from(decimals)))
}

/// Multiplies the nominal amplification parameter by [`AMP_PRECISION`],
/// yielding the integer value stable math operates on. Fractional digits
/// beyond that precision are dropped.
pub fn adjust_amplification(amp: Bfp) -> Result<U256, Error> {
    Ok(amp.as_uint256().bmul(AMP_PRECISION)? / ONE_18)
}

/// Raw token units to an 18 decimal fixed point amount.
pub fn upscale(units: U256, decimals: u8) -> Result<Bfp, Error> {
    Ok(Bfp::from_wei(units.bmul(scaling_factor(decimals)?)?))
}

/// 18 decimal fixed point amount to raw token units, truncating.
pub fn downscale(amount: Bfp, decimals: u8) -> Result<U256, Error> {
    let factor = scaling_factor(decimals)?;
    amount.as_uint256().bdiv_down(factor).map_err(Error::from)
}

fn scaling_factor(decimals: u8) -> Result<U256, Error> {
    let exponent = MAX_DECIMALS
        .checked_sub(decimals)
        .ok_or_else(|| Error::InvalidPool(format!("token with {decimals} decimals")))?;
    Ok(U256::from(10).pow(U256::from(exponent)))
}

#[cfg(test)]
mod tests {
    use {super::*, crate::bfp};

    #[test]
    fn scales_in_by_decimals() {
        assert_eq!(scale_in("1.5", 6, Bfp::one()).unwrap(), bfp!("1.5"));
        assert_eq!(scale_in("42", 0, Bfp::one()).unwrap(), Bfp::from(42));
        assert_eq!(
            scale_in("0.000000000000000001", 18, Bfp::one()).unwrap(),
            Bfp::from_wei(U256::ONE)
        );
        assert_eq!(scale_in("1.500000", 2, Bfp::one()).unwrap(), bfp!("1.5"));
    }

    #[test]
    fn empty_amount_is_zero() {
        assert_eq!(scale_in("", 18, Bfp::one()).unwrap(), Bfp::zero());
        assert_eq!(scale_in("  ", 6, bfp!("1.1")).unwrap(), Bfp::zero());
    }

    #[test]
    fn rejects_invalid_amounts() {
        for amount in ["abc", "-1", "1.2.3", "0.0000001", "1e80"] {
            assert!(
                matches!(scale_in(amount, 6, Bfp::one()), Err(Error::InvalidAmount(_))),
                "{amount} accepted"
            );
        }
    }

    #[test]
    fn applies_price_rate_rounding_up() {
        assert_eq!(scale_in("2", 18, bfp!("1.05")).unwrap(), bfp!("2.1"));
        // 1 wei * 0.5 rounds up to 1 wei.
        assert_eq!(
            scale_in("0.000000000000000001", 18, bfp!("0.5")).unwrap(),
            Bfp::from_wei(U256::ONE)
        );
    }

    #[test]
    fn scales_out_with_rounding() {
        let amount = bfp!("1.0000005");
        assert_eq!(
            scale_out(amount, 6, Bfp::one(), Rounding::Down).unwrap(),
            BigDecimal::from_str("1").unwrap()
        );
        assert_eq!(
            scale_out(amount, 6, Bfp::one(), Rounding::Up).unwrap(),
            BigDecimal::from_str("1.000001").unwrap()
        );
        assert_eq!(
            scale_out(bfp!("2.1"), 18, bfp!("1.05"), Rounding::Down).unwrap(),
            BigDecimal::from_str("2").unwrap()
        );
        assert_eq!(
            scale_out(amount, 6, Bfp::one(), Rounding::Down)
                .unwrap()
                .as_bigint_and_exponent()
                .1,
            6
        );
    }

    #[test]
    fn round_trip_brackets_the_amount() {
        for (amount, decimals, rate) in [
            ("123.456", 6, Bfp::one()),
            ("0.000001", 6, bfp!("1.000000000000000001")),
            ("987654321.123456789", 18, bfp!("1.0234")),
            ("0.000000000000000001", 18, bfp!("1.5")),
            ("1", 0, bfp!("3")),
            ("7.77", 2, bfp!("0.3")),
            ("5", 18, bfp!("0.5")),
        ] {
            let expected = BigDecimal::from_str(amount).unwrap();
            let scaled = scale_in(amount, decimals, rate).unwrap();
            let down = scale_out(scaled, decimals, rate, Rounding::Down).unwrap();
            let up = scale_out(scaled, decimals, rate, Rounding::Up).unwrap();
            assert!(down <= expected, "{amount}: {down}");
            assert!(expected <= up, "{amount}: {up}");
            assert!(&up - &down <= BigDecimal::new(1.into(), i64::from(decimals)), "{amount}");
        }
    }

    #[test]
    fn round_trip_slack_below_unit_rate() {
        // The rate rounds up on the way in, which at 18 decimals and a rate
        // below one can surface as one extra wei on the way out.
        let wei = BigDecimal::new(1.into(), 18);
        let scaled = scale_in("0.000000000000000001", 18, bfp!("0.5")).unwrap();
        assert_eq!(scaled, Bfp::from_wei(U256::ONE));
        let down = scale_out(scaled, 18, bfp!("0.5"), Rounding::Down).unwrap();
        assert_eq!(down, &wei + &wei);
        assert!(down - &wei <= wei);
    }

    #[test]
    fn amplification_precision() {
        assert_eq!(adjust_amplification(Bfp::from(100)).unwrap(), U256::from(100_000));
        assert_eq!(adjust_amplification(bfp!("1.5")).unwrap(), U256::from(1_500));
        assert_eq!(adjust_amplification(bfp!("0.0001")).unwrap(), U256::ZERO);
    }

    #[test]
    fn up_and_down_scaling() {
        let amount = upscale(U256::from(1_234_567), 6).unwrap();
        assert_eq!(amount, bfp!("1.234567"));
        assert_eq!(downscale(amount, 6).unwrap(), U256::from(1_234_567));
        assert_eq!(downscale(bfp!("0.0000009"), 6).unwrap(), U256::ZERO);
        assert_eq!(
            upscale(U256::ONE, 19).unwrap_err(),
            Error::InvalidPool("token with 19 decimals".to_owned())
        );
    }
}
