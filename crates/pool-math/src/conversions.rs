//! Conversions between `U256` and the arbitrary precision number types used
//! where fixed point precision is not enough.

use {
    alloy_primitives::U256,
    anyhow::{Result, ensure},
    bigdecimal::BigDecimal,
    num::{BigInt, BigRational, BigUint, Zero as _, bigint::Sign},
};

pub trait U256Ext: Sized {
    fn to_big_int(&self) -> BigInt;

    fn to_big_uint(&self) -> BigUint;

    fn to_big_rational(&self) -> BigRational;

    /// The integer as a decimal with `scale` fractional digits, i.e. the
    /// human readable form of a token amount with `scale` decimals.
    fn to_big_decimal(&self, scale: i64) -> BigDecimal;

    fn from_big_int(input: &BigInt) -> Result<Self>;

    fn from_big_uint(input: &BigUint) -> Result<Self>;

    /// Truncates towards zero.
    fn from_big_rational(value: &BigRational) -> Result<Self>;
}

impl U256Ext for U256 {
    fn to_big_int(&self) -> BigInt {
        BigInt::from_biguint(Sign::Plus, self.to_big_uint())
    }

    fn to_big_uint(&self) -> BigUint {
        BigUint::from_bytes_be(self.to_be_bytes::<32>().as_slice())
    }

    fn to_big_rational(&self) -> BigRational {
        BigRational::from_integer(self.to_big_int())
    }

    fn to_big_decimal(&self, scale: i64) -> BigDecimal {
        BigDecimal::new(self.to_big_int(), scale)
    }

    fn from_big_int(input: &BigInt) -> Result<Self> {
        ensure!(input.sign() != Sign::Minus, "negative");
        Self::from_big_uint(input.magnitude())
    }

    fn from_big_uint(input: &BigUint) -> Result<Self> {
        let bytes = input.to_bytes_be();
        ensure!(bytes.len() <= 32, "too large");
        Ok(U256::from_be_slice(&bytes))
    }

    fn from_big_rational(value: &BigRational) -> Result<Self> {
        ensure!(!value.denom().is_zero(), "zero denominator");
        Self::from_big_int(&(value.numer() / value.denom()))
    }
}

/// Rounds towards zero at `scale` fractional digits.
pub fn big_rational_to_big_decimal(value: &BigRational, scale: i64) -> BigDecimal {
    let unit = BigInt::from(10).pow(scale.unsigned_abs() as u32);
    BigDecimal::new(value.numer() * unit / value.denom(), scale)
}
