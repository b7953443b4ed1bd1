//! Fixed point numbers with 18 decimals, following the semantics of
//! Balancer's `FixedPoint` library:
//! https://github.com/balancer-labs/balancer-v2-monorepo/blob/6c9e24e22d0c46cca6dd15861d3d33da61a60b98/pkg/solidity-utils/contracts/math/FixedPoint.sol

use {
    super::{BalU256, Error, Rounding},
    alloy_primitives::U256,
    serde_with::{DeserializeFromStr, SerializeDisplay},
    std::{
        fmt::{self, Debug, Display, Formatter},
        str::FromStr,
    },
};

pub mod logexpmath;

/// 10^18, the raw representation of `Bfp::one()`.
pub const ONE_18: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);
const DECIMALS: usize = 18;
/// Relative error bound of `logexpmath::pow`, as a fixed point number.
const MAX_POW_RELATIVE_ERROR: U256 = U256::from_limbs([10_000, 0, 0, 0]);

/// Fixed point number that represents exactly every rational number with up
/// to 18 decimals that can be stored in 256 bits.
#[derive(
    Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd, DeserializeFromStr, SerializeDisplay,
)]
pub struct Bfp(U256);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid fixed point number {0:?}")]
pub struct ParseBfpError(String);

impl FromStr for Bfp {
    type Err = ParseBfpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseBfpError(s.to_string());
        let (units, decimals) = s.split_once('.').unwrap_or((s, ""));
        if units.is_empty()
            || decimals.len() > DECIMALS
            || !units.chars().chain(decimals.chars()).all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }
        let units = U256::from_str_radix(units, 10).map_err(|_| invalid())?;
        let decimals = if decimals.is_empty() {
            U256::ZERO
        } else {
            U256::from_str_radix(&format!("{decimals:0<DECIMALS$}"), 10).map_err(|_| invalid())?
        };
        units
            .checked_mul(ONE_18)
            .and_then(|units| units.checked_add(decimals))
            .map(Bfp)
            .ok_or_else(invalid)
    }
}

impl Display for Bfp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let units = self.0 / ONE_18;
        let decimals = self.0 % ONE_18;
        if decimals.is_zero() {
            return write!(f, "{units}");
        }
        let decimals = format!("{:0>DECIMALS$}", decimals.to_string());
        write!(f, "{units}.{}", decimals.trim_end_matches('0'))
    }
}

impl Debug for Bfp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:0>DECIMALS$}",
            self.0 / ONE_18,
            (self.0 % ONE_18).to_string()
        )
    }
}

impl From<u64> for Bfp {
    fn from(units: u64) -> Self {
        // 2^64 * 10^18 comfortably fits into 256 bits.
        Self(U256::from(units) * ONE_18)
    }
}

impl Bfp {
    pub const fn zero() -> Self {
        Self(U256::ZERO)
    }

    pub const fn one() -> Self {
        Self(ONE_18)
    }

    /// Interprets a raw integer as a fixed point number, i.e. `1` is
    /// `0.000000000000000001`.
    pub const fn from_wei(num: U256) -> Self {
        Self(num)
    }

    pub fn as_uint256(self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn add(self, other: Self) -> Result<Self, Error> {
        self.0.badd(other.0).map(Self)
    }

    pub fn sub(self, other: Self) -> Result<Self, Error> {
        self.0.bsub(other.0).map(Self)
    }

    pub fn mul_down(self, other: Self) -> Result<Self, Error> {
        Ok(Self(self.0.bmul(other.0)? / ONE_18))
    }

    pub fn mul_up(self, other: Self) -> Result<Self, Error> {
        let product = self.0.bmul(other.0)?;
        if product.is_zero() {
            return Ok(Self::zero());
        }
        Ok(Self((product - U256::ONE) / ONE_18 + U256::ONE))
    }

    pub fn mul(self, other: Self, rounding: Rounding) -> Result<Self, Error> {
        match rounding {
            Rounding::Up => self.mul_up(other),
            Rounding::Down => self.mul_down(other),
        }
    }

    pub fn div_down(self, other: Self) -> Result<Self, Error> {
        if other.is_zero() {
            return Err(Error::ZeroDivision);
        }
        if self.is_zero() {
            return Ok(Self::zero());
        }
        let inflated = self.0.bmul(ONE_18).map_err(|_| Error::DivInternal)?;
        Ok(Self(inflated / other.0))
    }

    pub fn div_up(self, other: Self) -> Result<Self, Error> {
        if other.is_zero() {
            return Err(Error::ZeroDivision);
        }
        if self.is_zero() {
            return Ok(Self::zero());
        }
        let inflated = self.0.bmul(ONE_18).map_err(|_| Error::DivInternal)?;
        Ok(Self((inflated - U256::ONE) / other.0 + U256::ONE))
    }

    pub fn div(self, other: Self, rounding: Rounding) -> Result<Self, Error> {
        match rounding {
            Rounding::Up => self.div_up(other),
            Rounding::Down => self.div_down(other),
        }
    }

    /// `1 - self`, saturating at zero.
    pub fn complement(self) -> Self {
        if self.0 < ONE_18 {
            Self(ONE_18 - self.0)
        } else {
            Self::zero()
        }
    }

    /// Upper bound of `self^exp`, accounting for the error of the underlying
    /// logarithm based approximation.
    pub fn pow_up(self, exp: Self) -> Result<Self, Error> {
        let raw = logexpmath::pow(self.0, exp.0)?;
        let max_error = raw.bmul(MAX_POW_RELATIVE_ERROR)?.bdiv_up(ONE_18)?;
        raw.badd(max_error).map(Self)
    }

    /// Lower bound of `self^exp`.
    pub fn pow_down(self, exp: Self) -> Result<Self, Error> {
        let raw = logexpmath::pow(self.0, exp.0)?;
        let max_error = raw.bmul(MAX_POW_RELATIVE_ERROR)?.bdiv_up(ONE_18)?;
        Ok(Self(raw.saturating_sub(max_error)))
    }

    pub fn pow(self, exp: Self, rounding: Rounding) -> Result<Self, Error> {
        match rounding {
            Rounding::Up => self.pow_up(exp),
            Rounding::Down => self.pow_down(exp),
        }
    }
}
