//! Integer and fixed point arithmetic emulating the Balancer V2 contracts.

pub use self::error::Error;
use alloy_primitives::U256;

mod error;
pub mod fixed_point;
pub mod spot_price;
pub mod stable_math;
pub mod weighted_math;

/// Direction in which an inexact result gets rounded.
///
/// Amounts flowing into the pool are rounded up and amounts flowing out of it
/// are rounded down, so that rounding never works in favour of the caller.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Rounding {
    Up,
    Down,
}

impl Rounding {
    /// The opposite direction. Used for denominators, where rounding the
    /// divisor up rounds the quotient down.
    pub fn inverse(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }
}

pub trait BalU256: Sized {
    fn bmul(self, other: Self) -> Result<Self, Error>;
    fn badd(self, other: Self) -> Result<Self, Error>;
    fn bsub(self, other: Self) -> Result<Self, Error>;
    fn bdiv_down(self, other: Self) -> Result<Self, Error>;
    fn bdiv_up(self, other: Self) -> Result<Self, Error>;

    fn bdiv(self, other: Self, rounding: Rounding) -> Result<Self, Error> {
        match rounding {
            Rounding::Up => self.bdiv_up(other),
            Rounding::Down => self.bdiv_down(other),
        }
    }
}

impl BalU256 for U256 {
    fn bmul(self, other: Self) -> Result<Self, Error> {
        self.checked_mul(other).ok_or(Error::MulOverflow)
    }

    fn badd(self, other: Self) -> Result<Self, Error> {
        self.checked_add(other).ok_or(Error::AddOverflow)
    }

    fn bsub(self, other: Self) -> Result<Self, Error> {
        self.checked_sub(other).ok_or(Error::SubOverflow)
    }

    fn bdiv_down(self, other: Self) -> Result<Self, Error> {
        if other.is_zero() {
            return Err(Error::ZeroDivision);
        }
        Ok(self / other)
    }

    fn bdiv_up(self, other: Self) -> Result<Self, Error> {
        if other.is_zero() {
            return Err(Error::ZeroDivision);
        }
        if self.is_zero() {
            return Ok(U256::ZERO);
        }
        Ok(U256::ONE + (self - U256::ONE) / other)
    }
}

/// Absolute difference used by the Newton iterations' stopping criterion.
fn abs_diff(a: U256, b: U256) -> U256 {
    if a > b { a - b } else { b - a }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(value: u64) -> U256 {
        U256::from(value)
    }

    #[test]
    fn checked_arithmetic() {
        assert_eq!(u(3).badd(u(4)), Ok(u(7)));
        assert_eq!(u(3).bmul(u(4)), Ok(u(12)));
        assert_eq!(u(4).bsub(u(4)), Ok(U256::ZERO));
        assert_eq!(U256::MAX.bmul(U256::ONE), Ok(U256::MAX));

        for (result, message) in [
            (U256::MAX.badd(U256::ONE), "BAL#000: AddOverflow"),
            (u(1).bsub(u(2)), "BAL#001: SubOverflow"),
            (U256::MAX.bmul(u(2)), "BAL#003: MulOverflow"),
            (u(1).bdiv_down(U256::ZERO), "BAL#004: ZeroDivision"),
            (U256::ZERO.bdiv_up(U256::ZERO), "BAL#004: ZeroDivision"),
        ] {
            assert_eq!(result.unwrap_err().to_string(), message);
        }
    }

    #[test]
    fn division_rounds_in_the_requested_direction() {
        for (numerator, denominator, down, up) in
            [(0, 5, 0, 0), (7, 2, 3, 4), (8, 2, 4, 4), (1, 3, 0, 1)]
        {
            let (numerator, denominator) = (u(numerator), u(denominator));
            assert_eq!(numerator.bdiv(denominator, Rounding::Down), Ok(u(down)));
            assert_eq!(numerator.bdiv(denominator, Rounding::Up), Ok(u(up)));
        }
        assert_eq!(Rounding::Up.inverse(), Rounding::Down);
        assert_eq!(Rounding::Down.inverse().to_string(), "up");
    }

    #[test]
    fn abs_diff_is_symmetric() {
        assert_eq!(abs_diff(u(3), u(10)), u(7));
        assert_eq!(abs_diff(u(10), u(3)), u(7));
    }
}
