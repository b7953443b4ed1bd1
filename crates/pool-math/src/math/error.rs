//! Arithmetic errors raised by the pool math. Variants mirror the error codes
//! of the Balancer contracts so that failures can be compared with on-chain
//! reverts. The full list lives in:
//! https://github.com/balancer-labs/balancer-v2-monorepo/blob/master/pkg/interfaces/contracts/solidity-utils/helpers/BalancerErrors.sol

use std::fmt;

macro_rules! errors_from_codes {
    ( $( ( $variant:ident, $code:literal ) ),+ $(,)? ) => {
        #[derive(thiserror::Error, Clone, Copy, Debug, PartialEq, Eq)]
        pub enum Error {
            $(
                $variant,
            )*
        }

        impl Error {
            /// The numeric Balancer error code.
            pub fn code(&self) -> u16 {
                match self {
                    $(
                        Self::$variant => $code,
                    )*
                }
            }
        }

        impl fmt::Display for Error {
            fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
                match self {
                    $(
                        Self::$variant => write!(f, "BAL#{:0>3}: {}", $code, stringify!($variant)),
                    )*
                }
            }
        }

        #[cfg(test)]
        impl From<&str> for Error {
            fn from(errno: &str) -> Self {
                match errno.parse::<u16>().unwrap() {
                    $(
                        $code => Self::$variant,
                    )*
                    _ => panic!("Invalid error code"),
                }
            }
        }
    }
}

errors_from_codes!(
    (AddOverflow, 0),
    (SubOverflow, 1),
    (MulOverflow, 3),
    (ZeroDivision, 4),
    (DivInternal, 5),
    (XOutOfBounds, 6),
    (YOutOfBounds, 7),
    (ProductOutOfBounds, 8),
    (InvalidExponent, 9),
    (StableInvariantDidntConverge, 321),
    (StableGetBalanceDidntConverge, 322),
);

impl Error {
    /// Whether the error comes from one of the bounded Newton iterations
    /// rather than from an arithmetic fault.
    pub fn is_convergence_failure(&self) -> bool {
        matches!(
            self,
            Self::StableInvariantDidntConverge | Self::StableGetBalanceDidntConverge
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_error_formatting() {
        assert_eq!(format!("{}", Error::XOutOfBounds), "BAL#006: XOutOfBounds");
        assert_eq!(
            Error::StableInvariantDidntConverge.to_string(),
            "BAL#321: StableInvariantDidntConverge"
        );
    }

    #[test]
    fn codes_round_trip() {
        for error in [
            Error::AddOverflow,
            Error::ZeroDivision,
            Error::InvalidExponent,
            Error::StableGetBalanceDidntConverge,
        ] {
            assert_eq!(Error::from(error.code().to_string().as_str()), error);
        }
    }

    #[test]
    fn convergence_failures() {
        assert!(Error::StableInvariantDidntConverge.is_convergence_failure());
        assert!(Error::StableGetBalanceDidntConverge.is_convergence_failure());
        assert!(!Error::ZeroDivision.is_convergence_failure());
    }
}
