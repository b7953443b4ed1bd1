use crate::math;

/// Failure of a pool calculation.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid amount {0:?}")]
    InvalidAmount(String),
    #[error("stable invariant did not converge: {0}")]
    InvariantConvergenceFailure(math::Error),
    #[error("pool has zero total supply or balance")]
    ZeroTotalSupplyOrBalance,
    #[error("unsupported pool type {0:?}")]
    UnsupportedPoolType(String),
    #[error("token index {0} out of range")]
    InvalidTokenIndex(usize),
    #[error("invalid pool: {0}")]
    InvalidPool(String),
    #[error(transparent)]
    Math(math::Error),
}

impl From<math::Error> for Error {
    fn from(err: math::Error) -> Self {
        match err {
            err if err.is_convergence_failure() => Self::InvariantConvergenceFailure(err),
            err => Self::Math(err),
        }
    }
}
