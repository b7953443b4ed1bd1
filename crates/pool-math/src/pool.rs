//! Pool snapshots as handed to the engine by a pool data source, and their
//! validated form that all calculations operate on.

use {
    crate::{
        Error,
        math::fixed_point::Bfp,
        scaling::{self, MAX_DECIMALS},
    },
    alloy_primitives::{Address, U256},
    bigdecimal::BigDecimal,
    num::Signed as _,
    serde::{Deserialize, Serialize},
    serde_with::{DeserializeFromStr, DisplayFromStr, SerializeDisplay, serde_as},
    std::str::FromStr,
    strum::IntoEnumIterator as _,
};

/// Maximum deviation of the sum of weights from one.
const WEIGHT_SUM_TOLERANCE: U256 = U256::from_limbs([1_000_000_000, 0, 0, 0]);

#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    strum::Display,
    strum::EnumIter,
    SerializeDisplay,
    DeserializeFromStr,
)]
pub enum PoolType {
    Weighted,
    Stable,
    MetaStable,
}

impl FromStr for PoolType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::iter()
            .find(|kind| kind.to_string() == s)
            .ok_or_else(|| Error::UnsupportedPoolType(s.to_owned()))
    }
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub address: Address,
    pub decimals: u8,
    /// Rate by which the token's balance gets multiplied before entering the
    /// invariant, for tokens that accrue value against their underlying.
    #[serde(default = "Bfp::one")]
    pub price_rate: Bfp,
    /// Human readable balance, e.g. `"1.5"` for 1.5 tokens.
    #[serde_as(as = "DisplayFromStr")]
    pub balance: BigDecimal,
}

/// Pool state as reported by a pool data source.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSnapshot {
    pub pool_type: PoolType,
    pub tokens: Vec<TokenInfo>,
    pub total_supply: Bfp,
    pub swap_fee: Bfp,
    #[serde(default)]
    pub amplification: Option<Bfp>,
    #[serde(default)]
    pub weights: Option<Vec<Bfp>>,
}

/// The invariant family of a pool together with its parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Invariant {
    Weighted { weights: Vec<Bfp> },
    /// Covers both stable and meta stable pools, whose math only differs in
    /// the token price rates applied while scaling.
    Stable { amplification: U256 },
}

/// A snapshot that passed validation, with balances already upscaled.
#[derive(Clone, Debug, PartialEq)]
pub struct Pool {
    pub pool_type: PoolType,
    pub tokens: Vec<TokenInfo>,
    pub balances: Vec<Bfp>,
    pub total_supply: Bfp,
    pub swap_fee: Bfp,
    pub invariant: Invariant,
}

impl PoolSnapshot {
    /// Checks the snapshot's invariants and resolves the pool kind.
    pub fn validate(&self) -> Result<Pool, Error> {
        let invalid = |reason: String| Err(Error::InvalidPool(reason));

        if self.tokens.len() < 2 {
            return invalid(format!("{} tokens", self.tokens.len()));
        }
        for token in &self.tokens {
            if token.decimals > MAX_DECIMALS {
                return invalid(format!("{} has {} decimals", token.address, token.decimals));
            }
            if token.balance.is_negative() {
                return invalid(format!("{} has negative balance", token.address));
            }
            if token.price_rate.is_zero() {
                return invalid(format!("{} has zero price rate", token.address));
            }
        }
        if self.swap_fee >= Bfp::one() {
            return invalid(format!("swap fee {}", self.swap_fee));
        }

        let invariant = match self.pool_type {
            PoolType::Weighted => {
                let Some(weights) = &self.weights else {
                    return invalid("weighted pool without weights".to_owned());
                };
                if weights.len() != self.tokens.len() {
                    return invalid(format!(
                        "{} weights for {} tokens",
                        weights.len(),
                        self.tokens.len()
                    ));
                }
                if weights.iter().any(Bfp::is_zero) {
                    return invalid("zero weight".to_owned());
                }
                let sum = weights
                    .iter()
                    .try_fold(U256::ZERO, |sum, weight| sum.checked_add(weight.as_uint256()))
                    .unwrap_or(U256::MAX);
                if sum.abs_diff(Bfp::one().as_uint256()) > WEIGHT_SUM_TOLERANCE {
                    return invalid(format!("weights sum up to {}", Bfp::from_wei(sum)));
                }
                Invariant::Weighted {
                    weights: weights.clone(),
                }
            }
            PoolType::Stable | PoolType::MetaStable => {
                let Some(amplification) = self.amplification else {
                    return invalid("stable pool without amplification".to_owned());
                };
                if amplification < Bfp::one() {
                    return invalid(format!("amplification {amplification}"));
                }
                Invariant::Stable {
                    amplification: scaling::adjust_amplification(amplification)?,
                }
            }
        };

        let balances = self
            .tokens
            .iter()
            .map(|token| scaling::scale_decimal_in(&token.balance, token.decimals, token.price_rate))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Pool {
            pool_type: self.pool_type,
            tokens: self.tokens.clone(),
            balances,
            total_supply: self.total_supply,
            swap_fee: self.swap_fee,
            invariant,
        })
    }
}

impl Pool {
    pub fn decimals(&self) -> Vec<u8> {
        self.tokens.iter().map(|token| token.decimals).collect()
    }

    /// Fails with [`Error::ZeroTotalSupplyOrBalance`] if there is nothing to
    /// price an operation against.
    pub fn check_liquidity(&self) -> Result<(), Error> {
        if self.total_supply.is_zero() || self.balances.iter().any(Bfp::is_zero) {
            return Err(Error::ZeroTotalSupplyOrBalance);
        }
        Ok(())
    }
}
