//! Entry point of the engine: joins, exits, price impact and liquidity of a
//! single pool, taking and returning human readable amounts.

use {
    crate::{
        Error,
        conversions::U256Ext as _,
        liquidity,
        math::{Rounding, fixed_point::Bfp, weighted_math},
        pool::{Pool, PoolSnapshot},
        price_impact::{self, Mode, PriceImpact},
        scaling::{self, DEFAULT_HIGH_PRICE_IMPACT},
    },
    alloy_primitives::Address,
    bigdecimal::BigDecimal,
    serde::Deserialize,
    std::collections::HashMap,
};

/// BPT always has 18 decimals.
const BPT_DECIMALS: u8 = 18;

/// What to do when the stable invariant does not converge.
#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, strum::EnumString, strum::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ConvergencePolicy {
    /// Log a warning and continue with a neutral value: no BPT, no price
    /// impact, a spot price of one.
    #[default]
    Degrade,
    /// Return [`Error::InvariantConvergenceFailure`].
    Fail,
}

/// Caller decisions the engine itself does not make.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Policy {
    /// Price impact from which an operation is reported as high impact.
    pub high_price_impact_threshold: BigDecimal,
    pub on_convergence_failure: ConvergencePolicy,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            high_price_impact_threshold: DEFAULT_HIGH_PRICE_IMPACT
                .as_uint256()
                .to_big_decimal(18),
            on_convergence_failure: ConvergencePolicy::default(),
        }
    }
}

/// Calculations on one validated pool snapshot.
#[derive(Clone, Debug)]
pub struct Calculator {
    pool: Pool,
    policy: Policy,
}

impl Calculator {
    pub fn new(snapshot: &PoolSnapshot, policy: Policy) -> Result<Self, Error> {
        let pool = snapshot.validate()?;
        tracing::debug!(pool_type = %pool.pool_type, tokens = pool.tokens.len(), "pool loaded");
        Ok(Self { pool, policy })
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Parses a human readable BPT amount.
    pub fn parse_bpt(amount: &str) -> Result<Bfp, Error> {
        scaling::scale_in(amount, BPT_DECIMALS, Bfp::one())
    }

    /// BPT minted for depositing exactly `amounts`.
    pub fn exact_tokens_in_for_bpt_out(&self, amounts: &[&str]) -> Result<BigDecimal, Error> {
        let amounts = self.scale_amounts(amounts)?;
        let bpt_out = self.priced(Bfp::zero(), |pool| price_impact::bpt_out(pool, &amounts))?;
        Ok(bpt(bpt_out))
    }

    /// BPT burned for withdrawing exactly `amounts`.
    pub fn bpt_in_for_exact_tokens_out(&self, amounts: &[&str]) -> Result<BigDecimal, Error> {
        let amounts = self.scale_amounts(amounts)?;
        let bpt_in = self.priced(Bfp::zero(), |pool| price_impact::bpt_in(pool, &amounts))?;
        Ok(bpt(bpt_in))
    }

    /// BPT burned for withdrawing exactly `amount` of a single token.
    pub fn bpt_in_for_exact_token_out(
        &self,
        amount: &str,
        token_index: usize,
    ) -> Result<BigDecimal, Error> {
        self.check_index(token_index)?;
        let mut amounts = vec![""; self.pool.tokens.len()];
        amounts[token_index] = amount;
        self.bpt_in_for_exact_tokens_out(&amounts)
    }

    /// Amount of a single token received for burning exactly `bpt_in`.
    pub fn exact_bpt_in_for_token_out(
        &self,
        bpt_in: &str,
        token_index: usize,
    ) -> Result<BigDecimal, Error> {
        self.check_index(token_index)?;
        let bpt_in = Self::parse_bpt(bpt_in)?;
        let amount = self.priced(Bfp::zero(), |pool| {
            price_impact::token_out(pool, token_index, bpt_in)
        })?;
        self.scale_out(amount, token_index, Rounding::Down)
    }

    /// Amounts of every token received for burning exactly `bpt_in` in a
    /// proportional exit.
    pub fn exact_bpt_in_for_tokens_out(&self, bpt_in: &str) -> Result<Vec<BigDecimal>, Error> {
        let bpt_in = Self::parse_bpt(bpt_in)?;
        let amounts = self.priced(vec![Bfp::zero(); self.pool.tokens.len()], |pool| {
            weighted_math::calc_tokens_out_given_exact_bpt_in(
                &pool.balances,
                bpt_in,
                pool.total_supply,
            )
            .map_err(Error::from)
        })?;
        amounts
            .into_iter()
            .enumerate()
            .map(|(index, amount)| self.scale_out(amount, index, Rounding::Down))
            .collect()
    }

    /// Amounts of all tokens for a proportional join in which token
    /// `fixed_index` contributes exactly `amount`.
    pub fn proportional_amounts(
        &self,
        fixed_index: usize,
        amount: &str,
    ) -> Result<Vec<BigDecimal>, Error> {
        self.check_index(fixed_index)?;
        let fixed = &self.pool.tokens[fixed_index];
        let scaled = scaling::scale_in(amount, fixed.decimals, fixed.price_rate)?;
        let ratio = self.priced(Bfp::zero(), |pool| {
            scaled
                .div_up(pool.balances[fixed_index])
                .map_err(Error::from)
        })?;

        (0..self.pool.tokens.len())
            .map(|index| {
                if index == fixed_index {
                    return self.scale_out(scaled, index, Rounding::Down);
                }
                let amount = self.pool.balances[index].mul_up(ratio)?;
                self.scale_out(amount, index, Rounding::Up)
            })
            .collect()
    }

    /// Price impact of an operation. `amounts` are only read by
    /// [`Mode::Join`] and [`Mode::ExitExactOut`].
    pub fn price_impact(&self, amounts: &[&str], mode: Mode) -> Result<PriceImpact, Error> {
        let amounts = match mode {
            Mode::Join | Mode::ExitExactOut => self.scale_amounts(amounts)?,
            Mode::ExitProportional { .. } | Mode::ExitSingleAsset { .. } => Vec::new(),
        };
        self.priced(PriceImpact::zero(), |pool| {
            price_impact::price_impact(pool, &amounts, mode)
        })
    }

    /// Whether `impact` reaches the policy's high price impact threshold.
    pub fn is_high_price_impact(&self, impact: &PriceImpact) -> bool {
        impact.is_high(&self.policy.high_price_impact_threshold)
    }

    /// Total value of the pool's reserves at `prices`.
    pub fn total_liquidity(
        &self,
        prices: &HashMap<Address, BigDecimal>,
    ) -> Result<BigDecimal, Error> {
        self.recover(
            liquidity::total_liquidity(&self.pool, prices, self.policy.on_convergence_failure),
            BigDecimal::default(),
        )
    }

    /// Parses and upscales one amount per token. Missing trailing amounts are
    /// zero.
    fn scale_amounts(&self, amounts: &[&str]) -> Result<Vec<Bfp>, Error> {
        if amounts.len() > self.pool.tokens.len() {
            return Err(Error::InvalidAmount(format!(
                "{} amounts for {} tokens",
                amounts.len(),
                self.pool.tokens.len()
            )));
        }
        self.pool
            .tokens
            .iter()
            .enumerate()
            .map(|(index, token)| {
                let amount = amounts.get(index).copied().unwrap_or_default();
                scaling::scale_in(amount, token.decimals, token.price_rate)
            })
            .collect()
    }

    fn scale_out(
        &self,
        amount: Bfp,
        token_index: usize,
        rounding: Rounding,
    ) -> Result<BigDecimal, Error> {
        let token = &self.pool.tokens[token_index];
        scaling::scale_out(amount, token.decimals, token.price_rate, rounding)
    }

    fn check_index(&self, token_index: usize) -> Result<(), Error> {
        if token_index >= self.pool.tokens.len() {
            return Err(Error::InvalidTokenIndex(token_index));
        }
        Ok(())
    }

    /// Runs an operation that prices against the pool's reserves. A snapshot
    /// without supply or with an empty reserve yields `neutral` instead.
    fn priced<T>(
        &self,
        neutral: T,
        operation: impl FnOnce(&Pool) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let result = self
            .pool
            .check_liquidity()
            .and_then(|()| operation(&self.pool));
        self.recover(result, neutral)
    }

    /// Replaces the results of an empty pool, and of a non-converging
    /// invariant if the policy allows it, with `neutral`.
    fn recover<T>(&self, result: Result<T, Error>, neutral: T) -> Result<T, Error> {
        match result {
            Err(Error::InvariantConvergenceFailure(err))
                if self.policy.on_convergence_failure == ConvergencePolicy::Degrade =>
            {
                tracing::warn!(?err, "stable invariant did not converge, using neutral value");
                Ok(neutral)
            }
            Err(Error::ZeroTotalSupplyOrBalance) => {
                tracing::debug!("pool without liquidity");
                Ok(neutral)
            }
            result => result,
        }
    }
}

fn bpt(amount: Bfp) -> BigDecimal {
    amount.as_uint256().to_big_decimal(i64::from(BPT_DECIMALS))
}
