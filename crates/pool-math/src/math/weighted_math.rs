//! Weighted product pool formulas for joins and exits, following Balancer's
//! `WeightedMath` library:
//! https://github.com/balancer-labs/balancer-v2-monorepo/blob/master/pkg/pool-weighted/contracts/WeightedMath.sol
//!
//! All balances, weights and amounts are 18 decimal fixed point numbers and
//! weights are normalized, i.e. they sum up to one.

use super::{Error, Rounding, fixed_point::Bfp};

/// BPT minted for depositing `amounts_in`, charging swap fees on the part of
/// each deposit that exceeds a proportional join.
pub fn calc_bpt_out_given_exact_tokens_in(
    balances: &[Bfp],
    normalized_weights: &[Bfp],
    amounts_in: &[Bfp],
    bpt_total_supply: Bfp,
    swap_fee: Bfp,
    rounding: Rounding,
) -> Result<Bfp, Error> {
    let mut balance_ratios_with_fee = Vec::with_capacity(balances.len());
    let mut invariant_ratio_with_fees = Bfp::zero();
    for ((balance, weight), amount_in) in balances.iter().zip(normalized_weights).zip(amounts_in) {
        let ratio = balance.add(*amount_in)?.div_down(*balance)?;
        invariant_ratio_with_fees = invariant_ratio_with_fees.add(ratio.mul_down(*weight)?)?;
        balance_ratios_with_fee.push(ratio);
    }

    let mut invariant_ratio = Bfp::one();
    for (((balance, weight), amount_in), ratio) in balances
        .iter()
        .zip(normalized_weights)
        .zip(amounts_in)
        .zip(&balance_ratios_with_fee)
    {
        let amount_in_without_fee = if *ratio > invariant_ratio_with_fees {
            let non_taxable = balance.mul_down(invariant_ratio_with_fees.sub(Bfp::one())?)?;
            let taxable = amount_in.sub(non_taxable)?;
            // Fees are rounded up so that the pool never under-charges.
            non_taxable.add(taxable.sub(taxable.mul_up(swap_fee)?)?)?
        } else {
            *amount_in
        };

        let balance_ratio = balance.add(amount_in_without_fee)?.div(*balance, rounding)?;
        invariant_ratio = invariant_ratio.mul(balance_ratio.pow(*weight, rounding)?, rounding)?;
    }

    if invariant_ratio > Bfp::one() {
        bpt_total_supply.mul(invariant_ratio.sub(Bfp::one())?, rounding)
    } else {
        Ok(Bfp::zero())
    }
}

/// BPT burned for withdrawing exactly `amounts_out`, grossing up the part of
/// each withdrawal that exceeds a proportional exit by the swap fee.
pub fn calc_bpt_in_given_exact_tokens_out(
    balances: &[Bfp],
    normalized_weights: &[Bfp],
    amounts_out: &[Bfp],
    bpt_total_supply: Bfp,
    swap_fee: Bfp,
    rounding: Rounding,
) -> Result<Bfp, Error> {
    let mut balance_ratios_without_fee = Vec::with_capacity(balances.len());
    let mut invariant_ratio_without_fees = Bfp::zero();
    for ((balance, weight), amount_out) in balances.iter().zip(normalized_weights).zip(amounts_out) {
        let ratio = balance.sub(*amount_out)?.div_up(*balance)?;
        invariant_ratio_without_fees = invariant_ratio_without_fees.add(ratio.mul_up(*weight)?)?;
        balance_ratios_without_fee.push(ratio);
    }

    // The invariant ratio shrinks with every withdrawal, so the BPT burned
    // grows when it is rounded the opposite way.
    let inner = rounding.inverse();
    let mut invariant_ratio = Bfp::one();
    for (((balance, weight), amount_out), ratio) in balances
        .iter()
        .zip(normalized_weights)
        .zip(amounts_out)
        .zip(&balance_ratios_without_fee)
    {
        let amount_out_with_fee = if invariant_ratio_without_fees > *ratio {
            let non_taxable = balance.mul_down(invariant_ratio_without_fees.complement())?;
            let taxable = amount_out.sub(non_taxable)?;
            non_taxable.add(taxable.div_up(swap_fee.complement())?)?
        } else {
            *amount_out
        };

        let balance_ratio = balance.sub(amount_out_with_fee)?.div(*balance, inner)?;
        invariant_ratio = invariant_ratio.mul(balance_ratio.pow(*weight, inner)?, inner)?;
    }

    bpt_total_supply.mul(invariant_ratio.complement(), rounding)
}

/// Amount of a single token received for burning exactly `bpt_amount_in`.
pub fn calc_token_out_given_exact_bpt_in(
    balance: Bfp,
    normalized_weight: Bfp,
    bpt_amount_in: Bfp,
    bpt_total_supply: Bfp,
    swap_fee: Bfp,
    rounding: Rounding,
) -> Result<Bfp, Error> {
    // token out = balance * (1 - ((supply - bpt in) / supply)^(1 / weight))
    let inner = rounding.inverse();
    let invariant_ratio = bpt_total_supply
        .sub(bpt_amount_in)?
        .div(bpt_total_supply, inner)?;
    let balance_ratio = invariant_ratio.pow(Bfp::one().div_down(normalized_weight)?, inner)?;
    let amount_out_without_fee = balance.mul(balance_ratio.complement(), rounding)?;

    // Only the share of the exit that is not proportional gets charged.
    let taxable_percentage = normalized_weight.complement();
    let taxable = amount_out_without_fee.mul_up(taxable_percentage)?;
    let non_taxable = amount_out_without_fee.sub(taxable)?;

    non_taxable.add(taxable.mul(swap_fee.complement(), rounding)?)
}

/// Proportional exit: every balance shrinks by the share of burned BPT. Used by
/// both pool families since it does not depend on the invariant.
pub fn calc_tokens_out_given_exact_bpt_in(
    balances: &[Bfp],
    bpt_amount_in: Bfp,
    bpt_total_supply: Bfp,
) -> Result<Vec<Bfp>, Error> {
    let bpt_ratio = bpt_amount_in.div_down(bpt_total_supply)?;
    balances
        .iter()
        .map(|balance| balance.mul_down(bpt_ratio))
        .collect()
}

/// BPT that a fee-less deposit of `amounts` would mint at the pool's current
/// prices: `Σ amount_i * supply * weight_i / balance_i`.
pub fn bpt_for_tokens_zero_price_impact(
    balances: &[Bfp],
    normalized_weights: &[Bfp],
    amounts: &[Bfp],
    bpt_total_supply: Bfp,
) -> Result<Bfp, Error> {
    balances
        .iter()
        .zip(normalized_weights)
        .zip(amounts)
        .try_fold(Bfp::zero(), |total, ((balance, weight), amount)| {
            if amount.is_zero() {
                return Ok(total);
            }
            let price = balance.div_up(bpt_total_supply.mul_down(*weight)?)?;
            total.add(amount.div_down(price)?)
        })
}
