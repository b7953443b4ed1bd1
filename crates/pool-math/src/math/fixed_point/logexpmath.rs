//! Power function with the exact integer semantics of Balancer's `LogExpMath`
//! library. Weighted pool formulas raise balance ratios to fractional weights
//! and must reproduce the contract results to the last wei.
// Contract code:
// https://github.com/balancer-labs/balancer-v2-monorepo/blob/6c9e24e22d0c46cca6dd15861d3d33da61a60b98/pkg/solidity-utils/contracts/math/LogExpMath.sol

use {
    crate::math::Error,
    alloy_primitives::{I256, U256},
    std::sync::LazyLock,
};

fn int(value: i128) -> I256 {
    I256::try_from(value).expect("every i128 fits into an I256")
}

fn ten_to(exp: u64) -> I256 {
    I256::from_raw(U256::from(10).pow(U256::from(exp)))
}

static ONE_18: LazyLock<I256> = LazyLock::new(|| ten_to(18));
static ONE_20: LazyLock<I256> = LazyLock::new(|| ten_to(20));
static ONE_36: LazyLock<I256> = LazyLock::new(|| ten_to(36));
static MAX_NATURAL_EXPONENT: LazyLock<I256> = LazyLock::new(|| *ONE_18 * int(130));
static MIN_NATURAL_EXPONENT: LazyLock<I256> = LazyLock::new(|| *ONE_18 * int(-41));
static LN_36_LOWER_BOUND: LazyLock<I256> = LazyLock::new(|| *ONE_18 - ten_to(17));
static LN_36_UPPER_BOUND: LazyLock<I256> = LazyLock::new(|| *ONE_18 + ten_to(17));
static MILD_EXPONENT_BOUND: LazyLock<U256> =
    LazyLock::new(|| (U256::ONE << 254) / U256::from(10).pow(U256::from(20)));

/// Exponents `x_n` with two-decimal precision (20 decimals) together with
/// `e^(x_n)` at the same precision, for `n` in `2..=11`. Index `n - 2`.
static TABLE_20: LazyLock<[(I256, I256); 10]> = LazyLock::new(|| {
    [
        (3_200_000_000_000_000_000_000, 7_896_296_018_268_069_516_100_000_000_000_000),
        (1_600_000_000_000_000_000_000, 888_611_052_050_787_263_676_000_000),
        (800_000_000_000_000_000_000, 298_095_798_704_172_827_474_000),
        (400_000_000_000_000_000_000, 5_459_815_003_314_423_907_810),
        (200_000_000_000_000_000_000, 738_905_609_893_065_022_723),
        (100_000_000_000_000_000_000, 271_828_182_845_904_523_536),
        (50_000_000_000_000_000_000, 164_872_127_070_012_814_685),
        (25_000_000_000_000_000_000, 128_402_541_668_774_148_407),
        (12_500_000_000_000_000_000, 113_314_845_306_682_631_683),
        (6_250_000_000_000_000_000, 106_449_445_891_785_942_956),
    ]
    .map(|(x, a)| (int(x), int(a)))
});

/// The two largest exponents `x_0` and `x_1` (18 decimals) with `e^(x_n)`
/// stored without decimals.
static TABLE_18: LazyLock<[(I256, I256); 2]> = LazyLock::new(|| {
    [
        (
            int(128_000_000_000_000_000_000),
            I256::from_dec_str("38877084059945950922200000000000000000000000000000000000")
                .expect("valid constant"),
        ),
        (
            int(64_000_000_000_000_000_000),
            int(6_235_149_080_811_616_882_910_000_000),
        ),
    ]
});

fn x_20(n: usize) -> I256 {
    TABLE_20[n - 2].0
}

fn a_20(n: usize) -> I256 {
    TABLE_20[n - 2].1
}

/// Computes `x^y` for 18 decimal fixed point numbers.
pub fn pow(x: U256, y: U256) -> Result<U256, Error> {
    if y.is_zero() {
        return Ok(ONE_18.into_raw());
    }
    if x.is_zero() {
        return Ok(U256::ZERO);
    }

    let x = I256::try_from(x).map_err(|_| Error::XOutOfBounds)?;
    if y >= *MILD_EXPONENT_BOUND {
        return Err(Error::YOutOfBounds);
    }
    let y = I256::try_from(y).map_err(|_| Error::YOutOfBounds)?;

    let ln_x_times_y = if *LN_36_LOWER_BOUND < x && x < *LN_36_UPPER_BOUND {
        let ln_36_x = ln_36(x);
        // Split the multiplication to keep the intermediate value in range.
        (ln_36_x / *ONE_18) * y + ((ln_36_x % *ONE_18) * y) / *ONE_18
    } else {
        ln(x) * y
    };
    let ln_x_times_y = ln_x_times_y / *ONE_18;

    if !(*MIN_NATURAL_EXPONENT <= ln_x_times_y && ln_x_times_y <= *MAX_NATURAL_EXPONENT) {
        return Err(Error::ProductOutOfBounds);
    }

    exp(ln_x_times_y).map(I256::into_raw)
}

fn exp(mut x: I256) -> Result<I256, Error> {
    if !(*MIN_NATURAL_EXPONENT <= x && x <= *MAX_NATURAL_EXPONENT) {
        return Err(Error::InvalidExponent);
    }
    if x.is_negative() {
        return Ok((*ONE_18 * *ONE_18) / exp(-x)?);
    }

    // Peel off the two large exponents, which are stored without decimals.
    let mut first_an = int(1);
    for &(x_n, a_n) in TABLE_18.iter() {
        if x >= x_n {
            x -= x_n;
            first_an = a_n;
            break;
        }
    }

    // From here on everything is computed with 20 decimals.
    x *= int(100);

    let mut product = *ONE_20;
    for n in 2..=9 {
        if x >= x_20(n) {
            x -= x_20(n);
            product = (product * a_20(n)) / *ONE_20;
        }
    }

    // Taylor series for the remainder, which is now smaller than x_9.
    let mut series_sum = *ONE_20;
    let mut term = x;
    series_sum += term;
    for n in 2..=12 {
        term = ((term * x) / *ONE_20) / int(n);
        series_sum += term;
    }

    Ok((((product * series_sum) / *ONE_20) * first_an) / int(100))
}

fn ln(mut a: I256) -> I256 {
    if a < *ONE_18 {
        return -ln((*ONE_18 * *ONE_18) / a);
    }

    let mut sum = I256::ZERO;
    for &(x_n, a_n) in TABLE_18.iter() {
        if a >= a_n * *ONE_18 {
            a /= a_n;
            sum += x_n;
        }
    }

    sum *= int(100);
    a *= int(100);

    for n in 2..=11 {
        if a >= a_20(n) {
            a = (a * *ONE_20) / a_20(n);
            sum += x_20(n);
        }
    }

    // ln(a) = 2 * atanh(z) with z = (a - 1) / (a + 1).
    let z = ((a - *ONE_20) * *ONE_20) / (a + *ONE_20);
    let z_squared = (z * z) / *ONE_20;

    let mut num = z;
    let mut series_sum = num;
    for n in (3..=11).step_by(2) {
        num = (num * z_squared) / *ONE_20;
        series_sum += num / int(n);
    }
    series_sum *= int(2);

    (sum + series_sum) / int(100)
}

/// High precision (36 decimals) natural logarithm for arguments close to one.
fn ln_36(mut x: I256) -> I256 {
    x *= *ONE_18;

    let z = ((x - *ONE_36) * *ONE_36) / (x + *ONE_36);
    let z_squared = (z * z) / *ONE_36;

    let mut num = z;
    let mut series_sum = num;
    for n in (3..=15).step_by(2) {
        num = (num * z_squared) / *ONE_36;
        series_sum += num / int(n);
    }

    series_sum * int(2)
}
