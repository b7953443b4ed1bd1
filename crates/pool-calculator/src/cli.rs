//! CLI arguments for the `pool-calculator` binary.

use {
    alloy_primitives::Address,
    anyhow::Context as _,
    bigdecimal::BigDecimal,
    clap::{Parser, Subcommand},
    std::{path::PathBuf, str::FromStr},
};

/// Run pool math on a snapshot of a weighted or stable pool
#[derive(Parser, Debug)]
#[command(version)]
pub struct Args {
    /// The log filter.
    #[arg(long, env, default_value = "warn,pool_calculator=info,pool_math=info")]
    pub log: String,

    /// Output log events as JSON.
    #[arg(long, env)]
    pub log_json: bool,

    /// Path to the calculator configuration file. This file should be in TOML
    /// format. Defaults apply when it is omitted.
    #[arg(long, env)]
    pub config: Option<PathBuf>,

    /// Path to the pool snapshot, either a `.toml` or a `.json` file.
    #[arg(long, env)]
    pub pool: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// The calculation to run.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// BPT received for depositing exactly the given amounts.
    Join {
        /// Human readable amounts in pool token order. Missing trailing
        /// amounts are zero.
        amounts: Vec<String>,
    },
    /// BPT burned for withdrawing exactly the given amounts.
    ExitExactOut {
        /// Human readable amounts in pool token order.
        amounts: Vec<String>,
    },
    /// Amount of a single token received for burning exactly `bpt_in`.
    ExitSingleAsset {
        #[arg(long)]
        bpt_in: String,
        #[arg(long)]
        token_index: usize,
    },
    /// Amounts of all tokens received for burning exactly `bpt_in`.
    ExitProportional {
        #[arg(long)]
        bpt_in: String,
    },
    /// Amounts of all tokens for a proportional join in which one token
    /// contributes exactly `amount`.
    Proportional {
        #[arg(long)]
        token_index: usize,
        #[arg(long)]
        amount: String,
    },
    /// Total value of the pool's reserves.
    Liquidity {
        /// Price of a token as `ADDRESS=PRICE`. Can be repeated.
        #[arg(long = "price", value_parser = parse_price)]
        prices: Vec<(Address, BigDecimal)>,
    },
}

fn parse_price(s: &str) -> anyhow::Result<(Address, BigDecimal)> {
    let (token, price) = s
        .split_once('=')
        .context("expected a price as ADDRESS=PRICE")?;
    let token = Address::from_str(token).context("invalid token address")?;
    let price = BigDecimal::from_str(price).context("invalid price")?;
    Ok((token, price))
}
