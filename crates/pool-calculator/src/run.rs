use {
    crate::{
        cli::{self, Command},
        config,
    },
    anyhow::Context as _,
    bigdecimal::BigDecimal,
    clap::Parser,
    pool_math::{Calculator, Mode, Policy, PriceImpact},
    serde::Serialize,
    serde_with::{DisplayFromStr, serde_as},
    std::collections::HashMap,
};

/// Parses the arguments, runs the calculation and prints its report to
/// stdout. Exits the process with a non-zero code on failure.
pub async fn start(args: impl Iterator<Item = String>) {
    let args = cli::Args::parse_from(args);
    observe::tracing::initialize(&observe::Config::new(&args.log, args.log_json));
    tracing::info!("running pool calculator with {args:#?}");

    match run(&args).await {
        Ok(report) => println!("{report}"),
        Err(err) => {
            tracing::error!(?err, "pool calculation failed");
            std::process::exit(1);
        }
    }
}

/// Runs the calculation and returns its report as JSON.
pub async fn run(args: &cli::Args) -> anyhow::Result<String> {
    let policy = match &args.config {
        Some(path) => config::load(path).await?,
        None => Policy::default(),
    };
    let snapshot = config::load_snapshot(&args.pool).await?;
    let calculator = Calculator::new(&snapshot, policy)
        .with_context(|| format!("invalid pool {:?}", args.pool))?;
    let report = execute(&calculator, &args.command)
        .with_context(|| format!("failed to run {:?}", args.command))?;
    Ok(serde_json::to_string_pretty(&report)?)
}

#[serde_as]
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    bpt: Option<BigDecimal>,
    #[serde_as(as = "Vec<DisplayFromStr>")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    amounts: Vec<BigDecimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    price_impact: Option<PriceImpact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    high_price_impact: Option<bool>,
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(skip_serializing_if = "Option::is_none")]
    total_liquidity: Option<BigDecimal>,
}

impl Report {
    fn with_price_impact(mut self, calculator: &Calculator, impact: PriceImpact) -> Self {
        self.high_price_impact = Some(calculator.is_high_price_impact(&impact));
        self.price_impact = Some(impact);
        self
    }
}

fn execute(calculator: &Calculator, command: &Command) -> Result<Report, pool_math::Error> {
    let report = match command {
        Command::Join { amounts } => {
            let amounts = amounts.iter().map(String::as_str).collect::<Vec<_>>();
            Report {
                bpt: Some(calculator.exact_tokens_in_for_bpt_out(&amounts)?),
                ..Default::default()
            }
            .with_price_impact(calculator, calculator.price_impact(&amounts, Mode::Join)?)
        }
        Command::ExitExactOut { amounts } => {
            let amounts = amounts.iter().map(String::as_str).collect::<Vec<_>>();
            Report {
                bpt: Some(calculator.bpt_in_for_exact_tokens_out(&amounts)?),
                ..Default::default()
            }
            .with_price_impact(
                calculator,
                calculator.price_impact(&amounts, Mode::ExitExactOut)?,
            )
        }
        Command::ExitSingleAsset {
            bpt_in,
            token_index,
        } => {
            let mode = Mode::ExitSingleAsset {
                token_index: *token_index,
                bpt_in: Calculator::parse_bpt(bpt_in)?,
            };
            Report {
                amounts: vec![calculator.exact_bpt_in_for_token_out(bpt_in, *token_index)?],
                ..Default::default()
            }
            .with_price_impact(calculator, calculator.price_impact(&[], mode)?)
        }
        Command::ExitProportional { bpt_in } => {
            let mode = Mode::ExitProportional {
                bpt_in: Calculator::parse_bpt(bpt_in)?,
            };
            Report {
                amounts: calculator.exact_bpt_in_for_tokens_out(bpt_in)?,
                ..Default::default()
            }
            .with_price_impact(calculator, calculator.price_impact(&[], mode)?)
        }
        Command::Proportional {
            token_index,
            amount,
        } => Report {
            amounts: calculator.proportional_amounts(*token_index, amount)?,
            ..Default::default()
        },
        Command::Liquidity { prices } => {
            let prices = prices.iter().cloned().collect::<HashMap<_, _>>();
            Report {
                total_liquidity: Some(calculator.total_liquidity(&prices)?),
                ..Default::default()
            }
        }
    };
    tracing::debug!(?report, "calculated");
    Ok(report)
}
