//! Loading of the calculator configuration and of pool snapshots.

use {
    anyhow::{Context as _, Result, bail, ensure},
    bigdecimal::BigDecimal,
    pool_math::{ConvergencePolicy, Policy, PoolSnapshot},
    serde::Deserialize,
    serde_with::{DisplayFromStr, serde_as},
    std::path::Path,
    tokio::fs,
};

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Config {
    /// Price impact from which an operation is reported as high impact.
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[serde(default)]
    high_price_impact_threshold: Option<BigDecimal>,

    /// Whether a stable invariant that does not converge degrades to neutral
    /// results or fails the calculation.
    #[serde(default)]
    on_convergence_failure: ConvergencePolicy,
}

/// Load the calculator policy from a TOML file.
pub async fn load(path: &Path) -> Result<Policy> {
    let data = fs::read_to_string(path)
        .await
        .with_context(|| format!("I/O error while reading {path:?}"))?;
    parse(&data).with_context(|| format!("invalid configuration in {path:?}"))
}

fn parse(data: &str) -> Result<Policy> {
    let config = toml::de::from_str::<Config>(data)?;
    let default = Policy::default();
    let threshold = config
        .high_price_impact_threshold
        .unwrap_or(default.high_price_impact_threshold);
    ensure!(
        threshold >= BigDecimal::default(),
        "negative price impact threshold {threshold}"
    );
    Ok(Policy {
        high_price_impact_threshold: threshold,
        on_convergence_failure: config.on_convergence_failure,
    })
}

/// Load a pool snapshot. The format follows the file extension.
pub async fn load_snapshot(path: &Path) -> Result<PoolSnapshot> {
    let data = fs::read_to_string(path)
        .await
        .with_context(|| format!("I/O error while reading {path:?}"))?;
    let snapshot = match path.extension().and_then(|extension| extension.to_str()) {
        Some("toml") => toml::de::from_str(&data).map_err(anyhow::Error::from),
        Some("json") => serde_json::from_str(&data).map_err(anyhow::Error::from),
        _ => bail!("pool snapshot {path:?} is neither a .toml nor a .json file"),
    };
    snapshot.with_context(|| format!("invalid pool snapshot in {path:?}"))
}
