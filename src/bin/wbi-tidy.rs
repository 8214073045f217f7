use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use wbi_tidy::Client;
use wbi_tidy::api::DEFAULT_BASE_URL;
use wbi_tidy::models::DEFAULT_INDICATORS;
use wbi_tidy::pipeline::{self, DEFAULT_PREFIX};

/// With no flags, fetches the default indicators to `./build/worldbank_<id>.csv`.
#[derive(Parser, Debug)]
#[command(
    name = "wbi-tidy",
    version,
    about = "Fetch World Bank indicators for all countries as tidy country/year/value CSV"
)]
struct Cli {
    /// Output path prefix; files are written to <PREFIX>_<INDICATOR>.csv
    #[arg(long, default_value = DEFAULT_PREFIX)]
    prefix: PathBuf,
    /// Fetch the full indicator catalog and also write <PREFIX>_meta.csv
    #[arg(long, default_value_t = false, conflicts_with = "indicators")]
    all: bool,
    /// Indicator codes separated by comma or semicolon (e.g., SP.POP.TOTL)
    #[arg(short, long)]
    indicators: Option<String>,
}

/// Split on comma/semicolon, dropping blanks and repeats (first occurrence wins).
fn parse_list(s: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for x in s.split([',', ';']).map(str::trim).filter(|x| !x.is_empty()) {
        if !out.iter().any(|seen| seen == x) {
            out.push(x.to_string());
        }
    }
    out
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let client = Arc::new(Client::new(DEFAULT_BASE_URL).context("build http client")?);

    let written = if cli.all {
        pipeline::fetch_and_save_all(client, &cli.prefix)
            .await
            .context("fetch indicator catalog")?
    } else {
        let indicators = match cli.indicators.as_deref() {
            Some(list) => parse_list(list),
            None => DEFAULT_INDICATORS.iter().map(|s| s.to_string()).collect(),
        };
        if indicators.is_empty() {
            anyhow::bail!("no indicator codes given");
        }
        pipeline::fetch_and_save_many(client, &cli.prefix, indicators)
            .await
            .context("fetch indicators")?
    };

    for f in &written {
        eprintln!("Saved {} rows to {}", f.rows, f.path.display());
    }
    Ok(())
}
