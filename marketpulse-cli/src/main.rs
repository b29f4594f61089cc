//! MarketPulse CLI: analyze, quote and export commands.
//!
//! Commands:
//! - `analyze`: run one analysis cycle and print a summary (or JSON)
//! - `quote`: fetch realtime quotes for the given codes
//! - `export`: run one cycle and write the snapshot, per-index series and
//!   style ratio to a directory

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use marketpulse_core::data::{CircuitBreaker, RealtimeSource, TencentClient};
use marketpulse_engine::{
    export_json, export_outcome, AnalysisOutcome, BoardResult, EngineConfig, MarketSignalEngine,
    MarketSnapshot, StyleResult,
};

#[derive(Parser)]
#[command(name = "marketpulse", about = "MarketPulse: A-share market regime signals")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one analysis cycle.
    Analyze {
        #[command(flatten)]
        sources: SourceArgs,

        /// Print the full snapshot as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Fetch realtime quotes (e.g. sh000001 sz399006).
    Quote {
        #[arg(required = true)]
        codes: Vec<String>,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run one cycle and write its artifacts to a directory.
    Export {
        #[command(flatten)]
        sources: SourceArgs,

        /// Output directory.
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Offline mode with synthetic history only. The data is fake.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Directory of <code>.csv files tried after the live provider.
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Skip realtime quotes and use the last historical bar.
    #[arg(long, default_value_t = false)]
    no_realtime: bool,

    /// Skip language-model commentary.
    #[arg(long, default_value_t = false)]
    no_commentary: bool,
}

impl SourceArgs {
    fn load_config(&self) -> Result<EngineConfig> {
        let mut config = load_config(self.config.as_ref())?;
        if self.synthetic {
            config.sources.offline = true;
            config.sources.synthetic_fallback = true;
        }
        if let Some(dir) = &self.csv_dir {
            config.sources.csv_dir = Some(dir.clone());
        }
        if self.no_realtime {
            config.sources.realtime = false;
        }
        if self.no_commentary {
            config.commentary.enabled = false;
        }
        config.validate()?;
        Ok(config)
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { sources, json } => run_analyze(&sources, json),
        Commands::Quote { codes, config } => run_quote(&codes, config.as_ref()),
        Commands::Export { sources, out } => run_export(&sources, out),
    }
}

fn run_cycle(sources: &SourceArgs) -> Result<AnalysisOutcome> {
    let config = sources.load_config()?;
    tracing::info!(
        watchlist = config.watchlist.len(),
        offline = config.sources.offline,
        "starting analysis cycle"
    );
    let engine = MarketSignalEngine::from_config(config)?;
    Ok(engine.run_cycle())
}

fn run_analyze(sources: &SourceArgs, json: bool) -> Result<()> {
    let outcome = run_cycle(sources)?;

    if json {
        println!("{}", export_json(&outcome)?);
    } else {
        match &outcome {
            AnalysisOutcome::Snapshot(snapshot) => print_summary(snapshot),
            AnalysisOutcome::Failed { error } => eprintln!("{error}"),
        }
    }

    if outcome.snapshot().is_none() {
        std::process::exit(1);
    }
    Ok(())
}

fn run_quote(codes: &[String], config_path: Option<&PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let client = TencentClient::new(
        Duration::from_secs(config.sources.timeout_secs),
        Arc::new(CircuitBreaker::default_provider()),
    )?
    .with_urls(&config.sources.kline_url, &config.sources.quote_url);

    let quotes = client.fetch_realtime(codes)?;
    if quotes.is_empty() {
        bail!("no quotes returned for {}", codes.join(", "));
    }

    println!(
        "{:<10} {:<12} {:>10} {:>8} {:>14} {:>9}  Time",
        "Code", "Name", "Price", "Chg%", "Volume", "Valid"
    );
    println!("{}", "-".repeat(80));
    for quote in quotes.values() {
        println!(
            "{:<10} {:<12} {:>10.2} {:>8} {:>14} {:>9}  {}",
            quote.code,
            quote.name,
            quote.last_price,
            quote
                .pct_change
                .map(|p| format!("{p:+.2}"))
                .unwrap_or_else(|| "-".into()),
            quote
                .volume
                .map(|v| v.to_string())
                .unwrap_or_else(|| "-".into()),
            if quote.is_valid() { "yes" } else { "no" },
            quote.observed_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
    Ok(())
}

fn run_export(sources: &SourceArgs, out: PathBuf) -> Result<()> {
    let outcome = run_cycle(sources)?;
    let written = export_outcome(&outcome, &out)?;
    tracing::info!(files = written.len(), out = %out.display(), "export complete");
    for path in &written {
        println!("{}", path.display());
    }
    println!("Artifacts saved to: {}", out.display());
    Ok(())
}

fn print_summary(snapshot: &MarketSnapshot) {
    let as_of = snapshot
        .as_of
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".into());
    println!("As of:      {as_of}");
    println!(
        "Generated:  {}",
        snapshot.generated_at.format("%Y-%m-%d %H:%M:%S %:z")
    );
    println!();
    println!(
        "{:<6} {:<10} {:>10} {:<6} {:<12} {:<14} {:<24}",
        "Board", "Code", "Price", "Trend", "Funding", "Sentiment", "Timing"
    );
    println!("{}", "-".repeat(88));

    for board in &snapshot.boards {
        match board {
            BoardResult::Ok(signal) => println!(
                "{:<6} {:<10} {:>10.2} {:<6} {:<12} {:<14} {:<24}",
                signal.key,
                signal.code,
                signal.trend.current_price,
                signal.trend.status,
                signal
                    .funding
                    .as_ref()
                    .map_or_else(|| "unknown".to_string(), |f| f.status.to_string()),
                format!("{} {:+.2}%", signal.sentiment.status, signal.sentiment.score),
                signal.timing.status,
            ),
            BoardResult::Failed(failure) => println!(
                "{:<6} {:<10} error: {}",
                failure.key, failure.code, failure.error
            ),
        }
    }

    println!();
    match &snapshot.style {
        StyleResult::Ok(style) => println!(
            "Style:      {} ({}, ratio {})",
            style.suggestion,
            style.trend,
            style
                .current_ratio
                .map(|r| format!("{r:.2}"))
                .unwrap_or_else(|| "-".into())
        ),
        StyleResult::Failed { error } => println!("Style:      {error}"),
    }

    let macro_data = &snapshot.macro_data;
    match macro_data.margin_balance() {
        Some(total) => println!("Margin:     {:.2} billion CNY", total / 1e9),
        None => println!(
            "Margin:     unavailable ({})",
            macro_data.margin.error.as_deref().unwrap_or("unknown")
        ),
    }
    match macro_data.scissors() {
        Some(scissors) => println!(
            "M1-M2:      {scissors:+.2}% ({})",
            macro_data.money_supply.month_label().unwrap_or("-")
        ),
        None => println!(
            "M1-M2:      unavailable ({})",
            macro_data.money_supply.error().unwrap_or("unknown")
        ),
    }

    if let Some(commentary) = &snapshot.commentary {
        println!();
        println!("{commentary}");
    }
    println!();
    println!("Fingerprint: {}", snapshot.fingerprint);
}
