//! ivcrush CLI
//!
//! # Usage
//!
//! ```bash
//! # Rank and size strategies for a batch of tickers
//! ivcrush analyze --input tickers.json --config config/engine.toml
//!
//! # Same, as JSON
//! ivcrush analyze --input tickers.json --json
//!
//! # Validate a configuration file (with IVCRUSH_* overrides applied)
//! ivcrush check-config --config config/engine.toml
//! ```

use std::fs;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use ivcrush::{BatchSummary, Decision, Engine, EngineConfig, TickerAnalysis, TickerInput};

#[derive(Parser)]
#[command(name = "ivcrush")]
#[command(about = "Pre-earnings volatility-crush strategy engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze tickers and print ranked, sized strategies
    Analyze {
        /// JSON array of ticker inputs
        #[arg(short, long)]
        input: String,

        /// Engine configuration (TOML or JSON); defaults apply when omitted
        #[arg(short, long)]
        config: Option<String>,

        /// Print the full analysis as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration and print the effective values
    CheckConfig {
        /// Engine configuration (TOML or JSON)
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn load_config(path: Option<&str>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => EngineConfig::load(path).with_context(|| format!("Loading {path}"))?,
        None => EngineConfig::default(),
    };
    config
        .apply_env_overrides()
        .context("Applying IVCRUSH_* overrides")?;
    Ok(config)
}

fn print_analysis(analysis: &TickerAnalysis) {
    println!("{}:", analysis.ticker);
    if let Some(vrp) = &analysis.vrp {
        println!(
            "  VRP: {:.2} ({}), implied {:.2}% vs historical {:.2}%",
            vrp.ratio,
            vrp.tier.as_str(),
            vrp.implied_move_pct,
            vrp.historical_mean_pct
        );
    }
    if let Some(liquidity) = &analysis.liquidity {
        println!("  Liquidity: {}", liquidity.tier.as_str());
    }
    if let Some(direction) = analysis.direction {
        println!("  Direction: {} (sentiment {:+.2})", direction.as_str(), analysis.sentiment);
    }

    match &analysis.decision {
        Decision::Trade => {
            for (rank, strategy) in analysis.strategies.iter().enumerate() {
                println!(
                    "  #{} {} {}  credit {}  max loss {}  POP {:.1}%  score {:.1}  x{}{}",
                    rank + 1,
                    strategy.kind(),
                    strategy.strikes_label(),
                    strategy.net_credit,
                    strategy.max_loss,
                    strategy.probability_of_profit * 100.0,
                    strategy.total_score(),
                    strategy.contracts(),
                    if strategy.reduced_sizing { " (reduced)" } else { "" }
                );
            }
        }
        Decision::NoTrade(reason) => {
            println!("  No trade: {} - {}", reason.code, reason.code.describe());
            println!("    {}", reason.message);
        }
    }

    for rejection in &analysis.rejections {
        let scope = rejection
            .strategy
            .map(|s| s.to_string())
            .unwrap_or_else(|| "ticker".to_string());
        println!("  [{}] {}: {}", rejection.code, scope, rejection.message);
    }
    println!();
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ivcrush=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            input,
            config,
            json,
        } => {
            let config = load_config(config.as_deref())?;
            let engine = Engine::new(config).context("Invalid engine configuration")?;

            let raw = fs::read_to_string(&input).with_context(|| format!("Reading {input}"))?;
            let inputs: Vec<TickerInput> =
                serde_json::from_str(&raw).with_context(|| format!("Parsing {input}"))?;

            let analyses = engine.analyze_batch(&inputs)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&analyses)?);
            } else {
                for analysis in &analyses {
                    print_analysis(analysis);
                }
                let summary = BatchSummary::from_analyses(&analyses);
                println!(
                    "{} ticker(s): {} trade, {} no trade",
                    summary.tickers, summary.trades, summary.no_trades
                );
                for (code, count) in &summary.by_reason {
                    println!("  {code}: {count}");
                }
            }
        }
        Commands::CheckConfig { config } => {
            let config = load_config(config.as_deref())?;
            config.validate().context("Invalid engine configuration")?;
            println!("{}", toml::to_string_pretty(&config)?);
            println!("Configuration OK");
        }
    }

    Ok(())
}
