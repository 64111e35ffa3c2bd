//! Papertrade CLI: replay recorded order sessions against the simulator.
//!
//! Commands:
//! - `replay`: apply scheduled order actions (JSON) and a quote tape (CSV)
//!   to a fresh portfolio, then print the result as JSON
//! - `config`: print the effective simulator configuration as TOML

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use papertrade_core::domain::{OrderId, Portfolio, PriceSnapshot, Quote};
use papertrade_core::engine::{OrderRequest, OrderStatistics, Simulator, TickReport};
use papertrade_core::{ManualClock, SimulatorConfig};

#[derive(Parser)]
#[command(name = "papertrade", about = "Paper-trading order simulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay scheduled order actions against a quote tape.
    Replay {
        /// Simulator config (TOML). Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// JSON array of scheduled actions.
        #[arg(long)]
        actions: PathBuf,

        /// CSV with columns timestamp,symbol,price,bid,ask.
        #[arg(long)]
        quotes: PathBuf,

        /// Starting cash.
        #[arg(long, default_value = "100000")]
        cash: Decimal,

        /// Write the result here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the effective configuration as TOML.
    Config {
        /// Config file to load and validate.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Replay {
            config,
            actions,
            quotes,
            cash,
            output,
        } => run_replay(config.as_deref(), &actions, &quotes, cash, output.as_deref()),
        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<SimulatorConfig> {
    match path {
        Some(path) => SimulatorConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(SimulatorConfig::default()),
    }
}

fn run_replay(
    config_path: Option<&Path>,
    actions_path: &Path,
    quotes_path: &Path,
    cash: Decimal,
    output: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path)?;

    let actions_text = std::fs::read_to_string(actions_path)
        .with_context(|| format!("reading actions {}", actions_path.display()))?;
    let actions = parse_actions(&actions_text)
        .with_context(|| format!("parsing actions {}", actions_path.display()))?;

    let quotes_file = std::fs::File::open(quotes_path)
        .with_context(|| format!("opening quotes {}", quotes_path.display()))?;
    let snapshots = load_snapshots(quotes_file)
        .with_context(|| format!("parsing quotes {}", quotes_path.display()))?;

    info!(
        actions = actions.len(),
        snapshots = snapshots.len(),
        %cash,
        "starting replay"
    );
    let result = replay(config, Portfolio::new(cash), actions, snapshots);

    let json = serde_json::to_string_pretty(&result)?;
    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "result written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

// ── Input formats ────────────────────────────────────────────────────

/// One entry of the actions file.
///
/// ```json
/// {"at": "2024-03-04T15:00:00Z", "action": "submit",
///  "order": {"type": "limit", "symbol": "AAPL", "side": "buy",
///            "quantity": "10", "limit_price": "140"}}
/// {"at": "2024-03-04T15:30:00Z", "action": "cancel", "order_id": 1}
/// ```
#[derive(Debug, Clone, Deserialize)]
struct ScheduledAction {
    at: DateTime<Utc>,
    #[serde(flatten)]
    action: Action,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum Action {
    Submit { order: OrderRequest },
    Cancel { order_id: OrderId },
}

/// Actions in time order; equal times keep file order.
fn parse_actions(text: &str) -> Result<Vec<ScheduledAction>> {
    let mut actions: Vec<ScheduledAction> = serde_json::from_str(text)?;
    actions.sort_by_key(|a| a.at);
    Ok(actions)
}

#[derive(Debug, Deserialize)]
struct QuoteRow {
    timestamp: DateTime<Utc>,
    symbol: String,
    price: String,
    bid: String,
    ask: String,
}

/// Rows sharing a timestamp form one snapshot. Snapshots come back in time
/// order.
fn load_snapshots<R: Read>(reader: R) -> Result<Vec<PriceSnapshot>> {
    let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut by_time: BTreeMap<DateTime<Utc>, PriceSnapshot> = BTreeMap::new();
    for (line, row) in csv.deserialize::<QuoteRow>().enumerate() {
        let row = row.with_context(|| format!("quote row {}", line + 1))?;
        let quote = Quote::new(
            parse_decimal(&row.price, "price", line)?,
            parse_decimal(&row.bid, "bid", line)?,
            parse_decimal(&row.ask, "ask", line)?,
        );
        by_time
            .entry(row.timestamp)
            .or_insert_with(|| PriceSnapshot::new(row.timestamp))
            .insert(row.symbol, quote);
    }
    Ok(by_time.into_values().collect())
}

fn parse_decimal(text: &str, field: &str, line: usize) -> Result<Decimal> {
    Decimal::from_str(text).with_context(|| format!("quote row {}: bad {field} {text:?}", line + 1))
}

// ── Replay ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ReplayResult {
    config: SimulatorConfig,
    /// Marked to the last quote seen for each symbol.
    equity: Decimal,
    statistics: OrderStatistics,
    ticks: Vec<TickSummary>,
    action_errors: Vec<ActionError>,
    portfolio: Portfolio,
}

#[derive(Debug, Serialize)]
struct TickSummary {
    as_of: DateTime<Utc>,
    #[serde(flatten)]
    report: TickReport,
}

#[derive(Debug, Serialize)]
struct ActionError {
    at: DateTime<Utc>,
    error: String,
}

fn replay(
    config: SimulatorConfig,
    mut portfolio: Portfolio,
    actions: Vec<ScheduledAction>,
    snapshots: Vec<PriceSnapshot>,
) -> ReplayResult {
    let start = actions
        .first()
        .map(|a| a.at)
        .or_else(|| snapshots.first().map(|s| s.as_of))
        .unwrap_or_else(Utc::now);
    let clock = ManualClock::new(start);
    let sim = Simulator::with_clock(config.clone(), Arc::new(clock.clone()));

    let mut pending_actions = actions.into_iter().peekable();
    let mut ticks = Vec::new();
    let mut action_errors = Vec::new();
    let mut last_prices = PriceSnapshot::new(start);

    let mut apply = |action: ScheduledAction, portfolio: &mut Portfolio| {
        clock.set(action.at);
        let result = match action.action {
            Action::Submit { order } => sim.submit_order(portfolio, order),
            Action::Cancel { order_id } => sim.cancel_order(portfolio, order_id),
        };
        if let Err(err) = result {
            warn!(at = %action.at, error = %err, "action failed");
            action_errors.push(ActionError {
                at: action.at,
                error: err.to_string(),
            });
        }
    };

    for snapshot in snapshots {
        while let Some(action) = pending_actions.next_if(|a| a.at <= snapshot.as_of) {
            apply(action, &mut portfolio);
        }
        clock.set(snapshot.as_of);
        let report = sim.process_tick(&mut portfolio, &snapshot);
        last_prices.as_of = snapshot.as_of;
        last_prices.quotes.extend(snapshot.quotes);
        if !report.is_empty() {
            ticks.push(TickSummary {
                as_of: last_prices.as_of,
                report,
            });
        }
    }
    for action in pending_actions {
        apply(action, &mut portfolio);
    }

    ReplayResult {
        equity: portfolio.equity(&last_prices),
        statistics: sim.order_statistics(&portfolio),
        config,
        ticks,
        action_errors,
        portfolio,
    }
}
