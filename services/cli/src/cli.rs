use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use pdufa_engine::analysis::TrustPolicy;
use pdufa_engine::error::AppError;
use pdufa_engine::facts::FactValue;

use crate::commands::{self, Engine};

#[derive(Parser, Debug)]
#[command(
    name = "pdufa",
    about = "Estimate FDA approval odds for pending PDUFA decisions from verified fact records",
    version
)]
struct Cli {
    #[command(flatten)]
    globals: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
pub(crate) struct GlobalArgs {
    /// Directory holding one `<event_id>.json` fact record per event
    #[arg(long, global = true, default_value = "facts")]
    pub(crate) facts_dir: PathBuf,
    /// Calculator constants file (overrides PDUFA_CONSTANTS_PATH)
    #[arg(long, global = true)]
    pub(crate) constants: Option<PathBuf>,
    /// Fact admission policy: `strict` or `standard` (overrides PDUFA_TRUST_POLICY)
    #[arg(long, global = true, value_parser = crate::infra::parse_trust_policy)]
    pub(crate) trust_policy: Option<TrustPolicy>,
    /// Analysis date; defaults to today
    #[arg(long, global = true, value_parser = crate::infra::parse_as_of)]
    pub(crate) as_of: Option<NaiveDate>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a single event and explain the result
    Analyze(AnalyzeArgs),
    /// Analyze many events concurrently and write a CSV summary
    Batch(BatchArgs),
    /// Score the engine against events with recorded outcomes
    Backtest(BacktestArgs),
    /// List the registered factors in evaluation order
    Factors(FactorsArgs),
}

#[derive(Args, Debug)]
pub(crate) struct AnalyzeArgs {
    /// Event identifier (file stem in the facts directory)
    pub(crate) event_id: String,
    /// Emit the full result as JSON instead of the explanation
    #[arg(long)]
    pub(crate) json: bool,
    /// Compare against a variant with one fact overridden, e.g. `pai_passed=false`.
    /// Repeat for several independent scenarios.
    #[arg(long = "what-if", value_name = "FACT=VALUE", value_parser = crate::infra::parse_assignment)]
    pub(crate) what_if: Vec<(String, FactValue)>,
}

#[derive(Args, Debug)]
pub(crate) struct BatchArgs {
    /// Events to analyze; defaults to every record in the facts directory
    pub(crate) event_ids: Vec<String>,
    /// Write the CSV here instead of stdout
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Concurrent analyses (overrides PDUFA_BATCH_CONCURRENCY)
    #[arg(long)]
    pub(crate) concurrency: Option<usize>,
}

#[derive(Args, Debug)]
pub(crate) struct BacktestArgs {
    /// Probability at or above which an approval is predicted
    #[arg(long, default_value_t = 0.5)]
    pub(crate) threshold: f64,
    /// Emit the full report as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct FactorsArgs {
    /// Only list factors in this layer (e.g. `designation`, `cap`)
    #[arg(long)]
    pub(crate) layer: Option<String>,
    /// Emit the listing as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let engine = Engine::start(cli.globals)?;

    match cli.command {
        Command::Analyze(args) => commands::analyze(&engine, args),
        Command::Batch(args) => commands::batch(&engine, args).await,
        Command::Backtest(args) => commands::backtest(&engine, args),
        Command::Factors(args) => commands::factors(&engine, args),
    }
}
