use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, CommandFactory, Parser, Subcommand};
use fcn::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct AnalyzeCommand {
    /// Tickers to analyze, comma or space separated (at most 5)
    tickers: Vec<String>,

    /// Knock-out level, percent of the latest close
    #[arg(long = "ko")]
    ko_pct: Option<f64>,

    /// Strike level, percent of the latest close
    #[arg(long = "strike")]
    strike_pct: Option<f64>,

    /// Knock-in level, percent of the latest close (0 for none)
    #[arg(long = "ki")]
    ki_pct: Option<f64>,

    /// Product tenor in months
    #[arg(short = 'm', long = "months")]
    period_months: Option<u32>,

    /// First day of the backtest history (YYYY-MM-DD)
    #[arg(short, long)]
    start: Option<NaiveDate>,

    /// Print the reports as JSON
    #[arg(long)]
    json: bool,
}

impl From<AnalyzeCommand> for fcn::AnalyzeArgs {
    fn from(cmd: AnalyzeCommand) -> fcn::AnalyzeArgs {
        fcn::AnalyzeArgs {
            tickers: cmd.tickers,
            ko_pct: cmd.ko_pct,
            strike_pct: cmd.strike_pct,
            ki_pct: cmd.ki_pct,
            period_months: cmd.period_months,
            start: cmd.start,
            json: cmd.json,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Backtest strike and barrier levels for one or more tickers
    Analyze(AnalyzeCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fcn::cli::setup::setup(),
        Some(Commands::Analyze(cmd)) => {
            fcn::run_command(
                fcn::AppCommand::Analyze(cmd.into()),
                cli.config_path.as_deref(),
            )
            .await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
