use chrono::NaiveDate;
use clap::Parser;
use pairtrader::commands::{run_score, run_simulate};
use pairtrader::config::SimulationConfig;
use pairtrader::selection::SelectionMethod;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

// --- CLI Argument Parsing ---
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set the verbosity level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    verbose: String,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Score every admissible pair in a price CSV
    Score {
        /// Dense price CSV (date column, one column per security, `index` benchmark)
        #[arg(short, long)]
        prices: PathBuf,
        /// Concurrent scoring workers
        #[arg(long, default_value_t = 10)]
        workers: usize,
        /// Optional JSON output path for the score table
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run the full scoring, selection, and backtest pipeline
    Simulate {
        /// Dense price CSV (date column, one column per security, `index` benchmark)
        #[arg(short, long)]
        prices: PathBuf,
        /// Index identifier used to label the benchmark
        #[arg(long, default_value = "index")]
        index_code: String,
        /// First date of the test window (YYYY-MM-DD)
        #[arg(long)]
        test_start: NaiveDate,
        /// Selection method: one of MDM, MFR, G
        #[arg(long, default_value = "MDM")]
        method: String,
        /// Rolling window length in days
        #[arg(long, default_value_t = 10)]
        window: usize,
        /// Z-score threshold that opens a position
        #[arg(long, default_value_t = 2.0)]
        open_threshold: f64,
        /// Z-score threshold that closes a position
        #[arg(long, default_value_t = 0.5)]
        close_threshold: f64,
        /// How many disjoint pairs to trade
        #[arg(long, default_value_t = 5)]
        top_n: usize,
        /// Months of training history before the test window
        #[arg(long, default_value_t = 12)]
        training_months: u32,
        /// Concurrent scoring workers
        #[arg(long, default_value_t = 10)]
        workers: usize,
        /// Optional JSON output path for the full report
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&cli.verbose).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match &cli.command {
        Commands::Score {
            prices,
            workers,
            output,
        } => {
            run_score(prices, *workers, output.as_deref()).await?;
        }
        Commands::Simulate {
            prices,
            index_code,
            test_start,
            method,
            window,
            open_threshold,
            close_threshold,
            top_n,
            training_months,
            workers,
            output,
        } => {
            // Reject a bad method before any scoring work happens.
            let method: SelectionMethod = method.parse()?;
            let config = SimulationConfig {
                index_code: index_code.clone(),
                training_months: *training_months,
                test_start: *test_start,
                method,
                window_size: *window,
                open_threshold: *open_threshold,
                close_threshold: *close_threshold,
                top_n: *top_n,
                scoring_workers: *workers,
            };
            run_simulate(prices, &config, output.as_deref()).await?;
        }
    }

    Ok(())
}
