use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use rusty_macros::{
    config::Config,
    dashboard::{format_correlations, Dashboard, PlotRequest},
    fred::Fred,
    ingest,
    mysql_db::Database,
    scale::ScaleMode,
    snapshot::SnapshotDir,
    store::{SeriesStore, TableSink, UnavailableSink},
    timeseries::parse_date,
    yahoo::Yahoo,
    Result,
};

#[derive(Parser, Debug)]
#[command(name = "rusty-macros", version, about = "Macroeconomic indicators vs. the stock market")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short, default_value = "config.toml", env = "RUSTY_MACROS_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch new observations and refresh snapshots and tables
    Ingest,
    /// Draw indicators against the benchmark as a PNG chart
    Plot {
        /// Comma-separated indicator names (default: all configured)
        #[arg(long, value_delimiter = ',')]
        indicators: Vec<String>,
        /// raw, log or z-score
        #[arg(long, default_value = "raw", value_parser = parse_scale)]
        scale: ScaleMode,
        #[arg(long, value_parser = parse_day)]
        start: Option<NaiveDate>,
        #[arg(long, value_parser = parse_day)]
        end: Option<NaiveDate>,
        /// Single indicator vs. benchmark chart instead
        #[arg(long, conflicts_with_all = ["indicators", "scale"])]
        pair: Option<String>,
        /// Read CSV snapshots instead of the database
        #[arg(long)]
        from_csv: bool,
    },
    /// Print Pearson correlations of every indicator with the benchmark
    Correlate {
        #[arg(long)]
        from_csv: bool,
    },
}

fn parse_scale(s: &str) -> std::result::Result<ScaleMode, String> {
    s.parse().map_err(|e: rusty_macros::Error| e.to_string())
}

fn parse_day(s: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(s).map_err(|e| e.to_string())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::read_config(&cli.config)?;
    info!(
        "Starting rusty-macros v{} ({} FRED series, {} tickers)",
        env!("CARGO_PKG_VERSION"),
        config.fred_series.len(),
        config.tickers.len()
    );

    match cli.command {
        Command::Ingest => {
            let fred = Fred::from_config(&config)?;
            let yahoo = Yahoo::from_config(&config)?;
            let mut sink: Box<dyn TableSink> = match Database::from_config(&config) {
                Ok(database) => Box::new(database),
                Err(e) => {
                    error!("Cannot reach the database, only snapshots will be updated: {}", e);
                    Box::new(UnavailableSink::new(e.to_string()))
                }
            };
            let report = ingest::run(&config, &fred, &yahoo, sink.as_mut());
            for (name, outcome) in &report.outcomes {
                println!("{:<28} {}", name, outcome);
            }
        }
        Command::Plot {
            indicators,
            scale,
            start,
            end,
            pair,
            from_csv,
        } => {
            let mut store = open_store(&config, from_csv)?;
            let mut dashboard = Dashboard::new(&config, store.as_mut());
            let written = match pair {
                Some(indicator) => dashboard.plot_pair(&indicator),
                None => dashboard.plot_comparison(&PlotRequest {
                    indicators,
                    scale,
                    start,
                    end,
                }),
            };
            match written {
                Ok(path) => println!("{}", path.display()),
                Err(e) => warn!("Nothing plotted: {}", e),
            }
        }
        Command::Correlate { from_csv } => {
            let mut store = open_store(&config, from_csv)?;
            let table = Dashboard::new(&config, store.as_mut()).correlations()?;
            print!("{}", format_correlations(&table, &config.benchmark));
        }
    }
    Ok(())
}

fn open_store(config: &Config, from_csv: bool) -> Result<Box<dyn SeriesStore>> {
    if from_csv {
        Ok(Box::new(SnapshotDir::new(&config.data_dir)))
    } else {
        Ok(Box::new(Database::from_config(config)?))
    }
}
