use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use seedmart_core::{ConfigOverrides, Error as CoreError, RunConfig};
use seedmart_generate::{AbortFlag, GenerationEngine, GenerationError, RunReport};
use seedmart_sink::{CsvSink, PostgresSink, SinkError};

#[derive(Debug, Error)]
enum CliError {
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("unsupported engine: {0}")]
    UnsupportedEngine(String),
}

#[derive(Parser, Debug)]
#[command(name = "seedmart", version, about = "Synthetic retail star-schema data generator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Postgres connection string target.
    #[arg(long, value_name = "CONNECTION_STRING")]
    conn: Option<String>,
    /// Write CSV files into this directory instead of a database.
    #[arg(long, value_name = "DIR", conflicts_with = "conn")]
    csv_out: Option<PathBuf>,
    /// Number of stores.
    #[arg(long)]
    stores: Option<u32>,
    /// Number of products.
    #[arg(long)]
    products: Option<u32>,
    /// Number of customers.
    #[arg(long)]
    customers: Option<u32>,
    /// Number of fact rows.
    #[arg(long)]
    sales: Option<u64>,
    /// Horizon length in days.
    #[arg(long)]
    days: Option<u32>,
    /// Explicit first day of the horizon (defaults to today minus the horizon).
    #[arg(long, value_name = "YYYY-MM-DD")]
    start_date: Option<NaiveDate>,
    /// Run seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Rows per committed batch.
    #[arg(long)]
    batch_size: Option<usize>,
    /// Probability that a sale draws from the loyalty pool.
    #[arg(long)]
    p_loyalty_sale: Option<f64>,
    /// Probability that a sale is discounted.
    #[arg(long)]
    p_discount: Option<f64>,
    /// Probability that a row is a return.
    #[arg(long)]
    p_return: Option<f64>,
    /// Enable the price-change (SCD) simulation on the product dimension.
    #[arg(long, default_value_t = false)]
    price_changes: bool,
    /// Fact-generation worker threads.
    #[arg(long)]
    workers: Option<usize>,
    /// Maximum in-flight batches in pipelined mode; 0 disables pipelining.
    #[arg(long)]
    pipeline_depth: Option<usize>,
    /// Optional path for the JSON run report.
    #[arg(long)]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Generate(args) => run_generate(args).await,
    }
}

async fn run_generate(args: GenerateArgs) -> Result<(), CliError> {
    let overrides = ConfigOverrides {
        num_stores: args.stores,
        num_products: args.products,
        num_customers: args.customers,
        num_sales: args.sales,
        date_range_days: args.days,
        start_date: args.start_date,
        seed: args.seed,
        batch_size: args.batch_size,
        p_loyalty_sale: args.p_loyalty_sale,
        p_discount: args.p_discount,
        p_return: args.p_return,
        price_changes: args.price_changes.then_some(true),
        workers: args.workers,
        pipeline_depth: args.pipeline_depth,
    };
    let config = RunConfig::resolve(&overrides)?;

    let abort = AbortFlag::new();
    let signal_abort = abort.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("abort requested; finishing the batch in flight");
            signal_abort.set();
        }
    });

    let engine = GenerationEngine::new(config);

    let report = match (args.conn, args.csv_out) {
        (Some(conn), None) => {
            detect_engine(&conn)?;
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(10))
                .connect(&conn)
                .await?;
            let mut sink = PostgresSink::new(pool);
            engine.run(&mut sink, &abort).await?
        }
        (None, Some(dir)) => {
            let mut sink = CsvSink::new(dir);
            engine.run(&mut sink, &abort).await?
        }
        _ => {
            return Err(CliError::InvalidConfig(
                "exactly one of --conn or --csv-out is required".to_string(),
            ));
        }
    };

    if let Some(path) = args.report {
        write_report(&path, &report)?;
        tracing::info!(path = %path.display(), "run report written");
    }

    tracing::info!(
        run_id = %report.run_id,
        facts = report.facts_generated,
        duration_ms = report.duration_ms,
        rows_per_sec = report.rows_per_sec as u64,
        "run finished"
    );
    Ok(())
}

fn write_report(path: &PathBuf, report: &RunReport) -> Result<(), CliError> {
    std::fs::write(path, serde_json::to_vec_pretty(report)?)?;
    Ok(())
}

fn detect_engine(conn: &str) -> Result<&'static str, CliError> {
    if conn.starts_with("postgres://") || conn.starts_with("postgresql://") {
        Ok("postgres")
    } else {
        Err(CliError::UnsupportedEngine(conn.to_string()))
    }
}
