use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use spotbot::api::CoincheckClient;
use spotbot::backtest::{BacktestRunner, MarketScenario, SyntheticMarket};
use spotbot::config::{ExecutionMode, MarketSource, Overrides, Settings, TraderConfig};
use spotbot::exchange::{Exchange, SimulatedExchange};
use spotbot::scheduler::{self, Scheduler, ShutdownSignal, SystemClock};
use spotbot::telemetry::Telemetry;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "spotbot", version, about = "Automated spot trading for one Coincheck pair")]
struct Cli {
    /// Settings file (defaults to config/default.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// btc, etc, fct or mona
    #[arg(long, global = true)]
    coin: Option<String>,

    #[arg(long, global = true)]
    algorithm: Option<String>,

    /// JPY per buy; empty spends the whole balance
    #[arg(long, global = true)]
    amount: Option<String>,

    /// Ticks per candle
    #[arg(long, global = true)]
    interval: Option<usize>,

    /// Paper trade instead of placing real orders
    #[arg(long, global = true)]
    simulation: bool,

    /// Price source while simulating: coincheck or synthetic
    #[arg(long, global = true)]
    market: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the trading loop (default)
    Run,
    /// Replay the trading loop against a synthetic market
    Backtest {
        /// Trading cycles to run after warm-up
        #[arg(long, default_value_t = 500)]
        candles: usize,

        #[arg(long)]
        seed: Option<u64>,

        #[arg(long, value_enum)]
        scenario: Option<MarketScenario>,

        /// Print metrics as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    fn overrides(&self) -> Overrides {
        let backtest = matches!(self.command, Some(Command::Backtest { .. }));
        Overrides {
            coin: self.coin.clone(),
            algorithm: self.algorithm.clone(),
            amount: self.amount.clone(),
            interval: self.interval,
            simulation: self.simulation || backtest,
            market: if backtest {
                Some("synthetic".to_string())
            } else {
                self.market.clone()
            },
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref(), &cli.overrides())
        .context("failed to load settings")?;
    let config = settings.validate().context("invalid configuration")?;

    match cli.command {
        None | Some(Command::Run) => run_trader(config).await,
        Some(Command::Backtest {
            candles,
            seed,
            scenario,
            json,
        }) => run_backtest(config, candles, seed, scenario, json).await,
    }
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("spotbot=info,spotbot::strategy=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run_trader(config: TraderConfig) -> anyhow::Result<()> {
    let (shutdown_handle, shutdown) = scheduler::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C, stopping at the next tick"),
            Err(e) => tracing::error!("Failed to listen for Ctrl+C: {}", e),
        }
        shutdown_handle.trigger();
    });

    match config.mode {
        ExecutionMode::Live => {
            let client = coincheck_client(&config)?;
            trade(config, client, shutdown).await
        }
        ExecutionMode::Simulation {
            market: MarketSource::Coincheck,
        } => {
            let client = coincheck_client(&config)?;
            trade(config, SimulatedExchange::new(client), shutdown).await
        }
        ExecutionMode::Simulation {
            market: MarketSource::Synthetic,
        } => {
            let market = SyntheticMarket::random_walk(config.scenario, config.seed);
            trade(config, SimulatedExchange::new(market), shutdown).await
        }
    }
}

fn coincheck_client(config: &TraderConfig) -> anyhow::Result<CoincheckClient> {
    let client = CoincheckClient::with_base_url(
        &config.api_base_url,
        &config.pair,
        config.credentials.clone(),
    )?;
    Ok(client)
}

async fn trade<E: Exchange>(
    config: TraderConfig,
    exchange: E,
    shutdown: ShutdownSignal,
) -> anyhow::Result<()> {
    let amount = config
        .verify_exchange(&exchange)
        .await
        .context("startup checks failed")?;

    if config.is_live() {
        tracing::warn!("============================");
        tracing::warn!("===== Production Mode ======");
        tracing::warn!("============================");
    } else {
        tracing::info!("🧪 Simulation mode: orders only move virtual balances");
    }
    tracing::info!(
        coin = %config.coin,
        algorithm = %config.algorithm,
        amount,
        interval = config.interval,
        "Trader configured"
    );

    // Only real trades are journaled
    let database_url = if config.is_live() {
        config.database_url.as_deref()
    } else {
        None
    };
    let telemetry = Telemetry::connect(
        database_url,
        config.redis_url.as_deref(),
        &config.project_name,
        &config.pair,
    )
    .await;

    let starting_profit = match telemetry.journal() {
        Some(journal) => match journal.load_cumulative_profit().await {
            Ok(profit) => {
                tracing::info!("✓ Restored cumulative profit {:+.2} from journal", profit);
                profit
            }
            Err(e) => {
                tracing::warn!("Failed to load cumulative profit from Postgres: {}", e);
                0.0
            }
        },
        None => 0.0,
    };

    let mut scheduler = Scheduler::new(
        config.scheduler_config(starting_profit),
        exchange,
        SystemClock,
        shutdown,
        telemetry,
    );
    let summary = scheduler.run().await?;

    tracing::info!(
        "👋 Stopped after {} cycles, {} round trips, profit {:+.2}",
        summary.cycles,
        summary.completed_trades,
        summary.cumulative_profit
    );
    Ok(())
}

async fn run_backtest(
    config: TraderConfig,
    candles: usize,
    seed: Option<u64>,
    scenario: Option<MarketScenario>,
    json: bool,
) -> anyhow::Result<()> {
    let scenario = scenario.unwrap_or(config.scenario);
    let seed = seed.unwrap_or(config.seed);
    let market = SyntheticMarket::random_walk(scenario, seed);

    tracing::info!("Backtesting {:?} market (seed {})", scenario, seed);
    let metrics = BacktestRunner::new(config.scheduler_config(0.0))
        .run(market, candles)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        metrics.print_report();
    }
    Ok(())
}
