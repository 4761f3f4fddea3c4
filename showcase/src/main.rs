mod config;

use clap::{Args, Parser, Subcommand};
use config::{CommonConfig, Config, ConfigError, LoggingConfig, MetricsConfig};
use metrics_exporter_statsd::StatsdBuilder;
use shared::metrics_defs::describe_all;
use std::path::PathBuf;
use std::process;
use storefront::config::ValidationError;
use storefront::errors::StorefrontError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const METRICS_PREFIX: &str = "showcase";

#[derive(Parser)]
#[command(about = "Feature flag driven recommendation page")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Serve the recommendation page
    Serve(ConfigArgs),
    /// Load and validate the config file, then exit
    Validate(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    #[arg(long)]
    config_file_path: PathBuf,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),
    #[error("could not start metrics exporter: {0}")]
    Metrics(String),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Storefront(#[from] StorefrontError),
}

fn main() {
    // A missing .env file is fine.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let result = match cli.command {
        CliCommand::Serve(args) => serve(&args),
        CliCommand::Validate(args) => validate(&args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn load(args: &ConfigArgs) -> Result<Config, CliError> {
    let config = Config::from_file(&args.config_file_path)?;
    config.storefront.validate()?;
    Ok(config)
}

fn validate(args: &ConfigArgs) -> Result<(), CliError> {
    load(args)?;
    println!("{} is valid", args.config_file_path.display());
    Ok(())
}

fn serve(args: &ConfigArgs) -> Result<(), CliError> {
    let config = load(args)?;

    // Flushes pending Sentry events when dropped.
    let _sentry_guard = init_logging(&config.common);
    init_metrics(config.common.metrics.as_ref())?;

    tracing::info!(
        config_file = %args.config_file_path.display(),
        "Starting showcase"
    );

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(storefront::run(config.storefront))?;
    Ok(())
}

fn init_logging(common: &CommonConfig) -> Option<sentry::ClientInitGuard> {
    let guard = common.logging.as_ref().map(|LoggingConfig { sentry_dsn }| {
        sentry::init((
            sentry_dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(guard.as_ref().map(|_| sentry::integrations::tracing::layer()))
        .init();

    guard
}

fn init_metrics(metrics: Option<&MetricsConfig>) -> Result<(), CliError> {
    let Some(MetricsConfig {
        statsd_host,
        statsd_port,
    }) = metrics
    else {
        return Ok(());
    };

    let recorder = StatsdBuilder::from(statsd_host.as_str(), *statsd_port)
        .build(Some(METRICS_PREFIX))
        .map_err(|e| CliError::Metrics(e.to_string()))?;
    metrics::set_global_recorder(recorder).map_err(|e| CliError::Metrics(e.to_string()))?;

    describe_all(flag_client::metrics_defs::ALL_METRICS);
    describe_all(recommender::metrics_defs::ALL_METRICS);
    describe_all(storefront::metrics_defs::ALL_METRICS);

    tracing::info!(%statsd_host, statsd_port, "StatsD metrics enabled");
    Ok(())
}
