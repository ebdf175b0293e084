mod config;

use clap::{Parser, Subcommand};
use config::{CommonConfig, Config, ConfigError};
use metrics_exporter_statsd::StatsdBuilder;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(about = "Moz and LLM API gateway")]
struct Cli {
    #[arg(long, default_value = "gateway.yaml")]
    config_path: PathBuf,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    RpcRouter,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("missing `{0}` section in config")]
    MissingSection(&'static str),
    #[error("could not install metrics recorder: {0}")]
    Metrics(String),
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    RpcRouter(#[from] rpc_router::errors::RpcRouterError),
}

fn main() {
    let cli = Cli::parse();

    let config = match Config::from_file(&cli.config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let _sentry = init_logging(&config.common);

    if let Err(e) = run(cli.command, config) {
        tracing::error!(error = %e, "Exiting");
        process::exit(1);
    }
}

fn run(command: CliCommand, config: Config) -> Result<(), CliError> {
    init_metrics(&config.common)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    match command {
        CliCommand::RpcRouter => {
            let router_config = config
                .rpc_router
                .ok_or(CliError::MissingSection("rpc_router"))?;
            tracing::info!("Starting rpc-router");
            runtime.block_on(rpc_router::run(router_config))?;
        }
    }

    Ok(())
}

/// Installs the fmt subscriber, plus the Sentry layer when a DSN is configured.
/// The returned guard flushes Sentry on drop.
fn init_logging(common: &CommonConfig) -> Option<sentry::ClientInitGuard> {
    let default_filter = common
        .logging
        .as_ref()
        .map_or("info", |logging| logging.filter.as_str());
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let guard = common
        .logging
        .as_ref()
        .and_then(|logging| logging.sentry_dsn.as_deref())
        .map(|dsn| {
            sentry::init((
                dsn,
                sentry::ClientOptions {
                    release: sentry::release_name!(),
                    ..Default::default()
                },
            ))
        });
    let sentry_layer = guard
        .as_ref()
        .map(|_| sentry::integrations::tracing::layer());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_layer)
        .init();

    guard
}

fn init_metrics(common: &CommonConfig) -> Result<(), CliError> {
    let Some(metrics) = &common.metrics else {
        tracing::info!("No metrics configured, metrics are discarded");
        return Ok(());
    };

    let recorder = StatsdBuilder::from(metrics.statsd_host.as_str(), metrics.statsd_port)
        .build(Some(&metrics.prefix))
        .map_err(|e| CliError::Metrics(e.to_string()))?;
    metrics::set_global_recorder(recorder).map_err(|e| CliError::Metrics(e.to_string()))?;

    shared::metrics_defs::describe_metrics(rpc_router::metrics_defs::ALL_METRICS);
    tracing::info!(
        host = %metrics.statsd_host,
        port = metrics.statsd_port,
        "Sending metrics to statsd"
    );
    Ok(())
}
