use std::sync::Arc;

use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use solana_client::nonblocking::rpc_client::RpcClient;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bundler::bundle::{BundleAssembler, BundleSubmitter, OutcomeAggregator};
use bundler::config::Config;
use bundler::quote::QuoteClient;
use bundler::relay::RelayClient;
use bundler::server::{self, AppState};

#[derive(Parser, Debug)]
#[command(name = "bundler", about = "Atomic swap-bundle coordinator")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Override the configured API port
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "bundler=debug,info" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let config = Config::from_file_with_env(&args.config)?;
    let port = args.port.unwrap_or(config.server.port);

    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], config.server.metrics_port))
        .install()?;
    info!(port = config.server.metrics_port, "Prometheus exporter up");

    let rpc = Arc::new(RpcClient::new(config.rpc.url.clone()));
    let quotes = QuoteClient::new(&config.quote);
    let relay = RelayClient::new(&config.relay);

    let assembler = Arc::new(BundleAssembler::new(
        quotes.clone(),
        Arc::clone(&rpc),
        &config.tip,
        &config.compute,
    )?);
    let submitter = Arc::new(BundleSubmitter::new(relay, &config.relay));
    let aggregator = Arc::new(OutcomeAggregator::new(Arc::clone(&rpc)));

    info!(
        relay = %config.relay.url,
        mode = ?config.relay.submission_mode,
        "Starting bundle coordinator"
    );

    server::serve(
        port,
        AppState {
            assembler,
            submitter,
            aggregator,
            quotes,
            confirmation_timeout_ms: config.relay.confirmation_timeout_ms,
        },
    )
    .await
}
