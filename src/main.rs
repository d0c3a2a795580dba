use clap::Parser;
use group_climate_feed::config::{DEFAULT_ENDPOINT, DEFAULT_RECONNECT_DELAY_MS, FeedConfig};
use group_climate_feed::feed::{ConnectionManager, GroupAggregator, WebSocketTransport};
use group_climate_feed::presentation::{FeedView, LogPresenter, Presenter};
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

#[derive(Parser)]
#[command(name = "group-climate-feed")]
#[command(about = "Show live temperature/humidity per sensor group")]
struct Cli {
    /// Sensor feed WebSocket URL
    #[arg(long, env = "FEED_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Wait before reconnecting after the feed drops
    #[arg(long, env = "FEED_RECONNECT_DELAY_MS", default_value_t = DEFAULT_RECONNECT_DELAY_MS)]
    reconnect_delay_ms: u64,

    /// JSON config file; overrides --endpoint and --reconnect-delay-ms
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seconds between renders
    #[arg(long, default_value_t = 5)]
    refresh_secs: u64,

    /// Flag groups with no reading for this many seconds
    #[arg(long, default_value_t = 60)]
    stale_secs: u64,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

#[tokio::main]
async fn main() {
    init_logger();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match FeedConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load config {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => FeedConfig::new(cli.endpoint).with_reconnect_delay_ms(cli.reconnect_delay_ms),
    };

    info!("Starting group climate feed");
    info!("  Endpoint: {}", config.endpoint_address);
    info!("  Reconnect delay: {} ms", config.reconnect_delay_ms);

    let aggregator = Arc::new(GroupAggregator::new());
    let manager = ConnectionManager::new(config, Arc::new(WebSocketTransport), aggregator.clone());

    if let Err(e) = manager.start() {
        error!("Failed to start feed: {}", e);
        std::process::exit(1);
    }

    let mut presenter = LogPresenter::new(Duration::from_secs(cli.stale_secs));
    let mut interval = tokio::time::interval(Duration::from_secs(cli.refresh_secs.max(1)));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                presenter.render(manager.connectivity(), &FeedView::capture(&aggregator));
            }
            result = signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("Received shutdown signal"),
                    Err(e) => error!("Failed to listen for shutdown signal: {}", e),
                }
                break;
            }
        }
    }

    manager.stop().await;
    info!("Group climate feed stopped");
}
