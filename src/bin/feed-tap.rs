//! Diagnostics tool for the sensor feed.
//!
//! Usage:
//!   cargo run --bin feed-tap -- --endpoint ws://10.0.0.40:81
//!
//! Connects once, prints every raw message with its decode result and exits
//! when the feed closes. No reconnects.

use clap::Parser;
use group_climate_feed::config::{DEFAULT_ENDPOINT, FeedConfig};
use group_climate_feed::feed::{
    Transport, TransportEvent, TransportStream, WebSocketTransport, decode,
};
use log::{info, warn};

#[derive(Parser)]
#[command(name = "feed-tap")]
#[command(about = "Print raw sensor feed messages and how they decode")]
struct Cli {
    /// Sensor feed WebSocket URL
    #[arg(long, env = "FEED_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Stop after this many messages
    #[arg(long)]
    count: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    FeedConfig::new(cli.endpoint.as_str()).validate()?;

    info!("Connecting to {}...", cli.endpoint);
    let mut stream = WebSocketTransport.connect(&cli.endpoint).await?;
    info!("Connected!");

    let mut received = 0usize;
    loop {
        match stream.next_event().await {
            TransportEvent::Message(payload) => {
                received += 1;
                let text = String::from_utf8_lossy(&payload);
                match decode(&payload) {
                    Ok(reading) => println!(
                        "{} -> {} {:.2} {:.2}",
                        text, reading.group_id, reading.temperature, reading.humidity
                    ),
                    Err(e) => println!("{} -> {}", text, e),
                }
                if cli.count.is_some_and(|count| received >= count) {
                    stream.close().await;
                    break;
                }
            }
            TransportEvent::Error(e) => warn!("Transport error: {}", e),
            TransportEvent::Closed => {
                info!("Feed closed connection");
                break;
            }
        }
    }

    info!("Received {} message(s)", received);
    Ok(())
}
