use clap::Parser;
use std::time::Duration;
use tcp_json_transfer::{load_config, send_payload, PayloadKind, TransferConfig, TransferError};
use tracing::{info, Level};

/// Sends one fixed JSON payload over a single TCP connection, then closes it
#[derive(Parser)]
#[command(name = "sender")]
#[command(about = "Send a fixed JSON object to the receiver and close the connection")]
#[command(version = "1.0")]
struct Args {
    /// Configuration file path (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Payload to send (overrides config file)
    #[arg(short, long, value_enum)]
    payload: Option<PayloadKind>,

    /// Receiver host (overrides config file)
    #[arg(long)]
    host: Option<String>,

    /// Receiver port (overrides config file)
    #[arg(long)]
    port: Option<u16>,

    /// Pause before connecting, in milliseconds (overrides config file)
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => TransferConfig::default(),
    };
    if let Some(payload) = args.payload {
        config.payload = payload;
    }
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(delay_ms) = args.delay_ms {
        config.delay_ms = delay_ms;
    }
    config.validate()?;

    let payload = config.payload.build();
    println!("Sending JSON string: {payload}");

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .enable_time()
        .build()?;

    rt.block_on(async {
        // Gives a receiver started at the same time a moment to bind.
        if config.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(config.delay_ms)).await;
        }

        let endpoint = config.endpoint();
        let written = send_payload(&endpoint, &payload).await?;
        info!("Sent {} payload ({written} bytes) to {endpoint}", config.payload);
        Ok::<(), TransferError>(())
    })?;

    println!("Data sent to server.");
    Ok(())
}
