use clap::Parser;
use tcp_json_transfer::{load_config, Received, Receiver, TransferConfig, TransferError};
use tracing::{info, Level};

const EXAMPLE_CONFIG_FILE: &str = "transfer_example.yml";

/// Accepts one TCP client, reads until it closes and decodes the JSON it sent
#[derive(Parser)]
#[command(name = "receiver")]
#[command(about = "Receive a single JSON object over TCP and print it")]
#[command(version = "1.0")]
struct Args {
    /// Configuration file path (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Host to bind (overrides config file)
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides config file)
    #[arg(long)]
    port: Option<u16>,

    /// Read size in bytes (overrides config file)
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Generate example configuration file and exit
    #[arg(long)]
    generate_config: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    if args.generate_config {
        let yaml = TransferConfig::default().to_yaml()?;
        std::fs::write(EXAMPLE_CONFIG_FILE, yaml)?;
        println!("Generated example configuration: {EXAMPLE_CONFIG_FILE}");
        println!("  receiver --config {EXAMPLE_CONFIG_FILE}");
        println!("  sender --config {EXAMPLE_CONFIG_FILE} --payload profile");
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => TransferConfig::default(),
    };
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(chunk_size) = args.chunk_size {
        config.chunk_size = chunk_size;
    }
    config.validate()?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .enable_time()
        .build()?;

    let received = rt.block_on(async {
        let mut receiver = Receiver::bind(&config.endpoint())
            .await?
            .with_chunk_size(config.chunk_size);
        receiver.accept_one().await
    })?;

    report(&received)?;
    Ok(())
}

fn report(received: &Received) -> Result<(), TransferError> {
    println!("Received JSON string: {}", received.text());
    println!(
        "Converted to object: {}",
        serde_json::to_string_pretty(received.payload.as_map())?
    );

    if let Some(window) = received.plot_window() {
        info!("Plot window {}", window.summary());
    }
    if let Some(point) = received.data_point() {
        info!("Data point x={} y={:?}", point.x, point.y);
    }
    Ok(())
}
