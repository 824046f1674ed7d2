use std::net::SocketAddr;

pub use config::{load_config, TransferConfig};
pub use payload::{Payload, PayloadKind};
pub use plot::{DataPoint, PlotWindow, Rgba};
pub use receiver::{read_to_eof, receive_once, Received, Receiver, ReceiverState};
pub use sender::{send_payload, Sender};

pub mod config;
pub mod payload;
pub mod plot;
pub mod receiver;
pub mod sender;

/// Host both binaries use unless configured otherwise
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port both binaries use unless configured otherwise
pub const DEFAULT_PORT: u16 = 65432;

/// Upper bound of a single read from the accepted connection
pub const READ_CHUNK_SIZE: usize = 1024;

/// Error type for transfer operations
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Could not connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not bind {endpoint}: {source}")]
    Bind {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Accept failed on {local}: {source}")]
    Accept {
        local: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("Receiver already served its client (state {0})")]
    AlreadyAccepted(ReceiverState),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Expected a JSON object, got {0}")]
    NotAnObject(&'static str),
    #[error("Invalid plot window: {0}")]
    InvalidWindow(String),
    #[error("Invalid data point: {0}")]
    InvalidDataPoint(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, TransferError>;

/// Formats `host:port` the way both sides expect it.
pub fn endpoint(host: &str, port: u16) -> String {
    format!("{host}:{port}")
}
