use std::net::SocketAddr;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::payload::Payload;
use crate::{Result, TransferError};

/// Client side of a single transfer.
///
/// Owns the connection; sending consumes the sender so the stream is closed
/// exactly once, after the last byte is written.
pub struct Sender {
    stream: TcpStream,
    peer: SocketAddr,
}

impl Sender {
    /// Connect to `endpoint` with a single attempt.
    pub async fn connect(endpoint: &str) -> Result<Self> {
        let stream = TcpStream::connect(endpoint)
            .await
            .map_err(|source| TransferError::Connect {
                endpoint: endpoint.to_string(),
                source,
            })?;
        let peer = stream.peer_addr()?;
        info!("Connected to {peer}");
        Ok(Self { stream, peer })
    }

    /// Write the whole encoded payload, then close the write side.
    ///
    /// Returns the number of bytes written.
    pub async fn send(mut self, payload: &Payload) -> Result<usize> {
        let encoded = payload.encode()?;
        self.stream.write_all(&encoded).await?;
        self.stream.flush().await?;
        // The receiver treats our FIN as end of message.
        self.stream.shutdown().await?;
        debug!("Wrote {} bytes to {} and closed the stream", encoded.len(), self.peer);
        Ok(encoded.len())
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.stream.local_addr().map_err(TransferError::from)
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

/// Connect, send `payload` and close.
pub async fn send_payload(endpoint: &str, payload: &Payload) -> Result<usize> {
    let sender = Sender::connect(endpoint).await?;
    sender.send(payload).await
}
