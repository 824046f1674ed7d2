use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::payload::Payload;
use crate::plot::{DataPoint, PlotWindow};
use crate::{Result, TransferError, READ_CHUNK_SIZE};

/// Lifecycle of a [`Receiver`].
///
/// ```text
/// Listening -> Accepted -> Reading -> Decoded -> Done
///                            ^    |
///                            +----+  non-empty read
/// ```
///
/// There is no way back to `Listening`: a receiver serves one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    Listening,
    Accepted,
    Reading,
    /// Peer closed its write side; the collected bytes are being decoded.
    Decoded,
    Done,
}

impl Display for ReceiverState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Everything one connection delivered.
#[derive(Debug, Clone)]
pub struct Received {
    pub peer: SocketAddr,
    pub bytes: Vec<u8>,
    pub payload: Payload,
}

impl Received {
    /// Raw message as text, as it arrived.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    /// Typed plot window, when the payload describes one.
    pub fn plot_window(&self) -> Option<PlotWindow> {
        match PlotWindow::from_payload(&self.payload) {
            Ok(window) => Some(window),
            Err(e) if self.payload.get("y_color").is_some() => {
                warn!("Payload from {} looks like a plot window but is invalid: {e}", self.peer);
                None
            }
            Err(e) => {
                debug!("Payload from {} is not a plot window: {e}", self.peer);
                None
            }
        }
    }

    /// Typed data point, when the payload is a `plot` message.
    pub fn data_point(&self) -> Option<DataPoint> {
        match DataPoint::from_payload(&self.payload) {
            Ok(point) => Some(point),
            Err(e) if self.payload.get("data").is_some() => {
                warn!("Payload from {} looks like a data point but is invalid: {e}", self.peer);
                None
            }
            Err(e) => {
                debug!("Payload from {} is not a data point: {e}", self.peer);
                None
            }
        }
    }
}

/// Server side of a single transfer.
pub struct Receiver {
    listener: TcpListener,
    local_addr: SocketAddr,
    chunk_size: usize,
    state: ReceiverState,
}

impl Receiver {
    /// Bind and start listening on `endpoint`.
    pub async fn bind(endpoint: &str) -> Result<Self> {
        let listener = TcpListener::bind(endpoint)
            .await
            .map_err(|source| TransferError::Bind {
                endpoint: endpoint.to_string(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {local_addr}");

        Ok(Self {
            listener,
            local_addr,
            chunk_size: READ_CHUNK_SIZE,
            state: ReceiverState::Listening,
        })
    }

    /// Upper bound for a single read; zero is raised to one byte.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> ReceiverState {
        self.state
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Accept one client, read until it closes, and decode what it sent.
    ///
    /// Can succeed at most once; later calls fail with `AlreadyAccepted`.
    /// The connection is closed on return, whatever the outcome.
    pub async fn accept_one(&mut self) -> Result<Received> {
        if self.state != ReceiverState::Listening {
            return Err(TransferError::AlreadyAccepted(self.state));
        }

        let (mut stream, peer) =
            self.listener
                .accept()
                .await
                .map_err(|source| TransferError::Accept {
                    local: self.local_addr,
                    source,
                })?;
        self.transition(ReceiverState::Accepted);
        info!("Connected by {peer}");

        self.transition(ReceiverState::Reading);
        let bytes = read_to_eof(&mut stream, self.chunk_size).await?;
        drop(stream);
        self.transition(ReceiverState::Decoded);
        info!("Received {} bytes from {peer}", bytes.len());

        let payload = Payload::decode(&bytes)?;
        self.transition(ReceiverState::Done);

        Ok(Received {
            peer,
            bytes,
            payload,
        })
    }

    fn transition(&mut self, next: ReceiverState) {
        debug!("Receiver {} -> {}", self.state, next);
        self.state = next;
    }
}

/// Read from `reader` until it reports end of stream.
///
/// Every non-empty read is followed by another one; only a zero-length read
/// ends the loop. Chunks are appended in arrival order.
pub async fn read_to_eof<R>(reader: &mut R, chunk_size: usize) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut data = Vec::new();
    let mut chunk = vec![0u8; chunk_size.max(1)];
    loop {
        let len = reader.read(&mut chunk).await?;
        if len == 0 {
            break;
        }
        debug!("Read chunk of {len} bytes");
        data.extend_from_slice(&chunk[..len]);
    }
    Ok(data)
}

/// Bind `endpoint`, serve exactly one client and return what it sent.
pub async fn receive_once(endpoint: &str) -> Result<Received> {
    let mut receiver = Receiver::bind(endpoint).await?;
    receiver.accept_one().await
}
