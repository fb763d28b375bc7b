//! Reader loop driving the stream decoder from a socket.
//!
//! The reader owns both halves of an already-established transport. It reads
//! at most [`ReaderConfig::read_size`] bytes at a time, feeds them to a
//! [`StreamDecoder`], and plays the dispatcher role for the connection:
//! deliveries go out on a channel, PINGs are answered with PONG after each
//! read, and server errors are logged and remembered.
//!
//! # Architecture
//!
//! ```text
//! Socket ──read──> Reader ──feed──> StreamDecoder
//!   ^                 │                   │
//!   │                 │           ConnectionDispatcher
//!   └──── PONG ───────┘                   │
//!                                         └──> mpsc channel ──> DecodedMessage
//! ```
//!
//! # Example Usage
//!
//! ```no_run
//! use skiff_network::{Reader, ReaderConfig};
//! use tokio::net::TcpStream;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let stream = TcpStream::connect("127.0.0.1:4222").await?;
//! let (read_half, write_half) = stream.into_split();
//!
//! let (mut reader, mut messages) = Reader::new(read_half, write_half, ReaderConfig::default());
//! tokio::spawn(async move {
//!     while let Some(msg) = messages.recv().await {
//!         println!("sid {}: {} bytes", msg.subscription_id(), msg.len());
//!     }
//! });
//!
//! reader.run().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Design Principles
//!
//! - **No reconnect**: the loop ends on the first error; the caller decides
//!   whether and how to reconnect
//! - **Replies after feed**: the decoder cannot be re-entered from a
//!   callback, so PONGs owed by a chunk are written once `feed` returns
//! - **Ordered delivery**: the unbounded channel keeps stream order

use bytes::Bytes;
use skiff_core::constants::{PONG, SCRATCH_SIZE};
use skiff_core::{Error as CoreError, Lossy, ProtocolError};
use skiff_protocol::{DecodedMessage, DecoderConfig, DecoderState, Dispatcher, StreamDecoder};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

/// Configuration for the reader loop
///
/// # Example
///
/// ```
/// use skiff_network::ReaderConfig;
/// use std::time::Duration;
///
/// let config = ReaderConfig {
///     read_timeout: Duration::from_secs(30),
///     ..ReaderConfig::default()
/// };
/// assert_eq!(config.read_size, 512);
/// ```
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Maximum bytes requested per socket read
    pub read_size: usize,

    /// Longest time to wait for a single read before giving up
    pub read_timeout: Duration,

    /// Limits passed to the decoder
    pub decoder: DecoderConfig,
}

impl ReaderConfig {
    /// Check the settings before starting a reader.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a zero `read_size`, a zero
    /// `read_timeout`, or invalid decoder limits.
    pub fn validate(&self) -> skiff_core::Result<()> {
        if self.read_size == 0 {
            return Err(CoreError::Config("read_size must be greater than zero".to_string()));
        }
        if self.read_timeout.is_zero() {
            return Err(CoreError::Config("read_timeout must be non-zero".to_string()));
        }
        self.decoder.validate()
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            read_size: SCRATCH_SIZE,
            read_timeout: Duration::from_secs(120),
            decoder: DecoderConfig::default(),
        }
    }
}

/// Errors that end the reader loop
#[derive(Debug, Error)]
pub enum ReaderError {
    /// The server violated the wire grammar
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Low-level I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No bytes arrived within the read timeout
    #[error("Read timeout after {0}ms")]
    ReadTimeout(u64),

    /// The stream ended in the middle of a protocol unit
    #[error("Connection lost: {0}")]
    ConnectionLost(String),
}

/// Dispatcher collaborator for one connection.
#[derive(Debug)]
pub struct ConnectionDispatcher {
    messages: mpsc::UnboundedSender<DecodedMessage>,
    pongs_owed: usize,
    pongs_received: u64,
    last_server_error: Option<Bytes>,
}

impl ConnectionDispatcher {
    pub fn new(messages: mpsc::UnboundedSender<DecodedMessage>) -> Self {
        Self {
            messages,
            pongs_owed: 0,
            pongs_received: 0,
            last_server_error: None,
        }
    }

    /// Take the number of PONG replies owed since the last call.
    pub fn take_pongs_owed(&mut self) -> usize {
        std::mem::take(&mut self.pongs_owed)
    }

    pub fn pongs_received(&self) -> u64 {
        self.pongs_received
    }

    /// Text of the most recent `-ERR` from the server
    pub fn last_server_error(&self) -> Option<&[u8]> {
        self.last_server_error.as_deref()
    }
}

impl Dispatcher for ConnectionDispatcher {
    fn on_message(&mut self, message: DecodedMessage) {
        if self.messages.send(message).is_err() {
            trace!("Message receiver dropped, discarding delivery");
        }
    }

    fn on_ping_received(&mut self) {
        self.pongs_owed += 1;
    }

    fn on_pong(&mut self) {
        self.pongs_received += 1;
        trace!(total = self.pongs_received, "Keep-alive acknowledged");
    }

    fn on_error(&mut self, text: Bytes) {
        warn!(error = %Lossy(&text), "Server reported error");
        self.last_server_error = Some(text);
    }
}

/// Reader loop for one connection
pub struct Reader<R, W> {
    reader: R,
    writer: W,
    decoder: StreamDecoder<ConnectionDispatcher>,
    scratch: Vec<u8>,
    read_timeout: Duration,
}

impl<R, W> Reader<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Create a reader and the receiving end of its message channel.
    pub fn new(
        reader: R,
        writer: W,
        config: ReaderConfig,
    ) -> (Self, mpsc::UnboundedReceiver<DecodedMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        debug!(read_size = config.read_size, "Creating reader");

        let reader = Self {
            reader,
            writer,
            decoder: StreamDecoder::with_config(ConnectionDispatcher::new(tx), config.decoder),
            scratch: vec![0; config.read_size.max(1)],
            read_timeout: config.read_timeout,
        };
        (reader, rx)
    }

    /// Like [`Reader::new`], but rejects an invalid configuration.
    ///
    /// # Errors
    ///
    /// Returns [`skiff_core::Error::Config`] if
    /// [`ReaderConfig::validate`] fails.
    pub fn try_new(
        reader: R,
        writer: W,
        config: ReaderConfig,
    ) -> skiff_core::Result<(Self, mpsc::UnboundedReceiver<DecodedMessage>)> {
        config.validate().inspect_err(|e| {
            error!("Rejected reader configuration: {}", e);
        })?;
        Ok(Self::new(reader, writer, config))
    }

    /// Run until the stream ends or fails.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The server violates the protocol
    /// - A read times out
    /// - The stream ends in the middle of a unit
    /// - Reading or writing the transport fails
    pub async fn run(&mut self) -> Result<(), ReaderError> {
        info!("Reader loop started");

        loop {
            let n = self.read_chunk().await?;
            if n == 0 {
                return self.finish();
            }

            self.decoder.feed(&self.scratch[..n]).inspect_err(|e| {
                error!("Closing stream on protocol error: {}", e);
            })?;

            self.send_owed_pongs().await?;
        }
    }

    pub fn pongs_received(&self) -> u64 {
        self.decoder.dispatcher().pongs_received()
    }

    pub fn last_server_error(&self) -> Option<&[u8]> {
        self.decoder.dispatcher().last_server_error()
    }

    pub fn decoder(&self) -> &StreamDecoder<ConnectionDispatcher> {
        &self.decoder
    }

    /// Give back the transport halves.
    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }

    async fn read_chunk(&mut self) -> Result<usize, ReaderError> {
        match tokio::time::timeout(self.read_timeout, self.reader.read(&mut self.scratch)).await {
            Ok(Ok(n)) => {
                trace!(bytes = n, "Read from transport");
                Ok(n)
            }
            Ok(Err(e)) => {
                error!("Read failed: {}", e);
                Err(e.into())
            }
            Err(_) => {
                let millis = self.read_timeout_millis();
                warn!("Read timeout after {}ms", millis);
                Err(ReaderError::ReadTimeout(millis))
            }
        }
    }

    fn read_timeout_millis(&self) -> u64 {
        u64::try_from(self.read_timeout.as_millis()).unwrap_or(u64::MAX)
    }

    async fn send_owed_pongs(&mut self) -> Result<(), ReaderError> {
        let owed = self.decoder.dispatcher_mut().take_pongs_owed();
        if owed == 0 {
            return Ok(());
        }

        for _ in 0..owed {
            self.writer.write_all(PONG).await?;
        }
        self.writer.flush().await?;

        debug!(count = owed, "Answered PING");
        Ok(())
    }

    fn finish(&self) -> Result<(), ReaderError> {
        if self.decoder.state() == DecoderState::AwaitingLine && self.decoder.buffered() == 0 {
            info!("Server closed connection");
            return Ok(());
        }

        warn!(
            state = ?self.decoder.state(),
            buffered = self.decoder.buffered(),
            "Connection closed mid-unit"
        );
        Err(ReaderError::ConnectionLost(format!(
            "stream ended in {:?} with {} bytes buffered",
            self.decoder.state(),
            self.decoder.buffered()
        )))
    }
}
