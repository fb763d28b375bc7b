//! Network layer for Skiff
//!
//! This crate drives the stream decoder from an async transport. It reads
//! bytes from the server, hands them to the decoder, answers keep-alive
//! PINGs, and forwards message deliveries to the application over a channel.
//!
//! # Components
//!
//! - **Reader**: read loop over any `AsyncRead`/`AsyncWrite` pair
//! - **ConnectionDispatcher**: the decoder's collaborator for one connection
//!
//! # Example
//!
//! ```no_run
//! use skiff_network::{Reader, ReaderConfig};
//! use std::time::Duration;
//! use tokio::net::TcpStream;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ReaderConfig {
//!     read_timeout: Duration::from_secs(60),
//!     ..ReaderConfig::default()
//! };
//!
//! let (read_half, write_half) = TcpStream::connect("127.0.0.1:4222").await?.into_split();
//! let (mut reader, _messages) = Reader::new(read_half, write_half, config);
//! reader.run().await?;
//! # Ok(())
//! # }
//! ```

mod reader;

pub use reader::{ConnectionDispatcher, Reader, ReaderConfig, ReaderError};
