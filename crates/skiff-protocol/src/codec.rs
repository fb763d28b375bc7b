//! Tokio codec adapter for the stream decoder.
//!
//! `ProtocolCodec` wraps a [`StreamDecoder`] recording into an
//! [`EventQueue`] and implements [`Decoder`], so the inbound protocol can be
//! consumed as a `Stream` of [`Event`]s with `FramedRead`.
//!
//! # Architecture
//!
//! ```text
//! Socket -> FramedRead -> ProtocolCodec::decode -> StreamDecoder::feed
//!                                                    └─> EventQueue -> Event
//! ```
//!
//! # Usage with Tokio FramedRead
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use skiff_protocol::{Event, ProtocolCodec};
//! use tokio::net::TcpStream;
//! use tokio_util::codec::FramedRead;
//!
//! # async fn example() -> skiff_core::Result<()> {
//! let stream = TcpStream::connect("127.0.0.1:4222").await?;
//! let mut events = FramedRead::new(stream, ProtocolCodec::new());
//!
//! while let Some(event) = events.next().await {
//!     match event? {
//!         Event::Message(msg) => println!("{} bytes on sid {}", msg.len(), msg.subscription_id()),
//!         Event::Ping => println!("server wants a PONG"),
//!         other => println!("{other:?}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! A [`ProtocolError`] from the decoder surfaces as
//! [`Error::Protocol`]. Events recognized before the violation are still
//! yielded first, so a stream never loses units that arrived intact. After
//! that every call returns the same error and input is discarded.
//!
//! [`ProtocolError`]: skiff_core::ProtocolError

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::{DecoderConfig, Event, EventQueue, StreamDecoder};
use skiff_core::{Error, Result};

/// Tokio codec yielding decoded protocol events.
#[derive(Debug)]
pub struct ProtocolCodec {
    decoder: StreamDecoder<EventQueue>,
}

impl ProtocolCodec {
    /// # Example
    ///
    /// ```
    /// use skiff_protocol::ProtocolCodec;
    ///
    /// let codec = ProtocolCodec::new();
    /// assert_eq!(codec.config().max_control_line, 1024);
    /// ```
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            decoder: StreamDecoder::with_config(EventQueue::new(), config),
        }
    }

    pub fn config(&self) -> &DecoderConfig {
        self.decoder.config()
    }

    /// The wrapped stream decoder.
    pub fn decoder(&self) -> &StreamDecoder<EventQueue> {
        &self.decoder
    }
}

impl Default for ProtocolCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ProtocolCodec {
    type Item = Event;
    type Error = Error;

    /// Decode the next event from the byte stream.
    ///
    /// - `Ok(Some(Event))` - An event was decoded
    /// - `Ok(None)` - Need more data
    /// - `Err(Error)` - Protocol violation
    ///
    /// # Example
    ///
    /// ```
    /// use bytes::BytesMut;
    /// use tokio_util::codec::Decoder;
    /// use skiff_protocol::{Event, ProtocolCodec};
    ///
    /// let mut codec = ProtocolCodec::new();
    /// let mut buffer = BytesMut::from(&b"PING\r\nPONG\r\n"[..]);
    ///
    /// assert_eq!(codec.decode(&mut buffer).unwrap(), Some(Event::Ping));
    /// assert_eq!(codec.decode(&mut buffer).unwrap(), Some(Event::Pong));
    /// assert_eq!(codec.decode(&mut buffer).unwrap(), None);
    /// ```
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if !src.is_empty() {
            // The decoder keeps its own buffer, so src is fully consumed here.
            // A failure is recorded by the decoder and reported below.
            let _ = self.decoder.feed(src);
            src.clear();
        }

        // Units recognized before a violation are yielded first
        if let Some(event) = self.decoder.dispatcher_mut().next_event() {
            return Ok(Some(event));
        }

        match self.decoder.failure() {
            Some(e) => Err(e.clone().into()),
            None => Ok(None),
        }
    }
}
