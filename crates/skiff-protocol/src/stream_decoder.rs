//! Incremental decoder for the inbound pub/sub wire protocol.
//!
//! This module provides a stateful decoder that consumes an arbitrarily
//! chunked byte stream and dispatches each protocol unit as soon as it is
//! complete. Units may be split across any number of reads, and a single
//! read may carry many units.
//!
//! # Protocol Framing
//!
//! ```text
//! MSG <subject> <sid> [reply] <len>\r\n<payload>\n
//! +OK\r\n
//! -ERR '<text>'\r\n
//! PING\r\n
//! PONG\r\n
//! ```
//!
//! The payload of a `MSG` is length-delimited, so it may contain CR, LF or
//! any other byte. All other units are single CRLF-terminated lines.
//!
//! # Usage
//!
//! ```
//! use skiff_protocol::{DecoderState, Event, EventQueue, StreamDecoder};
//!
//! let mut decoder = StreamDecoder::new(EventQueue::new());
//!
//! // Feed partial data from the socket
//! decoder.feed(b"MSG foo.bar 9 1").unwrap();
//! decoder.feed(b"1\r\nhello ").unwrap();
//! decoder.feed(b"world\n").unwrap();
//!
//! match decoder.dispatcher_mut().next_event() {
//!     Some(Event::Message(msg)) => assert_eq!(msg.payload(), b"hello world"),
//!     other => panic!("unexpected {other:?}"),
//! }
//! assert_eq!(decoder.state(), DecoderState::AwaitingLine);
//! ```

use bytes::{Buf, Bytes, BytesMut};
use memchr::{memchr, memmem};
use skiff_core::constants::{CRLF, CRLF_SIZE, ERR_OP, MSG_END, MSG_OP, OK, PING, PONG, SPACE};
use skiff_core::{Lossy, ProtocolError};
use tracing::{debug, trace};

use crate::config::DecoderConfig;
use crate::dispatcher::Dispatcher;
use crate::header::PendingHeader;
use crate::message::DecodedMessage;

/// Initial buffer capacity for incoming socket data.
const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024; // 4 KB

/// Named states of the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// The buffer holds the start of an unclassified control line.
    AwaitingLine,

    /// A `MSG` control line is being assembled.
    AwaitingMsgHeader,

    /// Header parsed; payload bytes are being accumulated.
    AwaitingPayload,

    /// Payload dispatched; the trailing line feed is pending.
    AwaitingPayloadEnd,

    /// A `-ERR` line is being assembled.
    AwaitingErrText,
}

/// Internal state with the pending header attached to the states that
/// need it, so the two can never disagree.
#[derive(Debug)]
enum Phase {
    AwaitingLine,
    AwaitingMsgHeader,
    AwaitingPayload(PendingHeader),
    AwaitingPayloadEnd(PendingHeader),
    AwaitingErrText,
}

/// Stateful decoder for the inbound wire protocol.
///
/// # State Machine
///
/// ```text
///  +OK / PING / PONG
///  (consumed, stays)
///     ┌────┐
///     │    v
/// ┌──────────────┐  -ERR   ┌─────────────────┐
/// │ AwaitingLine │────────>│ AwaitingErrText │
/// └──────────────┘<────────└─────────────────┘
///   ^      │         CRLF line (on_error)
///   │      │ MSG
///   │      v
///   │  ┌───────────────────┐
///   │  │ AwaitingMsgHeader │
///   │  └───────────────────┘
///   │      │ CRLF line (header parsed)
///   │      v
///   │  ┌─────────────────┐
///   │  │ AwaitingPayload │
///   │  └─────────────────┘
///   │      │ len bytes buffered (on_message)
///   │      v
///   │  ┌────────────────────┐
///   └──│ AwaitingPayloadEnd │ '\n' found
///      └────────────────────┘
/// ```
///
/// Dispatcher callbacks run synchronously inside [`feed`], in stream order,
/// after the decoder has already committed the transition that produced
/// them.
///
/// # Buffering
///
/// Incoming bytes are appended to one growable buffer and consumed by moving
/// a read cursor. The consumed prefix is dropped only at points where no
/// slice of the buffer is in flight: before splitting a payload or an error
/// line off the front, and at the end of every [`feed`] call. Payloads and
/// subjects are handed out as [`Bytes`] views of that buffer without
/// copying.
///
/// [`feed`]: StreamDecoder::feed
#[derive(Debug)]
pub struct StreamDecoder<D> {
    /// Bytes received but not yet compacted away.
    buffer: BytesMut,

    /// Read position in `buffer`; everything before it is consumed.
    cursor: usize,

    phase: Phase,

    config: DecoderConfig,

    /// First violation seen; the stream is dead until `reset`.
    failed: Option<ProtocolError>,

    dispatcher: D,
}

impl<D: Dispatcher> StreamDecoder<D> {
    /// Create a decoder with default limits.
    ///
    /// # Example
    ///
    /// ```
    /// use skiff_protocol::{DecoderState, EventQueue, StreamDecoder};
    ///
    /// let decoder = StreamDecoder::new(EventQueue::new());
    /// assert_eq!(decoder.state(), DecoderState::AwaitingLine);
    /// ```
    pub fn new(dispatcher: D) -> Self {
        Self::with_config(dispatcher, DecoderConfig::default())
    }

    pub fn with_config(dispatcher: D, config: DecoderConfig) -> Self {
        Self {
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            cursor: 0,
            phase: Phase::AwaitingLine,
            config,
            failed: None,
            dispatcher,
        }
    }

    /// Feed bytes read from the socket into the decoder.
    ///
    /// Appends `chunk` to the internal buffer and drives the state machine
    /// as far as the buffered bytes allow, dispatching every unit completed
    /// along the way. An incomplete trailing unit stays buffered for the
    /// next call. An empty chunk is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolError`] on any grammar violation. The error is
    /// fatal to the stream: the decoder does not try to resynchronize, and
    /// nothing from the offending unit is dispatched. Every later call
    /// returns the same error without buffering or dispatching anything,
    /// until [`reset`](StreamDecoder::reset).
    ///
    /// # Example
    ///
    /// ```
    /// use skiff_protocol::{Event, EventQueue, StreamDecoder};
    ///
    /// let mut decoder = StreamDecoder::new(EventQueue::new());
    /// decoder.feed(b"PI").unwrap();
    /// decoder.feed(b"NG\r\n").unwrap();
    ///
    /// assert_eq!(decoder.dispatcher_mut().next_event(), Some(Event::Ping));
    /// assert!(decoder.feed(b"MSG foo 1\r\n").is_err());
    /// assert!(decoder.feed(b"PING\r\n").is_err());
    /// ```
    pub fn feed(&mut self, chunk: &[u8]) -> Result<(), ProtocolError> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }
        if chunk.is_empty() {
            return Ok(());
        }
        self.buffer.extend_from_slice(chunk);

        let result = self.drive();
        if let Err(err) = &result {
            self.failed = Some(err.clone());
        }

        self.compact();
        result
    }

    /// The violation that stopped the decoder, if any.
    pub fn failure(&self) -> Option<&ProtocolError> {
        self.failed.as_ref()
    }

    /// Returns the current state of the state machine.
    pub fn state(&self) -> DecoderState {
        match self.phase {
            Phase::AwaitingLine => DecoderState::AwaitingLine,
            Phase::AwaitingMsgHeader => DecoderState::AwaitingMsgHeader,
            Phase::AwaitingPayload(_) => DecoderState::AwaitingPayload,
            Phase::AwaitingPayloadEnd(_) => DecoderState::AwaitingPayloadEnd,
            Phase::AwaitingErrText => DecoderState::AwaitingErrText,
        }
    }

    /// Header of the delivery currently being assembled, if any.
    ///
    /// Present exactly while in [`DecoderState::AwaitingPayload`] or
    /// [`DecoderState::AwaitingPayloadEnd`].
    pub fn pending_header(&self) -> Option<&PendingHeader> {
        match &self.phase {
            Phase::AwaitingPayload(header) | Phase::AwaitingPayloadEnd(header) => Some(header),
            _ => None,
        }
    }

    /// Number of received bytes not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }

    pub fn into_dispatcher(self) -> D {
        self.dispatcher
    }

    /// Discard buffered bytes, any pending header and a recorded failure.
    ///
    /// The dispatcher is kept untouched. Useful when the owner reuses the
    /// decoder for a fresh connection.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
        self.phase = Phase::AwaitingLine;
        self.failed = None;
    }

    fn drive(&mut self) -> Result<(), ProtocolError> {
        while self.step()? {
            // Keep going while units complete
        }
        Ok(())
    }

    /// Run one transition if the buffered bytes allow it.
    ///
    /// Returns `true` if the decoder made progress.
    fn step(&mut self) -> Result<bool, ProtocolError> {
        match self.phase {
            Phase::AwaitingLine => self.handle_awaiting_line(),
            Phase::AwaitingMsgHeader => self.handle_msg_header(),
            Phase::AwaitingPayload(ref header) => {
                let needed = header.payload_len;
                Ok(self.handle_payload(needed))
            }
            Phase::AwaitingPayloadEnd(_) => self.handle_payload_end(),
            Phase::AwaitingErrText => self.handle_err_text(),
        }
    }

    /// Classify the line at the cursor by its leading keyword.
    fn handle_awaiting_line(&mut self) -> Result<bool, ProtocolError> {
        let head = self.unread();

        if head.starts_with(MSG_OP) {
            self.phase = Phase::AwaitingMsgHeader;
        } else if head.starts_with(OK) {
            self.consume(OK.len());
            trace!("Received +OK");
        } else if head.starts_with(ERR_OP) {
            self.phase = Phase::AwaitingErrText;
        } else if head.starts_with(PONG) {
            self.consume(PONG.len());
            trace!("Received PONG");
            self.dispatcher.on_pong();
        } else if head.starts_with(PING) {
            self.consume(PING.len());
            trace!("Received PING");
            self.dispatcher.on_ping_received();
        } else {
            // Unknown or not yet distinguishable: wait for more bytes
            self.check_line_limit(unterminated_len(head))?;
            return Ok(false);
        }

        Ok(true)
    }

    /// Parse a complete `MSG` control line into a pending header.
    fn handle_msg_header(&mut self) -> Result<bool, ProtocolError> {
        let Some(end) = self.find_crlf()? else {
            return Ok(false);
        };

        let line = self.take_line(end);
        let header = PendingHeader::parse(&line).inspect_err(|e| {
            debug!(line = %Lossy(&line), "Rejected MSG header: {}", e);
        })?;

        if header.payload_len > self.config.max_payload {
            debug!(
                len = header.payload_len,
                max = self.config.max_payload,
                "Rejected MSG header: payload too large"
            );
            return Err(ProtocolError::payload_too_large(
                header.payload_len,
                self.config.max_payload,
            ));
        }

        self.phase = Phase::AwaitingPayload(header);
        Ok(true)
    }

    /// Slice the payload once enough bytes are buffered, then dispatch it.
    ///
    /// The transition to `AwaitingPayloadEnd` is committed before the
    /// dispatcher runs.
    fn handle_payload(&mut self, needed: usize) -> bool {
        if self.buffered() < needed {
            return false;
        }

        let header = match std::mem::replace(&mut self.phase, Phase::AwaitingLine) {
            Phase::AwaitingPayload(header) => header,
            other => {
                self.phase = other;
                return false;
            }
        };

        self.compact();
        let payload = self.buffer.split_to(needed).freeze();
        let message = DecodedMessage::new(
            header.subject.clone(),
            header.reply_to.clone(),
            header.subscription_id,
            payload,
        );
        self.phase = Phase::AwaitingPayloadEnd(header);

        trace!(
            subject = %Lossy(message.subject()),
            sid = %message.subscription_id(),
            len = message.len(),
            "Dispatching message"
        );
        self.dispatcher.on_message(message);
        true
    }

    /// Skip through the line feed that terminates a delivery.
    fn handle_payload_end(&mut self) -> Result<bool, ProtocolError> {
        let head = self.unread();
        match memchr(MSG_END, head) {
            Some(pos) => {
                self.consume(pos + 1);
                self.phase = Phase::AwaitingLine;
                Ok(true)
            }
            None => {
                self.check_line_limit(head.len())?;
                Ok(false)
            }
        }
    }

    /// Dispatch the text of a complete `-ERR` line.
    ///
    /// The keyword is split off at the first space; the rest is passed on
    /// verbatim, quotes included.
    fn handle_err_text(&mut self) -> Result<bool, ProtocolError> {
        let Some(end) = self.find_crlf()? else {
            return Ok(false);
        };

        let line = self.take_line(end);
        let text = match memchr(SPACE, &line) {
            Some(pos) => line.slice(pos + 1..),
            None => Bytes::new(),
        };
        self.phase = Phase::AwaitingLine;

        trace!(text = %Lossy(&text), "Received -ERR");
        self.dispatcher.on_error(text);
        Ok(true)
    }

    /// Locate the CRLF ending the line at the cursor.
    ///
    /// Returns `Ok(None)` if the terminator has not arrived yet, and an
    /// error if the line is already longer than allowed.
    fn find_crlf(&self) -> Result<Option<usize>, ProtocolError> {
        let head = self.unread();
        match memmem::find(head, CRLF) {
            Some(end) => {
                self.check_line_limit(end)?;
                Ok(Some(end))
            }
            None => {
                self.check_line_limit(unterminated_len(head))?;
                Ok(None)
            }
        }
    }

    /// Split the line of `len` bytes at the cursor off the buffer, consuming
    /// its terminator too.
    fn take_line(&mut self, len: usize) -> Bytes {
        self.compact();
        let mut line = self.buffer.split_to(len + CRLF_SIZE).freeze();
        line.truncate(len);
        line
    }

    fn check_line_limit(&self, len: usize) -> Result<(), ProtocolError> {
        if len > self.config.max_control_line {
            debug!(
                len,
                max = self.config.max_control_line,
                "Control line exceeds maximum size"
            );
            return Err(ProtocolError::control_line_too_long(
                len,
                self.config.max_control_line,
            ));
        }
        Ok(())
    }

    fn unread(&self) -> &[u8] {
        &self.buffer[self.cursor..]
    }

    fn consume(&mut self, n: usize) {
        self.cursor += n;
    }

    /// Drop the consumed prefix of the buffer.
    fn compact(&mut self) {
        if self.cursor > 0 {
            self.buffer.advance(self.cursor);
            self.cursor = 0;
        }
    }
}

/// Length of a line still waiting for its CRLF.
///
/// A lone trailing CR may be the first half of the terminator, so it is not
/// counted.
fn unterminated_len(head: &[u8]) -> usize {
    head.len() - usize::from(head.ends_with(b"\r"))
}

impl<D: Dispatcher + Default> Default for StreamDecoder<D> {
    fn default() -> Self {
        Self::new(D::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{Event, EventQueue};
    use skiff_core::SubscriptionId;

    fn decoder() -> StreamDecoder<EventQueue> {
        StreamDecoder::new(EventQueue::new())
    }

    fn events(decoder: &mut StreamDecoder<EventQueue>) -> Vec<Event> {
        decoder.dispatcher_mut().drain_events().collect()
    }

    fn expect_message(event: Event) -> DecodedMessage {
        match event {
            Event::Message(msg) => msg,
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[test]
    fn test_new_decoder() {
        let decoder = decoder();
        assert_eq!(decoder.state(), DecoderState::AwaitingLine);
        assert_eq!(decoder.buffered(), 0);
        assert!(decoder.pending_header().is_none());
        assert_eq!(decoder.dispatcher().events_available(), 0);
    }

    #[test]
    fn test_ping_dispatches_once() {
        let mut decoder = decoder();
        decoder.feed(b"PING\r\n").unwrap();

        assert_eq!(events(&mut decoder), vec![Event::Ping]);
        assert_eq!(decoder.state(), DecoderState::AwaitingLine);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_message_without_reply() {
        let mut decoder = decoder();
        decoder.feed(b"MSG foo.bar 9 11\r\nhello world\n").unwrap();

        let mut events = events(&mut decoder);
        assert_eq!(events.len(), 1);
        let msg = expect_message(events.remove(0));
        assert_eq!(msg.subject(), b"foo.bar");
        assert_eq!(msg.subscription_id(), SubscriptionId::new(9));
        assert!(msg.reply_to().is_none());
        assert_eq!(msg.payload(), b"hello world");

        assert_eq!(decoder.state(), DecoderState::AwaitingLine);
        assert_eq!(decoder.buffered(), 0);
        assert!(decoder.pending_header().is_none());
    }

    #[test]
    fn test_message_with_reply() {
        let mut decoder = decoder();
        decoder.feed(b"MSG foo.bar 9 reply.1 11\r\nhello world\n").unwrap();

        let msg = expect_message(events(&mut decoder).remove(0));
        assert_eq!(msg.subject(), b"foo.bar");
        assert_eq!(msg.reply_to(), Some(&b"reply.1"[..]));
        assert_eq!(msg.payload(), b"hello world");
    }

    #[test]
    fn test_payload_reassembled_across_feeds() {
        let mut decoder = decoder();
        decoder.feed(b"MSG foo 1 3\r\nhi").unwrap();

        assert_eq!(decoder.state(), DecoderState::AwaitingPayload);
        assert_eq!(decoder.pending_header().map(|h| h.payload_len), Some(3));
        assert_eq!(decoder.dispatcher().events_available(), 0);

        decoder.feed(b"x\n").unwrap();

        let msg = expect_message(events(&mut decoder).remove(0));
        assert_eq!(msg.payload(), b"hix");
        assert_eq!(decoder.state(), DecoderState::AwaitingLine);
    }

    #[test]
    fn test_header_wrong_arity_is_error() {
        let mut decoder = decoder();
        let result = decoder.feed(b"MSG foo 1\r\n");

        assert!(result.is_err());
        assert_eq!(decoder.dispatcher().events_available(), 0);
    }

    #[test]
    fn test_header_error_waits_for_complete_line() {
        let mut decoder = decoder();

        // The line is not complete yet, so nothing is judged
        decoder.feed(b"MSG foo 1").unwrap();
        assert_eq!(decoder.state(), DecoderState::AwaitingMsgHeader);

        assert!(decoder.feed(b"\r\n").is_err());
    }

    #[test]
    fn test_err_text_is_verbatim() {
        let mut decoder = decoder();
        decoder.feed(b"-ERR 'Slow Consumer'\r\n").unwrap();

        assert_eq!(
            events(&mut decoder),
            vec![Event::Error(Bytes::from_static(b"'Slow Consumer'"))]
        );
        assert_eq!(decoder.state(), DecoderState::AwaitingLine);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_err_without_text() {
        let mut decoder = decoder();
        decoder.feed(b"-ERR\r\n").unwrap();

        assert_eq!(events(&mut decoder), vec![Event::Error(Bytes::new())]);
    }

    #[test]
    fn test_empty_feed_is_noop() {
        let mut decoder = decoder();
        decoder.feed(b"").unwrap();
        assert_eq!(decoder.state(), DecoderState::AwaitingLine);
        assert_eq!(decoder.buffered(), 0);

        decoder.feed(b"MSG foo 1 3\r\nh").unwrap();
        decoder.feed(b"").unwrap();
        assert_eq!(decoder.state(), DecoderState::AwaitingPayload);
        assert_eq!(decoder.buffered(), 1);
        assert_eq!(decoder.dispatcher().events_available(), 0);
    }

    #[test]
    fn test_ok_then_pong_in_one_chunk() {
        let mut decoder = decoder();
        decoder.feed(b"+OK\r\nPONG\r\n").unwrap();

        assert_eq!(events(&mut decoder), vec![Event::Pong]);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_empty_payload() {
        let mut decoder = decoder();
        decoder.feed(b"MSG foo 1 0\r\n\n").unwrap();

        let msg = expect_message(events(&mut decoder).remove(0));
        assert!(msg.is_empty());
        assert_eq!(decoder.state(), DecoderState::AwaitingLine);
    }

    #[test]
    fn test_empty_payload_dispatched_before_terminator() {
        let mut decoder = decoder();
        decoder.feed(b"MSG foo 1 0\r\n").unwrap();

        assert_eq!(decoder.dispatcher().events_available(), 1);
        assert_eq!(decoder.state(), DecoderState::AwaitingPayloadEnd);
        assert!(decoder.pending_header().is_some());
    }

    #[test]
    fn test_state_committed_before_message_dispatch() {
        let mut decoder = decoder();
        decoder.feed(b"MSG foo 1 2\r\nhi").unwrap();

        // Dispatched, but the trailing line feed is still owed
        assert_eq!(decoder.dispatcher().events_available(), 1);
        assert_eq!(decoder.state(), DecoderState::AwaitingPayloadEnd);

        decoder.feed(b"\n").unwrap();
        assert_eq!(decoder.state(), DecoderState::AwaitingLine);
        assert!(decoder.pending_header().is_none());
    }

    #[test]
    fn test_payload_followed_by_crlf() {
        let mut decoder = decoder();
        decoder.feed(b"MSG foo 1 2\r\nhi\r\nPING\r\n").unwrap();

        let events = events(&mut decoder);
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], Event::Ping);
    }

    #[test]
    fn test_payload_may_contain_terminators() {
        let mut decoder = decoder();
        decoder.feed(b"MSG foo 1 6\r\na\r\nb\nc\n").unwrap();

        let msg = expect_message(events(&mut decoder).remove(0));
        assert_eq!(msg.payload(), b"a\r\nb\nc");
    }

    #[test]
    fn test_multiple_messages_keep_order() {
        let mut decoder = decoder();
        decoder
            .feed(b"MSG a 1 1\r\nx\nPING\r\nMSG b 2 1\r\ny\nPONG\r\n")
            .unwrap();

        let events = events(&mut decoder);
        assert_eq!(events.len(), 4);
        assert_eq!(expect_message(events[0].clone()).subject(), b"a");
        assert_eq!(events[1], Event::Ping);
        assert_eq!(expect_message(events[2].clone()).subject(), b"b");
        assert_eq!(events[3], Event::Pong);
    }

    #[test]
    fn test_byte_by_byte_feeding() {
        let mut decoder = decoder();
        let stream = b"+OK\r\nMSG foo.bar 9 reply.1 11\r\nhello world\n-ERR 'x'\r\nPING\r\n";

        for &byte in stream.iter() {
            decoder.feed(&[byte]).unwrap();
        }

        let events = events(&mut decoder);
        assert_eq!(events.len(), 3);
        let msg = expect_message(events[0].clone());
        assert_eq!(msg.reply_to(), Some(&b"reply.1"[..]));
        assert_eq!(msg.payload(), b"hello world");
        assert_eq!(events[1], Event::Error(Bytes::from_static(b"'x'")));
        assert_eq!(events[2], Event::Ping);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_partial_keyword_waits() {
        let mut decoder = decoder();
        decoder.feed(b"PON").unwrap();
        assert_eq!(decoder.state(), DecoderState::AwaitingLine);
        assert_eq!(decoder.buffered(), 3);

        decoder.feed(b"G\r").unwrap();
        assert_eq!(decoder.dispatcher().events_available(), 0);

        decoder.feed(b"\n").unwrap();
        assert_eq!(events(&mut decoder), vec![Event::Pong]);
    }

    #[test]
    fn test_unknown_line_waits() {
        let mut decoder = decoder();
        decoder.feed(b"INFO {}\r\n").unwrap();

        assert_eq!(decoder.state(), DecoderState::AwaitingLine);
        assert_eq!(decoder.dispatcher().events_available(), 0);
    }

    #[test]
    fn test_non_numeric_sid_is_error() {
        let mut decoder = decoder();
        let err = decoder.feed(b"MSG foo abc 3\r\nabc\n").unwrap_err();

        assert!(err.description().contains("subscription id"));
        assert_eq!(decoder.dispatcher().events_available(), 0);
    }

    #[test]
    fn test_negative_length_is_error() {
        let mut decoder = decoder();
        assert!(decoder.feed(b"MSG foo 1 -3\r\n").is_err());
        assert_eq!(decoder.dispatcher().events_available(), 0);
    }

    #[test]
    fn test_units_before_error_are_dispatched() {
        let mut decoder = decoder();
        let result = decoder.feed(b"PING\r\nMSG foo x 1\r\na\n");

        assert!(result.is_err());
        assert_eq!(events(&mut decoder), vec![Event::Ping]);
    }

    #[test]
    fn test_control_line_limit() {
        let config = DecoderConfig::default().with_max_control_line(16);
        let mut decoder = StreamDecoder::with_config(EventQueue::new(), config);

        decoder.feed(b"MSG foo.bar.baz").unwrap();
        let err = decoder.feed(b".qux 1 0").unwrap_err();

        assert!(err.description().contains("Control line exceeds"));
    }

    #[test]
    fn test_control_line_at_limit_accepted() {
        let line = b"MSG foo 1 0";
        let config = DecoderConfig::default().with_max_control_line(line.len());
        let mut decoder = StreamDecoder::with_config(EventQueue::new(), config);

        decoder.feed(line).unwrap();
        decoder.feed(b"\r").unwrap();
        decoder.feed(b"\n\n").unwrap();

        assert_eq!(decoder.dispatcher().events_available(), 1);
    }

    #[test]
    fn test_unknown_line_bounded_by_limit() {
        let config = DecoderConfig::default().with_max_control_line(8);
        let mut decoder = StreamDecoder::with_config(EventQueue::new(), config);

        assert!(decoder.feed(b"INFO {\"server_id\":1}\r\n").is_err());
    }

    #[test]
    fn test_payload_not_bounded_by_line_limit() {
        let config = DecoderConfig::default().with_max_control_line(16);
        let mut decoder = StreamDecoder::with_config(EventQueue::new(), config);

        let mut stream = b"MSG foo 1 100\r\n".to_vec();
        stream.extend_from_slice(&[b'X'; 100]);
        stream.push(b'\n');
        decoder.feed(&stream).unwrap();

        let msg = expect_message(events(&mut decoder).remove(0));
        assert_eq!(msg.len(), 100);
    }

    #[test]
    fn test_payload_limit() {
        let config = DecoderConfig::default().with_max_payload(4);
        let mut decoder = StreamDecoder::with_config(EventQueue::new(), config);

        let err = decoder.feed(b"MSG foo 1 5\r\nhello\n").unwrap_err();
        assert_eq!(err, ProtocolError::payload_too_large(5, 4));
        assert_eq!(decoder.dispatcher().events_available(), 0);
    }

    #[test]
    fn test_error_is_sticky() {
        let config = DecoderConfig::default().with_max_payload(8);
        let mut decoder = StreamDecoder::with_config(EventQueue::new(), config);

        let err = decoder.feed(b"MSG foo 1 30\r\n").unwrap_err();
        assert_eq!(decoder.failure(), Some(&err));

        // What follows the rejected header must not be decoded as new units
        let again = decoder.feed(b"MSG forged 2 3\r\nbad\nPING\r\n123x").unwrap_err();
        assert_eq!(again, err);
        assert_eq!(decoder.feed(b"").unwrap_err(), err);
        assert_eq!(decoder.dispatcher().events_available(), 0);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_reset_clears_failure() {
        let mut decoder = decoder();
        assert!(decoder.feed(b"MSG foo 1\r\n").is_err());

        decoder.reset();
        assert!(decoder.failure().is_none());

        decoder.feed(b"PING\r\n").unwrap();
        assert_eq!(events(&mut decoder), vec![Event::Ping]);
    }

    #[test]
    fn test_longer_keyword_is_not_msg() {
        let mut decoder = decoder();
        let err = decoder.feed(b"MSGX foo 1 2\r\nhi\n").unwrap_err();

        assert!(err.description().contains("Unknown operation"));
        assert_eq!(decoder.dispatcher().events_available(), 0);
    }

    #[test]
    fn test_unknown_line_limit_ignores_trailing_cr() {
        let config = DecoderConfig::default().with_max_control_line(8);

        let mut decoder = StreamDecoder::with_config(EventQueue::new(), config);
        decoder.feed(b"INFO {}x\r").unwrap();

        let mut decoder = StreamDecoder::with_config(EventQueue::new(), config);
        assert!(decoder.feed(b"INFO {}xy").is_err());
    }

    #[test]
    fn test_reset() {
        let mut decoder = decoder();
        decoder.feed(b"MSG foo 1 3\r\nh").unwrap();

        decoder.reset();

        assert_eq!(decoder.state(), DecoderState::AwaitingLine);
        assert_eq!(decoder.buffered(), 0);
        assert!(decoder.pending_header().is_none());

        decoder.feed(b"PONG\r\n").unwrap();
        assert_eq!(events(&mut decoder), vec![Event::Pong]);
    }

    #[test]
    fn test_large_payload() {
        let mut decoder = decoder();
        let payload = vec![0xABu8; 64 * 1024];

        decoder.feed(format!("MSG big 7 {}\r\n", payload.len()).as_bytes()).unwrap();
        for chunk in payload.chunks(1500) {
            decoder.feed(chunk).unwrap();
        }
        decoder.feed(b"\n").unwrap();

        let msg = expect_message(events(&mut decoder).remove(0));
        assert_eq!(msg.payload(), payload.as_slice());
    }

    #[test]
    fn test_dispatch_into_borrowed_queue() {
        let mut queue = EventQueue::new();
        {
            let mut decoder = StreamDecoder::new(&mut queue);
            decoder.feed(b"PING\r\nPONG\r\n").unwrap();
        }
        assert_eq!(queue.events_available(), 2);
    }

    #[test]
    fn test_into_dispatcher() {
        let mut decoder = decoder();
        decoder.feed(b"PONG\r\n").unwrap();

        let queue = decoder.into_dispatcher();
        assert_eq!(queue.events_available(), 1);
    }
}
