//! Common test utilities for integration tests.
//!
//! This module provides wire builders for inbound protocol units and
//! helpers to run a byte stream through a decoder with a given chunking.
//!
//! # Usage
//!
//! ```ignore
//! use crate::common;
//!
//! let stream = [common::msg("foo", 9, None, b"hello"), common::ping()].concat();
//! let events = common::decode_all(&stream);
//! ```

#![allow(dead_code)]

use skiff_protocol::{DecodedMessage, Event, EventQueue, StreamDecoder};

/// Build a `MSG` unit with a bare line-feed terminator.
pub fn msg(subject: &str, sid: u64, reply: Option<&str>, payload: &[u8]) -> Vec<u8> {
    let mut unit = match reply {
        Some(reply) => format!("MSG {subject} {sid} {reply} {}\r\n", payload.len()),
        None => format!("MSG {subject} {sid} {}\r\n", payload.len()),
    }
    .into_bytes();
    unit.extend_from_slice(payload);
    unit.push(b'\n');
    unit
}

pub fn ok() -> Vec<u8> {
    b"+OK\r\n".to_vec()
}

pub fn ping() -> Vec<u8> {
    b"PING\r\n".to_vec()
}

pub fn pong() -> Vec<u8> {
    b"PONG\r\n".to_vec()
}

pub fn err(text: &str) -> Vec<u8> {
    format!("-ERR {text}\r\n").into_bytes()
}

/// Feed the whole stream in one call and collect the events.
pub fn decode_all(stream: &[u8]) -> Vec<Event> {
    decode_chunked(stream, &[])
}

/// Feed the stream split at the given (sorted, in-range) cut points.
pub fn decode_chunked(stream: &[u8], cuts: &[usize]) -> Vec<Event> {
    let mut decoder = StreamDecoder::new(EventQueue::new());
    let mut start = 0;
    for &cut in cuts {
        decoder.feed(&stream[start..cut]).expect("valid stream");
        start = cut;
    }
    decoder.feed(&stream[start..]).expect("valid stream");
    decoder.dispatcher_mut().drain_events().collect()
}

/// Feed the stream one byte per call.
pub fn decode_bytewise(stream: &[u8]) -> Vec<Event> {
    let mut decoder = StreamDecoder::new(EventQueue::new());
    for byte in stream {
        decoder.feed(std::slice::from_ref(byte)).expect("valid stream");
    }
    decoder.dispatcher_mut().drain_events().collect()
}

/// Assert that an event is a delivery with the given fields.
pub fn assert_message(
    event: &Event,
    subject: &str,
    sid: u64,
    reply: Option<&str>,
    payload: &[u8],
) -> DecodedMessage {
    let Event::Message(msg) = event else {
        panic!("expected message, got {event:?}");
    };
    assert_eq!(msg.subject_str(), Some(subject));
    assert_eq!(msg.subscription_id().as_u64(), sid);
    assert_eq!(msg.reply_to(), reply.map(str::as_bytes));
    assert_eq!(msg.payload(), payload);
    msg.clone()
}
