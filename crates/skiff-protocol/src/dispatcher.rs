//! Callback capability the decoder dispatches decoded units into.
//!
//! The decoder is configured with a [`Dispatcher`] at construction and calls
//! it synchronously from inside [`StreamDecoder::feed`], in the exact order
//! the units were recognized in the stream.
//!
//! [`EventQueue`] is the recording implementation: it stores every dispatch
//! as an [`Event`] so callers (and the tokio codec) can pull them out later.
//!
//! [`StreamDecoder::feed`]: crate::StreamDecoder::feed

use bytes::Bytes;
use std::collections::VecDeque;

use crate::message::DecodedMessage;

/// Recommended initial capacity for the event queue.
///
/// Most reads carry a handful of units; this avoids regrowth for bursts.
const INITIAL_EVENT_QUEUE_CAPACITY: usize = 4;

/// Receiver of decoded protocol events.
///
/// Implementations must not block indefinitely. Sending the PONG reply to a
/// keep-alive request is the implementation's job, not the decoder's.
pub trait Dispatcher {
    /// A delivery was fully decoded.
    fn on_message(&mut self, message: DecodedMessage);

    /// The server sent `PING` and expects a `PONG` reply.
    fn on_ping_received(&mut self);

    /// The server acknowledged a keep-alive with `PONG`.
    fn on_pong(&mut self);

    /// The server sent `-ERR`; `text` is everything after the keyword,
    /// verbatim.
    fn on_error(&mut self, text: Bytes);
}

impl<D: Dispatcher + ?Sized> Dispatcher for &mut D {
    fn on_message(&mut self, message: DecodedMessage) {
        (**self).on_message(message);
    }

    fn on_ping_received(&mut self) {
        (**self).on_ping_received();
    }

    fn on_pong(&mut self) {
        (**self).on_pong();
    }

    fn on_error(&mut self, text: Bytes) {
        (**self).on_error(text);
    }
}

/// A recorded dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Message(DecodedMessage),
    Ping,
    Pong,
    Error(Bytes),
}

/// Dispatcher that queues every event in arrival order.
///
/// # Example
///
/// ```
/// use skiff_protocol::{Event, EventQueue, StreamDecoder};
///
/// let mut decoder = StreamDecoder::new(EventQueue::new());
/// decoder.feed(b"+OK\r\nPONG\r\n").unwrap();
///
/// let events: Vec<_> = decoder.dispatcher_mut().drain_events().collect();
/// assert_eq!(events, vec![Event::Pong]);
/// ```
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            events: VecDeque::with_capacity(INITIAL_EVENT_QUEUE_CAPACITY),
        }
    }

    /// Pop the oldest queued event.
    pub fn next_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    pub fn events_available(&self) -> usize {
        self.events.len()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Returns an iterator that drains all currently queued events.
    pub fn drain_events(&mut self) -> DrainEvents<'_> {
        DrainEvents { queue: self }
    }
}

impl Dispatcher for EventQueue {
    fn on_message(&mut self, message: DecodedMessage) {
        self.events.push_back(Event::Message(message));
    }

    fn on_ping_received(&mut self) {
        self.events.push_back(Event::Ping);
    }

    fn on_pong(&mut self) {
        self.events.push_back(Event::Pong);
    }

    fn on_error(&mut self, text: Bytes) {
        self.events.push_back(Event::Error(text));
    }
}

/// Iterator returned by [`EventQueue::drain_events`].
pub struct DrainEvents<'a> {
    queue: &'a mut EventQueue,
}

impl Iterator for DrainEvents<'_> {
    type Item = Event;

    fn next(&mut self) -> Option<Self::Item> {
        self.queue.next_event()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.queue.events_available();
        (len, Some(len))
    }
}

impl ExactSizeIterator for DrainEvents<'_> {
    fn len(&self) -> usize {
        self.queue.events_available()
    }
}
