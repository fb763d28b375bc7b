pub mod codec;
pub mod config;
pub mod dispatcher;
pub mod header;
pub mod message;
pub mod stream_decoder;

pub use codec::ProtocolCodec;
pub use config::DecoderConfig;
pub use dispatcher::{Dispatcher, DrainEvents, Event, EventQueue};
pub use header::PendingHeader;
pub use message::DecodedMessage;
pub use stream_decoder::{DecoderState, StreamDecoder};
