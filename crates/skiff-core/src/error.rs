use std::fmt;
use thiserror::Error;

/// A violation of the inbound wire grammar.
///
/// Protocol errors are fatal to the stream: the owning connection is expected
/// to close the transport and reconnect. The decoder never tries to
/// resynchronize after one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{description}")]
pub struct ProtocolError {
    description: String,
}

impl ProtocolError {
    /// Create a protocol error with a free-form description.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }

    /// Control line led by a keyword outside the inbound grammar.
    pub fn unknown_operation(token: &[u8]) -> Self {
        Self::new(format!(
            "Unknown operation: {:?}",
            String::from_utf8_lossy(token)
        ))
    }

    /// Header line split into a token count other than 4 or 5.
    pub fn wrong_arity(count: usize) -> Self {
        Self::new(format!(
            "Wrong number of arguments in MSG: expected 4 or 5 tokens, got {count}"
        ))
    }

    /// Subscription id token is not a non-negative integer.
    pub fn invalid_subscription_id(token: &[u8]) -> Self {
        Self::new(format!(
            "Invalid subscription id in MSG: {:?}",
            String::from_utf8_lossy(token)
        ))
    }

    /// Declared payload length is not a non-negative integer.
    pub fn invalid_payload_length(token: &[u8]) -> Self {
        Self::new(format!(
            "Invalid payload length in MSG: {:?}",
            String::from_utf8_lossy(token)
        ))
    }

    pub fn empty_subject() -> Self {
        Self::new("Empty subject in MSG")
    }

    pub fn empty_reply() -> Self {
        Self::new("Empty reply subject in MSG")
    }

    pub fn payload_too_large(size: usize, max: usize) -> Self {
        Self::new(format!("Payload too large: {size} bytes (max {max})"))
    }

    /// A control line grew past the configured limit without a terminator.
    pub fn control_line_too_long(size: usize, max: usize) -> Self {
        Self::new(format!(
            "Control line exceeds maximum size: {size} bytes (max {max})"
        ))
    }

    /// Human-readable description of the violation.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the error condemns the stream it came from.
    ///
    /// Protocol and I/O errors both leave the connection unusable.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Displays a byte string for log output, lossy for non-UTF-8 input.
pub struct Lossy<'a>(pub &'a [u8]);

impl fmt::Display for Lossy<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.0))
    }
}
