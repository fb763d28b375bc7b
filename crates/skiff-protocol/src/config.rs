use serde::{Deserialize, Serialize};
use skiff_core::constants::{DEFAULT_MAX_PAYLOAD, MAX_CONTROL_LINE_SIZE};
use skiff_core::{Error, Result};

/// Limits enforced by the stream decoder.
///
/// # Example
///
/// ```
/// use skiff_protocol::DecoderConfig;
///
/// let config = DecoderConfig::default().with_max_payload(64 * 1024);
/// assert_eq!(config.max_control_line, 1024);
/// assert_eq!(config.max_payload, 64 * 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Longest control line accepted, terminator excluded.
    pub max_control_line: usize,

    /// Largest declared payload length accepted in a `MSG` header.
    pub max_payload: usize,
}

impl DecoderConfig {
    #[must_use]
    pub fn with_max_control_line(mut self, max: usize) -> Self {
        self.max_control_line = max;
        self
    }

    #[must_use]
    pub fn with_max_payload(mut self, max: usize) -> Self {
        self.max_payload = max;
        self
    }

    /// Check the limits after loading them from a settings file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `max_control_line` is zero, which would
    /// reject every `MSG` header. A zero `max_payload` is allowed and
    /// admits only empty deliveries.
    pub fn validate(&self) -> Result<()> {
        if self.max_control_line == 0 {
            return Err(Error::Config(
                "max_control_line must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_control_line: MAX_CONTROL_LINE_SIZE,
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }
}
