use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier correlating a delivery with a locally registered subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        SubscriptionId(id)
    }

    /// Parse a subscription id token from a control line.
    ///
    /// Only ASCII decimal digits are accepted, so signs and whitespace are
    /// rejected.
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] if the token is empty, contains a
    /// non-digit, or overflows `u64`.
    pub fn parse(token: &[u8]) -> Result<Self, ProtocolError> {
        parse_decimal(token)
            .map(SubscriptionId)
            .ok_or_else(|| ProtocolError::invalid_subscription_id(token))
    }

    #[must_use]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SubscriptionId {
    fn from(id: u64) -> Self {
        SubscriptionId(id)
    }
}

impl std::str::FromStr for SubscriptionId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, ProtocolError> {
        SubscriptionId::parse(s.as_bytes())
    }
}

/// Parse a non-negative ASCII decimal integer.
///
/// Returns `None` for an empty token, any non-digit byte, or overflow.
#[must_use]
pub fn parse_decimal(token: &[u8]) -> Option<u64> {
    if token.is_empty() {
        return None;
    }
    token.iter().try_fold(0u64, |acc, &b| {
        if !b.is_ascii_digit() {
            return None;
        }
        acc.checked_mul(10)?.checked_add(u64::from(b - b'0'))
    })
}
