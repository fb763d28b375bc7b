//! `MSG` control line grammar.
//!
//! ```text
//! MSG <subject> <sid> <len>
//! MSG <subject> <sid> <reply> <len>
//! ```
//!
//! Tokens are separated by single spaces, so consecutive spaces produce
//! empty tokens and are rejected through the per-token checks. Subject and
//! reply are sliced out of the line without copying.

use bytes::Bytes;
use skiff_core::constants::{MSG_OP, SPACE};
use skiff_core::types::parse_decimal;
use skiff_core::{ProtocolError, SubscriptionId};

/// Largest token count a valid header can have.
const MAX_TOKENS: usize = 5;

/// Header fields of a delivery whose payload has not been consumed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingHeader {
    pub subject: Bytes,
    pub subscription_id: SubscriptionId,
    pub reply_to: Option<Bytes>,
    pub payload_len: usize,
}

impl PendingHeader {
    /// Parse a header line, terminator excluded.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolError`] if the line does not start with the
    /// `MSG` keyword, has other than 4 or 5 tokens, the subject or reply is empty, or the subscription id or
    /// length is not a non-negative integer.
    ///
    /// # Example
    ///
    /// ```
    /// use bytes::Bytes;
    /// use skiff_protocol::PendingHeader;
    ///
    /// let line = Bytes::from_static(b"MSG foo.bar 9 reply.1 11");
    /// let header = PendingHeader::parse(&line).unwrap();
    /// assert_eq!(&header.subject[..], b"foo.bar");
    /// assert_eq!(header.subscription_id.as_u64(), 9);
    /// assert_eq!(header.reply_to.as_deref(), Some(&b"reply.1"[..]));
    /// assert_eq!(header.payload_len, 11);
    /// ```
    pub fn parse(line: &Bytes) -> Result<Self, ProtocolError> {
        let mut tokens: [&[u8]; MAX_TOKENS] = [&[]; MAX_TOKENS];
        let mut count = 0;
        for token in line.split(|&b| b == SPACE) {
            if count < MAX_TOKENS {
                tokens[count] = token;
            }
            count += 1;
        }

        if tokens[0] != MSG_OP {
            return Err(ProtocolError::unknown_operation(tokens[0]));
        }

        let (subject, sid, reply, len) = match count {
            4 => (tokens[1], tokens[2], None, tokens[3]),
            5 => (tokens[1], tokens[2], Some(tokens[3]), tokens[4]),
            n => return Err(ProtocolError::wrong_arity(n)),
        };

        if subject.is_empty() {
            return Err(ProtocolError::empty_subject());
        }
        let subscription_id = SubscriptionId::parse(sid)?;
        let reply_to = match reply {
            Some([]) => return Err(ProtocolError::empty_reply()),
            Some(reply) => Some(line.slice_ref(reply)),
            None => None,
        };
        let payload_len = parse_decimal(len)
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| ProtocolError::invalid_payload_length(len))?;

        Ok(PendingHeader {
            subject: line.slice_ref(subject),
            subscription_id,
            reply_to,
            payload_len,
        })
    }
}
