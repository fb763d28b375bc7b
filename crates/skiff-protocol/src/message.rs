use bytes::Bytes;
use skiff_core::SubscriptionId;

/// A message delivery decoded from a `MSG` unit.
///
/// Built only once the full declared payload has been buffered, then handed
/// by value to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    subject: Bytes,
    reply_to: Option<Bytes>,
    subscription_id: SubscriptionId,
    payload: Bytes,
}

impl DecodedMessage {
    pub fn new(
        subject: Bytes,
        reply_to: Option<Bytes>,
        subscription_id: SubscriptionId,
        payload: Bytes,
    ) -> Self {
        DecodedMessage {
            subject,
            reply_to,
            subscription_id,
            payload,
        }
    }

    pub fn subject(&self) -> &[u8] {
        &self.subject
    }

    /// Subject as UTF-8, if it is valid UTF-8.
    pub fn subject_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.subject).ok()
    }

    pub fn reply_to(&self) -> Option<&[u8]> {
        self.reply_to.as_deref()
    }

    pub fn subscription_id(&self) -> SubscriptionId {
        self.subscription_id
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Take the payload without copying.
    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}
