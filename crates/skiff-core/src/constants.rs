//! Wire-level constants for the skiff pub/sub client protocol.
//!
//! This module defines the operation keywords, terminators and size limits
//! shared by the decoder and the reader loop. Keeping them in one place keeps
//! the decoder and any tooling built on top of it in agreement about what the
//! server sends.
//!
//! # Protocol Structure
//!
//! Every protocol unit starts with a control line terminated by CRLF. Only
//! message deliveries carry a payload after the control line:
//!
//! ```text
//! MSG <subject> <sid> [reply] <len>\r\n<payload>\n
//! +OK\r\n
//! -ERR '<text>'\r\n
//! PING\r\n
//! PONG\r\n
//! ```
//!
//! | Keyword | Direction | Payload | Decoder action |
//! |---------|-----------|---------|----------------|
//! | `MSG`   | inbound   | yes     | decode and dispatch message |
//! | `+OK`   | inbound   | no      | consume silently |
//! | `-ERR`  | inbound   | no      | dispatch error text |
//! | `PING`  | both      | no      | dispatch keep-alive request |
//! | `PONG`  | both      | no      | dispatch keep-alive acknowledgment |
//! | `INFO`, `CONNECT`, `PUB`, `SUB`, `UNSUB` | outbound | - | not parsed |
//!
//! # Usage
//!
//! ```
//! use skiff_core::constants::*;
//!
//! assert_eq!(PING, b"PING\r\n");
//! assert!(b"MSG foo 1 0\r\n\n".starts_with(MSG_OP));
//! ```

// ============================================================================
// Operation Keywords
// ============================================================================

/// Server information keyword (outbound negotiation, not parsed).
pub const INFO_OP: &[u8] = b"INFO";

/// Client connect keyword (outbound only).
pub const CONNECT_OP: &[u8] = b"CONNECT";

/// Publish keyword (outbound only).
pub const PUB_OP: &[u8] = b"PUB";

/// Subscribe keyword (outbound only).
pub const SUB_OP: &[u8] = b"SUB";

/// Unsubscribe keyword (outbound only).
pub const UNSUB_OP: &[u8] = b"UNSUB";

/// Message delivery keyword.
///
/// The keyword is the first token of the delivery control line, so the
/// decoder recognizes it without consuming it.
///
/// # Examples
///
/// ```
/// use skiff_core::constants::{MSG_OP, SPACE};
///
/// let line = b"MSG foo.bar 9 11";
/// let first = line.split(|&b| b == SPACE).next();
/// assert_eq!(first, Some(MSG_OP));
/// ```
pub const MSG_OP: &[u8] = b"MSG";

/// Keep-alive request keyword.
pub const PING_OP: &[u8] = b"PING";

/// Keep-alive acknowledgment keyword.
pub const PONG_OP: &[u8] = b"PONG";

/// Acknowledgment keyword.
pub const OK_OP: &[u8] = b"+OK";

/// Error notification keyword.
pub const ERR_OP: &[u8] = b"-ERR";

// ============================================================================
// Terminators and Separators
// ============================================================================

/// Control line terminator.
pub const CRLF: &[u8] = b"\r\n";

/// Length of [`CRLF`] in bytes.
pub const CRLF_SIZE: usize = CRLF.len();

/// Token separator within a control line.
pub const SPACE: u8 = b' ';

/// Message unit terminator following the payload.
///
/// Deliveries end with a bare line feed, not CRLF. Servers that send CRLF
/// after the payload are still accepted since the decoder skips through the
/// first line feed.
pub const MSG_END: u8 = b'\n';

// ============================================================================
// Complete Units
// ============================================================================

/// Complete acknowledgment unit.
pub const OK: &[u8] = b"+OK\r\n";

/// Complete keep-alive request unit.
pub const PING: &[u8] = b"PING\r\n";

/// Complete keep-alive acknowledgment unit.
///
/// This is also the fixed reply a client sends when it receives [`PING`].
pub const PONG: &[u8] = b"PONG\r\n";

// ============================================================================
// Size Limits
// ============================================================================

/// Read size used by the reader loop for each socket read.
pub const SCRATCH_SIZE: usize = 512;

/// Maximum length of a control line, terminator excluded.
///
/// A line that grows beyond this size without a terminator is a protocol
/// error. This bounds memory when a server misbehaves.
pub const MAX_CONTROL_LINE_SIZE: usize = 1024;

/// Default maximum declared payload length (1 MiB).
pub const DEFAULT_MAX_PAYLOAD: usize = 1024 * 1024;
