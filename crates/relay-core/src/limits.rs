//! Framing and capacity limits.
//!
//! Existing clients depend on these exact maximum line lengths.

/// Default maximum number of simultaneously registered clients.
pub const DEFAULT_MAX_CLIENTS: usize = 100;

/// Default first id handed out by the registry.
pub const DEFAULT_ID_BASE: u32 = 10;

/// Size of the inbound line buffer. One byte is reserved, so a single
/// inbound chunk carries at most `INBOUND_LINE_BUFFER - 1` bytes.
pub const INBOUND_LINE_BUFFER: usize = 1024;

/// Maximum payload of a chat or private message frame (excluding CRLF).
pub const MAX_CHAT_PAYLOAD: usize = 200;

/// Maximum payload of a system notice frame (excluding CRLF).
pub const MAX_NOTICE_PAYLOAD: usize = 2047;

/// Maximum display name length in bytes.
pub const MAX_NAME_LEN: usize = 31;

/// Truncates `s` to at most `max` bytes without splitting a UTF-8 sequence.
pub fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s.get(..end).unwrap_or_default()
}
