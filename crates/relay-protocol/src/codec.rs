//! Bounded line codec for the chat stream.
//!
//! Inbound lines are split on LF. A line that grows past the chunk limit
//! without a terminator is not rejected: it is handed out in consecutive
//! chunks of at most `max_chunk` bytes, each treated as its own line.
//!
//! Outbound lines are written with a CRLF terminator.

use bytes::{BufMut, BytesMut};
use relay_core::limits::INBOUND_LINE_BUFFER;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

/// Errors produced by [`ChatLineCodec`].
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Line codec with a bounded inbound chunk size.
#[derive(Debug, Clone)]
pub struct ChatLineCodec {
    /// Largest chunk handed out without a terminator
    max_chunk: usize,

    /// Bytes already scanned for a terminator
    next_index: usize,
}

impl ChatLineCodec {
    /// Creates a codec for a 1024-byte read buffer (1023 usable bytes).
    pub fn new() -> Self {
        Self::with_max_chunk(INBOUND_LINE_BUFFER - 1)
    }

    /// Creates a codec with a custom chunk limit (minimum 1).
    pub fn with_max_chunk(max_chunk: usize) -> Self {
        Self {
            max_chunk: max_chunk.max(1),
            next_index: 0,
        }
    }

    /// Returns the chunk limit.
    pub fn max_chunk(&self) -> usize {
        self.max_chunk
    }
}

impl Default for ChatLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ChatLineCodec {
    type Item = String;
    type Error = CodecError;

    /// Yields the raw line including its terminator, or a bare chunk.
    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, CodecError> {
        // A terminator right after a full chunk still belongs to that line
        let search_end = buf.len().min(self.max_chunk + 1);
        let start = self.next_index.min(search_end);

        let newline = buf
            .get(start..search_end)
            .and_then(|window| window.iter().position(|b| *b == b'\n'));

        if let Some(offset) = newline {
            self.next_index = 0;
            let line = buf.split_to(start + offset + 1);
            return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
        }

        if buf.len() >= self.max_chunk {
            self.next_index = 0;
            let chunk = buf.split_to(self.max_chunk);
            return Ok(Some(String::from_utf8_lossy(&chunk).into_owned()));
        }

        self.next_index = buf.len();
        Ok(None)
    }

    /// Flushes a trailing unterminated line when the peer closes.
    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, CodecError> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        if buf.is_empty() {
            return Ok(None);
        }
        self.next_index = 0;
        let rest = buf.split_to(buf.len());
        Ok(Some(String::from_utf8_lossy(&rest).into_owned()))
    }
}

impl Encoder<String> for ChatLineCodec {
    type Error = CodecError;

    fn encode(&mut self, line: String, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.reserve(line.len() + 2);
        buf.put_slice(line.as_bytes());
        buf.put_slice(b"\r\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(codec: &mut ChatLineCodec, buf: &mut BytesMut) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(line) = codec.decode(buf).unwrap() {
            out.push(line);
        }
        out
    }

    #[test]
    fn test_decodes_lf_and_crlf_lines() {
        let mut codec = ChatLineCodec::new();
        let mut buf = BytesMut::from("hello\r\nworld\n");
        assert_eq!(decode_all(&mut codec, &mut buf), vec!["hello\r\n", "world\n"]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_waits_for_terminator() {
        let mut codec = ChatLineCodec::new();
        let mut buf = BytesMut::from("hel");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"lo\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some("hello\n".to_string()));
    }

    #[test]
    fn test_long_line_is_chunked() {
        let mut codec = ChatLineCodec::with_max_chunk(4);
        let mut buf = BytesMut::from("abcdefghij\n");
        assert_eq!(
            decode_all(&mut codec, &mut buf),
            vec!["abcd", "efgh", "ij\n"]
        );
    }

    #[test]
    fn test_terminator_right_after_full_chunk_stays_with_line() {
        let mut codec = ChatLineCodec::with_max_chunk(4);
        let mut buf = BytesMut::from("abcd\nxy\n");
        assert_eq!(decode_all(&mut codec, &mut buf), vec!["abcd\n", "xy\n"]);
    }

    #[test]
    fn test_default_chunk_fills_read_buffer() {
        let mut codec = ChatLineCodec::new();
        assert_eq!(codec.max_chunk(), 1023);

        let mut buf = BytesMut::from("x".repeat(1500).as_str());
        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.len(), 1023);
        assert_eq!(buf.len(), 477);
    }

    #[test]
    fn test_decode_eof_flushes_partial_line() {
        let mut codec = ChatLineCodec::new();
        let mut buf = BytesMut::from("bye");
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), Some("bye".to_string()));
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut codec = ChatLineCodec::new();
        let mut buf = BytesMut::from(&b"a\xffb\n"[..]);
        let line = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(line, "a\u{fffd}b\n");
    }

    #[test]
    fn test_encode_appends_crlf() {
        let mut codec = ChatLineCodec::new();
        let mut buf = BytesMut::new();
        codec.encode("<<PONG".to_string(), &mut buf).unwrap();
        assert_eq!(&buf[..], b"<<PONG\r\n");
    }
}
