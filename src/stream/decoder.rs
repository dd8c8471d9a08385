//! Newline-delimited record decoder.
//!
//! Bytes are buffered raw, so a multi-byte UTF-8 character split across two
//! transport reads is reassembled before the record is decoded. A record is
//! only returned once its terminating `\n` has arrived.

use bytes::{Buf, BytesMut};

/// Splits an arriving byte stream into complete text records.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: BytesMut,
    /// Bytes of `buffer` already known to contain no delimiter
    scanned: usize,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every record it completed, in order.
    ///
    /// Trailing `\r` is stripped and blank records are dropped. Whatever
    /// follows the last delimiter stays buffered for the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut records = Vec::new();
        while let Some(offset) = self.buffer[self.scanned..].iter().position(|b| *b == b'\n') {
            let end = self.scanned + offset;
            let line = self.buffer.split_to(end);
            self.buffer.advance(1);
            self.scanned = 0;
            if let Some(record) = decode_line(&line) {
                records.push(record);
            }
        }
        self.scanned = self.buffer.len();
        records
    }

    /// Flush an unterminated trailing record at end-of-stream.
    pub fn finish(&mut self) -> Option<String> {
        let rest = self.buffer.split();
        self.scanned = 0;
        decode_line(&rest)
    }

    /// Number of buffered bytes that do not yet form a complete record.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any buffered partial record.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.scanned = 0;
    }
}

fn decode_line(bytes: &[u8]) -> Option<String> {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    let text = String::from_utf8_lossy(bytes);
    if text.trim().is_empty() {
        None
    } else {
        Some(text.into_owned())
    }
}
