//! The deferred connection buffer.
//!
//! Every byte read from the client while deciding which backend to route to
//! is retained here; once a decision is made, the buffer is replayed to the
//! chosen backend verbatim before the connection is spliced, so the backend
//! sees exactly what the client sent and nothing is lost or duplicated.

use bytes::BytesMut;

/// Growable, append-only read buffer capped at a maximum size.
#[derive(Debug, Default)]
pub struct SniffBuffer {
    bytes: BytesMut,
    cap: usize,
}

impl SniffBuffer {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            bytes: BytesMut::with_capacity(cap),
            cap,
        }
    }

    /// Bytes accumulated so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Room left before the cap is hit.
    pub fn remaining_capacity(&self) -> usize {
        self.cap.saturating_sub(self.bytes.len())
    }

    /// True once the cap has been reached; no more bytes should be read.
    pub fn is_full(&self) -> bool {
        self.bytes.len() >= self.cap
    }

    pub fn extend(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }
}
