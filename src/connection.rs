//! Drives the read-then-arbitrate loop for a single connection: read a
//! chunk, run every configured probe over everything read so far, and
//! either settle on a match, ask for more bytes, or fall back.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;
use tracing::debug;

use crate::arbiter::{self, Decision};
use crate::buffer::SniffBuffer;
use crate::config::Configuration;
use crate::entry::ProtocolEntry;
use crate::fallback::{self, FallbackReason};

/// Default cap on bytes accumulated while sniffing a connection, generalized
/// from the TLS-only sniffer this crate's buffer accumulator grew out of.
pub const DEFAULT_MAX_SNIFF_BYTES: usize = 16384;

/// Default overall deadline for arriving at a decision.
pub const DEFAULT_SNIFF_TIMEOUT: Duration = Duration::from_millis(500);

const READ_CHUNK: usize = 4096;

/// Outcome of sniffing one connection: which entry to route to, and whether
/// that was an actual probe match or a fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Matched,
    FellBack(FallbackReason),
}

/// Read from `stream` into `buffer`, arbitrating after every chunk, until a
/// match, a fallback, or the overall timeout is reached. Returns the chosen
/// entry (if the configuration has at least one) and how it was chosen.
///
/// On success, `buffer` holds exactly the bytes read from the client; the
/// caller is responsible for replaying them to the chosen backend before
/// splicing the rest of the connection.
pub async fn sniff<'a, R: AsyncRead + Unpin>(
    stream: &mut R,
    config: &'a Configuration,
    buffer: &mut SniffBuffer,
) -> (Option<&'a ProtocolEntry>, Resolution) {
    let deadline = DEFAULT_SNIFF_TIMEOUT;

    match timeout(deadline, read_and_arbitrate(stream, config, buffer)).await {
        Ok(Some(entry)) => (Some(entry), Resolution::Matched),
        Ok(None) => {
            debug!("probe chain exhausted without a match");
            (
                fallback::select(config, FallbackReason::Exhausted),
                Resolution::FellBack(FallbackReason::Exhausted),
            )
        }
        Err(_) => {
            debug!("sniff timed out before a match");
            (
                fallback::select(config, FallbackReason::Timeout),
                Resolution::FellBack(FallbackReason::Timeout),
            )
        }
    }
}

async fn read_and_arbitrate<'a, R: AsyncRead + Unpin>(
    stream: &mut R,
    config: &'a Configuration,
    buffer: &mut SniffBuffer,
) -> Option<&'a ProtocolEntry> {
    loop {
        if buffer.is_full() {
            return None;
        }

        let mut chunk = vec![0u8; READ_CHUNK.min(buffer.remaining_capacity())];
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            // EOF or a read error: nothing more is coming. Every prior
            // arbitration pass already said NEXT or AGAIN for what's
            // buffered so far, so this is exhaustion, not a fresh decision.
            return None;
        }
        buffer.extend(&chunk[..n]);

        match arbiter::arbitrate(buffer.as_slice(), &config.entries) {
            Decision::Matched(entry) => return Some(entry),
            Decision::NeedMoreBytes => continue,
            Decision::Exhausted(_) => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::ProtocolEntry;
    use crate::probes;
    use std::io::Cursor;

    fn config() -> Configuration {
        Configuration::builder()
            .entry(ProtocolEntry::new("ssh", probes::ssh_probe))
            .entry(ProtocolEntry::new("http", probes::http_probe))
            .entry(ProtocolEntry::new("anyprot", probes::anyprot_probe))
            .on_timeout("ssh")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn matches_ssh_banner() {
        let config = config();
        let mut stream = Cursor::new(b"SSH-2.0-OpenSSH_9.0\r\n".to_vec());
        let mut buffer = SniffBuffer::with_capacity(DEFAULT_MAX_SNIFF_BYTES);
        let (entry, resolution) = sniff(&mut stream, &config, &mut buffer).await;
        assert_eq!(entry.unwrap().name, "ssh");
        assert_eq!(resolution, Resolution::Matched);
        assert_eq!(buffer.as_slice(), b"SSH-2.0-OpenSSH_9.0\r\n");
    }

    #[tokio::test]
    async fn empty_connection_falls_back_to_exhaustion_entry() {
        let config = config();
        let mut stream = Cursor::new(Vec::new());
        let mut buffer = SniffBuffer::with_capacity(DEFAULT_MAX_SNIFF_BYTES);
        let (entry, resolution) = sniff(&mut stream, &config, &mut buffer).await;
        assert_eq!(entry.unwrap().name, "anyprot");
        assert_eq!(resolution, Resolution::FellBack(FallbackReason::Exhausted));
    }

    #[tokio::test]
    async fn unrecognized_bytes_fall_through_to_catch_all() {
        // Every named entry declines (NEXT); the trailing anyprot entry is
        // never invoked directly (it's the residual fallback, not a probe
        // result), so this resolves via exhaustion rather than a match.
        let config = config();
        let mut stream = Cursor::new(b"\x01\x02\x03\x04garbage-not-a-known-protocol".to_vec());
        let mut buffer = SniffBuffer::with_capacity(DEFAULT_MAX_SNIFF_BYTES);
        let (entry, resolution) = sniff(&mut stream, &config, &mut buffer).await;
        assert_eq!(entry.unwrap().name, "anyprot");
        assert_eq!(resolution, Resolution::FellBack(FallbackReason::Exhausted));
    }
}
