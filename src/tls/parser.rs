//! TLS record + ClientHello parser.
//!
//! Parses just enough of the wire format to extract the SNI and ALPN
//! extensions, never reading past the bytes it's given. The record-length
//! field (`R`) is read once the 5-byte record header is available; once the
//! buffer holds the full record (`len >= 5 + R`), every length inside the
//! handshake body is checked against that already-fully-buffered record
//! rather than the whole connection buffer. A ClientHello that doesn't fit
//! in a single record — rare, but legal TLS — is reported as [`ParseOutcome::NotTls`]
//! rather than chased across records; see DESIGN.md for the reasoning.

const RECORD_HEADER_LEN: usize = 5;
const HANDSHAKE_HEADER_LEN: usize = 4;
const CLIENT_HELLO_FIXED_LEN: usize = 34; // client version (2) + random (32)
const VALID_RECORD_MINORS: [u8; 5] = [0, 1, 2, 3, 4];
const CLIENT_HELLO_TYPE: u8 = 0x01;
const EXT_SNI: u16 = 0x0000;
const EXT_ALPN: u16 = 0x0010;
const SNI_HOST_NAME_TYPE: u8 = 0x00;

/// Outcome of attempting to parse a TLS ClientHello from a prefix buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// Need more bytes before a decision can be made.
    Incomplete,
    /// Bytes are structurally not a TLS ClientHello.
    NotTls,
    /// Parsed successfully; SNI/ALPN may or may not be present.
    Hello(ClientHelloInfo),
}

/// The pieces of a ClientHello this crate cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientHelloInfo {
    /// First SNI hostname entry (name type 0x00), lowercased with any
    /// trailing dot trimmed.
    pub server_name: Option<String>,
    /// All ALPN protocol names, in the order the client offered them.
    pub alpn: Vec<String>,
}

pub fn parse_client_hello(bytes: &[u8]) -> ParseOutcome {
    if bytes.len() < RECORD_HEADER_LEN {
        return ParseOutcome::Incomplete;
    }
    if bytes[0] != 0x16 {
        return ParseOutcome::NotTls;
    }
    let minor = bytes[2];
    if !VALID_RECORD_MINORS.contains(&minor) {
        return ParseOutcome::NotTls;
    }

    let record_len = u16::from_be_bytes([bytes[3], bytes[4]]) as usize;
    let record_end = RECORD_HEADER_LEN + record_len;
    if bytes.len() < record_end {
        return ParseOutcome::Incomplete;
    }

    let handshake = &bytes[RECORD_HEADER_LEN..record_end];
    if handshake.is_empty() || handshake[0] != CLIENT_HELLO_TYPE {
        return ParseOutcome::NotTls;
    }
    if handshake.len() < HANDSHAKE_HEADER_LEN {
        return ParseOutcome::NotTls;
    }
    let handshake_len = ((handshake[1] as usize) << 16)
        | ((handshake[2] as usize) << 8)
        | handshake[3] as usize;
    if HANDSHAKE_HEADER_LEN + handshake_len > handshake.len() {
        // Declared handshake body doesn't fit in the record we already have
        // in full; a continuation record would be needed to decide, which
        // this parser doesn't chase (see module docs).
        return ParseOutcome::NotTls;
    }

    let hello = &handshake[HANDSHAKE_HEADER_LEN..HANDSHAKE_HEADER_LEN + handshake_len];
    if hello.len() < CLIENT_HELLO_FIXED_LEN {
        return ParseOutcome::NotTls;
    }
    let mut pos = CLIENT_HELLO_FIXED_LEN;

    if pos >= hello.len() {
        return ParseOutcome::NotTls;
    }
    let session_id_len = hello[pos] as usize;
    pos += 1;
    if pos + session_id_len > hello.len() {
        return ParseOutcome::NotTls;
    }
    pos += session_id_len;

    if pos + 2 > hello.len() {
        return ParseOutcome::NotTls;
    }
    let cipher_suites_len = u16::from_be_bytes([hello[pos], hello[pos + 1]]) as usize;
    pos += 2;
    if pos + cipher_suites_len > hello.len() {
        return ParseOutcome::NotTls;
    }
    pos += cipher_suites_len;

    if pos >= hello.len() {
        return ParseOutcome::NotTls;
    }
    let compression_len = hello[pos] as usize;
    pos += 1;
    if pos + compression_len > hello.len() {
        return ParseOutcome::NotTls;
    }
    pos += compression_len;

    if pos + 2 > hello.len() {
        // No extensions block: a structurally valid ClientHello, just an
        // old one (or one with nothing to negotiate).
        return ParseOutcome::Hello(ClientHelloInfo::default());
    }
    let extensions_len = u16::from_be_bytes([hello[pos], hello[pos + 1]]) as usize;
    pos += 2;
    let extensions_end = (pos + extensions_len).min(hello.len());

    let mut server_name = None;
    let mut alpn = Vec::new();

    while pos + 4 <= extensions_end {
        let ext_type = u16::from_be_bytes([hello[pos], hello[pos + 1]]);
        let ext_len = u16::from_be_bytes([hello[pos + 2], hello[pos + 3]]) as usize;
        pos += 4;
        let payload_end = (pos + ext_len).min(hello.len());
        let payload = &hello[pos..payload_end];

        match ext_type {
            EXT_SNI if server_name.is_none() => server_name = parse_sni_extension(payload),
            EXT_ALPN => alpn = parse_alpn_extension(payload),
            _ => {}
        }

        pos = payload_end;
    }

    ParseOutcome::Hello(ClientHelloInfo { server_name, alpn })
}

fn parse_sni_extension(payload: &[u8]) -> Option<String> {
    if payload.len() < 2 {
        return None;
    }
    let list_len = u16::from_be_bytes([payload[0], payload[1]]) as usize;
    let list_end = (2 + list_len).min(payload.len());

    let mut pos = 2;
    while pos + 3 <= list_end {
        let name_type = payload[pos];
        let name_len = u16::from_be_bytes([payload[pos + 1], payload[pos + 2]]) as usize;
        pos += 3;
        let name_end = (pos + name_len).min(payload.len());

        if name_type == SNI_HOST_NAME_TYPE {
            return std::str::from_utf8(&payload[pos..name_end])
                .ok()
                .map(|s| s.to_lowercase().trim_end_matches('.').to_string());
        }
        pos = name_end;
    }
    None
}

fn parse_alpn_extension(payload: &[u8]) -> Vec<String> {
    if payload.len() < 2 {
        return Vec::new();
    }
    let list_len = u16::from_be_bytes([payload[0], payload[1]]) as usize;
    let list_end = (2 + list_len).min(payload.len());

    let mut pos = 2;
    let mut protocols = Vec::new();
    while pos < list_end && pos < payload.len() {
        let proto_len = payload[pos] as usize;
        pos += 1;
        if proto_len == 0 {
            break;
        }
        let proto_end = (pos + proto_len).min(payload.len());
        protocols.push(String::from_utf8_lossy(&payload[pos..proto_end]).into_owned());
        pos = proto_end;
    }
    protocols
}
