//! Byte-level protocol recognizers.
//!
//! Every probe here is a pure function of `(bytes, entry)`: read-only,
//! bounded to `bytes.len()`, and deterministic. See [`crate::arbiter`] for
//! how the chain combines their outcomes.

pub mod adb;
pub mod anyprot;
pub mod http;
pub mod openvpn;
pub mod regex_probe;
pub mod socks5;
pub mod tinc;
pub mod xmpp;

pub use crate::tls::probe as tls;
pub use adb::probe as adb_probe;
pub use anyprot::probe as anyprot_probe;
pub use http::probe as http_probe;
pub use openvpn::probe as openvpn_probe;
pub use regex_probe::probe as regex;
pub use socks5::probe as socks5_probe;
pub use ssh::probe as ssh_probe;
pub use tinc::probe as tinc_probe;
pub use xmpp::probe as xmpp_probe;

pub mod ssh;
