use packed_struct::PackingError;
use thiserror::Error;

/// Startup faults: config missing/malformed, bad addresses, socket/bind failure.
/// Fatal by construction — `main` reports these and exits non-zero.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no configuration file found, tried: {0}")]
    NotFound(String),
    #[error("failed to load configuration from {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: config::ConfigError,
    },
    #[error("invalid listen address {0:?}: {1}")]
    InvalidListenAddress(String, std::net::AddrParseError),
    #[error("refuse_r_code must be in 1..=5, got {0}")]
    RcodeOutOfRange(u8),
    #[error("failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Wire-parse faults raised by the codec. Never escapes the event loop: every
/// call site matches on this and drops the offending packet (§7 of the spec).
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum WireError {
    #[error("packet shorter than a DNS header ({0} bytes)")]
    ShortHeader(usize),
    #[error("label length {0} exceeds 63 bytes")]
    LabelTooLong(u8),
    #[error("read at offset {0} is out of bounds (buffer length {1})")]
    OutOfBounds(usize, usize),
    #[error("compression pointer at offset {0} targets {1}, which is not strictly before it")]
    ForwardPointer(usize, usize),
    #[error("name exceeds 127 labels")]
    TooManyLabels,
    #[error("resolved name exceeds 255 bytes")]
    NameTooLong,
    #[error("question count {0} does not fit in the remaining buffer")]
    TruncatedQuestion(u16),
    #[error("header unpack failed: {0}")]
    Unpack(String),
}

impl From<PackingError> for WireError {
    fn from(error: PackingError) -> Self {
        WireError::Unpack(error.to_string())
    }
}
