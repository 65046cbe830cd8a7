use crate::dns::{NameError, RecordType};
use thiserror::Error;

/// Record content (rdata text) errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContentError {
    #[error("Empty record content")]
    Empty,

    #[error("{rtype} record requires {expected} fields, got {got}")]
    FieldCount {
        rtype: RecordType,
        expected: usize,
        got: usize,
    },

    #[error("Invalid {field} value: {value}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Invalid domain name '{0}': {1}")]
    InvalidName(String, NameError),

    #[error("Invalid IPv4 address: {0}")]
    InvalidIpv4(String),

    #[error("Invalid IPv6 address: {0}")]
    InvalidIpv6(String),

    #[error("Invalid hex data: {0}")]
    InvalidHex(String),

    #[error("Invalid base64 data: {0}")]
    InvalidBase64(String),

    #[error("Invalid base32hex data: {0}")]
    InvalidBase32(String),

    #[error("Invalid signature timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Unknown record type: {0}")]
    UnknownType(String),

    #[error("Unterminated quoted string: {0}")]
    UnterminatedString(String),

    #[error("Invalid escape sequence: {0}")]
    InvalidEscape(String),

    #[error("Character string too long: {0} bytes")]
    StringTooLong(usize),
}

pub type Result<T> = std::result::Result<T, ContentError>;
