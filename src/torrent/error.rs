use thiserror::Error;

use crate::bencode::BencodeError;

/// Reasons a metainfo file is rejected.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The input is not valid bencode.
    #[error("bencode error: {0}")]
    Encoding(#[from] BencodeError),

    /// A required key is missing or holds the wrong type.
    #[error("schema error: {0}")]
    Schema(String),

    /// A field's byte length does not divide into its fixed record size.
    #[error("malformed field: {0}")]
    Malformed(String),

    /// The input exceeded the caller's size cap (in bytes).
    #[error("metainfo larger than {0} bytes")]
    TooLarge(u64),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
