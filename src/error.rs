use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The IP range dataset could not be turned into an index.
    #[error("malformed range data at row {row}: {reason}")]
    DataFormat { row: u64, reason: String },

    /// A log line could not be parsed into a host and timestamp.
    #[error("malformed log record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    /// An address handed to the range index is not a valid IPv4 literal.
    #[error("invalid IPv4 literal {0:?}")]
    InvalidIp(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
