use std::path::PathBuf;

/// Errors that can occur during DNS packet codec operations
#[derive(Debug, thiserror::Error)]
pub enum DnsCodecError {
    #[error("Incomplete packet: need at least {needed} bytes, have {available}")]
    IncompletePacket { needed: usize, available: usize },

    #[error("Truncated packet: input ended at offset {offset}")]
    Truncated { offset: usize },

    #[error("Unsupported label length byte {byte:#04x} at offset {offset}")]
    UnsupportedLabel { offset: usize, byte: u8 },

    #[error("Invalid label at offset {offset}: {reason}")]
    InvalidLabel { offset: usize, reason: &'static str },

    #[error("Nom parsing error: {0}")]
    NomError(String),

    #[error("Invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("Resource data of {0} bytes does not fit a 16-bit length")]
    RecordTooLarge(usize),

    #[error("Section holds {0} records, more than a 16-bit count allows")]
    TooManyRecords(usize),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors raised while loading the name table at startup
#[derive(Debug, thiserror::Error)]
pub enum LookupTableError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid address '{value}' for {name} in {path}")]
    InvalidAddress {
        path: PathBuf,
        name: String,
        value: String,
    },

    #[error("Malformed line {line} in {path}: '{content}'")]
    MalformedLine {
        path: PathBuf,
        line: usize,
        content: String,
    },

    #[error("No usable IPv4 entries in {path}")]
    Empty { path: PathBuf },
}
