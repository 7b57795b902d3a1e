//! Archive errors

/// Errors raised while reading or writing an archive
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Failed to read or write the backing file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended inside a value
    #[error("Unexpected end of stream: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    /// Malformed payload, e.g. a map with an odd number of components
    #[error("Data format error: {0}")]
    DataFormat(String),

    /// A type required to continue is unknown or unusable
    #[error("Type information error: {0}")]
    TypeInformation(String),

    /// Bad header, unsupported version or byte order
    #[error("Stream error: {0}")]
    Stream(String),

    /// Body checksum does not match the header
    #[error("Checksum mismatch: expected {expected:#010x}, found {actual:#010x}")]
    Checksum { expected: u32, actual: u32 },

    /// Malformed XML document
    #[error("XML error: {0}")]
    Xml(String),

    /// Operation not valid in the archive's current mode
    #[error("Archive is {state}, expected {expected}")]
    InvalidState {
        state: &'static str,
        expected: &'static str,
    },

    /// An object reaches itself through its own fields
    #[error("Cyclic reference through an instance of {0}")]
    CyclicReference(String),
}

/// Result type for archive operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;

impl ArchiveError {
    pub(crate) fn data_format(message: impl Into<String>) -> Self {
        Self::DataFormat(message.into())
    }

    pub(crate) fn xml(error: impl std::fmt::Display) -> Self {
        Self::Xml(error.to_string())
    }
}
