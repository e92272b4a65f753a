use thiserror::Error;

/// Errors raised while turning a byte stream into features.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The container itself is malformed or truncated
    #[error("FlatGeobuf error: {0}")]
    FlatGeobuf(#[from] flatgeobuf::Error),

    /// A feature's geometry or properties could not be converted
    #[error("Geometry error: {0}")]
    Geometry(#[from] geozero::error::GeozeroError),

    /// Rejections raised by custom decoders with their own stream format
    #[error("Malformed feature stream: {0}")]
    Malformed(String),
}

/// Errors that abort a feature load. No partial collection is ever returned.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Request could not be sent or the body failed mid-transfer
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered without a usable body
    #[error("{resource} returned HTTP {status}")]
    Status { resource: String, status: u16 },

    /// Local file or transport I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource reference could not be resolved
    #[error("Invalid resource {resource}: {reason}")]
    Resource { resource: String, reason: String },

    /// Decoder worker panicked or was cancelled
    #[error("Decoder task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    /// The stream arrived intact but is not a valid feature collection
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
}

impl LoadError {
    /// Network, transport or body failures.
    pub fn is_io(&self) -> bool {
        !self.is_decode()
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, LoadError::Decode(_))
    }
}

/// Type alias for Results using LoadError
pub type Result<T> = std::result::Result<T, LoadError>;
