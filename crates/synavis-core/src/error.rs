//! Error types for Synavis

use thiserror::Error;

/// Result type for Synavis operations
pub type Result<T> = std::result::Result<T, SynavisError>;

/// Synavis error types
///
/// Every variant except the transport ones is recovered at the command
/// boundary and turned into an `error` reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynavisError {
    /// Wire value does not have the expected shape
    #[error("Malformed value: {0}")]
    MalformedValue(String),

    /// Path, property or name resolution failed
    #[error("Not found: {0}")]
    NotFound(String),

    /// Value kind incompatible with the target accessor
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// Shortcut property used on an object that is not placeable
    #[error("Capability missing: {0}")]
    CapabilityMissing(String),

    /// Payload arrived while no reception accepts it
    #[error("Unexpected data: {0}")]
    UnexpectedData(String),

    /// Envelope `type` is not part of the protocol
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Same object and property already tracked
    #[error("Already tracking {0}")]
    DuplicateTracking(String),

    /// Declared storage type has no value-model counterpart
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// Transport failure
    #[error("IPC error: {0}")]
    IpcError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Error envelope received by a client
    #[error("Server error: {0}")]
    ServerError(String),
}

impl SynavisError {
    /// Transport errors end the connection; everything else is reported
    pub fn is_fatal(&self) -> bool {
        matches!(self, SynavisError::IpcError(_))
    }
}

impl From<serde_json::Error> for SynavisError {
    fn from(err: serde_json::Error) -> Self {
        SynavisError::SerializationError(err.to_string())
    }
}
