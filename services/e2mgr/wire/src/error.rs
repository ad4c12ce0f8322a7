//! Wire protocol error types.

use thiserror::Error;

/// Wire protocol errors
#[derive(Error, Debug)]
pub enum WireError {
    /// Incomplete frame (need more data)
    #[error("incomplete frame")]
    Incomplete,

    /// Unsupported protocol version
    #[error("version unsupported: {0}")]
    Version(u8),

    /// Size limit exceeded
    #[error("size limit exceeded: {0}")]
    Size(usize),

    /// Malformed frame structure
    #[error("malformed frame")]
    Malformed,

    /// Payload could not be decoded into the expected message
    #[error("decode failed for {message}: {reason}")]
    Decode {
        /// Message kind being decoded
        message: &'static str,
        /// Underlying decoder error
        reason: String,
    },

    /// Message could not be encoded
    #[error("encode failed for {message}: {reason}")]
    Encode {
        /// Message kind being encoded
        message: &'static str,
        /// Underlying encoder error
        reason: String,
    },

    /// Payload header template referenced a field with an unusable type
    #[error("invalid template field {0}")]
    Template(String),
}
