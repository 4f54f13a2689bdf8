//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while encoding or decoding wire events.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Payload was not valid JSON, carried an unknown `type`, or was missing
    /// a required field. Callers drop the frame without replying.
    #[error("malformed event: {0}")]
    Malformed(#[from] serde_json::Error),
}
