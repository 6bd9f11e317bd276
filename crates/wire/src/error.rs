//! Errors raised while decoding or encoding wire frames.

use thiserror::Error;

/// Wire-level failures.
#[derive(Debug, Error)]
pub enum WireError {
    /// The frame was not valid JSON or did not match the envelope shape
    #[error("Malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A batch envelope carried something other than an array of envelopes
    #[error("Invalid batch: {0}")]
    InvalidBatch(String),
}

impl WireError {
    pub fn invalid_batch(msg: impl Into<String>) -> Self {
        Self::InvalidBatch(msg.into())
    }
}
