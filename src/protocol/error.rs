//! Protocol error types

use thiserror::Error;

/// A frame that cannot be turned into an event.
///
/// Fatal to the connection that sent it.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Frame is not valid JSON
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Binary frame is not valid UTF-8
    #[error("frame is not valid UTF-8")]
    InvalidUtf8,

    /// Frame is JSON but not an object
    #[error("event must be a JSON object")]
    NotAnObject,

    /// Object has no `op` key
    #[error("event has no `op` field")]
    MissingOp,

    /// `op` is present but not a string
    #[error("`op` must be a string")]
    InvalidOp,
}
