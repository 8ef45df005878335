//! Handler error types

use std::borrow::Cow;
use thiserror::Error;

use crate::session::ReservedNameError;

/// Failure raised by application handler code.
///
/// Caught at the dispatch boundary: logged in full on the server and reported
/// to the originating client as an `error` event. Never closes the connection.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// A required field was absent from the event
    #[error("missing required field `{0}`")]
    MissingField(String),

    /// A field was present but had the wrong shape
    #[error("field `{field}` is invalid: {source}")]
    InvalidField {
        field: String,
        #[source]
        source: serde_json::Error,
    },

    /// The event could not be deserialized into the handler's payload type
    #[error("{0}")]
    InvalidPayload(#[source] serde_json::Error),

    /// Handler tried to use a reserved group name
    #[error(transparent)]
    ReservedName(#[from] ReservedNameError),

    /// Handler panicked
    #[error("handler panicked: {0}")]
    Panic(String),

    /// Error with an application-chosen kind
    #[error("{detail}")]
    Custom {
        kind: Cow<'static, str>,
        detail: String,
    },

    /// Any other failure
    #[error("{0}")]
    Failed(#[from] anyhow::Error),
}

impl HandlerError {
    /// Error with an application-chosen kind, reported as `"<kind>: <detail>"`
    pub fn custom(kind: impl Into<Cow<'static, str>>, detail: impl Into<String>) -> Self {
        Self::Custom {
            kind: kind.into(),
            detail: detail.into(),
        }
    }

    /// Short machine-friendly name of the error class
    pub fn kind(&self) -> &str {
        match self {
            Self::MissingField(_) => "MissingField",
            Self::InvalidField { .. } => "InvalidField",
            Self::InvalidPayload(_) => "InvalidPayload",
            Self::ReservedName(_) => "ReservedName",
            Self::Panic(_) => "Panic",
            Self::Custom { kind, .. } => kind.as_ref(),
            Self::Failed(_) => "Error",
        }
    }

    /// Human-readable summary sent to the client
    pub fn summary(&self) -> String {
        format!("{}: {}", self.kind(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summaries() {
        assert_eq!(
            HandlerError::MissingField("name".into()).summary(),
            "MissingField: missing required field `name`"
        );
        assert_eq!(
            HandlerError::custom("ValueError", "bad room").summary(),
            "ValueError: bad room"
        );
        assert_eq!(
            HandlerError::from(anyhow::anyhow!("boom")).summary(),
            "Error: boom"
        );
        assert_eq!(
            HandlerError::Panic("oops".into()).summary(),
            "Panic: handler panicked: oops"
        );
    }

    #[test]
    fn test_reserved_name_conversion() {
        let err: HandlerError = ReservedNameError {
            name: "_x".into(),
        }
        .into();
        assert_eq!(err.kind(), "ReservedName");
        assert!(err.summary().starts_with("ReservedName: group name `_x`"));
    }
}
