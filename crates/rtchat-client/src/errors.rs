use crate::event::EventKind;

/// Failure to decode the payload of a single stream frame.
///
/// These never leave the controller: a frame that fails to decode is dropped
/// and the session keeps waiting for the next one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Payload was not valid JSON.
    #[error("invalid json in {kind} payload: {message}")]
    Json { kind: EventKind, message: String },
    /// Payload was valid JSON but not a JSON string.
    #[error("{kind} payload is not a json string")]
    NotText { kind: EventKind },
    /// Frame carried an event name this client does not handle.
    #[error("unknown event kind: {0}")]
    UnknownKind(String),
}

impl DecodeError {
    pub(crate) fn json(kind: EventKind, err: &serde_json::Error) -> Self {
        Self::Json {
            kind,
            message: err.to_string(),
        }
    }
}

/// Top-level error type for the public client API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid caller input (for example an empty submission).
    #[error("validation error: {0}")]
    Validation(String),
    /// Network or stream I/O failed.
    #[error("transport error: {0}")]
    Transport(String),
    /// Server answered with a non-success status.
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    /// Response body could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl ClientError {
    pub(crate) fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        match value.status() {
            Some(status) => ClientError::Http {
                status: status.as_u16(),
                body: value.to_string(),
            },
            None => ClientError::transport(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_names_the_event_kind() {
        let err = DecodeError::NotText {
            kind: EventKind::Token,
        };
        assert_eq!(err.to_string(), "token payload is not a json string");
    }

    #[test]
    fn decode_error_converts_into_client_error() {
        let err: ClientError = DecodeError::UnknownKind("ping".into()).into();
        assert!(matches!(err, ClientError::Decode(DecodeError::UnknownKind(name)) if name == "ping"));
    }
}
