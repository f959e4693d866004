/// Errors returned by the backend client and console operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid caller input detected before any request was sent.
    #[error("validation error: {0}")]
    Validation(String),
    /// Network failure or aborted connection.
    #[error("transport error: {0}")]
    Transport(String),
    /// The backend answered with a non-success HTTP status.
    #[error("HTTP error! status: {status}")]
    Status { status: u16, body: String },
    /// The backend answered with a body that does not match the expected shape.
    #[error("decode error: {0}")]
    Decode(String),
}

impl ClientError {
    pub(crate) fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub(crate) fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }

    /// Returns the HTTP status code when the error came from a non-success response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Error raised while narrowing a single stream frame.
///
/// Frame errors never abort a stream; the consumer logs and skips the frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("invalid JSON frame: {0}")]
    Json(String),
    #[error("frame is not a JSON object")]
    NotAnObject,
    #[error("message frame without a `data` object")]
    MissingPayload,
}
