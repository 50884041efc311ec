use crate::submission::Submission;
use thiserror::Error;

/// The request, poll or channel could not be completed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("stream failed: {0}")]
    Stream(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError::Request(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        TransportError::Stream(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquireError {
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
    /// Non-2xx reply, or an `error`/`detail` sent by the backend
    #[error("backend error: {message}")]
    Backend { status: Option<u16>, message: String },
    /// A reply or message that does not match the wire contract
    #[error("unexpected response: {0}")]
    Protocol(String),
    #[error("submission cancelled")]
    Cancelled,
}

impl AcquireError {
    pub fn backend(status: Option<u16>, message: impl Into<String>) -> Self {
        AcquireError::Backend {
            status,
            message: message.into(),
        }
    }
}

/// Terminal failure of a submission
///
/// `partial` holds whatever was aggregated before the failure. It is never
/// marked completed.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct SubmissionFailure {
    pub error: AcquireError,
    pub partial: Box<Submission>,
}
