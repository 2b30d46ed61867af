//! Error types for BookNet authentication operations

/// Errors from authentication operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    /// Server answered with `success: false`; the message is user facing
    #[error("{0}")]
    Rejected(String),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("invalid token response: {0}")]
    InvalidTokenResponse(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// Classify a reqwest transport error.
    pub(crate) fn from_transport(context: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(format!("{context}: {e}"))
        } else {
            Error::Http(format!("{context}: {e}"))
        }
    }

    /// Whether the failure came from the network rather than the server.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Timeout(_))
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
