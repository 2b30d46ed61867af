//! Error types for API operations

/// Errors from BookNet API calls.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("connection error: {0}")]
    Transport(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    /// The session could not be recovered; credentials have been cleared
    #[error("session expired, please log in again")]
    SessionExpired,

    /// Non-2xx response outside the refresh path
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// `success: false` envelope; the message is user facing
    #[error("{0}")]
    Rejected(String),

    #[error("response has no data: {0}")]
    MissingData(String),

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Auth(#[from] booknet_auth::Error),
}

impl Error {
    /// Message suitable for showing to an end user.
    ///
    /// Transport failures collapse into one generic connection message.
    pub fn user_message(&self) -> String {
        match self {
            Error::Transport(_) | Error::Timeout(_) => {
                "Unable to reach BookNet, please check your connection".to_string()
            }
            Error::Auth(e) if e.is_transport() => {
                "Unable to reach BookNet, please check your connection".to_string()
            }
            Error::Auth(booknet_auth::Error::Rejected(msg))
            | Error::Auth(booknet_auth::Error::Validation(msg))
            | Error::Rejected(msg)
            | Error::Validation(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    pub(crate) fn from_transport(context: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(format!("{context}: {e}"))
        } else {
            Error::Transport(format!("{context}: {e}"))
        }
    }
}

/// Result alias for API operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_share_a_generic_message() {
        let a = Error::Transport("connection refused".into()).user_message();
        let b = Error::Timeout("after 10s".into()).user_message();
        let c = Error::Auth(booknet_auth::Error::Http("dns".into())).user_message();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert!(!a.contains("refused"));
    }

    #[test]
    fn business_errors_are_shown_verbatim() {
        assert_eq!(
            Error::Rejected("Genre already exists".into()).user_message(),
            "Genre already exists"
        );
        assert_eq!(
            Error::Auth(booknet_auth::Error::Validation("Username is required".into()))
                .user_message(),
            "Username is required"
        );
    }
}
