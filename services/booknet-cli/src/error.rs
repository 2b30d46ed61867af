//! CLI error types

use thiserror::Error;

/// Session guard errors.
///
/// API and auth failures keep their own error types; these cover what the
/// CLI decides on its own before or after calling the API. Argument errors
/// are reported by clap before any of this runs.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not logged in. Run `booknet login <username>` first.")]
    NotLoggedIn,

    #[error("Admin access required")]
    AdminRequired,

    #[error("Session expired, please log in again")]
    SessionExpired,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_errors_are_user_facing() {
        assert_eq!(Error::AdminRequired.to_string(), "Admin access required");
        assert!(Error::NotLoggedIn.to_string().contains("booknet login"));
    }
}
