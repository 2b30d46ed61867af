//! Endpoint URL construction

/// Join a configured base URL and a relative endpoint path.
///
/// Exactly one `/` separates the two regardless of trailing or leading
/// slashes on either side.
pub fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_with_single_slash() {
        assert_eq!(
            join_url("http://localhost:8080/api/", "/books/3"),
            "http://localhost:8080/api/books/3"
        );
        assert_eq!(
            join_url("http://localhost:8080/api", "auth/login"),
            "http://localhost:8080/api/auth/login"
        );
    }
}
