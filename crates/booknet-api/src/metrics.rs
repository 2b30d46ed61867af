//! Client-side counters
//!
//! Emitted through the `metrics` facade; they are no-ops unless the host
//! process installs a recorder.
//!
//! - `booknet_requests_total` (counter): labels `method`, `status`
//! - `booknet_token_refresh_total` (counter): label `outcome`
//! - `booknet_session_teardown_total` (counter): label `reason`

/// Record a completed API request.
pub fn record_request(method: &str, status: u16) {
    metrics::counter!(
        "booknet_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a refresh attempt triggered by a 401.
pub fn record_refresh(success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!("booknet_token_refresh_total", "outcome" => outcome).increment(1);
}

/// Record a forced session teardown.
pub fn record_teardown(reason: &'static str) {
    metrics::counter!("booknet_session_teardown_total", "reason" => reason).increment(1);
}
