//! BookNet authentication constants
//!
//! Endpoint paths are relative to the configured API base URL. Storage keys
//! match the keys the web client kept in browser storage so a session file
//! exported from either client reads the same.

use std::time::Duration;

/// Credential exchange: username + password → tokens + profile
pub const LOGIN_PATH: &str = "auth/login";

/// Account creation: returns tokens + profile like login
pub const REGISTER_PATH: &str = "auth/register";

/// Refresh token exchange
pub const REFRESH_PATH: &str = "auth/refresh";

/// Server-side refresh token invalidation
pub const LOGOUT_PATH: &str = "auth/logout";

/// Access token liveness check
pub const VERIFY_TOKEN_PATH: &str = "auth/verify-token";

/// Storage key for the access token
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Storage key for the refresh token
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Storage key for the JSON-encoded user profile
pub const USER_KEY: &str = "user";

/// Legacy access token key, read but never written
pub const LEGACY_ACCESS_TOKEN_KEY: &str = "accessToken";

/// Legacy refresh token key, read but never written
pub const LEGACY_REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Fixed transport timeout for every API call
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval between session liveness checks while authenticated
pub const SESSION_REVALIDATE_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// How long the "just logged in" flag stays raised after a login
pub const JUST_LOGGED_IN_DURATION: Duration = Duration::from_secs(3);
