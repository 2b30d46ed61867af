//! BookNet authentication library
//!
//! Credential persistence, token endpoint calls, form validation and the
//! auth session service. The HTTP client wrapper in `booknet-api` builds on
//! this crate for its refresh-and-retry path.
//!
//! Session flow:
//! 1. Caller validates input with `validation::LoginForm::validate()`
//! 2. `session::AuthService::login()` exchanges credentials via `token::exchange_password()`
//! 3. Tokens and profile stored via `credentials::CredentialStore::store_session()`
//! 4. On a 401 the API client calls `AuthService::refresh_token()`
//! 5. `AuthService::logout()` revokes the refresh token and clears the store

pub mod constants;
pub mod credentials;
pub mod error;
pub mod session;
pub mod token;
pub mod user;
pub mod validation;

pub use constants::*;
pub use credentials::{CredentialStore, Credentials};
pub use error::{Error, Result};
pub use session::AuthService;
pub use token::TokenGrant;
pub use user::{Role, UserProfile};
pub use validation::{
    LoginForm, PasswordChecks, PasswordStrength, ProfileUpdateForm, RegistrationForm,
    normalize_password_message,
};
