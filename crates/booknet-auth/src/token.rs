//! Token endpoint calls
//!
//! Direct POSTs to the `auth/*` endpoints. These never go through the
//! authenticated client wrapper, so a refresh triggered by a 401 cannot
//! recurse into another refresh.
//!
//! The server has shipped both `snake_case` and `camelCase` token fields, at
//! the top of `data` or nested under `data.tokens`. `TokenGrant::from_data`
//! accepts every combination and rejects a payload carrying neither.

use common::{Envelope, join_url};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::constants::{LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH, REGISTER_PATH, VERIFY_TOKEN_PATH};
use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::user::UserProfile;
use crate::validation::{LoginForm, RegistrationForm};

/// Tokens (and usually the profile) returned by login, registration and refresh.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub credentials: Credentials,
    pub user: Option<UserProfile>,
}

#[derive(Deserialize)]
struct RawGrant {
    #[serde(default, alias = "accessToken")]
    access_token: Option<String>,
    #[serde(default, alias = "refreshToken")]
    refresh_token: Option<String>,
    #[serde(default)]
    tokens: Option<RawTokens>,
    #[serde(default)]
    user: Option<UserProfile>,
}

#[derive(Deserialize)]
struct RawTokens {
    #[serde(default, alias = "accessToken")]
    access_token: Option<String>,
    #[serde(default, alias = "refreshToken")]
    refresh_token: Option<String>,
}

impl TokenGrant {
    /// Extract tokens and profile from an envelope's `data`.
    pub fn from_data(data: Value) -> Result<Self> {
        let raw: RawGrant = serde_json::from_value(data)
            .map_err(|e| Error::InvalidTokenResponse(format!("unexpected payload: {e}")))?;

        let (nested_access, nested_refresh) = match raw.tokens {
            Some(t) => (t.access_token, t.refresh_token),
            None => (None, None),
        };
        let access = raw
            .access_token
            .or(nested_access)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::InvalidTokenResponse("no access token in response".into()))?;
        let refresh = raw
            .refresh_token
            .or(nested_refresh)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::InvalidTokenResponse("no refresh token in response".into()))?;

        Ok(Self {
            credentials: Credentials::new(access, refresh),
            user: raw.user,
        })
    }
}

/// A raw reply from an auth endpoint: status plus the envelope when parseable.
struct Reply {
    status: StatusCode,
    envelope: Option<Envelope<Value>>,
}

impl Reply {
    fn message(&self) -> Option<&str> {
        self.envelope
            .as_ref()
            .map(|e| e.message.as_str())
            .filter(|m| !m.is_empty())
    }

    /// `data` of a successful reply, or `None` when the server refused.
    fn into_success_data(self) -> Option<Value> {
        match self.envelope {
            Some(env) if self.status.is_success() && env.success => {
                Some(env.data.unwrap_or(Value::Null))
            }
            _ => None,
        }
    }
}

async fn post(
    client: &reqwest::Client,
    base_url: &str,
    path: &str,
    body: &Value,
    bearer: Option<&str>,
) -> Result<Reply> {
    let url = join_url(base_url, path);
    let mut request = client.post(&url).json(body);
    if let Some(token) = bearer {
        request = request.bearer_auth(token);
    }

    let response = request
        .send()
        .await
        .map_err(|e| Error::from_transport(&format!("POST {path}"), e))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| Error::from_transport(&format!("reading {path} response"), e))?;
    let envelope = serde_json::from_str::<Envelope<Value>>(&text).ok();
    debug!(path, status = status.as_u16(), enveloped = envelope.is_some(), "auth endpoint replied");

    Ok(Reply { status, envelope })
}

fn failure_message(reply: &Reply, action: &str) -> String {
    if let Some(msg) = reply.message() {
        return msg.to_string();
    }
    match reply.status {
        StatusCode::UNAUTHORIZED => "Invalid username or password".to_string(),
        s if s.is_server_error() => "Server error, please try again later".to_string(),
        s => format!("{action} failed ({s})"),
    }
}

/// Exchange username and password for tokens and profile.
pub async fn exchange_password(
    client: &reqwest::Client,
    base_url: &str,
    form: &LoginForm,
) -> Result<TokenGrant> {
    let body = json!({
        "username": form.username.trim(),
        "password": form.password.expose(),
    });
    let reply = post(client, base_url, LOGIN_PATH, &body, None).await?;
    let message = failure_message(&reply, "login");
    match reply.into_success_data() {
        Some(data) => TokenGrant::from_data(data),
        None => Err(Error::Rejected(message)),
    }
}

/// Create an account; the server signs the new user straight in.
pub async fn register_account(
    client: &reqwest::Client,
    base_url: &str,
    form: &RegistrationForm,
) -> Result<TokenGrant> {
    let mut body = json!({
        "username": form.username.trim(),
        "email": form.email.trim(),
        "password": form.password.expose(),
    });
    if let Some(first) = &form.first_name {
        body["firstName"] = json!(first);
    }
    if let Some(last) = &form.last_name {
        body["lastName"] = json!(last);
    }
    let reply = post(client, base_url, REGISTER_PATH, &body, None).await?;
    let message = failure_message(&reply, "registration");
    match reply.into_success_data() {
        Some(data) => TokenGrant::from_data(data),
        None => Err(Error::Rejected(message)),
    }
}

/// Exchange a refresh token for a new token pair.
///
/// 401/403 means the refresh token is revoked or expired and is reported
/// as `InvalidCredentials`.
pub async fn refresh_token(
    client: &reqwest::Client,
    base_url: &str,
    refresh: &str,
) -> Result<TokenGrant> {
    let body = json!({ "refreshToken": refresh });
    let reply = post(client, base_url, REFRESH_PATH, &body, None).await?;

    if reply.status == StatusCode::UNAUTHORIZED || reply.status == StatusCode::FORBIDDEN {
        return Err(Error::InvalidCredentials(format!(
            "refresh token rejected ({}): {}",
            reply.status,
            reply.message().unwrap_or("<no message>")
        )));
    }

    let message = failure_message(&reply, "token refresh");
    match reply.into_success_data() {
        Some(data) => TokenGrant::from_data(data),
        None => Err(Error::Rejected(message)),
    }
}

/// Invalidate a refresh token server-side.
pub async fn revoke_token(
    client: &reqwest::Client,
    base_url: &str,
    access: Option<&str>,
    refresh: &str,
) -> Result<()> {
    let body = json!({ "refreshToken": refresh });
    let reply = post(client, base_url, LOGOUT_PATH, &body, access).await?;
    let message = failure_message(&reply, "logout");
    match reply.into_success_data() {
        Some(_) => Ok(()),
        None => Err(Error::Rejected(message)),
    }
}

/// Ask the server whether an access token is still live.
///
/// A 401/403 or an explicit `valid: false` is a dead token (`Ok(false)`);
/// other failures are errors.
pub async fn verify_token(client: &reqwest::Client, base_url: &str, access: &str) -> Result<bool> {
    let body = json!({ "token": access });
    let reply = post(client, base_url, VERIFY_TOKEN_PATH, &body, Some(access)).await?;

    if reply.status == StatusCode::UNAUTHORIZED || reply.status == StatusCode::FORBIDDEN {
        return Ok(false);
    }
    if !reply.status.is_success() {
        return Err(Error::Rejected(failure_message(&reply, "token check")));
    }

    let Some(envelope) = reply.envelope else {
        return Err(Error::InvalidTokenResponse(
            "verify-token reply was not an envelope".into(),
        ));
    };
    if !envelope.success {
        return Ok(false);
    }
    let valid = envelope
        .data
        .as_ref()
        .and_then(|d| d.get("valid"))
        .and_then(Value::as_bool)
        .unwrap_or(true);
    Ok(valid)
}
