//! Authenticated HTTP client wrapper
//!
//! Every call goes through `execute`, which attaches the bearer token, tags
//! the request with an `x-request-id`, and on the first 401 refreshes the
//! token and re-issues the request exactly once. A second 401, or a failed
//! refresh, tears the session down and emits `SessionSignal::LoginRequired`.
//!
//! Concurrent requests that hit 401 together each refresh on their own; the
//! refreshes are not coalesced.

use std::sync::Arc;
use std::time::Duration;

use booknet_auth::{AuthService, CredentialStore};
use common::{Envelope, Secret, join_url};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{Instrument, debug, info_span, warn};

use crate::error::{Error, Result};
use crate::metrics;

/// Session-level events raised by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
    /// Credentials were cleared; the user has to log in again
    LoginRequired,
}

/// Build the reqwest client used for every BookNet call.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Transport(format!("building HTTP client: {e}")))
}

/// Request body variants. Multipart bodies are kept as bytes so the form can
/// be rebuilt for the retry.
enum Body {
    Empty,
    Json(Value),
    File {
        field: &'static str,
        file_name: String,
        bytes: Vec<u8>,
        mime: String,
    },
}

struct Call<'a> {
    method: Method,
    path: &'a str,
    query: &'a [(&'a str, String)],
    body: Body,
    /// Return error envelopes instead of failing on non-2xx
    lenient: bool,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    auth: AuthService,
    signals: broadcast::Sender<SessionSignal>,
}

impl ApiClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, store: Arc<CredentialStore>) -> Self {
        let base_url = base_url.into();
        let auth = AuthService::new(http.clone(), base_url.clone(), store);
        let (signals, _) = broadcast::channel(16);
        Self {
            http,
            base_url,
            auth,
            signals,
        }
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        self.auth.store()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Subscribe to session signals (login required after teardown).
    pub fn subscribe(&self) -> broadcast::Receiver<SessionSignal> {
        self.signals.subscribe()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Envelope<T>> {
        self.get_with_query(path, &[]).await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Envelope<T>> {
        self.execute(Call {
            method: Method::GET,
            path,
            query,
            body: Body::Empty,
            lenient: false,
        })
        .await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<Envelope<T>> {
        self.execute(Call {
            method: Method::POST,
            path,
            query: &[],
            body: Body::Json(to_json(body)?),
            lenient: false,
        })
        .await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<Envelope<T>> {
        self.execute(Call {
            method: Method::PUT,
            path,
            query: &[],
            body: Body::Json(to_json(body)?),
            lenient: false,
        })
        .await
    }

    /// PATCH returns the server's error envelope instead of failing when the
    /// response carries one, so form callers can read `message` directly.
    pub async fn patch<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<Envelope<T>> {
        self.execute(Call {
            method: Method::PATCH,
            path,
            query: &[],
            body: Body::Json(to_json(body)?),
            lenient: true,
        })
        .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<Envelope<T>> {
        self.execute(Call {
            method: Method::DELETE,
            path,
            query: &[],
            body: Body::Empty,
            lenient: false,
        })
        .await
    }

    /// Multipart upload of a single file under the `file` field.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        mime: impl Into<String>,
    ) -> Result<Envelope<T>> {
        self.execute(Call {
            method: Method::POST,
            path,
            query: &[],
            body: Body::File {
                field: "file",
                file_name: file_name.into(),
                bytes,
                mime: mime.into(),
            },
            lenient: false,
        })
        .await
    }

    async fn execute<T: DeserializeOwned>(&self, call: Call<'_>) -> Result<Envelope<T>> {
        let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
        let span = info_span!(
            "api_request",
            request_id = %request_id,
            method = %call.method,
            path = call.path
        );
        self.execute_inner(call, request_id).instrument(span).await
    }

    async fn execute_inner<T: DeserializeOwned>(
        &self,
        call: Call<'_>,
        request_id: String,
    ) -> Result<Envelope<T>> {
        let mut retried = false;

        loop {
            let token = self.auth.store().access_token().await;

            let response = self.send_once(&call, token.as_ref(), &request_id).await?;
            let status = response.status();
            metrics::record_request(call.method.as_str(), status.as_u16());

            if status == StatusCode::UNAUTHORIZED {
                if retried {
                    warn!("still unauthorized after token refresh");
                    self.expire_session("unauthorized_after_retry").await;
                    return Err(Error::SessionExpired);
                }
                retried = true;
                debug!("unauthorized, attempting token refresh");
                match self.auth.refresh_token().await {
                    Ok(_) => {
                        metrics::record_refresh(true);
                        continue;
                    }
                    Err(e) => {
                        metrics::record_refresh(false);
                        warn!(error = %e, "token refresh failed");
                        self.expire_session("refresh_failed").await;
                        return Err(Error::SessionExpired);
                    }
                }
            }

            return read_envelope(call.path, status, call.lenient, response).await;
        }
    }

    async fn send_once(
        &self,
        call: &Call<'_>,
        token: Option<&Secret<String>>,
        request_id: &str,
    ) -> Result<reqwest::Response> {
        let mut url = reqwest::Url::parse(&join_url(&self.base_url, call.path))
            .map_err(|e| Error::Transport(format!("invalid URL for {}: {e}", call.path)))?;
        if !call.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in call.query {
                pairs.append_pair(key, value);
            }
        }

        let mut request = self
            .http
            .request(call.method.clone(), url)
            .header("x-request-id", request_id);
        if let Some(token) = token {
            request = request.bearer_auth(token.expose());
        }
        request = match &call.body {
            Body::Empty => request,
            Body::Json(value) => request.json(value),
            Body::File {
                field,
                file_name,
                bytes,
                mime,
            } => {
                let part = reqwest::multipart::Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str(mime)
                    .map_err(|e| Error::Validation(format!("invalid upload type {mime}: {e}")))?;
                request.multipart(reqwest::multipart::Form::new().part(*field, part))
            }
        };

        request
            .send()
            .await
            .map_err(|e| Error::from_transport(&format!("{} {}", call.method, call.path), e))
    }

    /// Clear credentials and tell subscribers a fresh login is needed.
    async fn expire_session(&self, reason: &'static str) {
        if let Err(e) = self.auth.store().clear().await {
            warn!(error = %e, "failed to clear session store");
        }
        metrics::record_teardown(reason);
        // No subscribers is fine: nobody is waiting to redirect.
        let _ = self.signals.send(SessionSignal::LoginRequired);
    }
}

fn to_json(body: &impl Serialize) -> Result<Value> {
    serde_json::to_value(body).map_err(|e| Error::Decode(format!("serializing request body: {e}")))
}

async fn read_envelope<T: DeserializeOwned>(
    path: &str,
    status: StatusCode,
    lenient: bool,
    response: reqwest::Response,
) -> Result<Envelope<T>> {
    let text = response
        .text()
        .await
        .map_err(|e| Error::from_transport(&format!("reading {path} response"), e))?;

    if status.is_success() {
        return serde_json::from_str::<Envelope<T>>(&text)
            .map_err(|e| Error::Decode(format!("{path}: {e}")));
    }

    // Error payloads rarely match T, so keep only the envelope fields.
    let structured = serde_json::from_str::<Envelope<Value>>(&text).ok();
    match structured {
        Some(env) if lenient => Ok(Envelope {
            success: false,
            message: env.message,
            data: None,
            timestamp: env.timestamp,
        }),
        Some(env) => Err(Error::Status {
            status: status.as_u16(),
            message: env.message,
        }),
        None => Err(Error::Status {
            status: status.as_u16(),
            message: if text.is_empty() {
                status.canonical_reason().unwrap_or("unknown").to_string()
            } else {
                text
            },
        }),
    }
}

/// Unwrap an envelope into its payload, failing on `success: false`.
pub(crate) fn into_data<T>(envelope: Envelope<T>, what: &str) -> Result<T> {
    match envelope.into_result() {
        Ok(Some(data)) => Ok(data),
        Ok(None) => Err(Error::MissingData(what.to_string())),
        Err(message) => Err(Error::Rejected(message)),
    }
}

/// Check an envelope for success, ignoring any payload.
pub(crate) fn ensure_success<T>(envelope: Envelope<T>) -> Result<()> {
    envelope.into_result().map(|_| ()).map_err(Error::Rejected)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use booknet_auth::{CredentialStore, Credentials, Role, UserProfile};
    use tokio::net::TcpListener;

    use super::ApiClient;

    /// Serve a mock BookNet API and return its base URL.
    pub async fn start_server(app: axum::Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    pub fn test_user() -> UserProfile {
        UserProfile {
            id: 1,
            username: "reader".into(),
            email: "reader@booknet.test".into(),
            role: Role::Admin,
            first_name: None,
            last_name: None,
            created_at: None,
        }
    }

    /// Client with a signed-in in-memory session.
    pub async fn signed_in_client(base: &str, access: &str, refresh: &str) -> ApiClient {
        let store = Arc::new(CredentialStore::in_memory());
        store
            .store_session(&Credentials::new(access, refresh), Some(&test_user()))
            .await
            .unwrap();
        ApiClient::new(reqwest::Client::new(), base, store)
    }
}
