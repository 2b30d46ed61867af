//! Credential storage for BookNet sessions
//!
//! A flat string key/value map persisted as JSON, holding the access token,
//! the refresh token and the JSON-encoded user profile under the same keys
//! the web client used. All writes use atomic temp-file + rename and a tokio
//! Mutex serializes writers, so a refresh racing a logout can't tear the file.
//!
//! The store is the single source of truth for session data: the HTTP client
//! and the session context read tokens from here at request time.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use common::Secret;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::constants::{
    ACCESS_TOKEN_KEY, LEGACY_ACCESS_TOKEN_KEY, LEGACY_REFRESH_TOKEN_KEY, REFRESH_TOKEN_KEY,
    USER_KEY,
};
use crate::error::{Error, Result};
use crate::user::UserProfile;

/// An access/refresh token pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub access_token: Secret<String>,
    pub refresh_token: Secret<String>,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: Secret::new(access_token.into()),
            refresh_token: Secret::new(refresh_token.into()),
        }
    }
}

/// Session key/value store.
///
/// `path` is `None` for an in-memory store (tests, `--ephemeral`); every
/// operation then behaves the same minus the disk write.
pub struct CredentialStore {
    path: Option<PathBuf>,
    state: Mutex<HashMap<String, String>>,
}

impl CredentialStore {
    /// Load the session file at the given path.
    ///
    /// If the file doesn't exist, creates it (and its parent directory) as
    /// `{}`: a cold start with no session.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading session file: {e}")))?;
            let entries: HashMap<String, String> = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing session file: {e}")))?;
            info!(path = %path.display(), keys = entries.len(), "loaded session store");
            entries
        } else {
            info!(path = %path.display(), "session file not found, starting signed out");
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(dir)
                    .await
                    .map_err(|e| Error::Io(format!("creating session directory: {e}")))?;
            }
            let entries = HashMap::new();
            write_atomic(&path, &entries).await?;
            entries
        };

        Ok(Self {
            path: Some(path),
            state: Mutex::new(state),
        })
    }

    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(HashMap::new()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current access token, falling back to the legacy key.
    pub async fn access_token(&self) -> Option<Secret<String>> {
        let state = self.state.lock().await;
        read_with_legacy(&state, ACCESS_TOKEN_KEY, LEGACY_ACCESS_TOKEN_KEY)
    }

    /// Current refresh token, falling back to the legacy key.
    pub async fn refresh_token(&self) -> Option<Secret<String>> {
        let state = self.state.lock().await;
        read_with_legacy(&state, REFRESH_TOKEN_KEY, LEGACY_REFRESH_TOKEN_KEY)
    }

    /// Both tokens, or `None` unless both are present.
    pub async fn credentials(&self) -> Option<Credentials> {
        let state = self.state.lock().await;
        Some(Credentials {
            access_token: read_with_legacy(&state, ACCESS_TOKEN_KEY, LEGACY_ACCESS_TOKEN_KEY)?,
            refresh_token: read_with_legacy(&state, REFRESH_TOKEN_KEY, LEGACY_REFRESH_TOKEN_KEY)?,
        })
    }

    /// Cached user profile. A corrupt entry reads as absent.
    pub async fn user(&self) -> Option<UserProfile> {
        let state = self.state.lock().await;
        let raw = state.get(USER_KEY)?;
        match serde_json::from_str(raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "ignoring unparseable cached user profile");
                None
            }
        }
    }

    /// Whether both tokens and a profile are present.
    pub async fn has_session(&self) -> bool {
        self.credentials().await.is_some() && self.user().await.is_some()
    }

    /// Store a token pair, and the profile when given, then persist.
    ///
    /// Legacy token keys are dropped on write so they can't shadow a newer
    /// token after a downgrade.
    pub async fn store_session(
        &self,
        credentials: &Credentials,
        user: Option<&UserProfile>,
    ) -> Result<()> {
        let user_json = user
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| Error::CredentialParse(format!("serializing user profile: {e}")))?;

        let mut state = self.state.lock().await;
        state.insert(
            ACCESS_TOKEN_KEY.into(),
            credentials.access_token.expose().clone(),
        );
        state.insert(
            REFRESH_TOKEN_KEY.into(),
            credentials.refresh_token.expose().clone(),
        );
        state.remove(LEGACY_ACCESS_TOKEN_KEY);
        state.remove(LEGACY_REFRESH_TOKEN_KEY);
        if let Some(json) = user_json {
            state.insert(USER_KEY.into(), json);
        }
        debug!(with_user = user.is_some(), "stored session tokens");
        self.persist(&state).await
    }

    /// Replace the cached profile and persist.
    pub async fn set_user(&self, user: &UserProfile) -> Result<()> {
        let json = serde_json::to_string(user)
            .map_err(|e| Error::CredentialParse(format!("serializing user profile: {e}")))?;
        let mut state = self.state.lock().await;
        state.insert(USER_KEY.into(), json);
        self.persist(&state).await
    }

    /// Remove every session key, legacy aliases included, and persist.
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        for key in [
            ACCESS_TOKEN_KEY,
            REFRESH_TOKEN_KEY,
            USER_KEY,
            LEGACY_ACCESS_TOKEN_KEY,
            LEGACY_REFRESH_TOKEN_KEY,
        ] {
            state.remove(key);
        }
        debug!("cleared session store");
        self.persist(&state).await
    }

    /// Whether no session key is present.
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.is_empty()
    }

    async fn persist(&self, state: &HashMap<String, String>) -> Result<()> {
        match &self.path {
            Some(path) => write_atomic(path, state).await,
            None => Ok(()),
        }
    }
}

fn read_with_legacy(
    state: &HashMap<String, String>,
    key: &str,
    legacy: &str,
) -> Option<Secret<String>> {
    state
        .get(key)
        .or_else(|| state.get(legacy))
        .filter(|v| !v.is_empty())
        .map(|v| Secret::new(v.clone()))
}

/// Write the session map to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. Sets file permissions to 0600 (owner read/write only) since
/// the file contains bearer tokens.
async fn write_atomic(path: &Path, data: &HashMap<String, String>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::CredentialParse(format!("serializing session: {e}")))?;

    let dir = match path.parent() {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => Path::new("."),
    };

    let tmp_path = dir.join(format!(".session.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp session file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting session file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp session file: {e}")))?;

    debug!(path = %path.display(), "persisted session");
    Ok(())
}
