//! Auth session service
//!
//! Performs login, registration, logout, refresh and liveness checks
//! against the `auth/*` endpoints and keeps the credential store in step:
//! success populates it, logout and failed refresh clear it. Navigation
//! decisions after a failure belong to the caller.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::credentials::{CredentialStore, Credentials};
use crate::error::{Error, Result};
use crate::token;
use crate::user::UserProfile;
use crate::validation::{LoginForm, RegistrationForm};

#[derive(Clone)]
pub struct AuthService {
    client: reqwest::Client,
    base_url: String,
    store: Arc<CredentialStore>,
}

impl AuthService {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        store: Arc<CredentialStore>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            store,
        }
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Validate, exchange credentials, store tokens + profile.
    #[instrument(skip_all, fields(username = %form.username.trim()))]
    pub async fn login(&self, form: &LoginForm) -> Result<UserProfile> {
        form.validate()?;
        let grant = token::exchange_password(&self.client, &self.base_url, form).await?;
        let user = grant
            .user
            .ok_or_else(|| Error::InvalidTokenResponse("login response has no user".into()))?;
        self.store
            .store_session(&grant.credentials, Some(&user))
            .await?;
        info!(user_id = user.id, role = user.role.label(), "logged in");
        Ok(user)
    }

    /// Validate, create the account, store tokens + profile.
    #[instrument(skip_all, fields(username = %form.username.trim()))]
    pub async fn register(&self, form: &RegistrationForm) -> Result<UserProfile> {
        form.validate()?;
        let grant = token::register_account(&self.client, &self.base_url, form).await?;
        let user = grant.user.ok_or_else(|| {
            Error::InvalidTokenResponse("registration response has no user".into())
        })?;
        self.store
            .store_session(&grant.credentials, Some(&user))
            .await?;
        info!(user_id = user.id, "registered and logged in");
        Ok(user)
    }

    /// Revoke the refresh token server-side, then clear the store whatever
    /// the server said.
    pub async fn logout(&self) -> Result<()> {
        let refresh = self.store.refresh_token().await;
        let access = self.store.access_token().await;

        if let Some(refresh) = refresh {
            let access = access.as_ref().map(|a| a.expose().as_str());
            if let Err(e) =
                token::revoke_token(&self.client, &self.base_url, access, refresh.expose()).await
            {
                warn!(error = %e, "server-side logout failed, clearing local session anyway");
            }
        }

        self.store.clear().await?;
        info!("logged out");
        Ok(())
    }

    /// Exchange the stored refresh token for a new pair.
    ///
    /// On success both tokens (and the profile when returned) are re-stored.
    /// On any failure the store is cleared and the error returned.
    #[instrument(skip_all)]
    pub async fn refresh_token(&self) -> Result<Credentials> {
        let Some(refresh) = self.store.refresh_token().await else {
            self.store.clear().await?;
            return Err(Error::NotAuthenticated);
        };

        match token::refresh_token(&self.client, &self.base_url, refresh.expose()).await {
            Ok(grant) => {
                self.store
                    .store_session(&grant.credentials, grant.user.as_ref())
                    .await?;
                info!("access token refreshed");
                Ok(grant.credentials)
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed, clearing session");
                if let Err(clear_err) = self.store.clear().await {
                    warn!(error = %clear_err, "failed to clear session after refresh failure");
                }
                Err(e)
            }
        }
    }

    /// Whether the stored access token is still accepted by the server.
    pub async fn verify_token(&self) -> Result<bool> {
        let Some(access) = self.store.access_token().await else {
            return Ok(false);
        };
        token::verify_token(&self.client, &self.base_url, access.expose()).await
    }
}
