//! Own profile read/update

use booknet_auth::{ProfileUpdateForm, UserProfile, normalize_password_message};
use tracing::{info, warn};

use crate::client::{ApiClient, into_data};
use crate::error::{Error, Result};

/// Fetch the signed-in user's profile and refresh the cached copy.
pub async fn get_profile(client: &ApiClient) -> Result<UserProfile> {
    let env = client.get("profile").await?;
    let user: UserProfile = into_data(env, "profile")?;
    if let Err(e) = client.store().set_user(&user).await {
        warn!(error = %e, "failed to cache profile");
    }
    Ok(user)
}

/// Update the signed-in user's profile.
///
/// Server password-mismatch messages come back normalized; on success the
/// cached profile is replaced.
pub async fn update_profile(client: &ApiClient, form: &ProfileUpdateForm) -> Result<UserProfile> {
    form.validate()?;
    let env = client
        .patch::<UserProfile>("profile", &form.to_body())
        .await?;
    if !env.success {
        return Err(Error::Rejected(normalize_password_message(&env.message)));
    }
    let user = into_data(env, "updated profile")?;
    client.store().set_user(&user).await?;
    info!(user_id = user.id, "profile updated");
    Ok(user)
}
