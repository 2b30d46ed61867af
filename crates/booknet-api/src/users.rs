//! Admin user management

use booknet_auth::validation::{validate_email, validate_password, validate_username};
use booknet_auth::{Role, UserProfile};
use common::Secret;
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::info;

use crate::client::{ApiClient, ensure_success, into_data};
use crate::error::Result;
use crate::models::{ListPayload, ListQuery, Page};

/// Admin create/update payload. `password` is required on create and
/// optional on update.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "plain_password")]
    pub password: Option<Secret<String>>,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl UserInput {
    pub fn validate(&self, creating: bool) -> Result<()> {
        validate_username(&self.username)?;
        validate_email(&self.email)?;
        match &self.password {
            Some(p) => {
                validate_password(p.expose())?;
            }
            None if creating => {
                return Err(booknet_auth::Error::Validation("Password is required".into()).into());
            }
            None => {}
        }
        Ok(())
    }
}

fn plain_password<S: Serializer>(
    password: &Option<Secret<String>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    password.as_ref().map(|p| p.expose().as_str()).serialize(serializer)
}

pub async fn list_users(client: &ApiClient, query: &ListQuery) -> Result<Page<UserProfile>> {
    let env = client
        .get_with_query::<ListPayload<UserProfile>>("users", &query.to_pairs())
        .await?;
    Ok(into_data(env, "users")?.into_page(query))
}

pub async fn get_user(client: &ApiClient, id: i64) -> Result<UserProfile> {
    let env = client.get(&format!("users/{id}")).await?;
    into_data(env, "user")
}

pub async fn create_user(client: &ApiClient, input: &UserInput) -> Result<UserProfile> {
    input.validate(true)?;
    let env = client.post("users", input).await?;
    let user: UserProfile = into_data(env, "created user")?;
    info!(user_id = user.id, role = user.role.label(), "user created");
    Ok(user)
}

pub async fn update_user(client: &ApiClient, id: i64, input: &UserInput) -> Result<UserProfile> {
    input.validate(false)?;
    let env = client.patch(&format!("users/{id}"), input).await?;
    into_data(env, "updated user")
}

pub async fn delete_user(client: &ApiClient, id: i64) -> Result<()> {
    let env = client.delete::<Value>(&format!("users/{id}")).await?;
    ensure_success(env)?;
    info!(user_id = id, "user deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::{signed_in_client, start_server};
    use crate::error::Error;
    use axum::Json;
    use axum::routing::post;
    use serde_json::json;

    fn input() -> UserInput {
        UserInput {
            username: "newbie".into(),
            email: "newbie@booknet.io".into(),
            password: Some("Welcome1!".into()),
            role: Role::User,
            first_name: None,
            last_name: None,
        }
    }

    #[test]
    fn create_requires_password_but_update_does_not() {
        let mut user = input();
        user.password = None;
        assert!(user.validate(true).is_err());
        assert!(user.validate(false).is_ok());
    }

    #[test]
    fn password_hidden_from_debug_but_sent_in_body() {
        let user = input();
        let debug = format!("{user:?}");
        assert!(!debug.contains("Welcome1!"), "leaked: {debug}");

        let body = serde_json::to_value(&user).unwrap();
        assert_eq!(body["password"], "Welcome1!");

        let mut update = input();
        update.password = None;
        let body = serde_json::to_value(&update).unwrap();
        assert!(body.get("password").is_none());
    }

    #[test]
    fn weak_password_rejected() {
        let mut user = input();
        user.password = Some("short".into());
        let err = user.validate(true).unwrap_err();
        assert!(matches!(err, Error::Auth(booknet_auth::Error::Validation(_))));
    }

    #[tokio::test]
    async fn create_sends_role_uppercase() {
        let app = axum::Router::new().route(
            "/users",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["role"], "ADMIN");
                assert_eq!(body["password"], "Welcome1!");
                Json(json!({
                    "success": true,
                    "message": "",
                    "data": {"id": 77, "username": body["username"], "email": body["email"], "role": "ADMIN"}
                }))
            }),
        );
        let base = start_server(app).await;
        let client = signed_in_client(&base, "at", "rt").await;

        let mut user = input();
        user.role = Role::Admin;
        let created = create_user(&client, &user).await.unwrap();
        assert_eq!(created.id, 77);
        assert!(created.is_admin());
    }
}
