//! Tag taxonomy

use serde::Serialize;
use serde_json::Value;

use crate::client::{ApiClient, ensure_success, into_data};
use crate::error::{Error, Result};
use crate::models::{ListPayload, ListQuery, Page, Tag};

#[derive(Serialize)]
struct TagInput<'a> {
    name: &'a str,
}

pub async fn list_tags(client: &ApiClient, query: &ListQuery) -> Result<Page<Tag>> {
    let env = client
        .get_with_query::<ListPayload<Tag>>("tags", &query.to_pairs())
        .await?;
    Ok(into_data(env, "tags")?.into_page(query))
}

/// Tags are stored lowercase and trimmed.
pub async fn create_tag(client: &ApiClient, name: &str) -> Result<Tag> {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return Err(Error::Validation("Tag name is required".into()));
    }
    let env = client.post("tags", &TagInput { name: &name }).await?;
    into_data(env, "created tag")
}

pub async fn delete_tag(client: &ApiClient, id: i64) -> Result<()> {
    let env = client.delete::<Value>(&format!("tags/{id}")).await?;
    ensure_success(env)
}
