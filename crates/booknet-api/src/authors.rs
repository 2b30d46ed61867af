//! Author CRUD

use serde_json::Value;

use crate::client::{ApiClient, ensure_success, into_data};
use crate::error::Result;
use crate::models::{Author, AuthorInput, ListPayload, ListQuery, Page};

pub async fn list_authors(client: &ApiClient, query: &ListQuery) -> Result<Page<Author>> {
    let env = client
        .get_with_query::<ListPayload<Author>>("authors", &query.to_pairs())
        .await?;
    Ok(into_data(env, "authors")?.into_page(query))
}

pub async fn get_author(client: &ApiClient, id: i64) -> Result<Author> {
    let env = client.get(&format!("authors/{id}")).await?;
    into_data(env, "author")
}

pub async fn create_author(client: &ApiClient, input: &AuthorInput) -> Result<Author> {
    input.validate()?;
    let env = client.post("authors", input).await?;
    into_data(env, "created author")
}

pub async fn update_author(client: &ApiClient, id: i64, input: &AuthorInput) -> Result<Author> {
    input.validate()?;
    let env = client.patch(&format!("authors/{id}"), input).await?;
    into_data(env, "updated author")
}

pub async fn delete_author(client: &ApiClient, id: i64) -> Result<()> {
    let env = client.delete::<Value>(&format!("authors/{id}")).await?;
    ensure_success(env)
}
