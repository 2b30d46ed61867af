//! Genre CRUD

use serde_json::Value;

use crate::client::{ApiClient, ensure_success, into_data};
use crate::error::Result;
use crate::models::{Genre, GenreInput, ListPayload, ListQuery, Page};

pub async fn list_genres(client: &ApiClient, query: &ListQuery) -> Result<Page<Genre>> {
    let env = client
        .get_with_query::<ListPayload<Genre>>("genres", &query.to_pairs())
        .await?;
    Ok(into_data(env, "genres")?.into_page(query))
}

pub async fn get_genre(client: &ApiClient, id: i64) -> Result<Genre> {
    let env = client.get(&format!("genres/{id}")).await?;
    into_data(env, "genre")
}

pub async fn create_genre(client: &ApiClient, input: &GenreInput) -> Result<Genre> {
    input.validate()?;
    let env = client.post("genres", input).await?;
    into_data(env, "created genre")
}

pub async fn update_genre(client: &ApiClient, id: i64, input: &GenreInput) -> Result<Genre> {
    input.validate()?;
    let env = client.patch(&format!("genres/{id}"), input).await?;
    into_data(env, "updated genre")
}

pub async fn delete_genre(client: &ApiClient, id: i64) -> Result<()> {
    let env = client.delete::<Value>(&format!("genres/{id}")).await?;
    ensure_success(env)
}
