//! Book catalog CRUD and bulk upload

use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::client::{ApiClient, ensure_success, into_data};
use crate::error::{Error, Result};
use crate::models::{Book, BookInput, ListPayload, ListQuery, Page};

/// Result of a bulk upload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUploadReport {
    #[serde(default, alias = "createdCount")]
    pub created: u32,
    #[serde(default, alias = "failedCount")]
    pub failed: u32,
    #[serde(default)]
    pub errors: Vec<String>,
}

pub async fn list_books(client: &ApiClient, query: &ListQuery) -> Result<Page<Book>> {
    let env = client
        .get_with_query::<ListPayload<Book>>("books", &query.to_pairs())
        .await?;
    Ok(into_data(env, "books")?.into_page(query))
}

pub async fn get_book(client: &ApiClient, id: i64) -> Result<Book> {
    let env = client.get(&format!("books/{id}")).await?;
    into_data(env, "book")
}

pub async fn create_book(client: &ApiClient, input: &BookInput) -> Result<Book> {
    input.validate()?;
    let env = client.post("books", input).await?;
    let book: Book = into_data(env, "created book")?;
    info!(book_id = book.id, "book created");
    Ok(book)
}

pub async fn update_book(client: &ApiClient, id: i64, input: &BookInput) -> Result<Book> {
    input.validate()?;
    let env = client.patch(&format!("books/{id}"), input).await?;
    into_data(env, "updated book")
}

pub async fn delete_book(client: &ApiClient, id: i64) -> Result<()> {
    let env = client.delete::<Value>(&format!("books/{id}")).await?;
    ensure_success(env)?;
    info!(book_id = id, "book deleted");
    Ok(())
}

/// Upload a CSV or JSON file of books.
pub async fn bulk_upload(
    client: &ApiClient,
    file_name: &str,
    bytes: Vec<u8>,
) -> Result<BulkUploadReport> {
    let mime = match file_name.rsplit('.').next().map(str::to_ascii_lowercase).as_deref() {
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        _ => {
            return Err(Error::Validation(
                "Bulk upload accepts .csv or .json files".into(),
            ));
        }
    };
    if bytes.is_empty() {
        return Err(Error::Validation("Upload file is empty".into()));
    }
    let env = client
        .upload("books/bulk-upload", file_name, bytes, mime)
        .await?;
    let report: BulkUploadReport = into_data(env, "bulk upload report")?;
    info!(created = report.created, failed = report.failed, "bulk upload finished");
    Ok(report)
}
