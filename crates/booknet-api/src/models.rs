//! Catalog records and form inputs
//!
//! Field names follow the server's camelCase JSON. Inputs validate before
//! any request is sent.

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Genre {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, alias = "coverImage", skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratings_count: Option<u64>,
}

impl Book {
    /// Comma-separated author names, or "Unknown author".
    pub fn author_names(&self) -> String {
        if self.authors.is_empty() {
            return "Unknown author".to_string();
        }
        self.authors
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A single community rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    #[serde(default)]
    pub id: i64,
    #[serde(alias = "score", alias = "stars")]
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Total matching records server-side, at least `items.len()`
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

impl<T> Page<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_more(&self) -> bool {
        (self.offset as u64) + (self.items.len() as u64) < self.total
    }
}

/// List endpoints answer either with a paged object or a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum ListPayload<T> {
    Paged(RawPage<T>),
    Items(Vec<T>),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawPage<T> {
    #[serde(alias = "content", alias = "ratings", alias = "results")]
    items: Vec<T>,
    #[serde(default, alias = "totalCount", alias = "totalElements")]
    total: Option<u64>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    offset: Option<u32>,
}

impl<T> ListPayload<T> {
    pub(crate) fn into_page(self, query: &ListQuery) -> Page<T> {
        match self {
            ListPayload::Paged(raw) => {
                let len = raw.items.len() as u64;
                Page {
                    total: raw.total.unwrap_or(len).max(len),
                    limit: raw.limit.or(query.limit).unwrap_or(raw.items.len() as u32),
                    offset: raw.offset.or(query.offset).unwrap_or(0),
                    items: raw.items,
                }
            }
            ListPayload::Items(items) => Page {
                total: items.len() as u64,
                limit: query.limit.unwrap_or(items.len() as u32),
                offset: query.offset.unwrap_or(0),
                items,
            },
        }
    }
}

/// Query parameters accepted by list endpoints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub genre: Option<i64>,
    pub author: Option<i64>,
}

impl ListQuery {
    pub fn page(limit: u32, offset: u32) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
            ..Default::default()
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn with_genre(mut self, genre: i64) -> Self {
        self.genre = Some(genre);
        self
    }

    pub(crate) fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(v) = self.limit {
            pairs.push(("limit", v.to_string()));
        }
        if let Some(v) = self.offset {
            pairs.push(("offset", v.to_string()));
        }
        if let Some(v) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            pairs.push(("search", v.to_string()));
        }
        if let Some(v) = &self.sort {
            pairs.push(("sort", v.clone()));
        }
        if let Some(v) = self.genre {
            pairs.push(("genre", v.to_string()));
        }
        if let Some(v) = self.author {
            pairs.push(("author", v.to_string()));
        }
        pairs
    }
}

/// Book create/update payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookInput {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    pub author_ids: Vec<i64>,
    pub genre_ids: Vec<i64>,
    pub tag_ids: Vec<i64>,
}

impl BookInput {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("Title is required".into()));
        }
        if let Some(year) = self.publication_year {
            let current = current_year();
            if year > current {
                return Err(Error::Validation(format!(
                    "Publication year cannot be after {current}"
                )));
            }
        }
        if let Some(isbn) = &self.isbn {
            let digits: Vec<char> = isbn.chars().filter(|c| *c != '-' && *c != ' ').collect();
            let valid = match digits.as_slice() {
                [body @ .., check] if digits.len() == 10 => {
                    body.iter().all(char::is_ascii_digit)
                        && (check.is_ascii_digit() || matches!(*check, 'X' | 'x'))
                }
                all if all.len() == 13 => all.iter().all(char::is_ascii_digit),
                _ => false,
            };
            if !valid {
                return Err(Error::Validation("ISBN must have 10 or 13 digits".into()));
            }
        }
        if self.page_count == Some(0) {
            return Err(Error::Validation("Page count must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
}

impl AuthorInput {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("Author name is required".into()));
        }
        if let Some(year) = self.birth_year
            && year > current_year()
        {
            return Err(Error::Validation("Birth year cannot be in the future".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenreInput {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl GenreInput {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("Genre name is required".into()));
        }
        Ok(())
    }
}

/// Current calendar year (UTC).
pub fn current_year() -> i32 {
    chrono::Utc::now().year()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn book_parses_server_shape() {
        let book: Book = serde_json::from_value(json!({
            "id": 9,
            "title": "Dune",
            "publicationYear": 1965,
            "coverImage": "https://covers.test/dune.jpg",
            "authors": [{"id": 1, "name": "Frank Herbert"}],
            "genres": [{"id": 2, "name": "Science Fiction"}],
            "averageRating": 4.4
        }))
        .unwrap();
        assert_eq!(book.cover_url.as_deref(), Some("https://covers.test/dune.jpg"));
        assert_eq!(book.author_names(), "Frank Herbert");
        assert!(book.tags.is_empty());
    }

    #[test]
    fn rating_accepts_score_alias() {
        let rating: Rating = serde_json::from_value(json!({"id": 1, "score": 4})).unwrap();
        assert_eq!(rating.rating, 4);
    }

    #[test]
    fn list_payload_accepts_page_and_array() {
        let query = ListQuery::page(10, 20);

        let paged: ListPayload<Tag> = serde_json::from_value(json!({
            "content": [{"id": 1, "name": "classic"}],
            "totalElements": 41
        }))
        .unwrap();
        let page = paged.into_page(&query);
        assert_eq!(page.total, 41);
        assert_eq!(page.offset, 20);
        assert!(page.has_more());

        let bare: ListPayload<Tag> =
            serde_json::from_value(json!([{"id": 1, "name": "classic"}])).unwrap();
        let page = bare.into_page(&ListQuery::default());
        assert_eq!(page.total, 1);
        assert_eq!(page.limit, 1);
        assert!(!page.has_more());
    }

    #[test]
    fn query_pairs_skip_blank_search() {
        let query = ListQuery::page(5, 0).with_search("   ").with_sort("newest");
        let pairs = query.to_pairs();
        assert_eq!(
            pairs,
            vec![
                ("limit", "5".to_string()),
                ("offset", "0".to_string()),
                ("sort", "newest".to_string())
            ]
        );
    }

    #[test]
    fn book_input_validation() {
        let mut input = BookInput {
            title: "Dune".into(),
            isbn: Some("978-0-441-17271-9".into()),
            publication_year: Some(1965),
            ..Default::default()
        };
        assert!(input.validate().is_ok());

        input.isbn = Some("0-441-17271-X".into());
        assert!(input.validate().is_ok());

        input.isbn = Some("12345".into());
        assert!(input.validate().is_err());

        input.isbn = None;
        input.publication_year = Some(current_year() + 1);
        assert!(input.validate().is_err());

        input.publication_year = None;
        input.title = "  ".into();
        assert!(input.validate().is_err());
    }

    #[test]
    fn book_input_serializes_camel_case() {
        let input = BookInput {
            title: "Dune".into(),
            author_ids: vec![1],
            ..Default::default()
        };
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["authorIds"], json!([1]));
        assert!(json.get("isbn").is_none());
    }

    #[test]
    fn isbn_with_non_ascii_characters_is_rejected() {
        let mut input = BookInput {
            title: "Dune".into(),
            isbn: Some("12345678é".into()),
            ..Default::default()
        };
        assert!(matches!(input.validate(), Err(Error::Validation(_))));

        // Ten characters, multi-byte check digit
        input.isbn = Some("044117271é".into());
        assert!(matches!(input.validate(), Err(Error::Validation(_))));

        input.isbn = Some("978044117271٣".into());
        assert!(matches!(input.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn author_and_genre_names_required() {
        assert!(AuthorInput::default().validate().is_err());
        assert!(GenreInput::default().validate().is_err());
        assert!(
            GenreInput {
                name: "Fantasy".into(),
                description: None
            }
            .validate()
            .is_ok()
        );
    }
}
