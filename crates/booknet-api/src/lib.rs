//! Typed client for the BookNet REST API
//!
//! `ApiClient` wraps reqwest with bearer auth, envelope parsing and a single
//! refresh-and-retry on 401. Resource modules expose one function per REST
//! operation on top of it.
//!
//! Request lifecycle:
//! 1. Attach `Authorization: Bearer <access>` from the credential store
//! 2. 2xx → parse `{ success, message, data, timestamp }`
//! 3. First 401 → refresh via `AuthService::refresh_token()`, re-issue once
//! 4. Second 401 or failed refresh → clear the store, emit `SessionSignal::LoginRequired`

pub mod authors;
pub mod books;
pub mod client;
pub mod error;
pub mod genres;
pub mod home;
pub mod interactions;
pub mod metrics;
pub mod models;
pub mod profile;
pub mod ratings;
pub mod tags;
pub mod users;

pub use client::{ApiClient, SessionSignal, build_http_client};
pub use error::{Error, Result};
pub use models::{Author, Book, Genre, ListQuery, Page, Rating, Tag};
pub use ratings::{RatingDistribution, StarBucket};
