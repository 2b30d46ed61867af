//! User interactions: rating a book

use serde::Serialize;

use crate::client::{ApiClient, into_data};
use crate::error::{Error, Result};
use crate::models::Rating;

const MAX_REVIEW_CHARS: usize = 2000;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RateRequest<'a> {
    book_id: i64,
    rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    review: Option<&'a str>,
}

/// Create or update the signed-in user's rating for a book.
pub async fn rate_book(
    client: &ApiClient,
    book_id: i64,
    rating: u8,
    review: Option<&str>,
) -> Result<Rating> {
    if !(1..=5).contains(&rating) {
        return Err(Error::Validation("Rating must be between 1 and 5 stars".into()));
    }
    let review = review.map(str::trim).filter(|r| !r.is_empty());
    if review.is_some_and(|r| r.chars().count() > MAX_REVIEW_CHARS) {
        return Err(Error::Validation(format!(
            "Review must be at most {MAX_REVIEW_CHARS} characters"
        )));
    }
    let env = client
        .post(
            "user-interactions/rate",
            &RateRequest {
                book_id,
                rating,
                review,
            },
        )
        .await?;
    into_data(env, "rating")
}
