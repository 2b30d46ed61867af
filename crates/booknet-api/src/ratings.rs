//! Community ratings and the star distribution estimate
//!
//! The ratings endpoint is paginated, so the detail view only ever sees a
//! sample. When the server reports more ratings than the sample holds, the
//! per-star counts are scaled up to the reported total; percentages stay
//! relative to the sample.

use serde::Serialize;

use crate::client::{ApiClient, into_data};
use crate::error::Result;
use crate::models::{ListPayload, ListQuery, Page, Rating};

/// Sample size fetched for the community distribution.
pub const COMMUNITY_SAMPLE_LIMIT: u32 = 100;

pub async fn get_book_ratings(
    client: &ApiClient,
    book_id: i64,
    query: &ListQuery,
) -> Result<Page<Rating>> {
    let env = client
        .get_with_query::<ListPayload<Rating>>(&format!("books/{book_id}/ratings"), &query.to_pairs())
        .await?;
    Ok(into_data(env, "ratings")?.into_page(query))
}

/// First page of community ratings plus its distribution.
pub async fn community_ratings(
    client: &ApiClient,
    book_id: i64,
) -> Result<(Page<Rating>, RatingDistribution)> {
    let page = get_book_ratings(client, book_id, &ListQuery::page(COMMUNITY_SAMPLE_LIMIT, 0)).await?;
    let distribution = RatingDistribution::estimate(&page.items, page.total);
    Ok((page, distribution))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StarBucket {
    pub stars: u8,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingDistribution {
    /// Stars 5 down to 1.
    pub buckets: Vec<StarBucket>,
    pub sample_size: usize,
    pub estimated_total: u64,
    pub average: f64,
    pub extrapolated: bool,
}

impl RatingDistribution {
    pub fn estimate(sample: &[Rating], reported_total: u64) -> Self {
        let sample_len = sample.len();
        let extrapolated = reported_total > sample_len as u64;

        let buckets = (1..=5u8)
            .rev()
            .map(|stars| {
                let in_sample = sample.iter().filter(|r| r.rating == stars).count();
                let (count, percentage) = if sample_len == 0 {
                    (0, 0.0)
                } else {
                    let share = in_sample as f64 / sample_len as f64;
                    let count = if extrapolated {
                        (share * reported_total as f64).round() as u64
                    } else {
                        in_sample as u64
                    };
                    (count, share * 100.0)
                };
                StarBucket {
                    stars,
                    count,
                    percentage,
                }
            })
            .collect();

        let average = if sample_len == 0 {
            0.0
        } else {
            sample.iter().map(|r| f64::from(r.rating)).sum::<f64>() / sample_len as f64
        };

        Self {
            buckets,
            sample_size: sample_len,
            estimated_total: reported_total.max(sample_len as u64),
            average,
            extrapolated,
        }
    }

    pub fn bucket(&self, stars: u8) -> Option<&StarBucket> {
        self.buckets.iter().find(|b| b.stars == stars)
    }
}
