//! Home page feed
//!
//! The home page is a stack of carousels: newest books, top rated books and
//! one row per genre. Carousels load concurrently and independently; one
//! failing row is logged and left empty, except for an expired session,
//! which fails the whole feed.

use tokio::task::JoinSet;
use tracing::warn;

use crate::books::list_books;
use crate::client::ApiClient;
use crate::error::{Error, Result};
use crate::genres::list_genres;
use crate::models::{Book, Genre, ListQuery};

pub const CAROUSEL_SIZE: u32 = 12;
pub const MAX_GENRE_CAROUSELS: u32 = 8;
pub const SORT_NEWEST: &str = "createdAt,desc";
pub const SORT_TOP_RATED: &str = "averageRating,desc";

#[derive(Debug, Clone, Default)]
pub struct HomeFeed {
    pub newest: Vec<Book>,
    pub top_rated: Vec<Book>,
    pub genres: Vec<(Genre, Vec<Book>)>,
}

impl HomeFeed {
    pub fn is_empty(&self) -> bool {
        self.newest.is_empty()
            && self.top_rated.is_empty()
            && self.genres.iter().all(|(_, books)| books.is_empty())
    }
}

async fn carousel(client: &ApiClient, query: ListQuery, name: &str) -> Result<Vec<Book>> {
    match list_books(client, &query).await {
        Ok(page) => Ok(page.items),
        Err(Error::SessionExpired) => Err(Error::SessionExpired),
        Err(e) => {
            warn!(carousel = name, error = %e, "carousel failed to load");
            Ok(Vec::new())
        }
    }
}

pub async fn load_home(client: &ApiClient) -> Result<HomeFeed> {
    let row = ListQuery::page(CAROUSEL_SIZE, 0);
    let genre_query = ListQuery::page(MAX_GENRE_CAROUSELS, 0);
    let (newest, top_rated, genres) = tokio::join!(
        carousel(client, row.clone().with_sort(SORT_NEWEST), "newest"),
        carousel(client, row.clone().with_sort(SORT_TOP_RATED), "top_rated"),
        list_genres(client, &genre_query),
    );
    let (newest, top_rated) = (newest?, top_rated?);
    let genres = match genres {
        Ok(page) => page.items,
        Err(Error::SessionExpired) => return Err(Error::SessionExpired),
        Err(e) => {
            warn!(error = %e, "genre list failed to load");
            Vec::new()
        }
    };

    let mut set = JoinSet::new();
    for (index, genre) in genres.iter().enumerate() {
        let client = client.clone();
        let query = row.clone().with_genre(genre.id).with_sort(SORT_TOP_RATED);
        let name = genre.name.clone();
        set.spawn(async move { (index, carousel(&client, query, &name).await) });
    }

    let mut rows: Vec<Option<Vec<Book>>> = vec![None; genres.len()];
    while let Some(joined) = set.join_next().await {
        let (index, books) = joined.map_err(|e| Error::Transport(format!("carousel task: {e}")))?;
        rows[index] = Some(books?);
    }

    Ok(HomeFeed {
        newest,
        top_rated,
        genres: genres
            .into_iter()
            .zip(rows)
            .map(|(genre, books)| (genre, books.unwrap_or_default()))
            .collect(),
    })
}
