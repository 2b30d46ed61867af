//! Plain-text rendering for command output

use std::fmt::Write as _;

use booknet_api::home::HomeFeed;
use booknet_api::models::Author;
use booknet_api::{Book, Genre, Page, Rating, RatingDistribution, Tag};
use booknet_auth::UserProfile;

const BAR_WIDTH: usize = 20;

pub fn book_line(book: &Book) -> String {
    let mut line = format!("[{}] {} by {}", book.id, book.title, book.author_names());
    if let Some(avg) = book.average_rating {
        let _ = write!(line, "  ★ {avg:.1}");
    }
    if let Some(year) = book.publication_year {
        let _ = write!(line, "  ({year})");
    }
    line
}

pub fn book_detail(book: &Book) -> String {
    let mut out = format!("{}\nby {}\n", book.title, book.author_names());
    let mut field = |label: &str, value: Option<String>| {
        if let Some(value) = value {
            let _ = writeln!(out, "{label:<12}{value}");
        }
    };
    field("ISBN", book.isbn.clone());
    field("Published", book.publication_year.map(|y| y.to_string()));
    field("Pages", book.page_count.map(|p| p.to_string()));
    field("Language", book.language.clone());
    field("Genres", names(book.genres.iter().map(|g| g.name.as_str())));
    field("Tags", names(book.tags.iter().map(|t| t.name.as_str())));
    if let Some(description) = &book.description {
        let _ = write!(out, "\n{description}\n");
    }
    out
}

fn names<'a>(iter: impl Iterator<Item = &'a str>) -> Option<String> {
    let joined = iter.collect::<Vec<_>>().join(", ");
    (!joined.is_empty()).then_some(joined)
}

pub fn distribution(d: &RatingDistribution) -> String {
    let mut out = String::new();
    if d.sample_size == 0 {
        out.push_str("No ratings yet\n");
    } else {
        let _ = writeln!(
            out,
            "Average {:.1} from {} rating{}",
            d.average,
            d.estimated_total,
            if d.estimated_total == 1 { "" } else { "s" }
        );
    }
    for bucket in &d.buckets {
        let filled = ((bucket.percentage / 100.0) * BAR_WIDTH as f64).round() as usize;
        let _ = writeln!(
            out,
            "{} {:<width$} {:>5.1}% ({})",
            bucket.stars,
            "█".repeat(filled.min(BAR_WIDTH)),
            bucket.percentage,
            bucket.count,
            width = BAR_WIDTH
        );
    }
    if d.extrapolated {
        let _ = writeln!(out, "(estimated from the latest {} ratings)", d.sample_size);
    }
    out
}

pub fn rating_line(rating: &Rating) -> String {
    let who = rating.username.as_deref().unwrap_or("anonymous");
    let stars = "★".repeat(rating.rating.into());
    match &rating.review {
        Some(review) => format!("{stars:<5} {who}: {review}"),
        None => format!("{stars:<5} {who}"),
    }
}

pub fn page_footer<T>(page: &Page<T>) -> String {
    if page.is_empty() {
        return "No results".to_string();
    }
    let first = u64::from(page.offset) + 1;
    let last = u64::from(page.offset) + page.items.len() as u64;
    let mut footer = format!("Showing {first}-{last} of {}", page.total);
    if page.has_more() {
        let _ = write!(footer, " (next: --offset {last})");
    }
    footer
}

pub fn home(feed: &HomeFeed) -> String {
    let mut out = String::new();
    carousel(&mut out, "Newest", &feed.newest);
    carousel(&mut out, "Top rated", &feed.top_rated);
    for (genre, books) in &feed.genres {
        carousel(&mut out, &genre.name, books);
    }
    if feed.is_empty() {
        out.push_str("Nothing to show yet\n");
    }
    out
}

fn carousel(out: &mut String, title: &str, books: &[Book]) {
    if books.is_empty() {
        return;
    }
    let _ = writeln!(out, "{title}");
    for book in books {
        let _ = writeln!(out, "  {}", book_line(book));
    }
    out.push('\n');
}

pub fn user(user: &UserProfile) -> String {
    format!(
        "[{}] {} <{}> {}",
        user.id,
        user.display_name(),
        user.email,
        user.role.label()
    )
}

pub fn author(author: &Author) -> String {
    let mut line = format!("[{}] {}", author.id, author.name);
    if let Some(n) = &author.nationality {
        let _ = write!(line, " ({n})");
    }
    line
}

pub fn genre(genre: &Genre) -> String {
    match &genre.description {
        Some(d) => format!("[{}] {}: {}", genre.id, genre.name, d),
        None => format!("[{}] {}", genre.id, genre.name),
    }
}

pub fn tag(tag: &Tag) -> String {
    format!("[{}] #{}", tag.id, tag.name)
}
