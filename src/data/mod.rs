//! Input records, catalogs and the validity filters.
//!
//! Provides:
//! - [`RatingRecord`], the only input the core pipeline consumes
//! - [`BookCatalog`] and [`ReaderCatalog`] loaded from CSV
//! - [`clean`], which restricts ratings to valid books and readers
//!
//! The CSV layout follows the Book-Crossing dump (`Books.csv`, `Users.csv`,
//! `Ratings.csv`); extra columns are ignored.

mod csv_loader;

pub use csv_loader::{load_ratings, read_ratings, CsvSource};

use crate::config::PipelineConfig;
use crate::error::{BookrecError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::info;

/// One explicit rating of a book by a reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRecord {
    /// Reader id
    pub user_id: u64,
    /// Book id (ISBN)
    pub item_id: String,
    /// Rating score
    pub rating: i32,
}

impl RatingRecord {
    /// Creates a rating record.
    #[must_use]
    pub fn new(user_id: u64, item_id: impl Into<String>, rating: i32) -> Self {
        Self {
            user_id,
            item_id: item_id.into(),
            rating,
        }
    }
}

/// Display attributes of a book.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// ISBN, the item id
    pub isbn: String,
    /// Title
    pub title: String,
    /// Author
    pub author: String,
    /// Year of publication
    pub year: i32,
}

/// A reader with a known age.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reader {
    /// Reader id
    pub user_id: u64,
    /// Age in years
    pub age: f64,
}

/// Item metadata lookup used when presenting recommendations.
pub trait ItemLookup {
    /// Returns the book with the given id, if known.
    fn lookup(&self, item_id: &str) -> Option<&Book>;
}

/// Books keyed by ISBN.
#[derive(Debug, Clone, Default)]
pub struct BookCatalog {
    books: Vec<Book>,
    index: HashMap<String, usize>,
}

impl BookCatalog {
    /// Creates a catalog. Later duplicates of an ISBN replace earlier ones.
    #[must_use]
    pub fn new(books: Vec<Book>) -> Self {
        let mut catalog = Self::default();
        for book in books {
            catalog.insert(book);
        }
        catalog
    }

    fn insert(&mut self, book: Book) {
        if let Some(&pos) = self.index.get(&book.isbn) {
            self.books[pos] = book;
        } else {
            self.index.insert(book.isbn.clone(), self.books.len());
            self.books.push(book);
        }
    }

    /// Number of books.
    #[must_use]
    pub fn len(&self) -> usize {
        self.books.len()
    }

    /// True if the catalog holds no books.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// All books in insertion order.
    #[must_use]
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    /// Keeps only books published in `min_year..=max_year`.
    #[must_use]
    pub fn published_between(&self, min_year: i32, max_year: i32) -> Self {
        Self::new(
            self.books
                .iter()
                .filter(|b| (min_year..=max_year).contains(&b.year))
                .cloned()
                .collect(),
        )
    }
}

impl ItemLookup for BookCatalog {
    fn lookup(&self, item_id: &str) -> Option<&Book> {
        self.index.get(item_id).map(|&pos| &self.books[pos])
    }
}

/// Readers keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ReaderCatalog {
    readers: Vec<Reader>,
    ids: HashSet<u64>,
}

impl ReaderCatalog {
    /// Creates a catalog.
    #[must_use]
    pub fn new(readers: Vec<Reader>) -> Self {
        let ids = readers.iter().map(|r| r.user_id).collect();
        Self { readers, ids }
    }

    /// Number of readers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.readers.len()
    }

    /// True if the catalog holds no readers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    /// True if the reader is in the catalog.
    #[must_use]
    pub fn contains(&self, user_id: u64) -> bool {
        self.ids.contains(&user_id)
    }

    /// Keeps only readers aged `min_age..=max_age`.
    #[must_use]
    pub fn aged_between(&self, min_age: u32, max_age: u32) -> Self {
        let (lo, hi) = (f64::from(min_age), f64::from(max_age));
        Self::new(
            self.readers
                .iter()
                .filter(|r| r.age >= lo && r.age <= hi)
                .copied()
                .collect(),
        )
    }
}

/// Restricts ratings to books and readers that pass the validity filters.
///
/// Books must be published within `min_year..=max_year` and readers aged
/// `min_age..=max_age`. When `max_ratings` is set only that many leading
/// rating rows are considered.
///
/// # Errors
///
/// Returns [`BookrecError::Configuration`] if no rating survives.
pub fn clean(
    books: &BookCatalog,
    readers: &ReaderCatalog,
    ratings: &[RatingRecord],
    config: &PipelineConfig,
) -> Result<Vec<RatingRecord>> {
    let books = books.published_between(config.min_year, config.max_year);
    let readers = readers.aged_between(config.min_age, config.max_age);
    let limit = config.max_ratings.unwrap_or(usize::MAX);

    let considered = ratings.len().min(limit);
    let kept: Vec<RatingRecord> = ratings
        .iter()
        .take(limit)
        .filter(|r| books.lookup(&r.item_id).is_some() && readers.contains(r.user_id))
        .cloned()
        .collect();

    info!(
        books = books.len(),
        readers = readers.len(),
        before = considered,
        after = kept.len(),
        "cleaned ratings"
    );

    if kept.is_empty() {
        return Err(BookrecError::empty_input(
            "no rating references a valid book and reader",
        ));
    }
    Ok(kept)
}
