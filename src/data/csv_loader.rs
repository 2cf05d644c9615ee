//! CSV loading for the book, reader and rating tables.

use super::{Book, BookCatalog, RatingRecord, Reader, ReaderCatalog};
use crate::error::Result;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct RawBook {
    #[serde(rename = "ISBN")]
    isbn: String,
    #[serde(rename = "Book-Title", default)]
    title: String,
    #[serde(rename = "Book-Author", default)]
    author: String,
    #[serde(rename = "Year-Of-Publication", default)]
    year: String,
}

#[derive(Debug, Deserialize)]
struct RawReader {
    #[serde(rename = "User-ID")]
    user_id: u64,
    #[serde(rename = "Age", default)]
    age: String,
}

#[derive(Debug, Deserialize)]
struct RawRating {
    #[serde(rename = "User-ID")]
    user_id: u64,
    #[serde(rename = "ISBN")]
    isbn: String,
    #[serde(rename = "Book-Rating")]
    rating: i32,
}

/// Coerces a free-text cell to a finite number; anything else is `None`.
fn coerce_numeric(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader)
}

/// A table that can be loaded from CSV.
pub trait CsvSource: Sized {
    /// Parses the table from any reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the CSV is malformed or a required column is
    /// missing.
    fn from_csv_reader<R: Read>(reader: R) -> Result<Self>;

    /// Opens and parses a CSV file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsed.
    fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_csv_reader(file)
    }
}

impl CsvSource for BookCatalog {
    /// Rows with a non-numeric publication year are dropped, not errored.
    fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut books = Vec::new();
        let mut dropped = 0usize;
        for row in csv_reader(reader).deserialize::<RawBook>() {
            let raw = row?;
            match coerce_numeric(&raw.year) {
                Some(year) => books.push(Book {
                    isbn: raw.isbn,
                    title: raw.title,
                    author: raw.author,
                    year: year as i32,
                }),
                None => dropped += 1,
            }
        }
        debug!(loaded = books.len(), dropped, "loaded books");
        Ok(BookCatalog::new(books))
    }
}

impl CsvSource for ReaderCatalog {
    /// Rows with a missing or non-numeric age are dropped.
    fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut readers = Vec::new();
        let mut dropped = 0usize;
        for row in csv_reader(reader).deserialize::<RawReader>() {
            let raw = row?;
            match coerce_numeric(&raw.age) {
                Some(age) => readers.push(Reader {
                    user_id: raw.user_id,
                    age,
                }),
                None => dropped += 1,
            }
        }
        debug!(loaded = readers.len(), dropped, "loaded readers");
        Ok(ReaderCatalog::new(readers))
    }
}

/// Parses `User-ID, ISBN, Book-Rating` rows.
///
/// # Errors
///
/// Returns an error on malformed rows.
pub fn read_ratings<R: Read>(reader: R) -> Result<Vec<RatingRecord>> {
    let mut ratings = Vec::new();
    for row in csv_reader(reader).deserialize::<RawRating>() {
        let raw = row?;
        ratings.push(RatingRecord::new(raw.user_id, raw.isbn, raw.rating));
    }
    debug!(loaded = ratings.len(), "loaded ratings");
    Ok(ratings)
}

/// Opens and parses a ratings CSV file.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or parsed.
pub fn load_ratings<P: AsRef<Path>>(path: P) -> Result<Vec<RatingRecord>> {
    let file = File::open(path.as_ref())?;
    read_ratings(file)
}
