use std::collections::HashMap;
use std::io;
use std::path::Path;

use csv::StringRecord;

use crate::{
    error::{AppError, AppResult},
    models::{BookId, BookRecord},
};

const ID_COLUMN: &[&str] = &["i"];
const TITLE_COLUMNS: &[&str] = &["title", "Title"];
const TITLE_LONG_COLUMNS: &[&str] = &["title_long"];
const AUTHOR_COLUMNS: &[&str] = &["Author", "author", "Authors"];
const SUBJECT_COLUMNS: &[&str] = &["Subjects", "subjects"];
const COVER_COLUMNS: &[&str] = &["image", "cover_url"];
const LINK_COLUMNS: &[&str] = &["link"];
const DESCRIPTION_COLUMNS: &[&str] = &["Description", "synopsis"];
const PAGES_COLUMNS: &[&str] = &["Pages", "pages"];
const YEAR_COLUMNS: &[&str] = &["Year", "date_published", "Published"];
const LANGUAGE_COLUMNS: &[&str] = &["Language", "language"];
const PUBLISHER_COLUMNS: &[&str] = &["Publisher", "publisher"];

/// Finds the first alias present in the header row.
///
/// Exact names win over case-insensitive matches so that a file carrying
/// both `title` and `Title` resolves deterministically.
pub(crate) fn resolve_column(headers: &StringRecord, aliases: &[&str]) -> Option<usize> {
    aliases
        .iter()
        .find_map(|alias| headers.iter().position(|h| h.trim() == *alias))
        .or_else(|| {
            aliases.iter().find_map(|alias| {
                headers
                    .iter()
                    .position(|h| h.trim().eq_ignore_ascii_case(alias))
            })
        })
}

/// Trimmed cell contents, `None` when the column is absent or the cell blank
pub(crate) fn cell(record: &StringRecord, column: Option<usize>) -> Option<String> {
    column
        .and_then(|idx| record.get(idx))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Source line of a record, for error messages
pub(crate) fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or_default()
}

/// Header positions for every canonical catalog field
struct CatalogColumns {
    id: usize,
    title: usize,
    title_long: Option<usize>,
    author: Option<usize>,
    subjects: Option<usize>,
    cover_image_url: Option<usize>,
    detail_link: Option<usize>,
    description: Option<usize>,
    pages: Option<usize>,
    publication_year: Option<usize>,
    language: Option<usize>,
    publisher: Option<usize>,
}

impl CatalogColumns {
    fn resolve(headers: &StringRecord) -> AppResult<Self> {
        let id = resolve_column(headers, ID_COLUMN)
            .ok_or_else(|| AppError::MalformedCatalog("missing `i` id column".to_string()))?;
        let title = resolve_column(headers, TITLE_COLUMNS)
            .ok_or_else(|| AppError::MalformedCatalog("missing title column".to_string()))?;

        Ok(Self {
            id,
            title,
            title_long: resolve_column(headers, TITLE_LONG_COLUMNS),
            author: resolve_column(headers, AUTHOR_COLUMNS),
            subjects: resolve_column(headers, SUBJECT_COLUMNS),
            cover_image_url: resolve_column(headers, COVER_COLUMNS),
            detail_link: resolve_column(headers, LINK_COLUMNS),
            description: resolve_column(headers, DESCRIPTION_COLUMNS),
            pages: resolve_column(headers, PAGES_COLUMNS),
            publication_year: resolve_column(headers, YEAR_COLUMNS),
            language: resolve_column(headers, LANGUAGE_COLUMNS),
            publisher: resolve_column(headers, PUBLISHER_COLUMNS),
        })
    }

    fn parse_row(&self, record: &StringRecord) -> AppResult<BookRecord> {
        let line = line_of(record);
        let raw_id = cell(record, Some(self.id))
            .ok_or_else(|| AppError::MalformedCatalog(format!("line {}: missing id", line)))?;
        let id: BookId = raw_id.parse().map_err(|_| {
            AppError::MalformedCatalog(format!("line {}: invalid id {:?}", line, raw_id))
        })?;

        let mut book = BookRecord {
            id,
            title: cell(record, Some(self.title)).unwrap_or_default(),
            title_long: cell(record, self.title_long),
            author: cell(record, self.author),
            subjects: Vec::new(),
            subjects_text: None,
            cover_image_url: cell(record, self.cover_image_url),
            detail_link: cell(record, self.detail_link),
            description: cell(record, self.description),
            pages: cell(record, self.pages),
            publication_year: cell(record, self.publication_year),
            language: cell(record, self.language),
            publisher: cell(record, self.publisher),
        };
        if let Some(raw) = cell(record, self.subjects) {
            book.set_subjects(&raw);
        }
        Ok(book)
    }
}

/// Immutable, in-memory book catalog keyed by id, in source order
#[derive(Debug, Default)]
pub struct CatalogStore {
    books: Vec<BookRecord>,
    by_id: HashMap<BookId, usize>,
}

impl CatalogStore {
    /// Loads the catalog from a CSV file
    pub fn from_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parses a catalog CSV.
    ///
    /// Fails with `MalformedCatalog` on a missing id or title column, or on
    /// any row whose id is missing, non-integer or already seen.
    pub fn from_reader<R: io::Read>(reader: R) -> AppResult<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let columns = CatalogColumns::resolve(reader.headers()?)?;

        let mut books = Vec::new();
        for result in reader.records() {
            let record = result?;
            books.push(columns.parse_row(&record)?);
        }

        let store = Self::from_records(books)?;
        tracing::info!(books = store.len(), "Catalog loaded");
        Ok(store)
    }

    /// Builds a catalog from already-parsed records, rejecting duplicate ids
    pub fn from_records(books: Vec<BookRecord>) -> AppResult<Self> {
        let mut by_id = HashMap::with_capacity(books.len());
        for (position, book) in books.iter().enumerate() {
            if by_id.insert(book.id, position).is_some() {
                return Err(AppError::MalformedCatalog(format!(
                    "duplicate id {}",
                    book.id
                )));
            }
        }

        Ok(Self { books, by_id })
    }

    pub fn get(&self, id: BookId) -> Option<&BookRecord> {
        self.by_id.get(&id).map(|&position| &self.books[position])
    }

    /// Every record in load order
    pub fn all(&self) -> &[BookRecord] {
        &self.books
    }

    /// Records satisfying `predicate`, in load order
    pub fn filter<'a, P>(&'a self, predicate: P) -> impl Iterator<Item = &'a BookRecord> + 'a
    where
        P: Fn(&BookRecord) -> bool + 'a,
    {
        self.books.iter().filter(move |book| predicate(*book))
    }

    /// First record whose long title (or canonical title when it has none)
    /// equals `title` exactly
    pub fn find_by_title_long(&self, title: &str) -> Option<&BookRecord> {
        self.books
            .iter()
            .find(|book| book.title_long.as_deref().unwrap_or(&book.title) == title)
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}
