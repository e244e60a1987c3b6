use serde::Serialize;

/// Catalog primary key (the `i` column of every source file)
pub type BookId = u64;

/// Sentinel rendered for any missing text field
pub const UNKNOWN: &str = "Unknown";

/// One row of the book catalog, with column-name variants already resolved
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BookRecord {
    pub id: BookId,
    /// Canonical title; empty when the source cell was blank
    pub title: String,
    /// Long display title used by the book picker
    pub title_long: Option<String>,
    pub author: Option<String>,
    /// Subject labels split from the comma-separated source field
    pub subjects: Vec<String>,
    /// The trimmed `Subjects` cell as written, used for matching
    pub subjects_text: Option<String>,
    pub cover_image_url: Option<String>,
    pub detail_link: Option<String>,
    pub description: Option<String>,
    pub pages: Option<String>,
    pub publication_year: Option<String>,
    pub language: Option<String>,
    pub publisher: Option<String>,
}

impl BookRecord {
    /// Creates a record with only the required fields set
    pub fn new(id: BookId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            title_long: None,
            author: None,
            subjects: Vec::new(),
            subjects_text: None,
            cover_image_url: None,
            detail_link: None,
            description: None,
            pages: None,
            publication_year: None,
            language: None,
            publisher: None,
        }
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            UNKNOWN
        } else {
            &self.title
        }
    }

    pub fn display_author(&self) -> &str {
        self.author.as_deref().unwrap_or(UNKNOWN)
    }

    /// Sets both the subject labels and the raw text from one `Subjects` cell.
    /// A blank cell leaves the record without subjects.
    pub fn set_subjects(&mut self, raw: &str) {
        let trimmed = raw.trim();
        self.subjects = parse_subjects(trimmed);
        self.subjects_text = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }

    /// Case-insensitive substring match against the raw subjects text only.
    /// An absent `Subjects` cell never matches.
    ///
    /// `needle` must already be lowercased.
    pub fn matches_subject(&self, needle: &str) -> bool {
        self.subjects_text
            .as_deref()
            .is_some_and(|text| text.to_lowercase().contains(needle))
    }

    /// Case-insensitive substring match against title, author and subjects.
    ///
    /// `needle` must already be lowercased.
    pub fn matches_query(&self, needle: &str) -> bool {
        let contains = |field: &str| !field.is_empty() && field.to_lowercase().contains(needle);

        contains(self.title.as_str())
            || self.author.as_deref().is_some_and(contains)
            || self.matches_subject(needle)
    }
}

/// Splits a free-text `Subjects` cell into trimmed, non-empty labels
pub fn parse_subjects(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
