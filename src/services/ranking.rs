use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::{
    config::Config,
    error::AppResult,
    models::{BookId, BookRecord},
    store::BookStores,
};

pub const DEFAULT_RECOMMENDATION_LIMIT: usize = 10;
pub const DEFAULT_POPULAR_LIMIT: usize = 10;
pub const DEFAULT_SEARCH_LIMIT: usize = 15;
pub const DEFAULT_GENRE_LIMIT: usize = 6;

/// Ordered, deduplicated, hydrated catalog records
pub type RankedResult<'a> = Vec<&'a BookRecord>;

/// Books of one genre shelf
#[derive(Debug, Clone, PartialEq)]
pub struct GenreShelf<'a> {
    pub label: &'a str,
    pub books: RankedResult<'a>,
}

/// Lowercased needle for substring matching; `None` for blank input
fn normalize_needle(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Keeps the first occurrence of each id
fn dedup_preserving_order(ids: &[BookId]) -> Vec<BookId> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Lookup-and-rank operations over the loaded stores.
///
/// Every operation is a pure read of immutable data, so a single instance is
/// shared across request handlers without locking.
#[derive(Debug)]
pub struct BookService {
    stores: BookStores,
    shelf_labels: Vec<String>,
    loaded_at: DateTime<Utc>,
}

impl BookService {
    pub fn new(stores: BookStores, shelf_labels: Vec<String>) -> Self {
        Self {
            stores,
            shelf_labels,
            loaded_at: Utc::now(),
        }
    }

    /// Loads the stores from the files named in `config`
    pub fn load(config: &Config) -> AppResult<Self> {
        let stores = BookStores::load(config)?;
        Ok(Self::new(stores, config.genre_shelves.clone()))
    }

    pub fn stores(&self) -> &BookStores {
        &self.stores
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn shelf_labels(&self) -> &[String] {
        &self.shelf_labels
    }

    fn hydrate<'a>(&'a self, ids: impl IntoIterator<Item = BookId>) -> RankedResult<'a> {
        ids.into_iter()
            .filter_map(|id| self.stores.catalog.get(id))
            .collect()
    }

    /// A user's precomputed recommendations in upstream order.
    ///
    /// The stored list is cut to its first `limit` entries, then repeats and
    /// ids missing from the catalog are dropped, so fewer than `limit` books
    /// may come back. Unknown users get an empty result.
    pub fn recommendations_for(&self, user_id: &str, limit: usize) -> RankedResult<'_> {
        let stored = self.stores.recommendations.for_user(user_id);
        let head = &stored[..limit.min(stored.len())];
        self.hydrate(dedup_preserving_order(head))
    }

    /// The `limit` most interacted-with books, most popular first
    pub fn most_popular(&self, limit: usize) -> RankedResult<'_> {
        self.hydrate(self.stores.interactions.top_n(limit).iter().copied())
    }

    /// Like `most_popular`, paired with each book's interaction count
    pub fn most_popular_with_counts(&self, limit: usize) -> Vec<(&BookRecord, u64)> {
        self.most_popular(limit)
            .into_iter()
            .map(|book| (book, self.stores.interactions.popularity(book.id)))
            .collect()
    }

    /// Case-insensitive substring search over title, author and subjects,
    /// in catalog order. A blank query matches nothing.
    pub fn search(&self, query: &str, limit: usize) -> RankedResult<'_> {
        let Some(needle) = normalize_needle(query) else {
            return Vec::new();
        };
        self.stores
            .catalog
            .filter(move |book| book.matches_query(&needle))
            .take(limit)
            .collect()
    }

    /// Number of books `search` would return without a limit
    pub fn count_matches(&self, query: &str) -> usize {
        let Some(needle) = normalize_needle(query) else {
            return 0;
        };
        self.stores
            .catalog
            .filter(move |book| book.matches_query(&needle))
            .count()
    }

    /// Case-insensitive substring match of `genre` against subjects only
    pub fn by_genre(&self, genre: &str, limit: usize) -> RankedResult<'_> {
        let Some(needle) = normalize_needle(genre) else {
            return Vec::new();
        };
        self.stores
            .catalog
            .filter(move |book| book.matches_subject(&needle))
            .take(limit)
            .collect()
    }

    /// One shelf per configured genre label, skipping shelves with no books
    pub fn genre_shelves(&self, limit: usize) -> Vec<GenreShelf<'_>> {
        self.shelf_labels
            .iter()
            .map(|label| GenreShelf {
                label: label.as_str(),
                books: self.by_genre(label, limit),
            })
            .filter(|shelf| !shelf.books.is_empty())
            .collect()
    }

    /// Hydrates a caller-owned favorites list in catalog order
    pub fn favorites(&self, ids: &[BookId]) -> RankedResult<'_> {
        let wanted: HashSet<BookId> = ids.iter().copied().collect();
        self.stores
            .catalog
            .filter(move |book| wanted.contains(&book.id))
            .collect()
    }

    pub fn book(&self, id: BookId) -> Option<&BookRecord> {
        self.stores.catalog.get(id)
    }

    pub fn book_by_title(&self, title: &str) -> Option<&BookRecord> {
        self.stores.catalog.find_by_title_long(title)
    }

    pub fn users(&self) -> &[String] {
        self.stores.recommendations.users()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CatalogStore, InteractionIndex, RecommendationTable};

    const CATALOG: &str = "\
i,title,Author,Subjects
3,Dune,Frank Herbert,\"Science-fiction, Classics\"
7,The Hobbit,J.R.R. Tolkien,\"Fantasy, Young Adult\"
1,Silmarillion,,Fantasy
2,One Piece,Eiichiro Oda,Mangas
5,Notebook,,
";

    fn service() -> BookService {
        let recommendations = "user_id,recommendation\n42,7 3 7 99\n9,bad 1\n";
        let stores = BookStores {
            catalog: CatalogStore::from_reader(CATALOG.as_bytes()).unwrap(),
            interactions: InteractionIndex::from_item_ids([1, 1, 2, 3, 3, 3, 404, 404, 404, 404]),
            recommendations: RecommendationTable::from_reader(recommendations.as_bytes()).unwrap(),
        };
        BookService::new(
            stores,
            vec!["Mangas".to_string(), "Romance".to_string(), "Fantasy".to_string()],
        )
    }

    fn ids(result: &[&BookRecord]) -> Vec<BookId> {
        result.iter().map(|b| b.id).collect()
    }

    #[test]
    fn test_recommendations_dedup_and_drop_dangling() {
        let service = service();
        assert_eq!(ids(&service.recommendations_for("42", 10)), vec![7, 3]);
    }

    #[test]
    fn test_recommendations_repeats_use_up_limit() {
        let service = service();
        assert_eq!(ids(&service.recommendations_for("42", 1)), vec![7]);
        assert_eq!(ids(&service.recommendations_for("42", 3)), vec![7, 3]);
        assert!(service.recommendations_for("42", 0).is_empty());

        let mut stores = BookStores::default();
        stores.catalog = CatalogStore::from_records(vec![
            BookRecord::new(1, "A"),
            BookRecord::new(2, "B"),
            BookRecord::new(3, "C"),
        ])
        .unwrap();
        stores.recommendations.insert("u", vec![1, 1, 1, 2, 3]);
        let service = BookService::new(stores, Vec::new());

        assert_eq!(ids(&service.recommendations_for("u", 3)), vec![1]);
        assert_eq!(ids(&service.recommendations_for("u", 4)), vec![1, 2]);
        assert_eq!(ids(&service.recommendations_for("u", 10)), vec![1, 2, 3]);
    }

    #[test]
    fn test_recommendations_limit_applies_before_hydration() {
        let mut stores = BookStores::default();
        stores.catalog =
            CatalogStore::from_records(vec![BookRecord::new(1, "A"), BookRecord::new(3, "C")])
                .unwrap();
        stores.recommendations.insert("u", vec![99, 1, 3]);
        let service = BookService::new(stores, Vec::new());

        // 99 occupies a slot and is then dropped as dangling
        assert_eq!(ids(&service.recommendations_for("u", 2)), vec![1]);
    }

    #[test]
    fn test_unknown_or_malformed_user_is_empty() {
        let service = service();
        assert!(service.recommendations_for("nobody", 10).is_empty());
        assert!(service.recommendations_for("9", 10).is_empty());
    }

    #[test]
    fn test_most_popular_order_and_dangling() {
        let service = service();
        // 404 is the most popular id but has no catalog record
        assert_eq!(ids(&service.most_popular(2)), vec![3]);
        assert_eq!(ids(&service.most_popular(10)), vec![3, 1, 2]);

        let counts: Vec<u64> = service
            .most_popular_with_counts(10)
            .into_iter()
            .map(|(_, count)| count)
            .collect();
        assert_eq!(counts, vec![3, 2, 1]);
    }

    #[test]
    fn test_most_popular_scenario() {
        let stores = BookStores {
            catalog: CatalogStore::from_reader(CATALOG.as_bytes()).unwrap(),
            interactions: InteractionIndex::from_item_ids([1, 1, 2, 3, 3, 3]),
            recommendations: RecommendationTable::default(),
        };
        let service = BookService::new(stores, Vec::new());
        assert_eq!(ids(&service.most_popular(2)), vec![3, 1]);
    }

    #[test]
    fn test_search_matches_any_field() {
        let service = service();
        assert_eq!(ids(&service.search("Tolkien", 15)), vec![7]);
        assert_eq!(ids(&service.search("dune", 15)), vec![3]);
        assert_eq!(ids(&service.search("FANTASY", 15)), vec![7, 1]);
        assert!(service.search("cookbook", 15).is_empty());
    }

    #[test]
    fn test_search_truncates_in_catalog_order() {
        let service = service();
        // "e" appears in every record except Silmarillion
        assert_eq!(ids(&service.search("e", 2)), vec![3, 7]);
        assert_eq!(service.count_matches("e"), 4);
    }

    #[test]
    fn test_blank_query_matches_nothing() {
        let service = service();
        assert!(service.search("", 15).is_empty());
        assert!(service.search("   ", 15).is_empty());
        assert_eq!(service.count_matches(""), 0);
        assert!(service.by_genre("", 6).is_empty());
    }

    #[test]
    fn test_by_genre_subjects_only() {
        let service = service();
        assert_eq!(ids(&service.by_genre("fantasy", 6)), vec![7, 1]);
        assert_eq!(ids(&service.by_genre("fantasy", 1)), vec![7]);
        assert!(service.by_genre("romance", 6).is_empty());
        // title match does not count as a genre match
        assert!(service.by_genre("dune", 6).is_empty());
    }

    #[test]
    fn test_missing_subjects_never_match() {
        let service = service();
        let notebook = service.book(5).unwrap();
        assert!(notebook.subjects.is_empty());
        assert!(!ids(&service.search("note", 15)).is_empty());
        assert!(!ids(&service.by_genre("a", 6)).contains(&5));
    }

    #[test]
    fn test_subject_match_uses_raw_cell() {
        let csv = "i,title,Subjects\n4,Eragon,\"Fantasy,Young Adult\"\n";
        let stores = BookStores {
            catalog: CatalogStore::from_reader(csv.as_bytes()).unwrap(),
            ..BookStores::default()
        };
        let service = BookService::new(stores, Vec::new());

        assert_eq!(ids(&service.search("fantasy,young", 15)), vec![4]);
        assert_eq!(ids(&service.by_genre("FANTASY,YOUNG", 6)), vec![4]);
        assert!(service.search("fantasy, young", 15).is_empty());
    }

    #[test]
    fn test_genre_shelves_skip_empty() {
        let service = service();
        let shelves = service.genre_shelves(6);
        let labels: Vec<&str> = shelves.iter().map(|s| s.label).collect();
        assert_eq!(labels, vec!["Mangas", "Fantasy"]);
        assert_eq!(ids(&shelves[0].books), vec![2]);
        assert_eq!(ids(&shelves[1].books), vec![7, 1]);
    }

    #[test]
    fn test_favorites_in_catalog_order() {
        let service = service();
        assert_eq!(ids(&service.favorites(&[1, 999, 3, 1])), vec![3, 1]);
        assert!(service.favorites(&[]).is_empty());
    }

    #[test]
    fn test_lookups() {
        let service = service();
        assert_eq!(service.book(7).map(|b| b.title.as_str()), Some("The Hobbit"));
        assert!(service.book(99).is_none());
        assert_eq!(service.book_by_title("Dune").map(|b| b.id), Some(3));
        assert_eq!(service.users(), &["42".to_string(), "9".to_string()]);
    }

    #[test]
    fn test_operations_are_idempotent() {
        let service = service();
        assert_eq!(service.recommendations_for("42", 10), service.recommendations_for("42", 10));
        assert_eq!(service.most_popular(5), service.most_popular(5));
        assert_eq!(service.search("a", 15), service.search("a", 15));
        assert_eq!(service.by_genre("fantasy", 6), service.by_genre("fantasy", 6));
    }
}
