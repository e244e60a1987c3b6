pub mod ranking;

pub use ranking::{
    BookService, GenreShelf, RankedResult, DEFAULT_GENRE_LIMIT, DEFAULT_POPULAR_LIMIT,
    DEFAULT_RECOMMENDATION_LIMIT, DEFAULT_SEARCH_LIMIT,
};
