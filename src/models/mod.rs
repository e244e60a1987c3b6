pub mod book;

pub use book::{BookId, BookRecord, UNKNOWN};
