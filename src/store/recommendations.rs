use std::collections::HashMap;
use std::io;
use std::path::Path;

use crate::{
    error::{AppError, AppResult},
    models::BookId,
    store::catalog::{cell, resolve_column},
};

/// Parses a whitespace-separated recommendation string.
///
/// Any token that is not an integer invalidates the whole list. Order and
/// repeats are kept as written.
pub fn parse_recommendation(user_id: &str, raw: &str) -> AppResult<Vec<BookId>> {
    raw.split_whitespace()
        .map(|token| {
            token
                .parse::<BookId>()
                .map_err(|_| AppError::MalformedRecommendation {
                    user_id: user_id.to_string(),
                    token: token.to_string(),
                })
        })
        .collect()
}

/// Precomputed per-user recommendation lists
#[derive(Debug, Default)]
pub struct RecommendationTable {
    entries: HashMap<String, Vec<BookId>>,
    /// Distinct user ids in first-seen order
    users: Vec<String>,
}

impl RecommendationTable {
    pub fn from_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parses a CSV with `user_id` and `recommendation` columns.
    ///
    /// A malformed recommendation string is logged and stored as an empty
    /// list. When a user appears more than once the last row wins.
    pub fn from_reader<R: io::Read>(reader: R) -> AppResult<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = reader.headers()?;
        let user_column = resolve_column(headers, &["user_id"]).ok_or_else(|| {
            AppError::MalformedRecommendations("missing `user_id` column".to_string())
        })?;
        let recommendation_column =
            resolve_column(headers, &["recommendation"]).ok_or_else(|| {
                AppError::MalformedRecommendations("missing `recommendation` column".to_string())
            })?;

        let mut table = Self::default();
        let mut malformed = 0usize;
        for result in reader.records() {
            let record = result?;
            let Some(user_id) = cell(&record, Some(user_column)) else {
                continue;
            };
            let raw = cell(&record, Some(recommendation_column)).unwrap_or_default();

            let item_ids = match parse_recommendation(&user_id, &raw) {
                Ok(ids) => ids,
                Err(e) => {
                    tracing::warn!(error = %e, user_id = %user_id, "Ignoring recommendation entry");
                    malformed += 1;
                    Vec::new()
                }
            };
            table.insert(&user_id, item_ids);
        }

        tracing::info!(
            users = table.users.len(),
            malformed,
            "Recommendations loaded"
        );
        Ok(table)
    }

    /// Stores `item_ids` for `user_id`, replacing any earlier entry
    pub fn insert(&mut self, user_id: &str, item_ids: Vec<BookId>) {
        let user_id = user_id.trim().to_string();
        if !self.entries.contains_key(&user_id) {
            self.users.push(user_id.clone());
        }
        self.entries.insert(user_id, item_ids);
    }

    /// Ordered recommendation ids for a user; empty when the user is unknown
    pub fn for_user(&self, user_id: &str) -> &[BookId] {
        self.entries
            .get(user_id.trim())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn users(&self) -> &[String] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_order_and_repeats() {
        assert_eq!(parse_recommendation("42", "7 3 7 99").unwrap(), vec![7, 3, 7, 99]);
        assert_eq!(parse_recommendation("42", "  12\t5 \n").unwrap(), vec![12, 5]);
        assert!(parse_recommendation("42", "").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_whole_entry() {
        let err = parse_recommendation("42", "7 x3 9").unwrap_err();
        assert!(matches!(
            err,
            AppError::MalformedRecommendation { ref user_id, ref token } if user_id == "42" && token == "x3"
        ));
    }

    #[test]
    fn test_load_table() {
        let csv = "user_id,recommendation\n42,7 3 7 99\n  8 ,1 2\n";
        let table = RecommendationTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.for_user("42"), &[7, 3, 7, 99]);
        assert_eq!(table.for_user("8"), &[1, 2]);
        assert_eq!(table.users(), &["42".to_string(), "8".to_string()]);
    }

    #[test]
    fn test_unknown_user_is_empty() {
        let table = RecommendationTable::default();
        assert!(table.for_user("nobody").is_empty());
    }

    #[test]
    fn test_malformed_entry_degrades_to_empty() {
        let csv = "user_id,recommendation\n1,4 five 6\n2,8\n";
        let table = RecommendationTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.users(), &["1".to_string(), "2".to_string()]);
        assert!(table.for_user("1").is_empty());
        assert_eq!(table.for_user("2"), &[8]);
    }

    #[test]
    fn test_last_row_wins() {
        let csv = "user_id,recommendation\n1,4 5\n2,8\n1,9\n";
        let table = RecommendationTable::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(table.for_user("1"), &[9]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.users(), &["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn test_insert_and_lookup_trim_user_ids() {
        let mut table = RecommendationTable::default();
        table.insert(" u ", vec![3, 1]);
        assert_eq!(table.for_user("u"), &[3, 1]);
        assert_eq!(table.for_user("  u"), &[3, 1]);
        assert_eq!(table.users(), &["u".to_string()]);

        table.insert("u", vec![9]);
        assert_eq!(table.for_user(" u "), &[9]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_missing_columns() {
        let err = RecommendationTable::from_reader("user_id\n1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, AppError::MalformedRecommendations(_)));
    }
}
