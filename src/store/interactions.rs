use std::cmp::Reverse;
use std::collections::HashMap;
use std::io;
use std::path::Path;

use crate::{
    error::{AppError, AppResult},
    models::BookId,
    store::catalog::{cell, resolve_column},
};

/// Popularity counts aggregated from the interaction log
#[derive(Debug, Default)]
pub struct InteractionIndex {
    counts: HashMap<BookId, u64>,
    /// Distinct ids, most popular first; equal counts keep first-seen order
    ranking: Vec<BookId>,
    total_events: u64,
}

impl InteractionIndex {
    pub fn from_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parses an interaction CSV with at least an `i` column.
    ///
    /// Rows whose item id is blank or non-integer are skipped; a file without
    /// an `i` column fails with `MalformedInteractions`.
    pub fn from_reader<R: io::Read>(reader: R) -> AppResult<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let item_column = resolve_column(reader.headers()?, &["i"]).ok_or_else(|| {
            AppError::MalformedInteractions("missing `i` item column".to_string())
        })?;

        let mut item_ids = Vec::new();
        let mut skipped = 0usize;
        for result in reader.records() {
            let record = result?;
            match cell(&record, Some(item_column)).and_then(|raw| raw.parse::<BookId>().ok()) {
                Some(id) => item_ids.push(id),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            tracing::warn!(skipped, "Skipped interaction rows without a valid item id");
        }

        let index = Self::from_item_ids(item_ids);
        tracing::info!(
            events = index.total_events,
            distinct_items = index.ranking.len(),
            "Interactions loaded"
        );
        Ok(index)
    }

    /// Builds the index from item ids in source order
    pub fn from_item_ids(item_ids: impl IntoIterator<Item = BookId>) -> Self {
        let mut counts: HashMap<BookId, u64> = HashMap::new();
        let mut first_seen = Vec::new();
        let mut total_events = 0u64;

        for id in item_ids {
            let count = counts.entry(id).or_insert(0);
            if *count == 0 {
                first_seen.push(id);
            }
            *count += 1;
            total_events += 1;
        }

        // stable sort: ties stay in first-seen order
        let mut ranking = first_seen;
        ranking.sort_by_key(|id| Reverse(counts[id]));

        Self {
            counts,
            ranking,
            total_events,
        }
    }

    /// Number of recorded interactions for `id`, 0 when never seen
    pub fn popularity(&self, id: BookId) -> u64 {
        self.counts.get(&id).copied().unwrap_or(0)
    }

    /// The `n` most popular item ids, descending by count
    pub fn top_n(&self, n: usize) -> &[BookId] {
        &self.ranking[..n.min(self.ranking.len())]
    }

    pub fn total_events(&self) -> u64 {
        self.total_events
    }

    pub fn distinct_items(&self) -> usize {
        self.ranking.len()
    }
}
