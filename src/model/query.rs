//! Query-side data: raw log records, resolved dimensions, frequency tables

use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;

use super::{Column, Table};

/// One executed query as it appears in the log.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRecord {
    /// Raw SQL text, exactly one statement.
    pub text: String,
    pub start_time: Option<DateTime<FixedOffset>>,
    pub end_time: Option<DateTime<FixedOffset>>,
}

impl QueryRecord {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            start_time: None,
            end_time: None,
        }
    }

    /// Wall-clock duration in seconds, when both timestamps are present.
    pub fn duration_seconds(&self) -> Option<f64> {
        let start = self.start_time?;
        let end = self.end_time?;
        let delta = end.signed_duration_since(start);
        Some(delta.num_milliseconds() as f64 / 1000.0)
    }
}

/// One referenced table and the subset of its columns a query used.
///
/// `used_columns` keeps duplicate mentions: a query that names the same
/// column twice contributes it twice. When the resolver ran schema-aware,
/// `table` is the declared table and `used_columns` is a subset of its
/// columns; otherwise `table` is synthesized from the used columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub table: Table,
    pub used_columns: Vec<Column>,
}

/// The result of resolving one query against the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryData {
    /// Normalized query text (trimmed, newlines collapsed).
    pub normalized_query: String,
    /// Sorted by table name ascending.
    pub dimensions: Vec<Dimension>,
}

/// Count-aggregated usage statistics over a batch of queries.
///
/// Each mapping preserves first-encounter order for equal counts and is
/// sorted by descending count for presentation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frequencies {
    /// Table name -> number of referencing mentions across the batch.
    pub tables: IndexMap<String, u64>,
    /// Column reference -> number of mentions across the batch.
    pub columns: IndexMap<String, u64>,
    /// Original query text -> number of exact duplicates in the input.
    pub queries: IndexMap<String, u64>,
}
