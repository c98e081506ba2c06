//! Batch aggregation over query logs
//!
//! All batch operations share the same isolation policy: a query that
//! fails analysis is logged at debug level and contributes nothing, and
//! the batch always completes. Parse failures are deterministic, so there
//! is no retry; the only recovery is omission.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::SqlAuditError;
use crate::model::{Column, Database, Frequencies, QueryRecord, Table};

use super::resolve::{analyze, resolve};

/// Which frequency mappings to populate. The `queries` mapping is always
/// populated.
#[derive(Debug, Clone)]
pub struct FrequencyOptions {
    pub include_tables: bool,
    pub include_columns: bool,
}

impl Default for FrequencyOptions {
    fn default() -> Self {
        Self {
            include_tables: true,
            include_columns: true,
        }
    }
}

fn skip_query(text: &str, err: &SqlAuditError) {
    debug_assert!(err.is_per_query());
    debug!(query = %text, error = %err, "skipping unanalyzable query");
}

/// Count table, column, and query-text occurrences across a batch.
///
/// Every mention counts, including repeats within one query. The `queries`
/// mapping counts exact-duplicate original texts over the whole input,
/// including records whose analysis failed. Each mapping is sorted by
/// descending count, first-encounter order on ties.
pub fn get_frequencies(records: &[QueryRecord], options: &FrequencyOptions) -> Frequencies {
    let mut frequencies = Frequencies::default();

    for record in records {
        *frequencies.queries.entry(record.text.clone()).or_insert(0) += 1;

        if !options.include_tables && !options.include_columns {
            continue;
        }
        let refs = match analyze(&record.text) {
            Ok(refs) => refs,
            Err(err) => {
                skip_query(&record.text, &err);
                continue;
            }
        };

        if options.include_tables {
            for table in refs.tables {
                *frequencies.tables.entry(table).or_insert(0) += 1;
            }
        }
        if options.include_columns {
            for column in refs.columns {
                *frequencies.columns.entry(column).or_insert(0) += 1;
            }
        }
    }

    frequencies.tables.sort_by(|_, a, _, b| b.cmp(a));
    frequencies.columns.sort_by(|_, a, _, b| b.cmp(a));
    frequencies.queries.sort_by(|_, a, _, b| b.cmp(a));

    frequencies
}

/// Find tables of `database` that no counted query referenced.
///
/// Pure name complement against `frequencies.tables`, in schema/table
/// traversal order. Absence of a reference is evidence only within the
/// supplied corpus and schema scope, which is why this warns rather than
/// concluding anything stronger.
pub fn find_unused_tables(frequencies: &Frequencies, database: &Database) -> Vec<Table> {
    let used: HashSet<&str> = frequencies.tables.keys().map(String::as_str).collect();

    let mut unused_tables = Vec::new();
    for schema in &database.schemas {
        for table in &schema.tables {
            if !used.contains(table.name.as_str()) {
                debug!(
                    "Found unused table: {}.{}.{} ({} columns)",
                    database.name,
                    schema.name,
                    table.name,
                    table.columns.len()
                );
                unused_tables.push(table.clone());
            }
        }
    }

    warn!("Tables are unused only with respect to the supplied queries; other workloads may still reference them.");
    warn!("Tables were checked only against the selected database schema; verify the queries were executed in that schema scope.");

    unused_tables
}

/// For every table referenced by at least one query, the declared columns
/// no query used.
///
/// Keys appear in first-reference order; values keep the declared column
/// order. A table referenced with every column used maps to an empty list,
/// while a table never referenced is absent (see [`find_unused_tables`]).
/// Queries that fail schema-aware resolution are skipped.
pub fn find_unused_columns(
    records: &[QueryRecord],
    schema_tables: &[Table],
) -> IndexMap<String, Vec<Column>> {
    let mut used_by_table: IndexMap<String, HashSet<String>> = IndexMap::new();
    for record in records {
        let data = match resolve(&record.text, Some(schema_tables)) {
            Ok(data) => data,
            Err(err) => {
                skip_query(&record.text, &err);
                continue;
            }
        };
        for dimension in data.dimensions {
            let used = used_by_table.entry(dimension.table.name).or_default();
            used.extend(dimension.used_columns.into_iter().map(|c| c.name));
        }
    }

    let mut unused = IndexMap::new();
    for (table_name, used) in used_by_table {
        let Some(table) = schema_tables.iter().find(|t| t.name == table_name) else {
            continue;
        };
        let unused_columns: Vec<Column> = table
            .columns
            .iter()
            .filter(|c| !used.contains(&c.name))
            .cloned()
            .collect();
        unused.insert(table_name, unused_columns);
    }

    warn!("Columns are unused only with respect to the supplied queries and schema scope.");

    unused
}

/// Wall-clock seconds spent per query text, sorted by descending duration.
///
/// Records missing either timestamp are skipped. Duplicate texts keep the
/// last record's duration.
pub fn get_time_spent(records: &[QueryRecord]) -> IndexMap<String, f64> {
    let mut time_spent = IndexMap::new();
    for record in records {
        match record.duration_seconds() {
            Some(seconds) => {
                time_spent.insert(record.text.clone(), seconds);
            }
            None => {
                debug!(query = %record.text, "skipping record without timestamps");
            }
        }
    }

    time_spent.sort_by(|_, a, _, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    time_spent
}
