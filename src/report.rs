//! Plain-text rendering of analysis results
//!
//! Presentation only: everything here consumes the aggregate values
//! read-only and builds human-readable text for the CLI.

use std::fmt::Write;

use indexmap::IndexMap;

use crate::model::{Column, Database, Frequencies, Table};

const CORPUS_CAVEAT: &str =
    "Note: \"unused\" means unreferenced by the supplied queries within the selected schema \
     scope. Other workloads or schema regions may still use these objects.";

fn write_counts(out: &mut String, title: &str, counts: &IndexMap<String, u64>) {
    let _ = writeln!(out, "--- {} ({} distinct) ---", title, counts.len());
    if counts.is_empty() {
        out.push_str("  (none)\n");
    }
    for (key, count) in counts {
        let _ = writeln!(out, "  {:>6}  {}", count, key);
    }
    out.push('\n');
}

/// Render the three frequency mappings as aligned count tables.
pub fn render_frequencies(frequencies: &Frequencies) -> String {
    let mut out = String::new();
    out.push_str("=== Usage Frequencies ===\n\n");
    write_counts(&mut out, "Tables", &frequencies.tables);
    write_counts(&mut out, "Columns", &frequencies.columns);
    write_counts(&mut out, "Queries", &frequencies.queries);
    out
}

/// Render the unused-table list with the corpus-scope caveat.
pub fn render_unused_tables(unused: &[Table], database: &Database) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "=== Unused tables in {} ({}) ===",
        database.name,
        unused.len()
    );
    if unused.is_empty() {
        out.push_str("  (none)\n");
    }
    for table in unused {
        let _ = writeln!(out, "  {} ({} columns)", table.name, table.columns.len());
    }
    out.push('\n');
    out.push_str(CORPUS_CAVEAT);
    out.push('\n');
    out
}

/// Render per-table unused columns with the corpus-scope caveat.
pub fn render_unused_columns(unused: &IndexMap<String, Vec<Column>>) -> String {
    let mut out = String::new();
    out.push_str("=== Unused columns per referenced table ===\n");
    if unused.is_empty() {
        out.push_str("  (no tables referenced)\n");
    }
    for (table, columns) in unused {
        if columns.is_empty() {
            let _ = writeln!(out, "  {}: (all columns used)", table);
        } else {
            let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
            let _ = writeln!(out, "  {}: {}", table, names.join(", "));
        }
    }
    out.push('\n');
    out.push_str(CORPUS_CAVEAT);
    out.push('\n');
    out
}

/// Render per-query wall-clock time, slowest first.
pub fn render_time_spent(time_spent: &IndexMap<String, f64>) -> String {
    let mut out = String::new();
    out.push_str("=== Time spent per query ===\n");
    if time_spent.is_empty() {
        out.push_str("  (no timestamped records)\n");
    }
    for (query, seconds) in time_spent {
        let _ = writeln!(out, "  {:>10.3}s  {}", seconds, query);
    }
    out
}
