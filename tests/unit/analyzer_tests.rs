//! Unit tests for the dimension resolver and batch analyzer

use indexmap::IndexMap;
use pretty_assertions::assert_eq;

use sqlaudit::analyzer::{
    analyze, find_unused_columns, find_unused_tables, get_frequencies, get_time_spent, normalize,
    resolve, FrequencyOptions,
};
use sqlaudit::model::{Column, Database, Frequencies, QueryRecord, Schema, Table};
use sqlaudit::SqlAuditError;

/// db1.schema1 with table1{column1, column2} and table2{column3}.
fn sample_database() -> Database {
    Database::new(
        "db1",
        vec![Schema::new(
            "schema1",
            vec![
                Table::new(
                    "table1",
                    vec![
                        Column::with_type("column1", "TEXT"),
                        Column::with_type("column2", "NUMBER"),
                    ],
                ),
                Table::new("table2", vec![Column::with_type("column3", "NUMBER")]),
            ],
        )],
    )
}

fn sample_tables() -> Vec<Table> {
    sample_database().tables().cloned().collect()
}

fn records(texts: &[&str]) -> Vec<QueryRecord> {
    texts.iter().map(|t| QueryRecord::new(*t)).collect()
}

// ============================================================================
// Single-query analysis
// ============================================================================

#[test]
fn test_analyze_reports_tables_and_columns() {
    let refs = analyze("SELECT column1, column2 FROM table1").unwrap();
    assert!(refs.tables.contains(&"table1".to_string()));
    assert!(refs.columns.contains(&"column1".to_string()));
    assert!(refs.columns.contains(&"column2".to_string()));
}

#[test]
fn test_analyze_rejects_multi_statement_input() {
    let err = analyze("SELECT a.x FROM a; SELECT b.y FROM b;").unwrap_err();
    assert!(matches!(err, SqlAuditError::InvalidInputError { .. }));
}

#[test]
fn test_resolve_uses_normalized_query() {
    let data = resolve("  SELECT t1.c1\nFROM t1  ", None).unwrap();
    assert_eq!(data.normalized_query, normalize("  SELECT t1.c1\nFROM t1  "));
    assert_eq!(data.normalized_query, "SELECT t1.c1 FROM t1");
}

#[test]
fn test_resolve_schema_aware_carries_declared_table() {
    let data = resolve("SELECT t1.c1, t1.c2 FROM t1", Some(&schema_t1())).unwrap();
    assert_eq!(data.dimensions.len(), 1);
    let dimension = &data.dimensions[0];
    // Declared table with all three columns, two of them used.
    assert_eq!(dimension.table.columns.len(), 3);
    let used: Vec<&str> = dimension.used_columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(used, vec!["c1", "c2"]);
}

#[test]
fn test_resolve_unknown_table_fails() {
    let err = resolve("SELECT ghost.c1 FROM ghost", Some(&schema_t1())).unwrap_err();
    assert!(matches!(err, SqlAuditError::UnknownTableError { .. }));
}

#[test]
fn test_resolve_without_schema_synthesizes_table() {
    let data = resolve("SELECT t9.a, t9.b FROM t9", None).unwrap();
    assert_eq!(data.dimensions.len(), 1);
    let dimension = &data.dimensions[0];
    assert_eq!(dimension.table.name, "t9");
    let declared: Vec<&str> = dimension.table.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(declared, vec!["a", "b"]);
}

#[test]
fn test_resolve_preserves_duplicate_column_mentions() {
    let data = resolve("SELECT t1.c1, t1.c1 FROM t1", None).unwrap();
    let used: Vec<&str> = data.dimensions[0]
        .used_columns
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(used, vec!["c1", "c1"]);
    // The synthesized declared columns stay unique.
    assert_eq!(data.dimensions[0].table.columns.len(), 1);
}

#[test]
fn test_resolve_sorts_dimensions_by_table_name() {
    let data = resolve(
        "SELECT zz.c1, aa.c2 FROM zz JOIN aa ON zz.id = aa.id",
        None,
    )
    .unwrap();
    let tables: Vec<&str> = data.dimensions.iter().map(|d| d.table.name.as_str()).collect();
    assert_eq!(tables, vec!["aa", "zz"]);
}

#[test]
fn test_resolve_is_pure() {
    let sql = "SELECT t1.c1, t1.c2 FROM t1";
    assert_eq!(resolve(sql, None).unwrap(), resolve(sql, None).unwrap());
}

#[test]
fn test_bare_column_attributed_to_sole_table() {
    let data = resolve("SELECT column1 FROM db1.schema1.table1", Some(&sample_tables())).unwrap();
    assert_eq!(data.dimensions.len(), 1);
    assert_eq!(data.dimensions[0].table.name, "table1");
    assert_eq!(data.dimensions[0].used_columns, vec![Column::new("column1")]);
}

fn schema_t1() -> Vec<Table> {
    vec![Table::new(
        "t1",
        vec![Column::new("c1"), Column::new("c2"), Column::new("c3")],
    )]
}

// ============================================================================
// Frequency aggregation
// ============================================================================

#[test]
fn test_get_frequencies_counts_mentions() {
    let records = records(&[
        "SELECT c1 FROM t1",
        "SELECT c1 FROM t1",
        "SELECT c2 FROM t1",
    ]);
    let frequencies = get_frequencies(&records, &FrequencyOptions::default());

    let columns: Vec<(&str, u64)> = frequencies
        .columns
        .iter()
        .map(|(k, v)| (k.as_str(), *v))
        .collect();
    assert_eq!(columns, vec![("c1", 2), ("c2", 1)]);

    assert_eq!(frequencies.tables.get("t1"), Some(&3));

    let queries: Vec<(&str, u64)> = frequencies
        .queries
        .iter()
        .map(|(k, v)| (k.as_str(), *v))
        .collect();
    assert_eq!(
        queries,
        vec![("SELECT c1 FROM t1", 2), ("SELECT c2 FROM t1", 1)]
    );
}

#[test]
fn test_get_frequencies_include_flags_are_independent() {
    let records = records(&["SELECT t1.c1 FROM t1"]);

    let no_tables = get_frequencies(
        &records,
        &FrequencyOptions {
            include_tables: false,
            include_columns: true,
        },
    );
    assert!(no_tables.tables.is_empty());
    assert_eq!(no_tables.columns.get("t1.c1"), Some(&1));
    assert_eq!(no_tables.queries.len(), 1);

    let no_columns = get_frequencies(
        &records,
        &FrequencyOptions {
            include_tables: true,
            include_columns: false,
        },
    );
    assert!(no_columns.columns.is_empty());
    assert_eq!(no_columns.tables.get("t1"), Some(&1));
    assert_eq!(no_columns.queries.len(), 1);
}

#[test]
fn test_get_frequencies_skips_bad_queries_but_counts_their_text() {
    let records = records(&[
        "SELECT t1.c1 FROM t1",
        "SELECT a.x FROM a; SELECT b.y FROM b;",
        "SELEC oops",
    ]);
    let frequencies = get_frequencies(&records, &FrequencyOptions::default());

    // Only the valid query contributed references...
    assert_eq!(frequencies.tables.len(), 1);
    assert_eq!(frequencies.columns.len(), 1);
    // ...but every input text is counted.
    assert_eq!(frequencies.queries.len(), 3);
}

#[test]
fn test_get_frequencies_sorting_is_stable_on_ties() {
    let records = records(&[
        "SELECT t2.x FROM t2",
        "SELECT t1.y FROM t1",
        "SELECT t1.y FROM t1",
        "SELECT t2.x FROM t2",
    ]);
    let frequencies = get_frequencies(&records, &FrequencyOptions::default());

    // Both tables tie at 2; t2 was discovered first.
    let tables: Vec<&str> = frequencies.tables.keys().map(String::as_str).collect();
    assert_eq!(tables, vec!["t2", "t1"]);

    // Counts are non-increasing.
    let counts: Vec<u64> = frequencies.tables.values().copied().collect();
    assert!(counts.windows(2).all(|w| w[0] >= w[1]));
}

// ============================================================================
// Unused-table detection
// ============================================================================

#[test]
fn test_find_unused_tables_complement() {
    let mut frequencies = Frequencies::default();
    frequencies.tables.insert("table1".to_string(), 1);

    let unused = find_unused_tables(&frequencies, &sample_database());
    assert_eq!(unused.len(), 1);
    assert_eq!(unused[0].name, "table2");
}

#[test]
fn test_find_unused_tables_empty_when_all_used() {
    let mut frequencies = Frequencies::default();
    frequencies.tables.insert("table1".to_string(), 2);
    frequencies.tables.insert("table2".to_string(), 1);

    let unused = find_unused_tables(&frequencies, &sample_database());
    assert!(unused.is_empty());
}

#[test]
fn test_find_unused_tables_traversal_order() {
    let frequencies = Frequencies::default();
    let unused = find_unused_tables(&frequencies, &sample_database());
    let names: Vec<&str> = unused.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["table1", "table2"]);
}

// ============================================================================
// Unused-column detection
// ============================================================================

#[test]
fn test_find_unused_columns_declared_minus_used() {
    let records = records(&["SELECT t1.c1, t1.c2 FROM t1"]);
    let unused = find_unused_columns(&records, &schema_t1());

    let mut expected = IndexMap::new();
    expected.insert("t1".to_string(), vec![Column::new("c3")]);
    assert_eq!(unused, expected);
}

#[test]
fn test_find_unused_columns_unreferenced_table_absent() {
    let records = records(&["SELECT column1 FROM db1.schema1.table1"]);
    let unused = find_unused_columns(&records, &sample_tables());

    assert!(unused.contains_key("table1"));
    assert!(!unused.contains_key("table2"));
    assert_eq!(
        unused.get("table1").unwrap(),
        &vec![Column::new("column2")]
    );
}

#[test]
fn test_find_unused_columns_all_used_maps_to_empty() {
    let records = records(&["SELECT t1.c1, t1.c2, t1.c3 FROM t1"]);
    let unused = find_unused_columns(&records, &schema_t1());
    assert_eq!(unused.get("t1").unwrap(), &Vec::<Column>::new());
}

#[test]
fn test_find_unused_columns_skips_failing_queries() {
    let records = records(&[
        "SELECT t1.c1 FROM t1",
        "SELECT ghost.c1 FROM ghost",
        "SELECT a.x FROM a; SELECT b.y FROM b;",
    ]);
    let unused = find_unused_columns(&records, &schema_t1());

    // Only the resolvable query contributes; the batch still completes.
    assert_eq!(unused.len(), 1);
    assert_eq!(
        unused.get("t1").unwrap(),
        &vec![Column::new("c2"), Column::new("c3")]
    );
}

// ============================================================================
// Time spent
// ============================================================================

#[test]
fn test_get_time_spent_sorted_descending() {
    let mut fast = QueryRecord::new("SELECT t1.c1 FROM t1");
    fast.start_time = chrono::DateTime::parse_from_rfc3339("2021-01-01T00:00:00Z").ok();
    fast.end_time = chrono::DateTime::parse_from_rfc3339("2021-01-01T00:00:01Z").ok();

    let mut slow = QueryRecord::new("SELECT t2.c2 FROM t2");
    slow.start_time = chrono::DateTime::parse_from_rfc3339("2021-01-01T00:00:00Z").ok();
    slow.end_time = chrono::DateTime::parse_from_rfc3339("2021-01-01T00:01:00Z").ok();

    let untimed = QueryRecord::new("SELECT t3.c3 FROM t3");

    let time_spent = get_time_spent(&[fast, slow, untimed]);
    let entries: Vec<(&str, f64)> = time_spent.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    assert_eq!(
        entries,
        vec![("SELECT t2.c2 FROM t2", 60.0), ("SELECT t1.c1 FROM t1", 1.0)]
    );
}

#[test]
fn test_get_time_spent_duplicate_text_keeps_last_duration() {
    let mut first = QueryRecord::new("SELECT t1.c1 FROM t1");
    first.start_time = chrono::DateTime::parse_from_rfc3339("2021-01-01T00:00:00Z").ok();
    first.end_time = chrono::DateTime::parse_from_rfc3339("2021-01-01T00:00:05Z").ok();

    let mut second = QueryRecord::new("SELECT t1.c1 FROM t1");
    second.start_time = chrono::DateTime::parse_from_rfc3339("2021-01-01T01:00:00Z").ok();
    second.end_time = chrono::DateTime::parse_from_rfc3339("2021-01-01T01:00:30Z").ok();

    let time_spent = get_time_spent(&[first, second]);
    assert_eq!(time_spent.len(), 1);
    assert_eq!(time_spent.get("SELECT t1.c1 FROM t1"), Some(&30.0));
}
