//! sqlaudit: schema-usage analysis over SQL query logs
//!
//! This library parses a corpus of executed SQL query texts, counts which
//! tables and columns they reference, and reconciles the counts against a
//! declared database schema to report the tables and columns the corpus
//! never touches.

pub mod analyzer;
pub mod error;
pub mod ingest;
pub mod model;
pub mod parser;
pub mod report;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use indexmap::IndexMap;

use model::{Column, Database, Frequencies, Table};

pub use error::SqlAuditError;

/// Options for a full audit run
#[derive(Debug, Clone)]
pub struct AuditOptions {
    /// Path to the query log CSV
    pub queries_path: PathBuf,
    /// Path to the flat schema description CSV, when a reference schema is
    /// available
    pub schema_path: Option<PathBuf>,
    /// Database to audit when the schema file describes several (defaults
    /// to the first one)
    pub database: Option<String>,
    /// Enable verbose output
    pub verbose: bool,
}

/// Everything one audit run produces
#[derive(Debug, Clone)]
pub struct AuditReport {
    pub frequencies: Frequencies,
    /// The audited database, when a schema was supplied
    pub database: Option<Database>,
    pub unused_tables: Vec<Table>,
    pub unused_columns: IndexMap<String, Vec<Column>>,
}

/// Run a full audit: load inputs, aggregate frequencies, and reconcile
/// against the reference schema when one is supplied.
pub fn run_audit(options: AuditOptions) -> Result<AuditReport> {
    if options.verbose {
        println!("Reading query log: {}", options.queries_path.display());
    }

    // Step 1: Load the query log
    let records = ingest::load_queries_csv(&options.queries_path)?;

    if options.verbose {
        println!("Loaded {} query records", records.len());
    }

    // Step 2: Aggregate usage frequencies
    let frequencies = analyzer::get_frequencies(&records, &analyzer::FrequencyOptions::default());

    if options.verbose {
        println!(
            "Counted {} distinct tables, {} distinct columns",
            frequencies.tables.len(),
            frequencies.columns.len()
        );
    }

    // Step 3: Reconcile against the reference schema, when supplied
    let Some(schema_path) = &options.schema_path else {
        return Ok(AuditReport {
            frequencies,
            database: None,
            unused_tables: vec![],
            unused_columns: IndexMap::new(),
        });
    };

    let databases = ingest::load_schema_csv(schema_path)?;
    let database = ingest::select_database(databases, options.database.as_deref()).ok_or_else(
        || match &options.database {
            Some(name) => anyhow!("database {name} not found in {}", schema_path.display()),
            None => anyhow!("schema file {} is empty", schema_path.display()),
        },
    )?;

    if options.verbose {
        println!(
            "Auditing database {} ({} schemas)",
            database.name,
            database.schemas.len()
        );
    }

    let unused_tables = analyzer::find_unused_tables(&frequencies, &database);
    let schema_tables: Vec<Table> = database.tables().cloned().collect();
    let unused_columns = analyzer::find_unused_columns(&records, &schema_tables);

    Ok(AuditReport {
        frequencies,
        database: Some(database),
        unused_tables,
        unused_columns,
    })
}
