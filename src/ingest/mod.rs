//! Flat-file ingestion: schema descriptions and query logs
//!
//! The schema side consumes the flat table/column export shape
//! (DATABASE_NAME, SCHEMA_NAME, TABLE_NAME, COLUMN_NAME, DATA_TYPE) and
//! groups it into the hierarchical model. The query side consumes a log
//! export with QUERY_TEXT and optional START_TIME/END_TIME columns.

use std::path::Path;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use indexmap::IndexMap;
use serde::Deserialize;
use sqlparser::ast::Statement;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use tracing::debug;

use crate::analyzer::resolve;
use crate::error::SqlAuditError;
use crate::model::{Column, Database, QueryRecord, Schema, Table};

/// One row of the flat schema description.
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaRow {
    #[serde(rename = "DATABASE_NAME")]
    pub database: String,
    #[serde(rename = "SCHEMA_NAME")]
    pub schema: String,
    #[serde(rename = "TABLE_NAME")]
    pub table: String,
    #[serde(rename = "COLUMN_NAME")]
    pub column: String,
    #[serde(rename = "DATA_TYPE")]
    pub data_type: Option<String>,
}

/// One row of the query log export.
#[derive(Debug, Clone, Deserialize)]
struct QueryRow {
    #[serde(rename = "QUERY_TEXT")]
    query_text: String,
    #[serde(rename = "START_TIME", default)]
    start_time: Option<String>,
    #[serde(rename = "END_TIME", default)]
    end_time: Option<String>,
}

/// Group flat schema rows into databases.
///
/// Databases, schemas, tables, and columns are created in row order.
/// Repeated column rows for the same table are dropped; the first
/// occurrence's data type wins.
pub fn build_schema(rows: &[SchemaRow]) -> Vec<Database> {
    let mut databases: IndexMap<String, Database> = IndexMap::new();

    for row in rows {
        debug!(
            "Database: {}, Schema: {}, Table: {}, Column: {}",
            row.database, row.schema, row.table, row.column
        );

        let database = databases
            .entry(row.database.clone())
            .or_insert_with(|| Database::new(row.database.clone(), vec![]));

        let schema_idx = match database.schemas.iter().position(|s| s.name == row.schema) {
            Some(idx) => idx,
            None => {
                database.schemas.push(Schema::new(row.schema.clone(), vec![]));
                database.schemas.len() - 1
            }
        };
        let schema = &mut database.schemas[schema_idx];

        let table_idx = match schema.tables.iter().position(|t| t.name == row.table) {
            Some(idx) => idx,
            None => {
                schema.tables.push(Table::new(row.table.clone(), vec![]));
                schema.tables.len() - 1
            }
        };
        let table = &mut schema.tables[table_idx];

        if !table.columns.iter().any(|c| c.name == row.column) {
            table.columns.push(Column {
                name: row.column.clone(),
                data_type: row.data_type.clone(),
            });
        }
    }

    databases.into_values().collect()
}

/// Build a table list from SQL text, typically a DDL script.
///
/// Each CREATE TABLE statement contributes a table with its declared
/// columns and data types. Any other statement contributes the tables it
/// references, with the columns it uses standing in for declarations. When
/// several statements name the same table, the first one wins.
pub fn build_schema_from_sql(sql: &str) -> Result<Vec<Table>, SqlAuditError> {
    let statements = Parser::parse_sql(&GenericDialect {}, sql)?;

    let mut tables: Vec<Table> = Vec::new();
    for statement in statements {
        match statement {
            Statement::CreateTable(create) => {
                let name = create
                    .name
                    .0
                    .last()
                    .map(|i| i.value.clone())
                    .unwrap_or_default();
                debug!("Declared table: {name}");
                let columns = create
                    .columns
                    .iter()
                    .map(|def| Column::with_type(def.name.value.clone(), def.data_type.to_string()))
                    .collect();
                push_table(&mut tables, Table::new(name, columns));
            }
            other => {
                let data = resolve(&other.to_string(), None)?;
                for dimension in data.dimensions {
                    push_table(&mut tables, dimension.table);
                }
            }
        }
    }

    Ok(tables)
}

fn push_table(tables: &mut Vec<Table>, table: Table) {
    if !tables.iter().any(|t| t.name == table.name) {
        tables.push(table);
    }
}

/// Pick the database to audit: by name when given, otherwise the first one
/// the schema source describes.
pub fn select_database(databases: Vec<Database>, name: Option<&str>) -> Option<Database> {
    match name {
        Some(name) => databases.into_iter().find(|db| db.name == name),
        None => databases.into_iter().next(),
    }
}

/// Load and group a schema description CSV.
pub fn load_schema_csv(path: &Path) -> Result<Vec<Database>, SqlAuditError> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| {
        SqlAuditError::SchemaReadError {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let mut rows = Vec::new();
    for row in reader.deserialize() {
        let row: SchemaRow = row.map_err(|source| SqlAuditError::SchemaReadError {
            path: path.to_path_buf(),
            source,
        })?;
        rows.push(row);
    }

    Ok(build_schema(&rows))
}

/// Parse a log timestamp.
///
/// Accepts RFC 3339, the `2024-06-22 17:17:34.245 +0200` log shape, and
/// zone-less ISO timestamps (read as UTC).
pub fn parse_timestamp(value: &str) -> Result<DateTime<FixedOffset>, SqlAuditError> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(ts) => Ok(ts),
        Err(rfc3339_err) => DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f %z")
            .or_else(|_| {
                NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                    .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
                    .map(|naive| naive.and_utc().fixed_offset())
            })
            .map_err(|_| SqlAuditError::TimestampParseError {
                value: value.to_string(),
                source: rfc3339_err,
            }),
    }
}

fn parse_optional_timestamp(
    value: Option<String>,
) -> Result<Option<DateTime<FixedOffset>>, SqlAuditError> {
    match value.as_deref() {
        None | Some("") => Ok(None),
        Some(raw) => parse_timestamp(raw).map(Some),
    }
}

/// Load a query log CSV into records.
pub fn load_queries_csv(path: &Path) -> Result<Vec<QueryRecord>, SqlAuditError> {
    let mut reader = csv::Reader::from_path(path).map_err(|source| {
        SqlAuditError::QueryLogReadError {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let mut records = Vec::new();
    for row in reader.deserialize() {
        let row: QueryRow = row.map_err(|source| SqlAuditError::QueryLogReadError {
            path: path.to_path_buf(),
            source,
        })?;
        records.push(QueryRecord {
            text: row.query_text,
            start_time: parse_optional_timestamp(row.start_time)?,
            end_time: parse_optional_timestamp(row.end_time)?,
        });
    }

    Ok(records)
}
