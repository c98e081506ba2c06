//! Query normalization and dimension resolution

use std::collections::BTreeMap;

use crate::error::SqlAuditError;
use crate::model::{Column, Dimension, QueryData, Table};
use crate::parser::{self, QueryReferences};

/// Trim the query and collapse embedded newlines to single spaces.
///
/// The result is the canonical key used for per-query de-duplication.
/// Idempotent.
pub fn normalize(text: &str) -> String {
    text.trim().replace('\n', " ")
}

/// Reject multi-statement input. A single trailing separator is fine.
fn ensure_single_statement(text: &str) -> Result<(), SqlAuditError> {
    if text.matches(';').count() > 1 {
        return Err(SqlAuditError::InvalidInputError {
            message: "only one statement per input is supported".to_string(),
        });
    }
    Ok(())
}

/// Normalize, validate, and extract raw table/column references.
///
/// This is the lightweight analysis path used for frequency counting; it
/// does not consult any schema.
pub fn analyze(query_text: &str) -> Result<QueryReferences, SqlAuditError> {
    ensure_single_statement(query_text)?;
    parser::extract(&normalize(query_text))
}

/// Split one extracted column reference into (table, column).
///
/// Qualified references must have exactly two parts. An unqualified
/// reference is attributed to the statement's sole table; when the
/// statement references zero or several tables there is no defensible
/// attribution and the reference is malformed.
fn split_reference<'a>(
    reference: &'a str,
    tables: &'a [String],
) -> Result<(&'a str, &'a str), SqlAuditError> {
    if reference.contains('.') {
        let mut parts = reference.split('.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(table), Some(column), None) => Ok((table, column)),
            _ => Err(SqlAuditError::MalformedReferenceError {
                reference: reference.to_string(),
            }),
        }
    } else if let [table] = tables {
        Ok((table.as_str(), reference))
    } else {
        Err(SqlAuditError::MalformedReferenceError {
            reference: reference.to_string(),
        })
    }
}

/// Resolve one query into per-table dimensions.
///
/// With `schema_tables` provided, each referenced table must exist in the
/// schema ([`SqlAuditError::UnknownTableError`] otherwise) and the dimension
/// carries the declared table. Without a schema, a table is synthesized
/// from the used columns. Dimensions come back sorted by table name;
/// duplicate column mentions within the query are preserved in
/// `used_columns`.
pub fn resolve(
    query_text: &str,
    schema_tables: Option<&[Table]>,
) -> Result<QueryData, SqlAuditError> {
    ensure_single_statement(query_text)?;
    let normalized = normalize(query_text);
    let refs = parser::extract(&normalized)?;

    // BTreeMap keys give the ascending table-name ordering of the output.
    let mut used_by_table: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for reference in &refs.columns {
        let (table, column) = split_reference(reference, &refs.tables)?;
        used_by_table
            .entry(table.to_string())
            .or_default()
            .push(column.to_string());
    }

    let mut dimensions = Vec::with_capacity(used_by_table.len());
    for (table_name, used) in used_by_table {
        let table = match schema_tables {
            Some(tables) => tables
                .iter()
                .find(|t| t.name == table_name)
                .cloned()
                .ok_or_else(|| SqlAuditError::UnknownTableError {
                    table: table_name.clone(),
                })?,
            None => {
                // Synthesized declared columns stay unique even when the
                // query mentions a column more than once.
                let mut declared: Vec<Column> = Vec::new();
                for name in &used {
                    if !declared.iter().any(|c| &c.name == name) {
                        declared.push(Column::new(name.clone()));
                    }
                }
                Table::new(table_name.clone(), declared)
            }
        };
        let used_columns = used.into_iter().map(Column::new).collect();
        dimensions.push(Dimension {
            table,
            used_columns,
        });
    }

    Ok(QueryData {
        normalized_query: normalized,
        dimensions,
    })
}
