//! SQL reference extraction using sqlparser-rs
//!
//! Walks a single parsed statement and reports which tables and columns it
//! references. This is a lexical/AST-level extraction: no SQL is executed
//! and no type information is consulted.

use std::collections::HashMap;
use std::ops::ControlFlow;

use indexmap::IndexSet;
use sqlparser::ast::{Expr, ObjectName, TableFactor, Visit, Visitor};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::error::SqlAuditError;

/// Tables and columns referenced by one SQL statement.
///
/// `tables` holds each distinct table once, in first-mention order.
/// `columns` holds every mention, in source order: qualified references as
/// `table.column` (aliases resolved to their relation name where known) and
/// unqualified references as the bare column name. Wildcard projections
/// contribute no column references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryReferences {
    pub tables: Vec<String>,
    pub columns: Vec<String>,
}

/// Extract the last identifier value from an ObjectName.
///
/// ObjectName is a Vec<Ident> representing qualified names like
/// db1.schema1.table1. Returns the final component.
fn from_object_name(name: &ObjectName) -> String {
    name.0.last().map(|i| i.value.clone()).unwrap_or_default()
}

struct ReferenceCollector {
    tables: IndexSet<String>,
    /// Alias -> relation name, from FROM/JOIN clauses.
    aliases: HashMap<String, String>,
    /// (qualifier, column) pairs in source order; qualifier still unresolved.
    raw_columns: Vec<(Option<String>, String)>,
}

impl Visitor for ReferenceCollector {
    type Break = ();

    fn pre_visit_table_factor(&mut self, table_factor: &TableFactor) -> ControlFlow<()> {
        if let TableFactor::Table { name, alias, .. } = table_factor {
            let table = from_object_name(name);
            if !table.is_empty() {
                if let Some(alias) = alias {
                    self.aliases.insert(alias.name.value.clone(), table.clone());
                }
                self.tables.insert(table);
            }
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<()> {
        match expr {
            Expr::Identifier(ident) => {
                self.raw_columns.push((None, ident.value.clone()));
            }
            Expr::CompoundIdentifier(parts) if parts.len() >= 2 => {
                let column = parts[parts.len() - 1].value.clone();
                let qualifier = parts[parts.len() - 2].value.clone();
                self.raw_columns.push((Some(qualifier), column));
            }
            _ => {}
        }
        ControlFlow::Continue(())
    }
}

/// Extract table and column references from a single SQL statement.
///
/// Deterministic for identical input. Parse failures surface as
/// [`SqlAuditError::SqlParseError`] so batch callers can classify them as a
/// skip-this-query condition.
pub fn extract(sql: &str) -> Result<QueryReferences, SqlAuditError> {
    let statements = Parser::parse_sql(&GenericDialect {}, sql)?;

    let mut collector = ReferenceCollector {
        tables: IndexSet::new(),
        aliases: HashMap::new(),
        raw_columns: Vec::new(),
    };
    for statement in &statements {
        let flow = statement.visit(&mut collector);
        debug_assert!(flow.is_continue());
    }

    let columns = collector
        .raw_columns
        .into_iter()
        .map(|(qualifier, column)| match qualifier {
            Some(q) => {
                let table = collector.aliases.get(&q).cloned().unwrap_or(q);
                format!("{table}.{column}")
            }
            None => column,
        })
        .collect();

    Ok(QueryReferences {
        tables: collector.tables.into_iter().collect(),
        columns,
    })
}
