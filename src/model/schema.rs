//! Reference schema representation: Database -> Schema -> Table -> Column
//!
//! All four entities compare and hash by name alone. Two columns with the
//! same name in different tables are equal under this model; callers that
//! need cross-table disambiguation must key by (table name, column name)
//! themselves.

use std::hash::{Hash, Hasher};

/// A column in a table. Equality and hashing ignore `data_type`.
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    /// Declared type, when the schema source provides one.
    pub data_type: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
        }
    }

    pub fn with_type(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: Some(data_type.into()),
        }
    }
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Column {}

impl Hash for Column {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// A table and its declared columns.
///
/// The column list is empty when the schema is unknown and the table was
/// synthesized from query references alone.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Look up a declared column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Table {}

impl Hash for Table {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// A named schema grouping tables.
#[derive(Debug, Clone)]
pub struct Schema {
    pub name: String,
    pub tables: Vec<Table>,
}

impl Schema {
    pub fn new(name: impl Into<String>, tables: Vec<Table>) -> Self {
        Self {
            name: name.into(),
            tables,
        }
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Schema {}

/// A database: the root of the reference schema.
#[derive(Debug, Clone)]
pub struct Database {
    pub name: String,
    pub schemas: Vec<Schema>,
}

impl Database {
    pub fn new(name: impl Into<String>, schemas: Vec<Schema>) -> Self {
        Self {
            name: name.into(),
            schemas,
        }
    }

    /// Iterate every table in every schema, in traversal order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.schemas.iter().flat_map(|s| s.tables.iter())
    }
}

impl PartialEq for Database {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Database {}
