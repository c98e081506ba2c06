//! In-memory data model: reference schema and query-side values

mod query;
mod schema;

pub use query::{Dimension, Frequencies, QueryData, QueryRecord};
pub use schema::{Column, Database, Schema, Table};
