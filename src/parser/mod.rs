//! SQL reference extraction

mod extract;

pub use extract::{extract, QueryReferences};
