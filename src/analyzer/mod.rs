//! Query analysis: normalization, dimension resolution, batch aggregation

mod batch;
mod resolve;

pub use batch::{
    find_unused_columns, find_unused_tables, get_frequencies, get_time_spent, FrequencyOptions,
};
pub use resolve::{analyze, normalize, resolve};
