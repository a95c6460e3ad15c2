pub mod aggregate;
pub mod align;
pub mod error;
pub mod granularity;
pub mod interval;
pub mod metric;
pub mod pivot;
pub mod usage;
pub mod weather;

#[cfg(test)]
pub mod fixtures;
