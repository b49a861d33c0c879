//! Schema module - Configuration types for flow transport jobs.

mod config;
mod dataset;

pub use config::*;
pub use dataset::*;
