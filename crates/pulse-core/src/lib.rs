pub mod activity;
pub mod cache;
pub mod config;
pub mod detail;
pub mod discovery;
pub mod error;
pub mod executor;
pub mod io;
pub mod normalize;
pub mod paths;
pub mod queries;
pub mod reconcile;
pub mod records;
pub mod scanner;
pub mod types;
pub mod window;
pub mod workspace;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{PulseError, Result};
