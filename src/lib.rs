// Record routing and writing
pub mod accumulator;
pub mod channel;
pub mod decoder;
pub mod executor;
pub mod grouper;
pub mod sink;
pub mod statement;
pub mod template;

// Configuration and database boundary
pub mod config;
pub mod db;
pub mod db_types;
pub mod error;
pub mod security;

#[cfg(test)]
mod test_support;

pub use config::{SinkConfig, SinkSettings};
pub use error::{Result, SinkError};
pub use sink::{SinkStats, SqlSink};
