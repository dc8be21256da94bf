pub mod config;
pub mod error;
pub mod types;

pub use config::ClientConfig;
pub use error::ConfigError;
pub use types::{Record, RecordKey, merge_patch, param_string};
