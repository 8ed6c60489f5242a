//! Configuration module for NetDash
//!
//! Command-line arguments, the JSON config file and the resolved runtime
//! settings handed to the API client and query cache.

mod settings;

pub use settings::*;
