//! URL state management
//!
//! Reads and writes pagination, sort, search and filter parameters to and
//! from the query string, with browser-like history.

mod manager;
mod query_string;
mod state;

pub use manager::*;
pub use query_string::*;
pub use state::*;
