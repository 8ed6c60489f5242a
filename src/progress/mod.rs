//! Progress feedback module
//!
//! Terminal spinner shown while requests are in flight.

mod spinner;

pub use spinner::*;
