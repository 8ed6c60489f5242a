//! Query cache layer
//!
//! Response cache with request de-duplication, stale-while-revalidate,
//! retry with backoff, cancellation of abandoned requests and optimistic
//! mutations.

mod cache;
mod key;
mod mutation;
mod retry;

pub use cache::*;
pub use key::*;
pub use mutation::*;
pub use retry::*;
