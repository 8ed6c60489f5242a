//! Dashboard views
//!
//! Views combine the URL state, the API client and the table renderer
//! into the screens the CLI shows.

mod device_detail;
mod device_list;

pub use device_detail::*;
pub use device_list::*;
