//! Table rendering
//!
//! Column descriptors, the named cell-renderer table and the renderer that
//! produces header, body and pagination for list views.

mod column;
mod renderer;
mod renderers;

pub use column::*;
pub use renderer::*;
pub use renderers::*;
