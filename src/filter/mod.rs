//! Filter composition
//!
//! Active filter clauses, their URL form (`field.operator=value`) and their
//! backend form (`filter[field][operator]=value`).

mod clause;
mod composer;

pub use clause::*;
pub use composer::*;
