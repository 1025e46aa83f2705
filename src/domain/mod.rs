//! Domain layer types and invariants.

pub mod entities;
pub mod error;
pub mod fronts;
pub mod items;
pub mod query;
pub mod slug;
