//! Front composition services.

pub mod conditions;
pub mod error;
pub mod front;
pub mod manager;
pub mod placements;
pub mod repos;
