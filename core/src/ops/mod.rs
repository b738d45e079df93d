//! Store operations

pub mod scripts;
pub mod search;
pub mod tags;
