//! SeaORM entities

pub mod script;
pub mod script_tag;
pub mod tag;
