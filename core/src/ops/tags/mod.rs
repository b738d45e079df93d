//! Tag store operations

pub mod hierarchy;
pub mod input;
pub mod manager;

pub use input::{CreateTagInput, UpdateTagInput};
pub use manager::TagManager;
