//! Script store operations

pub mod associations;
pub mod copy;
pub mod input;
pub mod manager;

pub use input::{CreateScriptInput, UpdateScriptInput};
pub use manager::ScriptManager;
