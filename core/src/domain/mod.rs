//! Domain types shared by the stores

pub mod bulk;
pub mod script;
pub mod tag;
pub mod validation;

pub use bulk::{BulkCreateError, BulkCreateReport};
pub use script::{ScriptDetail, ScriptType};
pub use tag::{TagNode, TagUsage, TagUsageStats};
pub use validation::Validator;
