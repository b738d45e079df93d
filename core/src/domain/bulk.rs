//! Reports for operations that keep going past per-item failures

use serde::{Deserialize, Serialize};

/// What a bulk create made, and why each rejected item failed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkCreateReport<T> {
	pub created: Vec<T>,
	pub errors: Vec<BulkCreateError>,
}

impl<T> Default for BulkCreateReport<T> {
	fn default() -> Self {
		Self {
			created: Vec::new(),
			errors: Vec::new(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkCreateError {
	/// Tag name or script title of the rejected item
	pub name: String,
	pub message: String,
}
