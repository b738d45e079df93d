//! Inputs for tag store operations

use serde::{Deserialize, Serialize};

use crate::common::Result;
use crate::domain::Validator;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTagInput {
	pub name: String,
	pub description: Option<String>,
	pub parent_id: Option<i32>,
	pub sort_order: Option<i32>,
}

impl CreateTagInput {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			..Self::default()
		}
	}

	pub fn with_parent(mut self, parent_id: i32) -> Self {
		self.parent_id = Some(parent_id);
		self
	}

	pub fn with_description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());
		self
	}

	pub fn with_sort_order(mut self, sort_order: i32) -> Self {
		self.sort_order = Some(sort_order);
		self
	}

	/// Validate and return the normalized `(name, description)` pair
	pub fn normalized(&self) -> Result<(String, String)> {
		let name = Validator::normalize_tag_name(&self.name)?;
		let description =
			Validator::normalize_tag_description(self.description.as_deref().unwrap_or(""))?;
		Ok((name, description))
	}
}

/// Partial update; `None` leaves the field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTagInput {
	pub name: Option<String>,
	pub description: Option<String>,
	pub sort_order: Option<i32>,
}

impl UpdateTagInput {
	pub fn rename(name: impl Into<String>) -> Self {
		Self {
			name: Some(name.into()),
			..Self::default()
		}
	}

	pub fn is_empty(&self) -> bool {
		self.name.is_none() && self.description.is_none() && self.sort_order.is_none()
	}
}
