//! Inputs for script store operations

use serde::{Deserialize, Serialize};

use crate::domain::ScriptType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateScriptInput {
	pub title: String,
	pub content: String,
	pub script_type: ScriptType,
	#[serde(default)]
	pub tag_ids: Vec<i32>,
	#[serde(default)]
	pub sort_order: i32,
}

impl CreateScriptInput {
	pub fn new(title: impl Into<String>, content: impl Into<String>, script_type: ScriptType) -> Self {
		Self {
			title: title.into(),
			content: content.into(),
			script_type,
			tag_ids: Vec::new(),
			sort_order: 0,
		}
	}

	pub fn with_tags(mut self, tag_ids: impl IntoIterator<Item = i32>) -> Self {
		self.tag_ids = tag_ids.into_iter().collect();
		self
	}

	pub fn with_sort_order(mut self, sort_order: i32) -> Self {
		self.sort_order = sort_order;
		self
	}
}

/// Changes to one version row; `None` leaves the field untouched.
///
/// `tag_ids` replaces the whole tag set when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateScriptInput {
	pub title: Option<String>,
	pub content: Option<String>,
	pub script_type: Option<ScriptType>,
	pub tag_ids: Option<Vec<i32>>,
	pub is_active: Option<bool>,
	pub sort_order: Option<i32>,
}

impl UpdateScriptInput {
	pub fn content(content: impl Into<String>) -> Self {
		Self {
			content: Some(content.into()),
			..Self::default()
		}
	}

	pub fn tags(tag_ids: impl IntoIterator<Item = i32>) -> Self {
		Self {
			tag_ids: Some(tag_ids.into_iter().collect()),
			..Self::default()
		}
	}

	pub fn is_empty(&self) -> bool {
		self.title.is_none()
			&& self.content.is_none()
			&& self.script_type.is_none()
			&& self.tag_ids.is_none()
			&& self.is_active.is_none()
			&& self.sort_order.is_none()
	}
}
