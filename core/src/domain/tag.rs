//! Tag read models: tree nodes and usage figures

use serde::{Deserialize, Serialize};

use crate::infra::db::entities::tag;

/// A tag with its children, as returned by the tree query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagNode {
	pub tag: tag::Model,
	pub children: Vec<TagNode>,
}

impl TagNode {
	/// Depth-first walk including `self`
	pub fn flatten(&self) -> Vec<&tag::Model> {
		let mut out = Vec::new();
		let mut stack = vec![self];
		while let Some(node) = stack.pop() {
			out.push(&node.tag);
			stack.extend(node.children.iter().rev());
		}
		out
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagUsage {
	pub tag_id: i32,
	pub name: String,
	pub is_active: bool,
	/// Associated active scripts
	pub usage_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagUsageStats {
	pub total_tags: u64,
	pub active_tags: u64,
	pub unused_tags: u64,
	/// Sorted by usage descending, then name
	pub usage: Vec<TagUsage>,
}
