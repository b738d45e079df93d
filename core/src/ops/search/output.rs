//! Search results

use serde::{Deserialize, Serialize};

use crate::infra::db::entities::{script, tag};

/// One page of results plus the totals needed to page through the rest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
	pub items: Vec<T>,
	pub total: u64,
	pub page: u64,
	pub page_size: u64,
	pub total_pages: u64,
}

impl<T> Page<T> {
	pub fn new(items: Vec<T>, total: u64, page: u64, page_size: u64) -> Self {
		Self {
			items,
			total,
			page,
			page_size,
			total_pages: total.div_ceil(page_size.max(1)),
		}
	}

	pub fn empty(page: u64, page_size: u64) -> Self {
		Self::new(Vec::new(), 0, page, page_size)
	}

	pub fn has_next(&self) -> bool {
		self.page < self.total_pages
	}

	pub fn has_previous(&self) -> bool {
		self.page > 1
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptHit {
	pub script: script::Model,
	pub tags: Vec<tag::Model>,
	/// Present for ranked searches
	pub score: Option<f32>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn total_pages_rounds_up() {
		let page: Page<u8> = Page::new(vec![1, 2], 41, 3, 20);
		assert_eq!(page.total_pages, 3);
		assert!(!page.has_next());
		assert!(page.has_previous());
		assert_eq!(Page::<u8>::empty(1, 20).total_pages, 0);
	}
}
