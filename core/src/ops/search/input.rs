//! Inputs for script and tag search

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{CoreError, Result};
use crate::config::SearchConfig;
use crate::domain::ScriptType;

/// How several tag ids combine in a filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagMatchMode {
	/// Script carries every listed tag
	#[default]
	All,
	/// Script carries at least one listed tag
	Any,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
	/// Filter, then order by the sort options
	#[default]
	Plain,
	/// Order keyword matches by relevance, title hits above content hits
	Ranked,
}

/// Which rows by active flag. Anything but `Active` needs a view permission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
	#[default]
	Active,
	Inactive,
	All,
}

impl StatusFilter {
	pub fn includes_inactive(&self) -> bool {
		!matches!(self, Self::Active)
	}

	pub fn as_flag(&self) -> Option<bool> {
		match self {
			Self::Active => Some(true),
			Self::Inactive => Some(false),
			Self::All => None,
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
	#[default]
	CreatedAt,
	UpdatedAt,
	SortOrder,
	Title,
	Version,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
	Asc,
	#[default]
	Desc,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOptions {
	pub field: SortField,
	pub direction: SortDirection,
}

/// 1-based page request. `page_size` falls back to the configured default
/// and is capped at the configured maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
	pub page: u64,
	pub page_size: Option<u64>,
}

impl Default for Pagination {
	fn default() -> Self {
		Self {
			page: 1,
			page_size: None,
		}
	}
}

/// A resolved page request. `offset` is known to fit a SQL `OFFSET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
	pub page: u64,
	pub page_size: u64,
	pub offset: u64,
}

impl Pagination {
	pub fn new(page: u64, page_size: u64) -> Self {
		Self {
			page,
			page_size: Some(page_size),
		}
	}

	/// Effective page, page size and row offset
	pub fn resolve(&self, config: &SearchConfig) -> Result<PageWindow> {
		if self.page == 0 {
			return Err(CoreError::validation("page", "pages start at 1"));
		}
		let page_size = match self.page_size {
			Some(0) => return Err(CoreError::validation("page_size", "must be positive")),
			Some(size) => size.min(config.max_page_size),
			None => config.default_page_size,
		};

		let offset = (self.page - 1)
			.checked_mul(page_size)
			.filter(|offset| i64::try_from(*offset).is_ok())
			.ok_or_else(|| CoreError::validation("page", "page number is out of range"))?;

		Ok(PageWindow {
			page: self.page,
			page_size,
			offset,
		})
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptSearchInput {
	/// Matched against title and content
	pub keyword: Option<String>,

	#[serde(default)]
	pub tag_ids: Vec<i32>,

	/// Defaults to the configured match mode
	pub tag_match: Option<TagMatchMode>,

	pub script_type: Option<ScriptType>,

	#[serde(default)]
	pub status: StatusFilter,

	pub created_after: Option<DateTime<Utc>>,
	pub created_before: Option<DateTime<Utc>>,

	/// Only the highest active version of each title
	#[serde(default)]
	pub current_only: bool,

	#[serde(default)]
	pub mode: SearchMode,

	#[serde(default)]
	pub sort: SortOptions,

	#[serde(default)]
	pub pagination: Pagination,
}

impl ScriptSearchInput {
	pub fn keyword(keyword: impl Into<String>) -> Self {
		Self {
			keyword: Some(keyword.into()),
			..Self::default()
		}
	}

	pub fn tagged(tag_ids: impl IntoIterator<Item = i32>, mode: TagMatchMode) -> Self {
		Self {
			tag_ids: tag_ids.into_iter().collect(),
			tag_match: Some(mode),
			..Self::default()
		}
	}

	/// Trimmed keyword, `None` when blank
	pub fn normalized_keyword(&self) -> Option<&str> {
		self.keyword
			.as_deref()
			.map(str::trim)
			.filter(|k| !k.is_empty())
	}

	pub fn validate(&self) -> Result<()> {
		if let (Some(after), Some(before)) = (self.created_after, self.created_before) {
			if after > before {
				return Err(CoreError::validation(
					"created_after",
					"must not be later than created_before",
				));
			}
		}
		if self.mode == SearchMode::Ranked && self.normalized_keyword().is_none() {
			return Err(CoreError::validation(
				"keyword",
				"ranked search needs a keyword",
			));
		}
		Ok(())
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagSearchInput {
	/// Matched against name and description
	pub keyword: Option<String>,

	#[serde(default)]
	pub status: StatusFilter,

	/// Restrict to direct children of this tag
	pub parent_id: Option<i32>,

	/// Restrict to tags without a parent
	#[serde(default)]
	pub roots_only: bool,

	#[serde(default)]
	pub pagination: Pagination,
}

impl TagSearchInput {
	pub fn validate(&self) -> Result<()> {
		if self.roots_only && self.parent_id.is_some() {
			return Err(CoreError::validation(
				"parent_id",
				"cannot combine a parent filter with roots_only",
			));
		}
		Ok(())
	}
}
