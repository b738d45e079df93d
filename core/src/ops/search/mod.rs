//! Script and tag search

pub mod input;
pub mod output;
pub mod pattern;
pub mod query;
pub mod sorting;
pub mod tags;

pub use input::{
	PageWindow, Pagination, ScriptSearchInput, SearchMode, SortDirection, SortField, SortOptions,
	StatusFilter, TagMatchMode, TagSearchInput,
};
pub use output::{Page, ScriptHit};
pub use query::ScriptSearch;
pub use sorting::{RelevanceCalculator, ScriptRanker};
pub use tags::TagSearch;
