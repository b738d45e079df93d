//! Tag listing, keyword search and name suggestions

use std::sync::Arc;

use sea_orm::{
	ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
	QueryOrder, QuerySelect,
};

use super::input::{StatusFilter, TagSearchInput};
use super::output::Page;
use super::pattern::contains_pattern;
use crate::common::Result;
use crate::config::SearchConfig;
use crate::infra::access::{Actor, Permission};
use crate::infra::db::entities::tag;

#[derive(Clone)]
pub struct TagSearch {
	db: Arc<DatabaseConnection>,
	config: SearchConfig,
}

impl TagSearch {
	pub fn new(db: Arc<DatabaseConnection>, config: SearchConfig) -> Self {
		Self { db, config }
	}

	/// Ordered by sort order descending, then name
	pub async fn search(&self, input: &TagSearchInput, actor: &Actor) -> Result<Page<tag::Model>> {
		input.validate()?;
		if input.status.includes_inactive() {
			actor.require(Permission::ViewInactiveTags)?;
		}

		let window = input.pagination.resolve(&self.config)?;
		let db = &*self.db;

		let mut condition = Condition::all();
		if let Some(active) = input.status.as_flag() {
			condition = condition.add(tag::Column::IsActive.eq(active));
		}
		if let Some(keyword) = input.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
			condition = condition.add(
				Condition::any()
					.add(tag::Column::Name.like(contains_pattern(keyword)))
					.add(tag::Column::Description.like(contains_pattern(keyword))),
			);
		}
		if let Some(parent_id) = input.parent_id {
			condition = condition.add(tag::Column::ParentId.eq(parent_id));
		}
		if input.roots_only {
			condition = condition.add(tag::Column::ParentId.is_null());
		}

		let query = tag::Entity::find().filter(condition);
		let total = query.clone().count(db).await?;

		let items = query
			.order_by_desc(tag::Column::SortOrder)
			.order_by_asc(tag::Column::Name)
			.order_by_asc(tag::Column::Id)
			.offset(window.offset)
			.limit(window.page_size)
			.all(db)
			.await?;

		Ok(Page::new(items, total, window.page, window.page_size))
	}

	/// Names containing `keyword`, for type-ahead. Inactive tags only show up
	/// for actors allowed to see them.
	pub async fn suggestions(&self, keyword: &str, actor: &Actor) -> Result<Vec<String>> {
		let keyword = keyword.trim();
		if keyword.is_empty() {
			return Ok(Vec::new());
		}

		let status = if actor.has(Permission::ViewInactiveTags) {
			StatusFilter::All
		} else {
			StatusFilter::Active
		};

		let mut query = tag::Entity::find().filter(tag::Column::Name.like(contains_pattern(keyword)));
		if let Some(active) = status.as_flag() {
			query = query.filter(tag::Column::IsActive.eq(active));
		}

		let tags = query
			.order_by_asc(tag::Column::Name)
			.limit(self.config.suggestion_limit)
			.all(&*self.db)
			.await?;

		Ok(tags.into_iter().map(|t| t.name).collect())
	}
}
