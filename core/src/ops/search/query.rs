//! Script search
//!
//! Filters run in SQL. Tag membership and "current version only" are
//! resolved to id sets first and applied as `id IN (...)`. Ranked mode scores
//! the keyword matches in process, so CJK text ranks the same as ASCII.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sea_orm::{
	ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
	QuerySelect,
};
use tracing::debug;

use super::input::{ScriptSearchInput, SearchMode, TagMatchMode};
use super::output::{Page, ScriptHit};
use super::pattern::contains_pattern;
use super::sorting::{apply_script_sort, ScriptRanker};
use crate::common::Result;
use crate::config::SearchConfig;
use crate::infra::access::{Actor, Permission};
use crate::infra::db::entities::{script, script_tag};
use crate::ops::scripts::associations::load_tags_for;

#[derive(Clone)]
pub struct ScriptSearch {
	db: Arc<DatabaseConnection>,
	config: SearchConfig,
}

impl ScriptSearch {
	pub fn new(db: Arc<DatabaseConnection>, config: SearchConfig) -> Self {
		Self { db, config }
	}

	pub async fn search(&self, input: &ScriptSearchInput, actor: &Actor) -> Result<Page<ScriptHit>> {
		input.validate()?;
		if input.status.includes_inactive() {
			actor.require(Permission::ViewInactiveScripts)?;
		}

		let window = input.pagination.resolve(&self.config)?;
		let db = &*self.db;

		let Some(condition) = self.build_condition(input).await? else {
			debug!("id restrictions left nothing to match");
			return Ok(Page::empty(window.page, window.page_size));
		};

		let query = script::Entity::find().filter(condition);

		match (input.mode, input.normalized_keyword()) {
			(SearchMode::Ranked, Some(keyword)) => {
				let ranker =
					ScriptRanker::new(keyword, self.config.title_weight, self.config.content_weight);

				let mut ranked: Vec<(f32, script::Model)> = query
					.all(db)
					.await?
					.into_iter()
					.map(|s| (ranker.rank(&s), s))
					.collect();
				ranked.sort_by(ScriptRanker::order);

				let total = ranked.len() as u64;
				let start = usize::try_from(window.offset.min(total)).unwrap_or(usize::MAX);
				let take = usize::try_from(window.page_size).unwrap_or(usize::MAX);
				let slice: Vec<(f32, script::Model)> =
					ranked.into_iter().skip(start).take(take).collect();

				let ids: Vec<i32> = slice.iter().map(|(_, s)| s.id).collect();
				let mut tags = load_tags_for(db, &ids).await?;
				let items = slice
					.into_iter()
					.map(|(score, script)| ScriptHit {
						tags: tags.remove(&script.id).unwrap_or_default(),
						script,
						score: Some(score),
					})
					.collect();

				Ok(Page::new(items, total, window.page, window.page_size))
			}
			_ => {
				let total = query.clone().count(db).await?;

				let scripts = apply_script_sort(query, &input.sort)
					.offset(window.offset)
					.limit(window.page_size)
					.all(db)
					.await?;

				let ids: Vec<i32> = scripts.iter().map(|s| s.id).collect();
				let mut tags = load_tags_for(db, &ids).await?;
				let items = scripts
					.into_iter()
					.map(|script| ScriptHit {
						tags: tags.remove(&script.id).unwrap_or_default(),
						script,
						score: None,
					})
					.collect();

				Ok(Page::new(items, total, window.page, window.page_size))
			}
		}
	}

	/// `None` when an id restriction already rules out every row
	async fn build_condition(&self, input: &ScriptSearchInput) -> Result<Option<Condition>> {
		let mut condition = Condition::all();

		if let Some(active) = input.status.as_flag() {
			condition = condition.add(script::Column::IsActive.eq(active));
		}

		if let Some(keyword) = input.normalized_keyword() {
			condition = condition.add(
				Condition::any()
					.add(script::Column::Title.like(contains_pattern(keyword)))
					.add(script::Column::Content.like(contains_pattern(keyword))),
			);
		}

		if let Some(script_type) = input.script_type {
			condition = condition.add(script::Column::ScriptType.eq(script_type.to_string()));
		}
		if let Some(after) = input.created_after {
			condition = condition.add(script::Column::CreatedAt.gte(after));
		}
		if let Some(before) = input.created_before {
			condition = condition.add(script::Column::CreatedAt.lte(before));
		}

		let mut allowed: Option<HashSet<i32>> = None;

		if !input.tag_ids.is_empty() {
			let mode = input.tag_match.unwrap_or(self.config.default_tag_match);
			allowed = Some(self.scripts_with_tags(&input.tag_ids, mode).await?);
		}

		if input.current_only {
			let current = self.current_version_ids().await?;
			allowed = Some(match allowed {
				Some(ids) => ids.intersection(&current).copied().collect(),
				None => current,
			});
		}

		match allowed {
			Some(ids) if ids.is_empty() => Ok(None),
			Some(ids) => Ok(Some(condition.add(script::Column::Id.is_in(ids)))),
			None => Ok(Some(condition)),
		}
	}

	/// Script ids carrying all (or any) of `tag_ids`
	async fn scripts_with_tags(&self, tag_ids: &[i32], mode: TagMatchMode) -> Result<HashSet<i32>> {
		let wanted: HashSet<i32> = tag_ids.iter().copied().collect();

		let rows: Vec<(i32, i32)> = script_tag::Entity::find()
			.select_only()
			.column(script_tag::Column::ScriptId)
			.column(script_tag::Column::TagId)
			.filter(script_tag::Column::TagId.is_in(wanted.iter().copied()))
			.into_tuple()
			.all(&*self.db)
			.await?;

		let mut per_script: HashMap<i32, HashSet<i32>> = HashMap::new();
		for (script_id, tag_id) in rows {
			per_script.entry(script_id).or_default().insert(tag_id);
		}

		Ok(per_script
			.into_iter()
			.filter(|(_, tags)| match mode {
				TagMatchMode::All => tags.len() == wanted.len(),
				TagMatchMode::Any => !tags.is_empty(),
			})
			.map(|(script_id, _)| script_id)
			.collect())
	}

	/// Ids of the highest active version of every title
	async fn current_version_ids(&self) -> Result<HashSet<i32>> {
		let rows: Vec<(i32, String, i32)> = script::Entity::find()
			.select_only()
			.column(script::Column::Id)
			.column(script::Column::Title)
			.column(script::Column::Version)
			.filter(script::Column::IsActive.eq(true))
			.into_tuple()
			.all(&*self.db)
			.await?;

		let mut best: HashMap<String, (i32, i32)> = HashMap::new();
		for (id, title, version) in rows {
			let entry = best.entry(title).or_insert((id, version));
			if version > entry.1 {
				*entry = (id, version);
			}
		}

		Ok(best.into_values().map(|(id, _)| id).collect())
	}
}
