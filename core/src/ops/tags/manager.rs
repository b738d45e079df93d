//! Tag store
//!
//! Owns the tag tree: uniqueness of names, acyclic parent links and the
//! cascading (de)activation rules. Every mutation checks the actor before
//! touching storage and runs multi-row changes inside one transaction.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
	ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
	EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use tracing::{debug, info, warn};

use super::hierarchy;
use super::input::{CreateTagInput, UpdateTagInput};
use crate::common::{CoreError, Result};
use crate::domain::{
	BulkCreateError, BulkCreateReport, TagNode, TagUsage, TagUsageStats, Validator,
};
use crate::infra::access::{Actor, Permission};
use crate::infra::db::entities::{script, script_tag, tag};

#[derive(Clone)]
pub struct TagManager {
	db: Arc<DatabaseConnection>,
}

impl TagManager {
	pub fn new(db: Arc<DatabaseConnection>) -> Self {
		Self { db }
	}

	/// Create a tag, optionally under an existing active parent.
	///
	/// The parent check and the insert share one transaction, so a concurrent
	/// deactivation of the parent either sees the new child or makes this
	/// call fail with `Conflict`.
	pub async fn create(&self, input: CreateTagInput, actor: &Actor) -> Result<tag::Model> {
		let actor_id = actor.require(Permission::ManageTags)?;
		let (name, description) = input.normalized()?;
		let txn = self.db.begin().await?;

		if let Some(parent_id) = input.parent_id {
			let parent = tag::Entity::find_by_id(parent_id).one(&txn).await?.ok_or_else(|| {
				CoreError::validation("parent", format!("parent tag {parent_id} does not exist"))
			})?;
			if !parent.is_active {
				warn!(parent_id, "refusing to create tag under inactive parent");
				return Err(CoreError::validation("parent", "parent tag is inactive"));
			}
		}

		if find_by_name(&txn, &name).await?.is_some() {
			warn!(%name, "duplicate tag name");
			return Err(duplicate_name(&name));
		}

		let model = tag::ActiveModel {
			name: Set(name.clone()),
			description: Set(description),
			parent_id: Set(input.parent_id),
			sort_order: Set(input.sort_order.unwrap_or(0)),
			created_by: Set(Some(actor_id)),
			updated_by: Set(Some(actor_id)),
			..tag::ActiveModel::new()
		};

		// The unique index catches a concurrent create that slipped past the lookup
		let created = model
			.insert(&txn)
			.await
			.map_err(|e| name_conflict(e, &name))?;

		txn.commit().await?;

		info!(tag_id = created.id, name = %created.name, parent_id = ?created.parent_id, "created tag");
		Ok(created)
	}

	pub async fn get(&self, id: i32) -> Result<tag::Model> {
		find_tag(&*self.db, id).await
	}

	/// Exact, case-sensitive lookup
	pub async fn find_by_name(&self, name: &str) -> Result<Option<tag::Model>> {
		find_by_name(&*self.db, name).await
	}

	/// Rename, describe or reorder a tag
	pub async fn update(&self, id: i32, input: UpdateTagInput, actor: &Actor) -> Result<tag::Model> {
		let actor_id = actor.require(Permission::ManageTags)?;
		let db = &*self.db;
		let existing = find_tag(db, id).await?;

		if input.is_empty() {
			return Ok(existing);
		}

		let mut model: tag::ActiveModel = existing.clone().into();
		let mut target_name = existing.name.clone();

		if let Some(name) = &input.name {
			let name = Validator::normalize_tag_name(name)?;
			if name != existing.name {
				if let Some(other) = find_by_name(db, &name).await? {
					if other.id != id {
						return Err(duplicate_name(&name));
					}
				}
				target_name = name.clone();
				model.name = Set(name);
			}
		}
		if let Some(description) = &input.description {
			model.description = Set(Validator::normalize_tag_description(description)?);
		}
		if let Some(sort_order) = input.sort_order {
			model.sort_order = Set(sort_order);
		}
		model.updated_by = Set(Some(actor_id));
		model.updated_at = Set(Utc::now());

		let updated = model
			.update(db)
			.await
			.map_err(|e| name_conflict(e, &target_name))?;

		info!(tag_id = id, name = %updated.name, "updated tag");
		Ok(updated)
	}

	/// Move a tag under `new_parent`, or to the root when `None`.
	///
	/// Rejects moving a tag under itself or any of its descendants, and
	/// under an inactive parent.
	pub async fn reparent(
		&self,
		id: i32,
		new_parent: Option<i32>,
		actor: &Actor,
	) -> Result<tag::Model> {
		let actor_id = actor.require(Permission::ManageTags)?;
		let txn = self.db.begin().await?;

		let existing = find_tag(&txn, id).await?;

		if let Some(parent_id) = new_parent {
			if parent_id == id {
				return Err(CoreError::validation("parent", "a tag cannot be its own parent"));
			}

			let parent = tag::Entity::find_by_id(parent_id).one(&txn).await?.ok_or_else(|| {
				CoreError::validation("parent", format!("parent tag {parent_id} does not exist"))
			})?;
			if !parent.is_active {
				return Err(CoreError::validation("parent", "parent tag is inactive"));
			}

			let parents = hierarchy::load_parent_map(&txn).await?;
			if hierarchy::would_create_cycle(&parents, id, parent_id) {
				warn!(tag_id = id, parent_id, "reparent would create a cycle");
				return Err(CoreError::validation(
					"parent",
					"cannot move a tag under one of its descendants",
				));
			}
		}

		let mut model: tag::ActiveModel = existing.into();
		model.parent_id = Set(new_parent);
		model.updated_by = Set(Some(actor_id));
		model.updated_at = Set(Utc::now());
		let updated = model.update(&txn).await?;

		txn.commit().await?;

		info!(tag_id = id, parent_id = ?new_parent, "reparented tag");
		Ok(updated)
	}

	/// Deactivate a tag and its whole subtree as one unit.
	///
	/// Returns the ids of the subtree (the tag first). Calling it again on an
	/// already inactive subtree changes nothing.
	pub async fn deactivate(&self, id: i32, actor: &Actor) -> Result<Vec<i32>> {
		let actor_id = actor.require(Permission::ManageTags)?;
		let txn = self.db.begin().await?;

		find_tag(&txn, id).await?;

		let parents = hierarchy::load_parent_map(&txn).await?;
		let children = hierarchy::child_index(&parents);
		let mut subtree = vec![id];
		subtree.extend(hierarchy::collect_descendants(&children, id));
		debug!(tag_id = id, subtree = ?subtree, "collected subtree for deactivation");

		let result = tag::Entity::update_many()
			.col_expr(tag::Column::IsActive, Expr::value(false))
			.col_expr(tag::Column::UpdatedBy, Expr::value(actor_id))
			.col_expr(tag::Column::UpdatedAt, Expr::value(Utc::now()))
			.filter(tag::Column::Id.is_in(subtree.clone()))
			.filter(tag::Column::IsActive.eq(true))
			.exec(&txn)
			.await?;

		txn.commit().await?;

		info!(
			tag_id = id,
			subtree_size = subtree.len(),
			changed = result.rows_affected,
			"deactivated tag subtree"
		);
		Ok(subtree)
	}

	/// Reactivate a single tag. Children stay as they are.
	pub async fn activate(&self, id: i32, actor: &Actor) -> Result<tag::Model> {
		let actor_id = actor.require(Permission::ManageTags)?;
		let txn = self.db.begin().await?;
		let existing = find_tag(&txn, id).await?;

		if let Some(parent_id) = existing.parent_id {
			let parent = find_tag(&txn, parent_id).await?;
			if !parent.is_active {
				return Err(CoreError::validation(
					"parent",
					"cannot activate a tag whose parent is inactive",
				));
			}
		}

		if existing.is_active {
			return Ok(existing);
		}

		let mut model: tag::ActiveModel = existing.into();
		model.is_active = Set(true);
		model.updated_by = Set(Some(actor_id));
		model.updated_at = Set(Utc::now());
		let updated = model.update(&txn).await?;

		txn.commit().await?;

		info!(tag_id = id, "activated tag");
		Ok(updated)
	}

	/// Hard delete. Rejected while the tag still has children; script
	/// associations pointing at it are removed with it.
	pub async fn delete(&self, id: i32, actor: &Actor) -> Result<()> {
		actor.require(Permission::ManageTags)?;
		let txn = self.db.begin().await?;

		find_tag(&txn, id).await?;

		let children = tag::Entity::find()
			.filter(tag::Column::ParentId.eq(id))
			.count(&txn)
			.await?;
		if children > 0 {
			return Err(CoreError::validation(
				"children",
				format!("tag has {children} child tag(s); move or delete them first"),
			));
		}

		let relations = script_tag::Entity::delete_many()
			.filter(script_tag::Column::TagId.eq(id))
			.exec(&txn)
			.await?;
		tag::Entity::delete_by_id(id).exec(&txn).await?;

		txn.commit().await?;

		info!(tag_id = id, relations_removed = relations.rows_affected, "deleted tag");
		Ok(())
	}

	/// Delete several tags at once. A tag may only go if each of its
	/// children is deleted in the same call.
	pub async fn bulk_delete(&self, ids: &[i32], actor: &Actor) -> Result<u64> {
		actor.require(Permission::ManageTags)?;
		if ids.is_empty() {
			return Ok(0);
		}

		let wanted: HashSet<i32> = ids.iter().copied().collect();
		let txn = self.db.begin().await?;

		let found = tag::Entity::find()
			.filter(tag::Column::Id.is_in(wanted.iter().copied()))
			.count(&txn)
			.await?;
		if found != wanted.len() as u64 {
			return Err(CoreError::NotFound(format!(
				"{} of {} tags do not exist",
				wanted.len() as u64 - found,
				wanted.len()
			)));
		}

		let parents = hierarchy::load_parent_map(&txn).await?;
		let blocked = parents
			.iter()
			.filter(|&(child, parent)| {
				!wanted.contains(child) && parent.is_some_and(|p| wanted.contains(&p))
			})
			.count();
		if blocked > 0 {
			return Err(CoreError::validation(
				"children",
				format!("{blocked} child tag(s) outside the selection would be orphaned"),
			));
		}

		script_tag::Entity::delete_many()
			.filter(script_tag::Column::TagId.is_in(wanted.iter().copied()))
			.exec(&txn)
			.await?;
		let result = tag::Entity::delete_many()
			.filter(tag::Column::Id.is_in(wanted.iter().copied()))
			.exec(&txn)
			.await?;

		txn.commit().await?;

		info!(deleted = result.rows_affected, "bulk deleted tags");
		Ok(result.rows_affected)
	}

	/// Create root tags from a list of names, collecting per-name failures
	pub async fn bulk_create(
		&self,
		names: &[String],
		actor: &Actor,
	) -> Result<BulkCreateReport<tag::Model>> {
		actor.require(Permission::ManageTags)?;

		let mut report = BulkCreateReport::default();
		for name in names {
			match self.create(CreateTagInput::new(name.clone()), actor).await {
				Ok(tag) => report.created.push(tag),
				Err(err @ CoreError::Validation { .. }) | Err(err @ CoreError::Conflict(_)) => {
					report.errors.push(BulkCreateError {
						name: name.clone(),
						message: err.to_string(),
					})
				}
				Err(other) => return Err(other),
			}
		}

		info!(
			created = report.created.len(),
			failed = report.errors.len(),
			"bulk created tags"
		);
		Ok(report)
	}

	/// Number of active scripts associated with the tag
	pub async fn usage_count(&self, id: i32) -> Result<u64> {
		let db = &*self.db;
		find_tag(db, id).await?;

		Ok(script::Entity::find()
			.inner_join(script_tag::Entity)
			.filter(script_tag::Column::TagId.eq(id))
			.filter(script::Column::IsActive.eq(true))
			.count(db)
			.await?)
	}

	pub async fn usage_statistics(&self) -> Result<TagUsageStats> {
		let db = &*self.db;

		let tags = tag::Entity::find()
			.order_by_asc(tag::Column::Name)
			.all(db)
			.await?;
		let counts = active_usage_counts(db).await?;

		let mut usage: Vec<TagUsage> = tags
			.iter()
			.map(|t| TagUsage {
				tag_id: t.id,
				name: t.name.clone(),
				is_active: t.is_active,
				usage_count: counts.get(&t.id).copied().unwrap_or(0),
			})
			.collect();
		usage.sort_by(|a, b| b.usage_count.cmp(&a.usage_count).then_with(|| a.name.cmp(&b.name)));

		Ok(TagUsageStats {
			total_tags: tags.len() as u64,
			active_tags: tags.iter().filter(|t| t.is_active).count() as u64,
			unused_tags: usage.iter().filter(|u| u.usage_count == 0).count() as u64,
			usage,
		})
	}

	pub async fn children(&self, id: i32, include_inactive: bool) -> Result<Vec<tag::Model>> {
		let db = &*self.db;
		find_tag(db, id).await?;

		let mut query = tag::Entity::find().filter(tag::Column::ParentId.eq(id));
		if !include_inactive {
			query = query.filter(tag::Column::IsActive.eq(true));
		}

		Ok(query
			.order_by_desc(tag::Column::SortOrder)
			.order_by_asc(tag::Column::Name)
			.all(db)
			.await?)
	}

	/// Ancestors, root first
	pub async fn ancestors(&self, id: i32) -> Result<Vec<tag::Model>> {
		let db = &*self.db;
		find_tag(db, id).await?;

		let parents = hierarchy::load_parent_map(db).await?;
		let chain = hierarchy::ancestor_chain(&parents, id);
		if chain.is_empty() {
			return Ok(Vec::new());
		}

		let mut by_id: HashMap<i32, tag::Model> = tag::Entity::find()
			.filter(tag::Column::Id.is_in(chain.clone()))
			.all(db)
			.await?
			.into_iter()
			.map(|t| (t.id, t))
			.collect();

		Ok(chain.into_iter().filter_map(|id| by_id.remove(&id)).collect())
	}

	/// Tags sharing the same parent (or other roots), excluding the tag itself
	pub async fn siblings(&self, id: i32) -> Result<Vec<tag::Model>> {
		let db = &*self.db;
		let current = find_tag(db, id).await?;

		let query = match current.parent_id {
			Some(parent_id) => tag::Entity::find().filter(tag::Column::ParentId.eq(parent_id)),
			None => tag::Entity::find().filter(tag::Column::ParentId.is_null()),
		};

		Ok(query
			.filter(tag::Column::Id.ne(id))
			.order_by_desc(tag::Column::SortOrder)
			.order_by_asc(tag::Column::Name)
			.all(db)
			.await?)
	}

	/// Whole forest. Inactive tags need `ViewInactiveTags`.
	pub async fn tree(&self, include_inactive: bool, actor: &Actor) -> Result<Vec<TagNode>> {
		if include_inactive {
			actor.require(Permission::ViewInactiveTags)?;
		}

		let mut query = tag::Entity::find();
		if !include_inactive {
			query = query.filter(tag::Column::IsActive.eq(true));
		}
		let tags = query
			.order_by_desc(tag::Column::SortOrder)
			.order_by_asc(tag::Column::Name)
			.all(&*self.db)
			.await?;

		Ok(build_forest(tags))
	}
}

async fn find_tag<C: ConnectionTrait>(conn: &C, id: i32) -> Result<tag::Model> {
	tag::Entity::find_by_id(id)
		.one(conn)
		.await?
		.ok_or_else(|| CoreError::not_found("tag", id))
}

async fn find_by_name<C: ConnectionTrait>(conn: &C, name: &str) -> Result<Option<tag::Model>> {
	Ok(tag::Entity::find()
		.filter(tag::Column::Name.eq(name))
		.one(conn)
		.await?)
}

fn duplicate_name(name: &str) -> CoreError {
	CoreError::validation("name", format!("tag name '{name}' already exists"))
}

/// Unique violations on write mean the name was taken; anything else,
/// including a busy database, keeps its usual classification.
fn name_conflict(err: DbErr, name: &str) -> CoreError {
	match err.sql_err() {
		Some(SqlErr::UniqueConstraintViolation(_)) => duplicate_name(name),
		_ => err.into(),
	}
}

/// `tag_id -> number of active scripts` for every used tag
async fn active_usage_counts<C: ConnectionTrait>(conn: &C) -> Result<HashMap<i32, u64>> {
	let rows: Vec<(i32, i64)> = script_tag::Entity::find()
		.select_only()
		.column(script_tag::Column::TagId)
		.column_as(
			Expr::col((script_tag::Entity, script_tag::Column::Id)).count(),
			"usage",
		)
		.inner_join(script::Entity)
		.filter(script::Column::IsActive.eq(true))
		.group_by(script_tag::Column::TagId)
		.into_tuple()
		.all(conn)
		.await?;

	Ok(rows
		.into_iter()
		.map(|(tag_id, count)| (tag_id, count.max(0) as u64))
		.collect())
}

/// Assemble nodes from a flat list already in display order. Tags whose
/// parent is missing from the list become roots.
fn build_forest(tags: Vec<tag::Model>) -> Vec<TagNode> {
	let present: HashSet<i32> = tags.iter().map(|t| t.id).collect();
	let order: HashMap<i32, usize> = tags.iter().enumerate().map(|(i, t)| (t.id, i)).collect();

	let mut children_of: HashMap<i32, Vec<i32>> = HashMap::new();
	let mut roots = Vec::new();
	for t in &tags {
		match t.parent_id.filter(|p| present.contains(p)) {
			Some(parent) => children_of.entry(parent).or_default().push(t.id),
			None => roots.push(t.id),
		}
	}
	for ids in children_of.values_mut() {
		ids.sort_by_key(|id| order[id]);
	}

	let mut models: HashMap<i32, tag::Model> = tags.into_iter().map(|t| (t.id, t)).collect();

	// Post-order assembly with an explicit stack
	let mut built: HashMap<i32, TagNode> = HashMap::new();
	let mut stack: Vec<(i32, bool)> = roots.iter().rev().map(|&id| (id, false)).collect();
	while let Some((id, expanded)) = stack.pop() {
		if expanded {
			let children: Vec<TagNode> = children_of
				.get(&id)
				.map(|ids| ids.iter().filter_map(|c| built.remove(c)).collect())
				.unwrap_or_default();
			if let Some(tag) = models.remove(&id) {
				built.insert(id, TagNode { tag, children });
			}
		} else {
			stack.push((id, true));
			if let Some(ids) = children_of.get(&id) {
				stack.extend(ids.iter().rev().map(|&c| (c, false)));
			}
		}
	}

	roots.into_iter().filter_map(|id| built.remove(&id)).collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn model(id: i32, name: &str, parent_id: Option<i32>, sort_order: i32) -> tag::Model {
		let now = Utc::now();
		tag::Model {
			id,
			name: name.to_string(),
			description: String::new(),
			is_active: true,
			sort_order,
			parent_id,
			created_by: None,
			updated_by: None,
			created_at: now,
			updated_at: now,
		}
	}

	#[test]
	fn forest_keeps_input_order_and_nesting() {
		let tags = vec![
			model(1, "a", None, 5),
			model(3, "c", Some(1), 2),
			model(2, "b", Some(1), 1),
			model(4, "d", Some(2), 0),
			model(5, "e", None, 0),
		];

		let forest = build_forest(tags);
		assert_eq!(forest.len(), 2);
		assert_eq!(forest[0].tag.id, 1);
		let child_ids: Vec<i32> = forest[0].children.iter().map(|n| n.tag.id).collect();
		assert_eq!(child_ids, vec![3, 2]);
		assert_eq!(forest[0].children[1].children[0].tag.id, 4);

		let flat: Vec<i32> = forest[0].flatten().iter().map(|t| t.id).collect();
		assert_eq!(flat, vec![1, 3, 2, 4]);
	}

	#[test]
	fn orphans_become_roots() {
		let forest = build_forest(vec![model(7, "orphan", Some(99), 0)]);
		assert_eq!(forest.len(), 1);
		assert_eq!(forest[0].tag.id, 7);
	}
}
