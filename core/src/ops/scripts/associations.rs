//! Script to tag associations

use std::collections::{BTreeSet, HashMap, HashSet};

use sea_orm::{
	ActiveModelBehavior, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
	TransactionTrait,
};
use tracing::{debug, info};

use super::manager::{find_script, ScriptManager};
use crate::common::{CoreError, Result};
use crate::infra::access::Actor;
use crate::infra::db::entities::{script_tag, tag};

impl ScriptManager {
	/// Tags of one script, ordered by name
	pub async fn tags_of(&self, script_id: i32) -> Result<Vec<tag::Model>> {
		let db = self.conn();
		find_script(db, script_id).await?;
		load_tags(db, script_id).await
	}

	/// Link a tag to a script. Linking twice is a conflict.
	pub async fn add_tag(&self, script_id: i32, tag_id: i32, actor: &Actor) -> Result<()> {
		let txn = self.conn().begin().await?;

		let script = find_script(&txn, script_id).await?;
		let actor_id = self.check_owner(&script, actor)?;
		resolve_active_tags(&txn, &[tag_id]).await?;

		let existing = script_tag::Entity::find()
			.filter(script_tag::Column::ScriptId.eq(script_id))
			.filter(script_tag::Column::TagId.eq(tag_id))
			.one(&txn)
			.await?;
		if existing.is_some() {
			return Err(CoreError::Conflict(format!(
				"script {script_id} is already tagged with {tag_id}"
			)));
		}

		script_tag::Entity::insert(relation(script_id, tag_id, actor_id))
			.exec(&txn)
			.await?;
		txn.commit().await?;

		info!(script_id, tag_id, "tagged script");
		Ok(())
	}

	/// Unlink a tag. Returns whether an association existed.
	pub async fn remove_tag(&self, script_id: i32, tag_id: i32, actor: &Actor) -> Result<bool> {
		let db = self.conn();
		let script = find_script(db, script_id).await?;
		self.check_owner(&script, actor)?;

		let result = script_tag::Entity::delete_many()
			.filter(script_tag::Column::ScriptId.eq(script_id))
			.filter(script_tag::Column::TagId.eq(tag_id))
			.exec(db)
			.await?;

		info!(script_id, tag_id, removed = result.rows_affected, "untagged script");
		Ok(result.rows_affected > 0)
	}

	/// Replace the tag set of a script
	pub async fn set_tags(
		&self,
		script_id: i32,
		tag_ids: &[i32],
		actor: &Actor,
	) -> Result<Vec<tag::Model>> {
		let txn = self.conn().begin().await?;

		let script = find_script(&txn, script_id).await?;
		let actor_id = self.check_owner(&script, actor)?;
		let wanted = resolve_active_tags(&txn, tag_ids).await?;
		sync_tags(&txn, script_id, &wanted, actor_id).await?;
		let tags = load_tags(&txn, script_id).await?;

		txn.commit().await?;
		Ok(tags)
	}
}

fn relation(script_id: i32, tag_id: i32, actor_id: i32) -> script_tag::ActiveModel {
	script_tag::ActiveModel {
		script_id: Set(script_id),
		tag_id: Set(tag_id),
		created_by: Set(Some(actor_id)),
		updated_by: Set(Some(actor_id)),
		..script_tag::ActiveModel::new()
	}
}

/// Check every id refers to an existing, active tag. Returns the distinct ids.
pub(crate) async fn resolve_active_tags<C: ConnectionTrait>(
	conn: &C,
	tag_ids: &[i32],
) -> Result<BTreeSet<i32>> {
	let wanted: BTreeSet<i32> = tag_ids.iter().copied().collect();
	if wanted.is_empty() {
		return Ok(wanted);
	}

	let found: HashMap<i32, tag::Model> = tag::Entity::find()
		.filter(tag::Column::Id.is_in(wanted.iter().copied()))
		.all(conn)
		.await?
		.into_iter()
		.map(|t| (t.id, t))
		.collect();

	for id in &wanted {
		match found.get(id) {
			None => return Err(CoreError::not_found("tag", id)),
			Some(tag) if !tag.is_active => {
				return Err(CoreError::validation(
					"tag_ids",
					format!("tag '{}' is inactive", tag.name),
				))
			}
			Some(_) => {}
		}
	}

	Ok(wanted)
}

/// Make the association rows of `script_id` match `wanted` exactly
pub(crate) async fn sync_tags<C: ConnectionTrait>(
	conn: &C,
	script_id: i32,
	wanted: &BTreeSet<i32>,
	actor_id: i32,
) -> Result<()> {
	let current: HashSet<i32> = script_tag::Entity::find()
		.filter(script_tag::Column::ScriptId.eq(script_id))
		.all(conn)
		.await?
		.into_iter()
		.map(|r| r.tag_id)
		.collect();

	let to_remove: Vec<i32> = current.iter().copied().filter(|id| !wanted.contains(id)).collect();
	let to_add: Vec<i32> = wanted.iter().copied().filter(|id| !current.contains(id)).collect();

	if !to_remove.is_empty() {
		script_tag::Entity::delete_many()
			.filter(script_tag::Column::ScriptId.eq(script_id))
			.filter(script_tag::Column::TagId.is_in(to_remove.clone()))
			.exec(conn)
			.await?;
	}

	insert_relations(conn, script_id, &to_add, actor_id).await?;

	debug!(script_id, added = ?to_add, removed = ?to_remove, "synced script tags");
	Ok(())
}

pub(crate) async fn insert_relations<C: ConnectionTrait>(
	conn: &C,
	script_id: i32,
	tag_ids: &[i32],
	actor_id: i32,
) -> Result<()> {
	if tag_ids.is_empty() {
		return Ok(());
	}

	script_tag::Entity::insert_many(
		tag_ids
			.iter()
			.map(|&tag_id| relation(script_id, tag_id, actor_id)),
	)
	.exec(conn)
	.await?;

	Ok(())
}

pub(crate) async fn load_tags<C: ConnectionTrait>(conn: &C, script_id: i32) -> Result<Vec<tag::Model>> {
	Ok(tag::Entity::find()
		.inner_join(script_tag::Entity)
		.filter(script_tag::Column::ScriptId.eq(script_id))
		.order_by_asc(tag::Column::Name)
		.all(conn)
		.await?)
}

/// Tags for many scripts at once, each list ordered by name
pub(crate) async fn load_tags_for<C: ConnectionTrait>(
	conn: &C,
	script_ids: &[i32],
) -> Result<HashMap<i32, Vec<tag::Model>>> {
	let mut out: HashMap<i32, Vec<tag::Model>> = HashMap::new();
	if script_ids.is_empty() {
		return Ok(out);
	}

	let rows = script_tag::Entity::find()
		.filter(script_tag::Column::ScriptId.is_in(script_ids.iter().copied()))
		.find_also_related(tag::Entity)
		.all(conn)
		.await?;

	for (relation, tag) in rows {
		if let Some(tag) = tag {
			out.entry(relation.script_id).or_default().push(tag);
		}
	}
	for tags in out.values_mut() {
		tags.sort_by(|a, b| a.name.cmp(&b.name));
	}

	Ok(out)
}
