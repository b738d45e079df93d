//! Copying scripts into new documents
//!
//! A copy is version 1 of a title nobody uses yet. Content, type, sort order
//! and tags carry over; the copying actor becomes the creator.

use std::collections::{BTreeSet, HashSet};

use sea_orm::{
	ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait,
	PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{info, warn};

use super::associations::{insert_relations, load_tags};
use super::manager::{find_script, ScriptManager};
use crate::common::{CoreError, Result};
use crate::domain::validation::SCRIPT_TITLE_MAX_CHARS;
use crate::domain::{ScriptDetail, Validator};
use crate::infra::access::{Actor, Permission};
use crate::infra::db::entities::{script, script_tag};

const COPY_MARKER: &str = "副本";
const MAX_COPY_SUFFIX: u32 = 100;

impl ScriptManager {
	/// Copy one script. Without `new_title` the copy is named after the
	/// source, e.g. `欢迎词（副本）`, then `欢迎词（副本2）`.
	pub async fn copy(
		&self,
		id: i32,
		new_title: Option<&str>,
		actor: &Actor,
	) -> Result<ScriptDetail> {
		let actor_id = actor.require_authenticated()?;
		let db = self.conn();

		let source = find_script(db, id).await?;
		check_readable(&source, actor)?;

		let title = match new_title {
			Some(title) => {
				let title = Validator::normalize_script_title(title)?;
				if title_in_use(db, &title).await? {
					return Err(CoreError::validation(
						"title",
						format!("a script titled '{title}' already exists"),
					));
				}
				title
			}
			None => free_copy_title(db, &source.title, &HashSet::new()).await?,
		};

		self.write_copies(vec![(source, title)], actor_id)
			.await?
			.pop()
			.ok_or_else(|| CoreError::not_found("script", id))
	}

	/// Copy several scripts in one transaction; either every copy is made or
	/// none is. Copies come back in id order of their sources.
	pub async fn batch_copy(&self, ids: &[i32], actor: &Actor) -> Result<Vec<ScriptDetail>> {
		let actor_id = actor.require_authenticated()?;
		if ids.is_empty() {
			return Err(CoreError::validation("ids", "nothing to copy"));
		}
		let db = self.conn();

		let wanted: BTreeSet<i32> = ids.iter().copied().collect();
		let sources = script::Entity::find()
			.filter(script::Column::Id.is_in(wanted.iter().copied()))
			.order_by_asc(script::Column::Id)
			.all(db)
			.await?;
		if sources.len() != wanted.len() {
			return Err(CoreError::NotFound(format!(
				"{} of {} scripts do not exist",
				wanted.len() - sources.len(),
				wanted.len()
			)));
		}

		let mut reserved = HashSet::new();
		let mut plan = Vec::with_capacity(sources.len());
		for source in sources {
			check_readable(&source, actor)?;
			let title = free_copy_title(db, &source.title, &reserved).await?;
			reserved.insert(title.clone());
			plan.push((source, title));
		}

		let copies = self.write_copies(plan, actor_id).await?;
		info!(copied = copies.len(), "batch copied scripts");
		Ok(copies)
	}

	/// Insert every planned copy under its title lock. Locks are taken in
	/// title order so two batches cannot wait on each other.
	async fn write_copies(
		&self,
		plan: Vec<(script::Model, String)>,
		actor_id: i32,
	) -> Result<Vec<ScriptDetail>> {
		let titles: BTreeSet<&str> = plan.iter().map(|(_, title)| title.as_str()).collect();
		let mut guards = Vec::with_capacity(titles.len());
		for title in titles {
			guards.push(self.lock_title(title).await?);
		}

		let txn = self.conn().begin().await?;
		let mut copies = Vec::with_capacity(plan.len());

		for (source, title) in plan {
			if title_in_use(&txn, &title).await? {
				warn!(%title, "copy title taken concurrently");
				return Err(CoreError::Conflict(format!(
					"title '{title}' was taken while copying"
				)));
			}

			let created = script::ActiveModel {
				title: Set(title),
				content: Set(source.content.clone()),
				script_type: Set(source.script_type.clone()),
				sort_order: Set(source.sort_order),
				created_by: Set(Some(actor_id)),
				updated_by: Set(Some(actor_id)),
				..script::ActiveModel::new()
			}
			.insert(&txn)
			.await?;

			let tag_ids: Vec<i32> = script_tag::Entity::find()
				.filter(script_tag::Column::ScriptId.eq(source.id))
				.all(&txn)
				.await?
				.into_iter()
				.map(|r| r.tag_id)
				.collect();
			insert_relations(&txn, created.id, &tag_ids, actor_id).await?;
			let tags = load_tags(&txn, created.id).await?;

			info!(
				source_id = source.id,
				script_id = created.id,
				title = %created.title,
				"copied script"
			);
			copies.push(ScriptDetail {
				script: created,
				tags,
			});
		}

		txn.commit().await?;
		drop(guards);

		Ok(copies)
	}
}

/// Inactive rows are only visible to actors allowed to list them
fn check_readable(source: &script::Model, actor: &Actor) -> Result<()> {
	if !source.is_active {
		actor.require(Permission::ViewInactiveScripts)?;
	}
	Ok(())
}

async fn title_in_use<C: ConnectionTrait>(conn: &C, title: &str) -> Result<bool> {
	Ok(script::Entity::find()
		.filter(script::Column::Title.eq(title))
		.count(conn)
		.await?
		> 0)
}

/// First unused `title（副本N）`, skipping titles already claimed by the
/// same batch. The source part is shortened to keep the length limit.
async fn free_copy_title<C: ConnectionTrait>(
	conn: &C,
	source_title: &str,
	reserved: &HashSet<String>,
) -> Result<String> {
	for n in 1..=MAX_COPY_SUFFIX {
		let candidate = copy_title(source_title, n);
		if !reserved.contains(&candidate) && !title_in_use(conn, &candidate).await? {
			return Ok(candidate);
		}
	}

	Err(CoreError::validation(
		"title",
		format!("too many copies of '{source_title}'"),
	))
}

fn copy_title(source_title: &str, n: u32) -> String {
	let suffix = if n == 1 {
		format!("（{COPY_MARKER}）")
	} else {
		format!("（{COPY_MARKER}{n}）")
	};
	let room = SCRIPT_TITLE_MAX_CHARS.saturating_sub(suffix.chars().count());
	let base: String = source_title.chars().take(room).collect();
	format!("{base}{suffix}")
}
