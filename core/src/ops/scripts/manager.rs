//! Script store
//!
//! Every row is one version of a logical document identified by its title.
//! Version numbers for a title are assigned under an exclusive per-title lock
//! held across the read-max / insert sequence, so concurrent callers always
//! receive distinct consecutive numbers. The `(title, version)` unique index
//! backs this up across processes.

use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
	ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
	EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{info, warn};

use super::associations::{insert_relations, load_tags, resolve_active_tags, sync_tags};
use super::input::{CreateScriptInput, UpdateScriptInput};
use crate::common::{CoreError, Result};
use crate::config::{ContentConfig, DuplicateTitlePolicy, VersioningConfig};
use crate::domain::{BulkCreateError, BulkCreateReport, ScriptDetail, Validator};
use crate::infra::access::{Actor, Permission};
use crate::infra::db::entities::{script, script_tag};
use crate::infra::db::Database;
use crate::infra::locks::{KeyedGuard, KeyedLocks};

#[derive(Clone)]
pub struct ScriptManager {
	db: Arc<DatabaseConnection>,
	content: ContentConfig,
	versioning: VersioningConfig,
	title_locks: Arc<KeyedLocks>,
}

impl ScriptManager {
	pub fn new(
		db: Arc<DatabaseConnection>,
		content: ContentConfig,
		versioning: VersioningConfig,
	) -> Self {
		Self {
			db,
			content,
			versioning,
			title_locks: Arc::new(KeyedLocks::new()),
		}
	}

	pub(crate) fn conn(&self) -> &DatabaseConnection {
		&self.db
	}

	/// Exclusive hold on one title's version sequence
	pub(crate) async fn lock_title(&self, title: &str) -> Result<KeyedGuard> {
		self.title_locks
			.acquire(title, self.versioning.lock_timeout())
			.await
	}

	/// Create the first version of a script (or the next one, when the title
	/// only has inactive rows or the policy allows appending).
	pub async fn create(&self, input: CreateScriptInput, actor: &Actor) -> Result<ScriptDetail> {
		let actor_id = actor.require_authenticated()?;
		let title = Validator::normalize_script_title(&input.title)?;
		let content = Validator::normalize_script_content(&input.content)?;

		let _guard = self.lock_title(&title).await?;
		let txn = self.db.begin().await?;

		let wanted_tags = resolve_active_tags(&txn, &input.tag_ids).await?;

		let existing = script::Entity::find()
			.filter(script::Column::Title.eq(&title))
			.all(&txn)
			.await?;
		if existing.iter().any(|s| s.is_active)
			&& self.content.duplicate_title_policy == DuplicateTitlePolicy::Reject
		{
			warn!(%title, "active script with this title already exists");
			return Err(CoreError::validation(
				"title",
				format!("an active script titled '{title}' already exists"),
			));
		}
		let version = existing.iter().map(|s| s.version).max().unwrap_or(0) + 1;

		let created = script::ActiveModel {
			title: Set(title),
			content: Set(content),
			script_type: Set(input.script_type.to_string()),
			version: Set(version),
			sort_order: Set(input.sort_order),
			created_by: Set(Some(actor_id)),
			updated_by: Set(Some(actor_id)),
			..script::ActiveModel::new()
		}
		.insert(&txn)
		.await?;

		let tag_ids: Vec<i32> = wanted_tags.into_iter().collect();
		insert_relations(&txn, created.id, &tag_ids, actor_id).await?;
		let tags = load_tags(&txn, created.id).await?;

		txn.commit().await?;

		info!(
			script_id = created.id,
			title = %created.title,
			version = created.version,
			tags = tag_ids.len(),
			"created script"
		);
		Ok(ScriptDetail {
			script: created,
			tags,
		})
	}

	pub async fn get(&self, id: i32) -> Result<script::Model> {
		find_script(&*self.db, id).await
	}

	pub async fn get_detail(&self, id: i32) -> Result<ScriptDetail> {
		let db = &*self.db;
		let script = find_script(db, id).await?;
		let tags = load_tags(db, id).await?;
		Ok(ScriptDetail { script, tags })
	}

	/// Append a copy of `id` as the next version of its title.
	///
	/// Prior rows are never modified. Lock wait timeouts surface as
	/// `Conflict`; transient storage conflicts are retried with exponential
	/// backoff while the title lock stays held.
	pub async fn new_version(&self, id: i32, actor: &Actor) -> Result<ScriptDetail> {
		let actor_id = actor.require_authenticated()?;
		let source = find_script(&*self.db, id).await?;

		let guard = self.lock_title(&source.title).await?;

		let policy = ExponentialBackoffBuilder::new()
			.with_initial_interval(Duration::from_millis(self.versioning.retry_initial_ms))
			.with_multiplier(2.0)
			.with_randomization_factor(0.0)
			.with_max_elapsed_time(None)
			.build();
		let max_attempts = self.versioning.max_attempts;
		let mut attempt = 0u32;

		let detail = backoff::future::retry(policy, || {
			attempt += 1;
			let current = attempt;
			let title = guard.key();
			async move {
				self.append_version(id, title, actor_id)
					.await
					.map_err(|err| {
						if err.is_retryable() && current < max_attempts {
							warn!(script_id = id, attempt = current, error = %err, "retrying new version");
							backoff::Error::transient(err)
						} else {
							backoff::Error::permanent(err)
						}
					})
			}
		})
		.await?;

		drop(guard);

		info!(
			source_id = id,
			script_id = detail.script.id,
			title = %detail.script.title,
			version = detail.script.version,
			"created new script version"
		);
		Ok(detail)
	}

	/// One read-max / insert attempt. Caller holds the title lock.
	async fn append_version(&self, id: i32, title: &str, actor_id: i32) -> Result<ScriptDetail> {
		let txn = self.db.begin().await?;

		let source = find_script(&txn, id).await?;
		if source.title != title {
			return Err(CoreError::Conflict(format!(
				"script {id} was renamed while creating a new version"
			)));
		}

		let mut versions = script::Entity::find()
			.select_only()
			.column(script::Column::Version)
			.filter(script::Column::Title.eq(title));
		if Database::supports_row_locks(txn.get_database_backend()) {
			versions = versions.lock_exclusive();
		}
		let max_version = versions
			.into_tuple::<i32>()
			.all(&txn)
			.await?
			.into_iter()
			.max()
			.unwrap_or(0);

		let created = script::ActiveModel {
			title: Set(source.title.clone()),
			content: Set(source.content.clone()),
			script_type: Set(source.script_type.clone()),
			version: Set(max_version + 1),
			is_active: Set(source.is_active),
			sort_order: Set(source.sort_order),
			created_by: Set(Some(actor_id)),
			updated_by: Set(Some(actor_id)),
			..script::ActiveModel::new()
		}
		.insert(&txn)
		.await?;

		let source_tags: Vec<i32> = script_tag::Entity::find()
			.filter(script_tag::Column::ScriptId.eq(source.id))
			.all(&txn)
			.await?
			.into_iter()
			.map(|r| r.tag_id)
			.collect();
		insert_relations(&txn, created.id, &source_tags, actor_id).await?;
		let tags = load_tags(&txn, created.id).await?;

		txn.commit().await?;

		Ok(ScriptDetail {
			script: created,
			tags,
		})
	}

	/// Change one version row. Other versions of the title are untouched.
	pub async fn update(
		&self,
		id: i32,
		input: UpdateScriptInput,
		actor: &Actor,
	) -> Result<ScriptDetail> {
		let existing = self.get(id).await?;
		let actor_id = self.check_owner(&existing, actor)?;

		if input.is_empty() {
			return self.get_detail(id).await;
		}

		let new_title = input
			.title
			.as_deref()
			.map(Validator::normalize_script_title)
			.transpose()?
			.filter(|t| *t != existing.title);
		let new_content = input
			.content
			.as_deref()
			.map(Validator::normalize_script_content)
			.transpose()?;

		// Moving into another title's version set must not race its new_version
		let _guard = match &new_title {
			Some(title) => Some(self.lock_title(title).await?),
			None => None,
		};

		let txn = self.db.begin().await?;
		let existing = find_script(&txn, id).await?;

		let mut model: script::ActiveModel = existing.clone().into();

		if let Some(title) = new_title {
			let taken = script::Entity::find()
				.filter(script::Column::Title.eq(&title))
				.filter(script::Column::Version.eq(existing.version))
				.one(&txn)
				.await?;
			if taken.is_some() {
				return Err(CoreError::validation(
					"title",
					format!("version {} of '{title}' already exists", existing.version),
				));
			}

			// Joining another document's title follows the same rule as create
			let stays_active = input.is_active.unwrap_or(existing.is_active);
			if stays_active && self.content.duplicate_title_policy == DuplicateTitlePolicy::Reject {
				let active = script::Entity::find()
					.filter(script::Column::Title.eq(&title))
					.filter(script::Column::IsActive.eq(true))
					.count(&txn)
					.await?;
				if active > 0 {
					warn!(script_id = id, %title, "rename onto an active title rejected");
					return Err(CoreError::validation(
						"title",
						format!("an active script titled '{title}' already exists"),
					));
				}
			}
			model.title = Set(title);
		}
		if let Some(content) = new_content {
			model.content = Set(content);
		}
		if let Some(script_type) = input.script_type {
			model.script_type = Set(script_type.to_string());
		}
		if let Some(is_active) = input.is_active {
			model.is_active = Set(is_active);
		}
		if let Some(sort_order) = input.sort_order {
			model.sort_order = Set(sort_order);
		}
		if let Some(tag_ids) = &input.tag_ids {
			let wanted = resolve_active_tags(&txn, tag_ids).await?;
			sync_tags(&txn, id, &wanted, actor_id).await?;
		}
		model.updated_by = Set(Some(actor_id));
		model.updated_at = Set(Utc::now());

		let updated = model.update(&txn).await?;
		let tags = load_tags(&txn, id).await?;

		txn.commit().await?;

		info!(script_id = id, title = %updated.title, version = updated.version, "updated script");
		Ok(ScriptDetail {
			script: updated,
			tags,
		})
	}

	/// Remove one version row and its associations
	pub async fn delete(&self, id: i32, actor: &Actor) -> Result<()> {
		let txn = self.db.begin().await?;

		let existing = find_script(&txn, id).await?;
		self.check_owner(&existing, actor)?;

		script_tag::Entity::delete_many()
			.filter(script_tag::Column::ScriptId.eq(id))
			.exec(&txn)
			.await?;
		script::Entity::delete_by_id(id).exec(&txn).await?;

		txn.commit().await?;

		info!(script_id = id, title = %existing.title, version = existing.version, "deleted script");
		Ok(())
	}

	/// Delete several rows atomically; every row must pass the ownership check
	pub async fn bulk_delete(&self, ids: &[i32], actor: &Actor) -> Result<u64> {
		actor.require_authenticated()?;
		if ids.is_empty() {
			return Ok(0);
		}

		let txn = self.db.begin().await?;
		let rows = self.load_owned(&txn, ids, actor).await?;
		let ids: Vec<i32> = rows.iter().map(|s| s.id).collect();

		script_tag::Entity::delete_many()
			.filter(script_tag::Column::ScriptId.is_in(ids.clone()))
			.exec(&txn)
			.await?;
		let result = script::Entity::delete_many()
			.filter(script::Column::Id.is_in(ids))
			.exec(&txn)
			.await?;

		txn.commit().await?;

		info!(deleted = result.rows_affected, "bulk deleted scripts");
		Ok(result.rows_affected)
	}

	/// Create each script in turn, collecting per-item failures instead of
	/// stopping at the first one.
	pub async fn bulk_create(
		&self,
		inputs: Vec<CreateScriptInput>,
		actor: &Actor,
	) -> Result<BulkCreateReport<ScriptDetail>> {
		actor.require_authenticated()?;

		let mut report = BulkCreateReport::default();
		for input in inputs {
			let title = input.title.clone();
			match self.create(input, actor).await {
				Ok(detail) => report.created.push(detail),
				Err(
					err @ (CoreError::Validation { .. }
					| CoreError::Conflict(_)
					| CoreError::NotFound(_)),
				) => report.errors.push(BulkCreateError {
					name: title,
					message: err.to_string(),
				}),
				Err(other) => return Err(other),
			}
		}

		info!(
			created = report.created.len(),
			failed = report.errors.len(),
			"bulk created scripts"
		);
		Ok(report)
	}

	/// Flip the active flag on several rows; returns the number changed
	pub async fn bulk_update_status(&self, ids: &[i32], is_active: bool, actor: &Actor) -> Result<u64> {
		let actor_id = actor.require_authenticated()?;
		if ids.is_empty() {
			return Ok(0);
		}

		let txn = self.db.begin().await?;
		let rows = self.load_owned(&txn, ids, actor).await?;
		let ids: Vec<i32> = rows.iter().map(|s| s.id).collect();

		let result = script::Entity::update_many()
			.col_expr(script::Column::IsActive, Expr::value(is_active))
			.col_expr(script::Column::UpdatedBy, Expr::value(actor_id))
			.col_expr(script::Column::UpdatedAt, Expr::value(Utc::now()))
			.filter(script::Column::Id.is_in(ids))
			.filter(script::Column::IsActive.ne(is_active))
			.exec(&txn)
			.await?;

		txn.commit().await?;

		info!(is_active, changed = result.rows_affected, "bulk updated script status");
		Ok(result.rows_affected)
	}

	/// All versions of a title, newest first
	pub async fn list_versions(&self, title: &str) -> Result<Vec<script::Model>> {
		Ok(script::Entity::find()
			.filter(script::Column::Title.eq(title.trim()))
			.order_by_desc(script::Column::Version)
			.all(&*self.db)
			.await?)
	}

	/// Highest version among the active rows of a title
	pub async fn current_version(&self, title: &str) -> Result<Option<script::Model>> {
		Ok(script::Entity::find()
			.filter(script::Column::Title.eq(title.trim()))
			.filter(script::Column::IsActive.eq(true))
			.order_by_desc(script::Column::Version)
			.one(&*self.db)
			.await?)
	}

	/// Creator, or holder of `ManageScripts`, when ownership is enforced
	pub(crate) fn check_owner(&self, script: &script::Model, actor: &Actor) -> Result<i32> {
		if self.content.enforce_script_ownership {
			actor.require_owner_or(script.created_by, Permission::ManageScripts)
		} else {
			actor.require_authenticated()
		}
	}

	async fn load_owned<C: ConnectionTrait>(
		&self,
		conn: &C,
		ids: &[i32],
		actor: &Actor,
	) -> Result<Vec<script::Model>> {
		let rows = script::Entity::find()
			.filter(script::Column::Id.is_in(ids.iter().copied()))
			.all(conn)
			.await?;

		let mut wanted: Vec<i32> = ids.to_vec();
		wanted.sort_unstable();
		wanted.dedup();
		if rows.len() != wanted.len() {
			return Err(CoreError::NotFound(format!(
				"{} of {} scripts do not exist",
				wanted.len() - rows.len(),
				wanted.len()
			)));
		}

		for row in &rows {
			self.check_owner(row, actor)?;
		}
		Ok(rows)
	}
}

pub(crate) async fn find_script<C: ConnectionTrait>(conn: &C, id: i32) -> Result<script::Model> {
	script::Entity::find_by_id(id)
		.one(conn)
		.await?
		.ok_or_else(|| CoreError::not_found("script", id))
}
