//! dylive content core
//!
//! Hierarchical tags and versioned scripts backed by SQLite through SeaORM.
//! [`Core`] wires configuration, storage and the stores together; callers
//! pass an already authenticated [`Actor`] into every operation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

pub mod common;
pub mod config;
pub mod domain;
pub mod infra;
pub mod ops;

pub use common::{CoreError, Result};
pub use config::AppConfig;
pub use infra::access::{Actor, Permission};

use infra::db::Database;
use ops::scripts::ScriptManager;
use ops::search::{ScriptSearch, TagSearch};
use ops::tags::TagManager;

/// Entry point owning the database and the stores built on it
pub struct Core {
	pub config: Arc<AppConfig>,
	pub tags: TagManager,
	pub scripts: ScriptManager,
	pub script_search: ScriptSearch,
	pub tag_search: TagSearch,
}

impl Core {
	/// Open (creating if needed) the data directory and its database
	pub async fn new(data_dir: impl AsRef<Path>) -> Result<Self> {
		let config = AppConfig::load_from(data_dir.as_ref())
			.map_err(|e| CoreError::Config(e.to_string()))?;
		Self::with_config(config).await
	}

	pub async fn with_config(config: AppConfig) -> Result<Self> {
		config
			.ensure_directories()
			.map_err(|e| CoreError::Config(e.to_string()))?;

		let db = Database::create(&config.database_path(), &config.database).await?;
		db.migrate().await?;

		let conn = Arc::new(db.conn().clone());
		let config = Arc::new(config);

		info!(data_dir = ?config.data_dir, "core initialized");

		Ok(Self {
			tags: TagManager::new(conn.clone()),
			scripts: ScriptManager::new(
				conn.clone(),
				config.content.clone(),
				config.versioning.clone(),
			),
			script_search: ScriptSearch::new(conn.clone(), config.search.clone()),
			tag_search: TagSearch::new(conn, config.search.clone()),
			config,
		})
	}

	pub fn data_dir(&self) -> &PathBuf {
		&self.config.data_dir
	}
}
