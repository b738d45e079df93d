//! Application configuration

use super::{default_data_dir, Migrate};
use crate::ops::search::TagMatchMode;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

const CONFIG_FILE: &str = "dylive.json";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
	/// Config schema version
	pub version: u32,

	/// Data directory path
	pub data_dir: PathBuf,

	/// Logging level
	pub log_level: String,

	#[serde(default)]
	pub database: DatabaseConfig,

	#[serde(default)]
	pub content: ContentConfig,

	#[serde(default)]
	pub versioning: VersioningConfig,

	#[serde(default)]
	pub search: SearchConfig,
}

/// Connection pool and SQLite settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
	/// Database file name, relative to the data directory
	pub file_name: String,
	pub max_connections: u32,
	pub min_connections: u32,
	pub connect_timeout_secs: u64,
	/// How long SQLite waits on a locked database before reporting busy
	pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
	fn default() -> Self {
		Self {
			file_name: "dylive.db".to_string(),
			max_connections: 8,
			min_connections: 1,
			connect_timeout_secs: 8,
			busy_timeout_ms: 5_000,
		}
	}
}

/// What happens when a script is created with a title that already has an
/// active version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateTitlePolicy {
	/// Reject with a validation error on `title`
	Reject,
	/// Accept and append as the next version of that title
	AppendVersion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
	pub duplicate_title_policy: DuplicateTitlePolicy,

	/// Only the creator (or a holder of `ManageScripts`) may update or delete a script
	pub enforce_script_ownership: bool,
}

impl Default for ContentConfig {
	fn default() -> Self {
		Self {
			duplicate_title_policy: DuplicateTitlePolicy::Reject,
			enforce_script_ownership: true,
		}
	}
}

/// Version assignment tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersioningConfig {
	/// Maximum wait for the per-title lock before reporting a conflict
	pub lock_timeout_ms: u64,

	/// Attempts made when storage reports a transient conflict
	pub max_attempts: u32,

	/// First retry delay; doubles on each further attempt
	pub retry_initial_ms: u64,
}

impl VersioningConfig {
	pub fn lock_timeout(&self) -> Duration {
		Duration::from_millis(self.lock_timeout_ms)
	}
}

impl Default for VersioningConfig {
	fn default() -> Self {
		Self {
			lock_timeout_ms: 10_000,
			max_attempts: 3,
			retry_initial_ms: 1_000,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
	pub title_weight: f32,
	pub content_weight: f32,
	pub default_page_size: u64,
	pub max_page_size: u64,
	pub suggestion_limit: u64,
	pub default_tag_match: TagMatchMode,
}

impl Default for SearchConfig {
	fn default() -> Self {
		Self {
			title_weight: 1.0,
			content_weight: 0.4,
			default_page_size: 20,
			max_page_size: 100,
			suggestion_limit: 10,
			default_tag_match: TagMatchMode::All,
		}
	}
}

impl AppConfig {
	/// Load configuration from the default location
	pub fn load() -> Result<Self> {
		let data_dir = default_data_dir()?;
		Self::load_from(&data_dir)
	}

	/// Load configuration from a specific data directory, writing defaults if absent
	pub fn load_from(data_dir: &Path) -> Result<Self> {
		let config_path = data_dir.join(CONFIG_FILE);

		if config_path.exists() {
			info!("Loading config from {:?}", config_path);
			let json = fs::read_to_string(&config_path)?;
			let mut config: AppConfig = serde_json::from_str(&json)?;

			if config.version < Self::target_version() {
				info!(
					"Migrating config from v{} to v{}",
					config.version,
					Self::target_version()
				);
				config.migrate()?;
				config.save()?;
			}

			config.validate()?;
			Ok(config)
		} else {
			warn!("No config found, creating default at {:?}", config_path);
			let config = Self::default_with_dir(data_dir.to_path_buf());
			config.save()?;
			Ok(config)
		}
	}

	/// Create default configuration with specific data directory
	pub fn default_with_dir(data_dir: PathBuf) -> Self {
		Self {
			version: Self::target_version(),
			data_dir,
			log_level: "info".to_string(),
			database: DatabaseConfig::default(),
			content: ContentConfig::default(),
			versioning: VersioningConfig::default(),
			search: SearchConfig::default(),
		}
	}

	/// Save configuration to disk
	pub fn save(&self) -> Result<()> {
		fs::create_dir_all(&self.data_dir)?;

		let config_path = self.data_dir.join(CONFIG_FILE);
		let json = serde_json::to_string_pretty(self)?;
		fs::write(&config_path, json)?;
		info!("Saved config to {:?}", config_path);
		Ok(())
	}

	pub fn validate(&self) -> Result<()> {
		if self.search.max_page_size == 0 || self.search.default_page_size == 0 {
			return Err(anyhow!("search page sizes must be positive"));
		}
		if self.search.default_page_size > self.search.max_page_size {
			return Err(anyhow!(
				"default_page_size {} exceeds max_page_size {}",
				self.search.default_page_size,
				self.search.max_page_size
			));
		}
		if self.database.max_connections < self.database.min_connections {
			return Err(anyhow!("max_connections is below min_connections"));
		}
		if self.versioning.max_attempts == 0 {
			return Err(anyhow!("versioning.max_attempts must be at least 1"));
		}
		Ok(())
	}

	pub fn database_path(&self) -> PathBuf {
		self.data_dir.join(&self.database.file_name)
	}

	/// Get the path for logs directory
	pub fn logs_dir(&self) -> PathBuf {
		self.data_dir.join("logs")
	}

	/// Ensure all required directories exist
	pub fn ensure_directories(&self) -> Result<()> {
		fs::create_dir_all(&self.data_dir)?;
		fs::create_dir_all(self.logs_dir())?;
		Ok(())
	}
}

impl Default for AppConfig {
	fn default() -> Self {
		let data_dir = default_data_dir().unwrap_or_else(|_| PathBuf::from("."));
		Self::default_with_dir(data_dir)
	}
}

impl Migrate for AppConfig {
	fn current_version(&self) -> u32 {
		self.version
	}

	fn target_version() -> u32 {
		2
	}

	fn migrate(&mut self) -> Result<()> {
		match self.version {
			0 => {
				self.version = 1;
				self.migrate()
			}
			1 => {
				// v2 introduced search tuning
				self.search = SearchConfig::default();
				self.version = 2;
				Ok(())
			}
			2 => Ok(()),
			v => Err(anyhow!("Unknown config version: {}", v)),
		}
	}
}
