//! Application configuration management

use anyhow::{anyhow, Result};
use std::fs;
use std::path::PathBuf;

pub mod app_config;
pub mod migration;

pub use app_config::{
	AppConfig, ContentConfig, DatabaseConfig, DuplicateTitlePolicy, SearchConfig,
	VersioningConfig,
};
pub use migration::Migrate;

/// Platform-specific data directory resolution
pub fn default_data_dir() -> Result<PathBuf> {
	let base = if cfg!(target_os = "linux") {
		dirs::data_local_dir()
	} else {
		dirs::data_dir()
	};

	let dir = base
		.ok_or_else(|| anyhow!("Could not determine data directory"))?
		.join("dylive");

	fs::create_dir_all(&dir)?;

	Ok(dir)
}
