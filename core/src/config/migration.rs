//! Config schema upgrades

use anyhow::Result;

/// Implemented by persisted configuration that carries a schema version.
pub trait Migrate {
	fn current_version(&self) -> u32;

	fn target_version() -> u32;

	/// Upgrade in place until `current_version() == target_version()`.
	fn migrate(&mut self) -> Result<()>;
}
