//! Database infrastructure using SeaORM

use sea_orm::sqlx::sqlite::SqliteJournalMode;
use sea_orm::{ConnectOptions, Database as SeaDatabase, DatabaseConnection, DbBackend, DbErr};
use sea_orm_migration::MigratorTrait;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;

pub mod entities;
pub mod migration;

/// Database wrapper owning the connection pool
pub struct Database {
	conn: DatabaseConnection,
}

impl Database {
	/// Open the database at the specified path, creating it when missing
	pub async fn create(path: &Path, config: &DatabaseConfig) -> Result<Self, DbErr> {
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)
				.map_err(|e| DbErr::Custom(format!("Failed to create directory: {}", e)))?;
		}

		let db_url = format!("sqlite://{}?mode=rwc", path.display());
		let conn = SeaDatabase::connect(Self::options(db_url, config)).await?;

		info!("Opened database at {:?}", path);

		Ok(Self { conn })
	}

	fn options(db_url: String, config: &DatabaseConfig) -> ConnectOptions {
		let busy_timeout = Duration::from_millis(config.busy_timeout_ms);

		let mut opt = ConnectOptions::new(db_url);
		opt.max_connections(config.max_connections)
			.min_connections(config.min_connections)
			.connect_timeout(Duration::from_secs(config.connect_timeout_secs))
			.sqlx_logging(false)
			.map_sqlx_sqlite_opts(move |opts| {
				opts.journal_mode(SqliteJournalMode::Wal)
					.busy_timeout(busy_timeout)
					.foreign_keys(true)
			});
		opt
	}

	/// Run migrations
	pub async fn migrate(&self) -> Result<(), DbErr> {
		migration::Migrator::up(&self.conn, None).await?;
		info!("Database migrations completed successfully");
		Ok(())
	}

	/// Get the database connection
	pub fn conn(&self) -> &DatabaseConnection {
		&self.conn
	}

	/// Row locks (`SELECT ... FOR UPDATE`) are only meaningful off SQLite,
	/// where the writer lock already covers the whole database.
	pub fn supports_row_locks(backend: DbBackend) -> bool {
		!matches!(backend, DbBackend::Sqlite)
	}
}
