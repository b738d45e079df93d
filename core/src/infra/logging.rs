//! Tracing setup: console plus a daily rolling file under `{data_dir}/logs`

use std::sync::Once;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::common::{CoreError, Result};
use crate::config::AppConfig;

/// Install the global subscriber. Later calls are no-ops, so tests and the
/// binary can both call this freely.
pub fn init_tracing(config: &AppConfig) -> Result<()> {
	static INIT: Once = Once::new();
	let mut result = Ok(());

	INIT.call_once(|| {
		let logs_dir = config.logs_dir();
		if let Err(e) = std::fs::create_dir_all(&logs_dir) {
			result = Err(CoreError::Io(e));
			return;
		}

		let default_filter = format!("dylive_core={0},dylive={0}", config.log_level);

		let file_appender = RollingFileAppender::new(Rotation::DAILY, logs_dir, "dylive.log");

		if let Err(e) = tracing_subscriber::registry()
			.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
			.with(
				fmt::layer()
					.with_target(true)
					.with_thread_ids(true)
					.with_writer(std::io::stderr),
			)
			.with(
				fmt::layer()
					.with_target(true)
					.with_thread_ids(true)
					.with_ansi(false)
					.with_writer(file_appender),
			)
			.try_init()
		{
			result = Err(CoreError::Config(format!(
				"Failed to initialize tracing: {}",
				e
			)));
		}
	});

	result
}
