//! Shared fixtures: a fresh store in a temporary data directory

#![allow(dead_code)]

use dylive_core::domain::{ScriptDetail, ScriptType};
use dylive_core::infra::db::entities::tag;
use dylive_core::ops::scripts::CreateScriptInput;
use dylive_core::ops::tags::CreateTagInput;
use dylive_core::{Actor, AppConfig, Core};
use tempfile::TempDir;

pub const ADMIN_ID: i32 = 1;

pub struct TestCore {
	pub core: Core,
	// Dropped last so the database file outlives the pool
	_dir: TempDir,
}

impl std::ops::Deref for TestCore {
	type Target = Core;

	fn deref(&self) -> &Core {
		&self.core
	}
}

pub async fn setup() -> TestCore {
	setup_with(|_| {}).await
}

/// Start a store after adjusting the default configuration
pub async fn setup_with(adjust: impl FnOnce(&mut AppConfig)) -> TestCore {
	let dir = TempDir::new().expect("temp dir");
	let mut config = AppConfig::default_with_dir(dir.path().to_path_buf());
	config.versioning.retry_initial_ms = 20;
	adjust(&mut config);

	let core = Core::with_config(config).await.expect("core starts");
	TestCore { core, _dir: dir }
}

pub fn admin() -> Actor {
	Actor::admin(ADMIN_ID)
}

pub async fn tag(core: &Core, name: &str) -> tag::Model {
	core.tags
		.create(CreateTagInput::new(name), &admin())
		.await
		.expect("create tag")
}

pub async fn child_tag(core: &Core, name: &str, parent: i32) -> tag::Model {
	core.tags
		.create(CreateTagInput::new(name).with_parent(parent), &admin())
		.await
		.expect("create child tag")
}

pub async fn script(core: &Core, title: &str, content: &str, tags: &[i32]) -> ScriptDetail {
	script_as(core, &admin(), title, content, tags).await
}

pub async fn script_as(
	core: &Core,
	actor: &Actor,
	title: &str,
	content: &str,
	tags: &[i32],
) -> ScriptDetail {
	core.scripts
		.create(
			CreateScriptInput::new(title, content, ScriptType::Custom).with_tags(tags.iter().copied()),
			actor,
		)
		.await
		.expect("create script")
}
