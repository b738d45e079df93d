//! Bulk creation and copying of scripts

mod helpers;

use dylive_core::domain::ScriptType;
use dylive_core::ops::scripts::CreateScriptInput;
use dylive_core::{Actor, CoreError};
use helpers::{admin, script, setup, tag};
use pretty_assertions::assert_eq;

fn names(tags: &[dylive_core::infra::db::entities::tag::Model]) -> Vec<String> {
	tags.iter().map(|t| t.name.clone()).collect()
}

#[tokio::test]
async fn bulk_create_reports_each_failure_and_keeps_going() {
	let core = setup().await;
	let hot = tag(&core, "热卖").await;
	script(&core, "已存在", "旧内容", &[]).await;

	let report = core
		.scripts
		.bulk_create(
			vec![
				CreateScriptInput::new("开场一", "大家好", ScriptType::Opening).with_tags([hot.id]),
				CreateScriptInput::new("   ", "空标题", ScriptType::Custom),
				CreateScriptInput::new("已存在", "重复", ScriptType::Custom),
				CreateScriptInput::new("缺标签", "内容", ScriptType::Qa).with_tags([9999]),
				CreateScriptInput::new("结束语", "下次见", ScriptType::Closing),
			],
			&admin(),
		)
		.await
		.unwrap();

	let created: Vec<&str> = report
		.created
		.iter()
		.map(|d| d.script.title.as_str())
		.collect();
	assert_eq!(created, vec!["开场一", "结束语"]);
	assert_eq!(names(&report.created[0].tags), vec!["热卖".to_string()]);

	let failed: Vec<&str> = report.errors.iter().map(|e| e.name.as_str()).collect();
	assert_eq!(failed, vec!["   ", "已存在", "缺标签"]);
	assert!(core.scripts.list_versions("缺标签").await.unwrap().is_empty());

	let anonymous = core
		.scripts
		.bulk_create(
			vec![CreateScriptInput::new("匿名", "内容", ScriptType::Custom)],
			&Actor::anonymous(),
		)
		.await;
	assert!(matches!(anonymous, Err(CoreError::Permission(_))));
}

#[tokio::test]
async fn copy_starts_a_new_title_at_version_one() {
	let core = setup().await;
	let a = tag(&core, "福利").await;
	let b = tag(&core, "新品").await;
	let source = core
		.scripts
		.create(
			CreateScriptInput::new("欢迎词", "欢迎来到直播间", ScriptType::Opening)
				.with_tags([a.id, b.id]),
			&admin(),
		)
		.await
		.unwrap();
	let v2 = core.scripts.new_version(source.script.id, &admin()).await.unwrap();

	let copier = Actor::user(7);
	let copy = core.scripts.copy(v2.script.id, Some(" 新欢迎词 "), &copier).await.unwrap();

	assert_eq!(copy.script.title, "新欢迎词");
	assert_eq!(copy.script.version, 1);
	assert!(copy.script.is_active);
	assert_eq!(copy.script.content, v2.script.content);
	assert_eq!(copy.script.script_type, v2.script.script_type);
	assert_eq!(copy.script.created_by, Some(7));
	assert_eq!(names(&copy.tags), names(&v2.tags));

	let untouched = core.scripts.get_detail(v2.script.id).await.unwrap();
	assert_eq!(untouched.script.title, "欢迎词");
	assert_eq!(untouched.script.version, 2);
	assert_eq!(untouched.script.created_by, Some(helpers::ADMIN_ID));
	assert_eq!(names(&untouched.tags), names(&v2.tags));

	// The copy's tags are its own rows
	core.scripts.set_tags(copy.script.id, &[a.id], &copier).await.unwrap();
	assert_eq!(
		names(&core.scripts.tags_of(v2.script.id).await.unwrap()),
		names(&v2.tags)
	);
}

#[tokio::test]
async fn copy_titles_never_collide() {
	let core = setup().await;
	let source = script(&core, "欢迎词", "内容", &[]).await;
	script(&core, "占用", "内容", &[]).await;

	let first = core.scripts.copy(source.script.id, None, &admin()).await.unwrap();
	let second = core.scripts.copy(source.script.id, None, &admin()).await.unwrap();
	assert_eq!(first.script.title, "欢迎词（副本）");
	assert_eq!(second.script.title, "欢迎词（副本2）");

	for taken in ["占用", "欢迎词"] {
		let err = core
			.scripts
			.copy(source.script.id, Some(taken), &admin())
			.await
			.unwrap_err();
		assert!(matches!(err, CoreError::Validation { ref field, .. } if field == "title"));
	}

	let missing = core.scripts.copy(9999, None, &admin()).await;
	assert!(matches!(missing, Err(CoreError::NotFound(_))));
}

#[tokio::test]
async fn inactive_sources_need_permission_to_copy() {
	let core = setup().await;
	let source = script(&core, "旧话术", "内容", &[]).await;
	core.scripts
		.bulk_update_status(&[source.script.id], false, &admin())
		.await
		.unwrap();

	let denied = core.scripts.copy(source.script.id, None, &Actor::user(5)).await;
	assert!(matches!(denied, Err(CoreError::Permission(_))));

	let copy = core.scripts.copy(source.script.id, None, &admin()).await.unwrap();
	assert!(copy.script.is_active);
}

#[tokio::test]
async fn batch_copy_writes_all_or_nothing() {
	let core = setup().await;
	let hot = tag(&core, "热卖").await;
	let one = script(&core, "话术一", "内容一", &[hot.id]).await;
	let two = script(&core, "话术二", "内容二", &[]).await;

	let copies = core
		.scripts
		.batch_copy(&[two.script.id, one.script.id, two.script.id], &admin())
		.await
		.unwrap();
	let titles: Vec<&str> = copies.iter().map(|d| d.script.title.as_str()).collect();
	assert_eq!(titles, vec!["话术一（副本）", "话术二（副本）"]);
	assert_eq!(names(&copies[0].tags), vec!["热卖".to_string()]);

	let again = core
		.scripts
		.batch_copy(&[one.script.id], &admin())
		.await
		.unwrap();
	assert_eq!(again[0].script.title, "话术一（副本2）");

	let missing = core
		.scripts
		.batch_copy(&[one.script.id, 9999], &admin())
		.await;
	assert!(matches!(missing, Err(CoreError::NotFound(_))));
	assert!(core
		.scripts
		.list_versions("话术一（副本3）")
		.await
		.unwrap()
		.is_empty());

	let empty = core.scripts.batch_copy(&[], &admin()).await;
	assert!(matches!(empty, Err(CoreError::Validation { ref field, .. }) if field == "ids"));
}
