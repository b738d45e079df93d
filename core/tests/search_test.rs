//! Script and tag search: filters, tag matching, ranking, paging

mod helpers;

use dylive_core::domain::ScriptType;
use dylive_core::ops::scripts::CreateScriptInput;
use dylive_core::ops::search::{
	Page, Pagination, ScriptHit, ScriptSearchInput, SearchMode, StatusFilter, TagMatchMode,
	TagSearchInput,
};
use dylive_core::{Actor, CoreError, Permission};
use helpers::{admin, child_tag, script, setup, tag};
use pretty_assertions::assert_eq;

fn ids(page: &Page<ScriptHit>) -> Vec<i32> {
	let mut ids: Vec<i32> = page.items.iter().map(|hit| hit.script.id).collect();
	ids.sort_unstable();
	ids
}

#[tokio::test]
async fn keyword_matches_title_or_content_of_active_rows() {
	let core = setup().await;

	let by_title = script(&core, "欢迎新朋友", "点个关注", &[]).await;
	let by_content = script(&core, "开场", "欢迎来到直播间", &[]).await;
	script(&core, "结束语", "下次再见", &[]).await;
	let hidden = script(&core, "欢迎老朋友", "回来啦", &[]).await;
	core.scripts
		.bulk_update_status(&[hidden.script.id], false, &admin())
		.await
		.unwrap();

	let page = core
		.script_search
		.search(&ScriptSearchInput::keyword("欢迎"), &Actor::user(5))
		.await
		.unwrap();

	assert_eq!(page.total, 2);
	assert_eq!(ids(&page), vec![by_title.script.id, by_content.script.id]);
	assert!(page.items.iter().all(|hit| hit.score.is_none()));
}

#[tokio::test]
async fn blank_keyword_matches_everything() {
	let core = setup().await;
	script(&core, "一", "内容", &[]).await;
	script(&core, "二", "内容", &[]).await;

	let page = core
		.script_search
		.search(&ScriptSearchInput::keyword("   "), &admin())
		.await
		.unwrap();
	assert_eq!(page.total, 2);
}

#[tokio::test]
async fn tag_filter_all_and_any() {
	let core = setup().await;

	let t1 = tag(&core, "促单").await;
	let t2 = tag(&core, "福利").await;
	let both = script(&core, "双标签", "内容", &[t1.id, t2.id]).await;
	let first = script(&core, "仅促单", "内容", &[t1.id]).await;
	let second = script(&core, "仅福利", "内容", &[t2.id]).await;
	script(&core, "无标签", "内容", &[]).await;

	let all = core
		.script_search
		.search(&ScriptSearchInput::tagged([t1.id, t2.id], TagMatchMode::All), &admin())
		.await
		.unwrap();
	assert_eq!(ids(&all), vec![both.script.id]);
	assert_eq!(all.items[0].tags.len(), 2);

	let any = core
		.script_search
		.search(&ScriptSearchInput::tagged([t1.id, t2.id], TagMatchMode::Any), &admin())
		.await
		.unwrap();
	assert_eq!(
		ids(&any),
		vec![both.script.id, first.script.id, second.script.id]
	);

	// Dropping an association removes the script from matching results
	core.scripts
		.remove_tag(both.script.id, t1.id, &admin())
		.await
		.unwrap();
	let all = core
		.script_search
		.search(&ScriptSearchInput::tagged([t1.id, t2.id], TagMatchMode::All), &admin())
		.await
		.unwrap();
	assert!(all.items.is_empty());
	assert_eq!(all.total, 0);

	let only_t1 = core
		.script_search
		.search(&ScriptSearchInput::tagged([t1.id], TagMatchMode::All), &admin())
		.await
		.unwrap();
	assert_eq!(ids(&only_t1), vec![first.script.id]);
}

#[tokio::test]
async fn tag_filter_defaults_to_configured_mode() {
	let core = setup().await;

	let t1 = tag(&core, "甲").await;
	let t2 = tag(&core, "乙").await;
	let both = script(&core, "全都有", "内容", &[t1.id, t2.id]).await;
	script(&core, "只有甲", "内容", &[t1.id]).await;

	let input = ScriptSearchInput {
		tag_ids: vec![t1.id, t2.id],
		..Default::default()
	};
	let page = core.script_search.search(&input, &admin()).await.unwrap();
	assert_eq!(ids(&page), vec![both.script.id]);
}

#[tokio::test]
async fn ranked_search_puts_title_hits_first() {
	let core = setup().await;

	let content_hit = script(&core, "开场", "欢迎来到直播间", &[]).await;
	let title_prefix = script(&core, "欢迎词", "大家好", &[]).await;
	let exact = script(&core, "欢迎", "欢迎欢迎", &[]).await;

	let input = ScriptSearchInput {
		keyword: Some("欢迎".into()),
		mode: SearchMode::Ranked,
		..Default::default()
	};
	let page = core.script_search.search(&input, &admin()).await.unwrap();

	let order: Vec<i32> = page.items.iter().map(|hit| hit.script.id).collect();
	assert_eq!(
		order,
		vec![exact.script.id, title_prefix.script.id, content_hit.script.id]
	);
	let scores: Vec<f32> = page.items.iter().filter_map(|hit| hit.score).collect();
	assert_eq!(scores.len(), 3);
	assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn pages_report_totals() {
	let core = setup().await;
	for n in 0..25 {
		script(&core, &format!("话术{n:02}"), "批量内容", &[]).await;
	}

	let mut seen = Vec::new();
	for page in 1..=3 {
		let input = ScriptSearchInput {
			keyword: Some("批量".into()),
			pagination: Pagination::new(page, 10),
			..Default::default()
		};
		let result = core.script_search.search(&input, &admin()).await.unwrap();
		assert_eq!(result.total, 25);
		assert_eq!(result.total_pages, 3);
		assert_eq!(result.page, page);
		seen.extend(result.items.iter().map(|hit| hit.script.id));

		if page == 3 {
			assert_eq!(result.items.len(), 5);
			assert!(!result.has_next());
		} else {
			assert_eq!(result.items.len(), 10);
			assert!(result.has_next());
		}
	}

	seen.sort_unstable();
	seen.dedup();
	assert_eq!(seen.len(), 25);

	let beyond = core
		.script_search
		.search(
			&ScriptSearchInput {
				pagination: Pagination::new(9, 10),
				..Default::default()
			},
			&admin(),
		)
		.await
		.unwrap();
	assert!(beyond.items.is_empty());
	assert_eq!(beyond.total, 25);
}

#[tokio::test]
async fn inactive_rows_need_a_view_permission() {
	let core = setup().await;

	let live = script(&core, "在用", "内容", &[]).await;
	let retired = script(&core, "停用", "内容", &[]).await;
	core.scripts
		.bulk_update_status(&[retired.script.id], false, &admin())
		.await
		.unwrap();

	let input = ScriptSearchInput {
		status: StatusFilter::All,
		..Default::default()
	};
	let err = core
		.script_search
		.search(&input, &Actor::user(9))
		.await
		.unwrap_err();
	assert!(matches!(err, CoreError::Permission(_)));

	let viewer = Actor::user(9).with_permission(Permission::ViewInactiveScripts);
	let page = core.script_search.search(&input, &viewer).await.unwrap();
	assert_eq!(ids(&page), vec![live.script.id, retired.script.id]);

	let inactive_only = ScriptSearchInput {
		status: StatusFilter::Inactive,
		..Default::default()
	};
	let page = core.script_search.search(&inactive_only, &viewer).await.unwrap();
	assert_eq!(ids(&page), vec![retired.script.id]);
}

#[tokio::test]
async fn current_only_and_type_filters() {
	let core = setup().await;

	let v1 = script(&core, "问答一", "发货时间", &[]).await;
	let v2 = core.scripts.new_version(v1.script.id, &admin()).await.unwrap();
	let qa = core
		.scripts
		.create(
			CreateScriptInput::new("问答二", "怎么退货", ScriptType::Qa),
			&admin(),
		)
		.await
		.unwrap();

	let current = core
		.script_search
		.search(
			&ScriptSearchInput {
				current_only: true,
				..Default::default()
			},
			&admin(),
		)
		.await
		.unwrap();
	assert_eq!(ids(&current), vec![v2.script.id, qa.script.id]);

	let by_type = core
		.script_search
		.search(
			&ScriptSearchInput {
				script_type: Some(ScriptType::Qa),
				..Default::default()
			},
			&admin(),
		)
		.await
		.unwrap();
	assert_eq!(ids(&by_type), vec![qa.script.id]);
}

#[tokio::test]
async fn invalid_search_input_is_rejected() {
	let core = setup().await;

	let ranked_without_keyword = ScriptSearchInput {
		mode: SearchMode::Ranked,
		..Default::default()
	};
	let err = core
		.script_search
		.search(&ranked_without_keyword, &admin())
		.await
		.unwrap_err();
	assert_eq!(err.field(), Some("keyword"));

	let zero_page = ScriptSearchInput {
		pagination: Pagination::new(0, 10),
		..Default::default()
	};
	let err = core.script_search.search(&zero_page, &admin()).await.unwrap_err();
	assert_eq!(err.field(), Some("page"));
}

#[tokio::test]
async fn tag_search_filters_by_keyword_and_position() {
	let core = setup().await;

	let root = tag(&core, "商品").await;
	let child = child_tag(&core, "商品介绍", root.id).await;
	let other = tag(&core, "互动").await;

	let by_keyword = core
		.tag_search
		.search(
			&TagSearchInput {
				keyword: Some("商品".into()),
				..Default::default()
			},
			&admin(),
		)
		.await
		.unwrap();
	assert_eq!(by_keyword.total, 2);

	let roots = core
		.tag_search
		.search(
			&TagSearchInput {
				roots_only: true,
				..Default::default()
			},
			&admin(),
		)
		.await
		.unwrap();
	let mut root_ids: Vec<i32> = roots.items.iter().map(|t| t.id).collect();
	root_ids.sort_unstable();
	assert_eq!(root_ids, vec![root.id, other.id]);

	let children = core
		.tag_search
		.search(
			&TagSearchInput {
				parent_id: Some(root.id),
				..Default::default()
			},
			&admin(),
		)
		.await
		.unwrap();
	assert_eq!(children.items.len(), 1);
	assert_eq!(children.items[0].id, child.id);

	core.tags.deactivate(root.id, &admin()).await.unwrap();
	let err = core
		.tag_search
		.search(
			&TagSearchInput {
				status: StatusFilter::Inactive,
				..Default::default()
			},
			&Actor::user(3),
		)
		.await
		.unwrap_err();
	assert!(matches!(err, CoreError::Permission(_)));

	let inactive = core
		.tag_search
		.search(
			&TagSearchInput {
				status: StatusFilter::Inactive,
				..Default::default()
			},
			&admin(),
		)
		.await
		.unwrap();
	assert_eq!(inactive.total, 2);
}

#[tokio::test]
async fn suggestions_hide_inactive_tags_from_plain_users() {
	let core = setup().await;

	tag(&core, "开场白").await;
	tag(&core, "开场互动").await;
	let retired = tag(&core, "开场旧版").await;
	tag(&core, "结束").await;
	core.tags.deactivate(retired.id, &admin()).await.unwrap();

	let plain = core
		.tag_search
		.suggestions("开场", &Actor::user(2))
		.await
		.unwrap();
	assert_eq!(plain.len(), 2);
	assert!(!plain.contains(&"开场旧版".to_string()));

	let full = core.tag_search.suggestions("开场", &admin()).await.unwrap();
	assert_eq!(full.len(), 3);

	assert!(core
		.tag_search
		.suggestions("  ", &admin())
		.await
		.unwrap()
		.is_empty());
}

#[tokio::test]
async fn like_wildcards_in_keywords_match_literally() {
	let core = setup().await;

	script(&core, "开场白", "欢迎大家", &[]).await;
	script(&core, "满减", "今天下单立减", &[]).await;
	let percent = script(&core, "折扣", "满100%减20", &[]).await;

	let search = |keyword: &'static str| {
		let core = &core;
		async move {
			core.script_search
				.search(&ScriptSearchInput::keyword(keyword), &admin())
				.await
				.unwrap()
		}
	};

	assert_eq!(search("%").await.total, 1);
	assert_eq!(ids(&search("100%").await), vec![percent.script.id]);
	assert_eq!(search("_").await.total, 0);
	assert_eq!(search("满_减").await.total, 0);

	let ranked = ScriptSearchInput {
		keyword: Some("%".into()),
		mode: SearchMode::Ranked,
		..Default::default()
	};
	let page = core.script_search.search(&ranked, &admin()).await.unwrap();
	assert_eq!(ids(&page), vec![percent.script.id]);
}

#[tokio::test]
async fn tag_keywords_and_suggestions_match_literally() {
	let core = setup().await;

	let underscored = tag(&core, "a_b").await;
	tag(&core, "ab").await;
	tag(&core, "axb").await;

	let page = core
		.tag_search
		.search(
			&TagSearchInput {
				keyword: Some("_".into()),
				..Default::default()
			},
			&admin(),
		)
		.await
		.unwrap();
	assert_eq!(page.total, 1);
	assert_eq!(page.items[0].id, underscored.id);

	let names = core.tag_search.suggestions("a_", &admin()).await.unwrap();
	assert_eq!(names, vec!["a_b".to_string()]);
	assert!(core.tag_search.suggestions("%", &admin()).await.unwrap().is_empty());
}

#[tokio::test]
async fn out_of_range_pages_are_rejected() {
	let core = setup().await;
	script(&core, "话术", "内容", &[]).await;

	let err = core
		.script_search
		.search(
			&ScriptSearchInput {
				pagination: Pagination::new(u64::MAX, 20),
				..Default::default()
			},
			&admin(),
		)
		.await
		.unwrap_err();
	assert_eq!(err.field(), Some("page"));

	let ranked = ScriptSearchInput {
		keyword: Some("话术".into()),
		mode: SearchMode::Ranked,
		pagination: Pagination::new(u64::MAX, 20),
		..Default::default()
	};
	let err = core.script_search.search(&ranked, &admin()).await.unwrap_err();
	assert_eq!(err.field(), Some("page"));

	let err = core
		.tag_search
		.search(
			&TagSearchInput {
				pagination: Pagination::new(u64::MAX, 20),
				..Default::default()
			},
			&admin(),
		)
		.await
		.unwrap_err();
	assert_eq!(err.field(), Some("page"));

	// Far but representable pages are simply empty
	let far = core
		.script_search
		.search(
			&ScriptSearchInput {
				pagination: Pagination::new(1 << 40, 20),
				..Default::default()
			},
			&admin(),
		)
		.await
		.unwrap();
	assert!(far.items.is_empty());
	assert_eq!(far.total, 1);
}
