//! Result ordering and relevance scoring

use std::cmp::Ordering;

use sea_orm::{Order, QueryOrder, Select};

use super::input::{SortDirection, SortField, SortOptions};
use crate::infra::db::entities::script;

/// Apply the requested order plus an `id` tie-break so pages are stable
pub fn apply_script_sort(query: Select<script::Entity>, sort: &SortOptions) -> Select<script::Entity> {
	let direction = match sort.direction {
		SortDirection::Asc => Order::Asc,
		SortDirection::Desc => Order::Desc,
	};

	let query = match sort.field {
		SortField::CreatedAt => query.order_by(script::Column::CreatedAt, direction.clone()),
		SortField::UpdatedAt => query.order_by(script::Column::UpdatedAt, direction.clone()),
		SortField::SortOrder => query.order_by(script::Column::SortOrder, direction.clone()),
		SortField::Title => query
			.order_by(script::Column::Title, direction.clone())
			.order_by_desc(script::Column::Version),
		SortField::Version => query.order_by(script::Column::Version, direction.clone()),
	};

	query.order_by(script::Column::Id, direction)
}

/// Scores how well a text matches the query, in `0.0..=1.0`
pub struct RelevanceCalculator {
	query: String,
	query_words: Vec<String>,
}

impl RelevanceCalculator {
	pub fn new(query: &str) -> Self {
		let query = query.trim().to_lowercase();
		let query_words = query.split_whitespace().map(str::to_string).collect();
		Self { query, query_words }
	}

	pub fn score(&self, text: &str) -> f32 {
		if self.query.is_empty() {
			return 0.0;
		}

		let text = text.to_lowercase();

		// Exact match gets highest score
		if text == self.query {
			return 1.0;
		}

		if text.starts_with(&self.query) {
			return 0.9;
		}

		if text.contains(&self.query) {
			return 0.7;
		}

		// Partial word matches, normalized by query length
		let words: Vec<&str> = text.split_whitespace().collect();
		let mut score = 0.0;
		for query_word in &self.query_words {
			let best = words
				.iter()
				.map(|word| {
					if word.starts_with(query_word.as_str()) {
						0.5
					} else if word.contains(query_word.as_str()) {
						0.3
					} else {
						0.0
					}
				})
				.fold(0.0_f32, f32::max);
			score += best;
		}

		if self.query_words.is_empty() {
			0.0
		} else {
			score / self.query_words.len() as f32
		}
	}
}

/// Weighted title/content relevance for scripts
pub struct ScriptRanker {
	calculator: RelevanceCalculator,
	title_weight: f32,
	content_weight: f32,
}

impl ScriptRanker {
	pub fn new(keyword: &str, title_weight: f32, content_weight: f32) -> Self {
		Self {
			calculator: RelevanceCalculator::new(keyword),
			title_weight,
			content_weight,
		}
	}

	pub fn rank(&self, script: &script::Model) -> f32 {
		self.title_weight * self.calculator.score(&script.title)
			+ self.content_weight * self.calculator.score(&script.content)
	}

	/// Rank descending, then most recently updated, then id descending
	pub fn order(a: &(f32, script::Model), b: &(f32, script::Model)) -> Ordering {
		b.0.partial_cmp(&a.0)
			.unwrap_or(Ordering::Equal)
			.then_with(|| b.1.updated_at.cmp(&a.1.updated_at))
			.then_with(|| b.1.id.cmp(&a.1.id))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn relevance_tiers() {
		let calc = RelevanceCalculator::new("开场");
		assert_eq!(calc.score("开场"), 1.0);
		assert_eq!(calc.score("开场白"), 0.9);
		assert_eq!(calc.score("直播开场白"), 0.7);
		assert_eq!(calc.score("结束语"), 0.0);
	}

	#[test]
	fn word_partials_are_normalized() {
		let calc = RelevanceCalculator::new("live greet");
		// "live" prefixes a word, "greet" is inside one
		let score = calc.score("livestream a big-greeting");
		assert!((score - 0.4).abs() < f32::EPSILON);
	}

	#[test]
	fn title_hits_outrank_content_hits() {
		let ranker = ScriptRanker::new("欢迎", 1.0, 0.4);
		let now = chrono::Utc::now();
		let make = |title: &str, content: &str| script::Model {
			id: 1,
			title: title.into(),
			content: content.into(),
			script_type: "custom".into(),
			version: 1,
			is_active: true,
			sort_order: 0,
			created_by: None,
			updated_by: None,
			created_at: now,
			updated_at: now,
		};

		let title_hit = ranker.rank(&make("欢迎词", "大家好"));
		let content_hit = ranker.rank(&make("开场", "欢迎来到直播间"));
		assert!(title_hit > content_hit);
	}
}
