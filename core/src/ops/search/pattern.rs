//! Literal substring matching through SQL `LIKE`

use sea_orm::sea_query::LikeExpr;

const ESCAPE: char = '\\';

/// `%keyword%`, with `%`, `_` and the escape character in the keyword
/// matched literally.
pub fn contains_pattern(keyword: &str) -> LikeExpr {
	LikeExpr::new(format!("%{}%", escape_like(keyword))).escape(ESCAPE)
}

fn escape_like(keyword: &str) -> String {
	let mut out = String::with_capacity(keyword.len());
	for c in keyword.chars() {
		if matches!(c, '%' | '_' | ESCAPE) {
			out.push(ESCAPE);
		}
		out.push(c);
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn wildcards_are_escaped() {
		assert_eq!(escape_like("满100%减"), "满100\\%减");
		assert_eq!(escape_like("a_b"), "a\\_b");
		assert_eq!(escape_like("c:\\tmp"), "c:\\\\tmp");
		assert_eq!(escape_like("开场白"), "开场白");
	}
}
