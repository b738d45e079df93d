//! Validation rules for tag and script input
//!
//! Each `normalize_*` function returns the value as it should be stored
//! (trimmed) or a `Validation` error naming the offending field.

use crate::common::{CoreError, Result};

pub const TAG_NAME_MAX_CHARS: usize = 50;
pub const TAG_DESCRIPTION_MAX_CHARS: usize = 2_000;
pub const SCRIPT_TITLE_MAX_CHARS: usize = 100;
pub const SCRIPT_CONTENT_MAX_CHARS: usize = 10_000;

/// Validation rules shared by the stores
pub struct Validator;

impl Validator {
	pub fn normalize_tag_name(name: &str) -> Result<String> {
		Self::normalize_line("name", name, TAG_NAME_MAX_CHARS)
	}

	pub fn normalize_tag_description(description: &str) -> Result<String> {
		let description = description.trim();
		if description.chars().count() > TAG_DESCRIPTION_MAX_CHARS {
			return Err(CoreError::validation(
				"description",
				format!("cannot exceed {TAG_DESCRIPTION_MAX_CHARS} characters"),
			));
		}
		Ok(description.to_string())
	}

	pub fn normalize_script_title(title: &str) -> Result<String> {
		Self::normalize_line("title", title, SCRIPT_TITLE_MAX_CHARS)
	}

	/// Content keeps its inner formatting; only surrounding whitespace is dropped.
	pub fn normalize_script_content(content: &str) -> Result<String> {
		let trimmed = content.trim();
		if trimmed.is_empty() {
			return Err(CoreError::validation("content", "cannot be empty"));
		}
		if trimmed.chars().count() > SCRIPT_CONTENT_MAX_CHARS {
			return Err(CoreError::validation(
				"content",
				format!("cannot exceed {SCRIPT_CONTENT_MAX_CHARS} characters"),
			));
		}
		Ok(trimmed.to_string())
	}

	/// Single-line text: non-empty after trimming, bounded, no control characters
	fn normalize_line(field: &str, value: &str, max_chars: usize) -> Result<String> {
		let value = value.trim();

		if value.is_empty() {
			return Err(CoreError::validation(field, "cannot be empty"));
		}

		if value.chars().count() > max_chars {
			return Err(CoreError::validation(
				field,
				format!("cannot exceed {max_chars} characters"),
			));
		}

		if value.chars().any(char::is_control) {
			return Err(CoreError::validation(
				field,
				"cannot contain control characters",
			));
		}

		Ok(value.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn tag_names_are_trimmed() {
		assert_eq!(Validator::normalize_tag_name("  父标签 ").unwrap(), "父标签");
	}

	#[test]
	fn empty_and_blank_names_fail_on_name_field() {
		for raw in ["", "   ", "\t"] {
			let err = Validator::normalize_tag_name(raw).unwrap_err();
			assert_eq!(err.field(), Some("name"));
		}
	}

	#[test]
	fn length_is_counted_in_characters() {
		let fifty = "标".repeat(50);
		assert!(Validator::normalize_tag_name(&fifty).is_ok());
		assert!(Validator::normalize_tag_name(&format!("{fifty}签")).is_err());

		let title = "a".repeat(101);
		assert_eq!(
			Validator::normalize_script_title(&title).unwrap_err().field(),
			Some("title")
		);
	}

	#[test]
	fn control_characters_rejected() {
		assert!(Validator::normalize_tag_name("bad\u{7}name").is_err());
	}

	#[test]
	fn content_keeps_inner_newlines() {
		assert_eq!(
			Validator::normalize_script_content("\n第一行\n第二行\n").unwrap(),
			"第一行\n第二行"
		);
		assert_eq!(
			Validator::normalize_script_content("  ").unwrap_err().field(),
			Some("content")
		);
	}
}
