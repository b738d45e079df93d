//! Script domain types

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::infra::db::entities::{script, tag};

/// Classification of a script
#[derive(
	Debug,
	Clone,
	Copy,
	PartialEq,
	Eq,
	Hash,
	Serialize,
	Deserialize,
	Display,
	EnumString,
	EnumIter,
	AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ScriptType {
	Opening,
	Closing,
	Qa,
	Custom,
}

impl ScriptType {
	pub fn all() -> Vec<ScriptType> {
		Self::iter().collect()
	}

	/// Human readable label
	pub fn label(&self) -> &'static str {
		match self {
			Self::Opening => "开场白",
			Self::Closing => "结束语",
			Self::Qa => "问答",
			Self::Custom => "自定义",
		}
	}
}

/// A script version together with its tags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptDetail {
	pub script: script::Model,
	pub tags: Vec<tag::Model>,
}

impl ScriptDetail {
	pub fn tag_ids(&self) -> Vec<i32> {
		let mut ids: Vec<i32> = self.tags.iter().map(|t| t.id).collect();
		ids.sort_unstable();
		ids
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn script_type_round_trips_through_storage_strings() {
		assert_eq!(ScriptType::Qa.to_string(), "qa");
		assert_eq!("opening".parse::<ScriptType>().unwrap(), ScriptType::Opening);
		assert!("invalid".parse::<ScriptType>().is_err());
		assert_eq!(ScriptType::all().len(), 4);
	}
}
