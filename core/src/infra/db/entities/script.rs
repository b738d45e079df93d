//! Script entity
//!
//! One row per version. Rows sharing a `title` are versions of one logical
//! document, unique on `(title, version)`.

use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use crate::domain::script::ScriptType;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "script")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,

	pub title: String,
	pub content: String,
	pub script_type: String, // ScriptType as string
	pub version: i32,
	pub is_active: bool,
	pub sort_order: i32,

	pub created_by: Option<i32>,
	pub updated_by: Option<i32>,

	pub created_at: DateTimeUtc,
	pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(has_many = "super::script_tag::Entity")]
	ScriptTags,
}

impl Related<super::script_tag::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::ScriptTags.def()
	}
}

impl Related<super::tag::Entity> for Entity {
	fn to() -> RelationDef {
		super::script_tag::Relation::Tag.def()
	}

	fn via() -> Option<RelationDef> {
		Some(super::script_tag::Relation::Script.def().rev())
	}
}

impl ActiveModelBehavior for ActiveModel {
	fn new() -> Self {
		let now = chrono::Utc::now();
		Self {
			script_type: Set(ScriptType::Custom.to_string()),
			version: Set(1),
			is_active: Set(true),
			sort_order: Set(0),
			created_at: Set(now),
			updated_at: Set(now),
			..ActiveModelTrait::default()
		}
	}
}

impl Model {
	/// Parsed type; unknown stored values read back as `Custom`.
	pub fn kind(&self) -> ScriptType {
		self.script_type.parse().unwrap_or(ScriptType::Custom)
	}
}
