//! Script to tag association

use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "script_tag")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,
	pub script_id: i32,
	pub tag_id: i32,

	pub created_by: Option<i32>,
	pub updated_by: Option<i32>,

	pub created_at: DateTimeUtc,
	pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "super::script::Entity",
		from = "Column::ScriptId",
		to = "super::script::Column::Id",
		on_delete = "Cascade"
	)]
	Script,

	#[sea_orm(
		belongs_to = "super::tag::Entity",
		from = "Column::TagId",
		to = "super::tag::Column::Id",
		on_delete = "Cascade"
	)]
	Tag,
}

impl Related<super::script::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Script.def()
	}
}

impl Related<super::tag::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::Tag.def()
	}
}

impl ActiveModelBehavior for ActiveModel {
	fn new() -> Self {
		let now = chrono::Utc::now();
		Self {
			created_at: Set(now),
			updated_at: Set(now),
			..ActiveModelTrait::default()
		}
	}
}
