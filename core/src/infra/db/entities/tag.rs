//! Tag entity
//!
//! Tags form a tree through the optional `parent_id` self reference.

use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tag")]
pub struct Model {
	#[sea_orm(primary_key)]
	pub id: i32,

	#[sea_orm(unique)]
	pub name: String,
	pub description: String,
	pub is_active: bool,
	pub sort_order: i32,
	pub parent_id: Option<i32>,

	// Opaque actor references
	pub created_by: Option<i32>,
	pub updated_by: Option<i32>,

	pub created_at: DateTimeUtc,
	pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
	#[sea_orm(
		belongs_to = "Entity",
		from = "Column::ParentId",
		to = "Column::Id",
		on_delete = "SetNull"
	)]
	Parent,

	#[sea_orm(has_many = "super::script_tag::Entity")]
	ScriptTags,
}

impl Related<super::script_tag::Entity> for Entity {
	fn to() -> RelationDef {
		Relation::ScriptTags.def()
	}
}

impl Related<super::script::Entity> for Entity {
	fn to() -> RelationDef {
		super::script_tag::Relation::Script.def()
	}

	fn via() -> Option<RelationDef> {
		Some(super::script_tag::Relation::Tag.def().rev())
	}
}

impl ActiveModelBehavior for ActiveModel {
	fn new() -> Self {
		let now = chrono::Utc::now();
		Self {
			description: Set(String::new()),
			is_active: Set(true),
			sort_order: Set(0),
			created_at: Set(now),
			updated_at: Set(now),
			..ActiveModelTrait::default()
		}
	}
}

impl Model {
	pub fn is_root(&self) -> bool {
		self.parent_id.is_none()
	}
}
