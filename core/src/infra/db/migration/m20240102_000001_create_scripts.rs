//! Versioned script rows and the script/tag join table

use sea_orm_migration::prelude::*;

use super::m20240101_000001_create_tags::Tag;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
	async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		manager
			.create_table(
				Table::create()
					.table(Script::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(Script::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(Script::Title).string_len(100).not_null())
					.col(ColumnDef::new(Script::Content).text().not_null())
					.col(
						ColumnDef::new(Script::ScriptType)
							.string_len(20)
							.not_null()
							.default("custom"),
					)
					.col(ColumnDef::new(Script::Version).integer().not_null().default(1))
					.col(ColumnDef::new(Script::IsActive).boolean().not_null().default(true))
					.col(ColumnDef::new(Script::SortOrder).integer().not_null().default(0))
					.col(ColumnDef::new(Script::CreatedBy).integer())
					.col(ColumnDef::new(Script::UpdatedBy).integer())
					.col(
						ColumnDef::new(Script::CreatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.col(
						ColumnDef::new(Script::UpdatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.to_owned(),
			)
			.await?;

		// Last line of defence for version monotonicity
		manager
			.create_index(
				Index::create()
					.name("idx_script_title_version")
					.table(Script::Table)
					.col(Script::Title)
					.col(Script::Version)
					.unique()
					.to_owned(),
			)
			.await?;

		manager
			.create_index(
				Index::create()
					.name("idx_script_type")
					.table(Script::Table)
					.col(Script::ScriptType)
					.to_owned(),
			)
			.await?;

		manager
			.create_index(
				Index::create()
					.name("idx_script_is_active")
					.table(Script::Table)
					.col(Script::IsActive)
					.to_owned(),
			)
			.await?;

		manager
			.create_index(
				Index::create()
					.name("idx_script_created_at")
					.table(Script::Table)
					.col(Script::CreatedAt)
					.to_owned(),
			)
			.await?;

		manager
			.create_table(
				Table::create()
					.table(ScriptTag::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(ScriptTag::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(ScriptTag::ScriptId).integer().not_null())
					.col(ColumnDef::new(ScriptTag::TagId).integer().not_null())
					.col(ColumnDef::new(ScriptTag::CreatedBy).integer())
					.col(ColumnDef::new(ScriptTag::UpdatedBy).integer())
					.col(
						ColumnDef::new(ScriptTag::CreatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.col(
						ColumnDef::new(ScriptTag::UpdatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.foreign_key(
						ForeignKey::create()
							.name("fk_script_tag_script")
							.from(ScriptTag::Table, ScriptTag::ScriptId)
							.to(Script::Table, Script::Id)
							.on_delete(ForeignKeyAction::Cascade),
					)
					.foreign_key(
						ForeignKey::create()
							.name("fk_script_tag_tag")
							.from(ScriptTag::Table, ScriptTag::TagId)
							.to(Tag::Table, Tag::Id)
							.on_delete(ForeignKeyAction::Cascade),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_index(
				Index::create()
					.name("idx_script_tag_unique")
					.table(ScriptTag::Table)
					.col(ScriptTag::ScriptId)
					.col(ScriptTag::TagId)
					.unique()
					.to_owned(),
			)
			.await?;

		manager
			.create_index(
				Index::create()
					.name("idx_script_tag_tag_id")
					.table(ScriptTag::Table)
					.col(ScriptTag::TagId)
					.to_owned(),
			)
			.await?;

		Ok(())
	}

	async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		manager
			.drop_table(Table::drop().table(ScriptTag::Table).to_owned())
			.await?;
		manager
			.drop_table(Table::drop().table(Script::Table).to_owned())
			.await
	}
}

#[derive(DeriveIden)]
enum Script {
	Table,
	Id,
	Title,
	Content,
	ScriptType,
	Version,
	IsActive,
	SortOrder,
	CreatedBy,
	UpdatedBy,
	CreatedAt,
	UpdatedAt,
}

#[derive(DeriveIden)]
enum ScriptTag {
	Table,
	Id,
	ScriptId,
	TagId,
	CreatedBy,
	UpdatedBy,
	CreatedAt,
	UpdatedAt,
}
