//! Tag table with self-referencing parent link

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
	async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		manager
			.create_table(
				Table::create()
					.table(Tag::Table)
					.if_not_exists()
					.col(
						ColumnDef::new(Tag::Id)
							.integer()
							.not_null()
							.auto_increment()
							.primary_key(),
					)
					.col(ColumnDef::new(Tag::Name).string_len(50).not_null().unique_key())
					.col(ColumnDef::new(Tag::Description).text().not_null().default(""))
					.col(ColumnDef::new(Tag::IsActive).boolean().not_null().default(true))
					.col(ColumnDef::new(Tag::SortOrder).integer().not_null().default(0))
					.col(ColumnDef::new(Tag::ParentId).integer())
					.col(ColumnDef::new(Tag::CreatedBy).integer())
					.col(ColumnDef::new(Tag::UpdatedBy).integer())
					.col(
						ColumnDef::new(Tag::CreatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.col(
						ColumnDef::new(Tag::UpdatedAt)
							.timestamp_with_time_zone()
							.not_null(),
					)
					.foreign_key(
						ForeignKey::create()
							.name("fk_tag_parent")
							.from(Tag::Table, Tag::ParentId)
							.to(Tag::Table, Tag::Id)
							.on_delete(ForeignKeyAction::SetNull),
					)
					.to_owned(),
			)
			.await?;

		manager
			.create_index(
				Index::create()
					.name("idx_tag_parent_id")
					.table(Tag::Table)
					.col(Tag::ParentId)
					.to_owned(),
			)
			.await?;

		manager
			.create_index(
				Index::create()
					.name("idx_tag_is_active")
					.table(Tag::Table)
					.col(Tag::IsActive)
					.to_owned(),
			)
			.await?;

		manager
			.create_index(
				Index::create()
					.name("idx_tag_sort_order")
					.table(Tag::Table)
					.col(Tag::SortOrder)
					.to_owned(),
			)
			.await?;

		Ok(())
	}

	async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
		manager
			.drop_table(Table::drop().table(Tag::Table).to_owned())
			.await
	}
}

#[derive(DeriveIden)]
pub(super) enum Tag {
	Table,
	Id,
	Name,
	Description,
	IsActive,
	SortOrder,
	ParentId,
	CreatedBy,
	UpdatedBy,
	CreatedAt,
	UpdatedAt,
}
