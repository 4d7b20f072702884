use sea_orm_migration::prelude::extension::postgres::Type;
use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Resources {
    Table,
    Id,
    ResourceType,
    Slug,
    CreatedById,
    Visibility,
    State,
    RegionRestriction,
    CreatedAt,
    UpdatedAt,
}

/// 父子关系表 (一个 lesson 可以挂在多个 workshop 下)
#[derive(DeriveIden)]
enum ResourceLinks {
    Table,
    ParentId,
    ChildId,
    Position,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
    Name,
    ProductType,
    Price,
    QuantityAvailable,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ProductResources {
    Table,
    ProductId,
    ResourceId,
}

#[derive(DeriveIden)]
enum Coupons {
    Table,
    Id,
    Code,
    PercentageDiscount,
    AmountDiscount,
    MaxUses,
    UsedCount,
    Expires,
    RestrictedToProductId,
    IsDefault,
    BulkPurchaseId,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

async fn create_enum(manager: &SchemaManager<'_>, name: &str, values: &[&str]) -> Result<(), DbErr> {
    manager
        .create_type(
            Type::create()
                .as_enum(Alias::new(name))
                .values(values.iter().map(|v| Alias::new(*v)).collect::<Vec<_>>())
                .to_owned(),
        )
        .await
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        create_enum(
            manager,
            "resource_type",
            &[
                "workshop",
                "cohort",
                "section",
                "lesson",
                "exercise",
                "solution",
                "videoResource",
                "post",
            ],
        )
        .await?;
        create_enum(manager, "resource_visibility", &["public", "private", "unlisted"]).await?;
        create_enum(
            manager,
            "resource_state",
            &["draft", "published", "review", "archived"],
        )
        .await?;
        create_enum(
            manager,
            "product_type",
            &["self-paced", "live", "cohort", "membership"],
        )
        .await?;

        manager
            .create_table(
                Table::create()
                    .table(Resources::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Resources::Id)
                            .string_len(191)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Resources::ResourceType)
                            .custom(Alias::new("resource_type"))
                            .not_null(),
                    )
                    .col(ColumnDef::new(Resources::Slug).string_len(255).not_null())
                    .col(ColumnDef::new(Resources::CreatedById).string_len(191).null())
                    .col(
                        ColumnDef::new(Resources::Visibility)
                            .custom(Alias::new("resource_visibility"))
                            .not_null()
                            .default(Expr::cust("'public'")),
                    )
                    .col(
                        ColumnDef::new(Resources::State)
                            .custom(Alias::new("resource_state"))
                            .not_null()
                            .default(Expr::cust("'draft'")),
                    )
                    .col(ColumnDef::new(Resources::RegionRestriction).json_binary().null())
                    .col(
                        ColumnDef::new(Resources::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Resources::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ResourceLinks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ResourceLinks::ParentId).string_len(191).not_null())
                    .col(ColumnDef::new(ResourceLinks::ChildId).string_len(191).not_null())
                    .col(
                        ColumnDef::new(ResourceLinks::Position)
                            .double()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .col(ResourceLinks::ParentId)
                            .col(ResourceLinks::ChildId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_resource_links_child_id")
                    .table(ResourceLinks::Table)
                    .col(ResourceLinks::ChildId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Products::Id)
                            .string_len(191)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Products::Name).string_len(255).not_null())
                    .col(
                        ColumnDef::new(Products::ProductType)
                            .custom(Alias::new("product_type"))
                            .not_null()
                            .default(Expr::cust("'self-paced'")),
                    )
                    .col(
                        ColumnDef::new(Products::Price)
                            .decimal_len(10, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Products::QuantityAvailable)
                            .integer()
                            .not_null()
                            .default(-1),
                    )
                    .col(
                        ColumnDef::new(Products::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ProductResources::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ProductResources::ProductId).string_len(191).not_null())
                    .col(ColumnDef::new(ProductResources::ResourceId).string_len(191).not_null())
                    .primary_key(
                        Index::create()
                            .col(ProductResources::ProductId)
                            .col(ProductResources::ResourceId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Coupons::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Coupons::Id)
                            .string_len(191)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Coupons::Code).string_len(191).null().unique_key())
                    .col(
                        ColumnDef::new(Coupons::PercentageDiscount)
                            .decimal_len(3, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Coupons::AmountDiscount).decimal_len(10, 2).null())
                    .col(ColumnDef::new(Coupons::MaxUses).integer().not_null().default(-1))
                    .col(ColumnDef::new(Coupons::UsedCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Coupons::Expires).timestamp_with_time_zone().null())
                    .col(
                        ColumnDef::new(Coupons::RestrictedToProductId)
                            .string_len(191)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Coupons::IsDefault)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Coupons::BulkPurchaseId).string_len(191).null())
                    .col(
                        ColumnDef::new(Coupons::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Coupons::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProductResources::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Products::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ResourceLinks::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Resources::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}
