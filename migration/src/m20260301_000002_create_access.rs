use sea_orm_migration::prelude::extension::postgres::Type;
use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    Roles,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Organizations {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(DeriveIden)]
enum OrganizationMemberships {
    Table,
    Id,
    OrganizationId,
    UserId,
    Role,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Purchases {
    Table,
    Id,
    UserId,
    ProductId,
    OrganizationId,
    Status,
    BulkCouponId,
    RedeemedBulkCouponId,
    MerchantChargeId,
    Country,
    TotalAmount,
    CreatedAt,
}

/// 权益表: deleted_at 为软删除标记, (source_id, resource_id) 为幂等键
#[derive(DeriveIden)]
enum Entitlements {
    Table,
    Id,
    UserId,
    OrganizationId,
    OrganizationMembershipId,
    EntitlementType,
    SourceId,
    SourceType,
    ResourceId,
    Metadata,
    ExpiresAt,
    DeletedAt,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("purchase_status"))
                    .values(vec![
                        Alias::new("Valid"),
                        Alias::new("Restricted"),
                        Alias::new("Refunded"),
                        Alias::new("Disputed"),
                    ])
                    .to_owned(),
            )
            .await?;
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("entitlement_source_type"))
                    .values(vec![Alias::new("PURCHASE"), Alias::new("SUBSCRIPTION")])
                    .to_owned(),
            )
            .await?;
        manager
            .create_type(
                Type::create()
                    .as_enum(Alias::new("membership_role"))
                    .values(vec![
                        Alias::new("owner"),
                        Alias::new("admin"),
                        Alias::new("member"),
                    ])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).string_len(191).not_null().primary_key())
                    .col(ColumnDef::new(Users::Email).string_len(255).null())
                    // ["admin", "contributor", "user"]
                    .col(
                        ColumnDef::new(Users::Roles)
                            .json_binary()
                            .not_null()
                            .default(Expr::cust("'[]'::jsonb")),
                    )
                    .col(
                        ColumnDef::new(Users::CreatedAt)
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
                    .table(Organizations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Organizations::Id)
                            .string_len(191)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Organizations::Name).string_len(255).null())
                    .col(
                        ColumnDef::new(Organizations::CreatedAt)
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
                    .table(OrganizationMemberships::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrganizationMemberships::Id)
                            .string_len(191)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OrganizationMemberships::OrganizationId)
                            .string_len(191)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OrganizationMemberships::UserId)
                            .string_len(191)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OrganizationMemberships::Role)
                            .custom(Alias::new("membership_role"))
                            .not_null()
                            .default(Expr::cust("'member'")),
                    )
                    .col(
                        ColumnDef::new(OrganizationMemberships::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_organization_memberships_user_id")
                    .table(OrganizationMemberships::Table)
                    .col(OrganizationMemberships::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Purchases::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Purchases::Id).string_len(191).not_null().primary_key())
                    .col(ColumnDef::new(Purchases::UserId).string_len(191).not_null())
                    .col(ColumnDef::new(Purchases::ProductId).string_len(191).not_null())
                    .col(ColumnDef::new(Purchases::OrganizationId).string_len(191).null())
                    .col(
                        ColumnDef::new(Purchases::Status)
                            .custom(Alias::new("purchase_status"))
                            .not_null()
                            .default(Expr::cust("'Valid'")),
                    )
                    .col(ColumnDef::new(Purchases::BulkCouponId).string_len(191).null())
                    .col(ColumnDef::new(Purchases::RedeemedBulkCouponId).string_len(191).null())
                    .col(ColumnDef::new(Purchases::MerchantChargeId).string_len(191).null())
                    .col(ColumnDef::new(Purchases::Country).string_len(2).null())
                    .col(
                        ColumnDef::new(Purchases::TotalAmount)
                            .decimal_len(10, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Purchases::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_purchases_user_id")
                    .table(Purchases::Table)
                    .col(Purchases::UserId)
                    .to_owned(),
            )
            .await?;
        // 同一用户对同一个团队券只能兑换一次
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .unique()
                    .name("uq_purchases_redeemed_bulk_coupon_user")
                    .table(Purchases::Table)
                    .col(Purchases::RedeemedBulkCouponId)
                    .col(Purchases::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Entitlements::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Entitlements::Id)
                            .string_len(191)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Entitlements::UserId).string_len(191).not_null())
                    .col(ColumnDef::new(Entitlements::OrganizationId).string_len(191).null())
                    .col(
                        ColumnDef::new(Entitlements::OrganizationMembershipId)
                            .string_len(191)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Entitlements::EntitlementType)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Entitlements::SourceId).string_len(191).not_null())
                    .col(
                        ColumnDef::new(Entitlements::SourceType)
                            .custom(Alias::new("entitlement_source_type"))
                            .not_null(),
                    )
                    .col(ColumnDef::new(Entitlements::ResourceId).string_len(191).not_null())
                    .col(ColumnDef::new(Entitlements::Metadata).json_binary().not_null())
                    .col(ColumnDef::new(Entitlements::ExpiresAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Entitlements::DeletedAt).timestamp_with_time_zone().null())
                    .col(
                        ColumnDef::new(Entitlements::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .unique()
                    .name("uq_entitlements_source_resource")
                    .table(Entitlements::Table)
                    .col(Entitlements::SourceId)
                    .col(Entitlements::ResourceId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_entitlements_membership_id")
                    .table(Entitlements::Table)
                    .col(Entitlements::OrganizationMembershipId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Entitlements::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Purchases::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(OrganizationMemberships::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Organizations::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}
