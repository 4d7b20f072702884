use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};

use crate::entities::{
    coupon_entity as coupons, entitlement_entity as entitlements,
    organization_entity as organizations, organization_membership_entity as memberships,
    product_entity as products, product_resource_entity as product_resources,
    purchase_entity as purchases, resource_entity as resources,
    resource_link_entity as resource_links, user_entity as users,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    Coupon, CouponWithBulkPurchases, Entitlement, Organization, OrganizationMembership, Product,
    Purchase, PurchaseDetails, PurchaseStatus, Resource, ResourceGraph, ResourceLink, SeatClaim,
    User,
};
use crate::repositories::{
    CatalogStore, EntitlementStore, MembershipStore, PurchaseStore, ResourceStore,
};

pub struct DatabaseStore {
    db: DatabaseConnection,
}

impl DatabaseStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_link(m: resource_links::Model) -> ResourceLink {
    ResourceLink {
        parent_id: m.parent_id,
        child_id: m.child_id,
        position: m.position,
    }
}

fn to_resource(m: resources::Model) -> AppResult<Resource> {
    let id = m.id.clone();
    Resource::try_from(m).map_err(|e| {
        log::error!("Resource {id} has a malformed region restriction: {e}");
        AppError::SerdeJsonError(e)
    })
}

fn to_entitlement(m: entitlements::Model) -> AppResult<Entitlement> {
    let id = m.id.clone();
    Entitlement::try_from(m).map_err(|e| {
        log::error!("Entitlement {id} has malformed metadata: {e}");
        AppError::SerdeJsonError(e)
    })
}

// 条件更新: 仅在仍有剩余次数时 +1, 并发下由数据库保证不会超发
async fn take_coupon_use<C: ConnectionTrait>(conn: &C, coupon_id: &str) -> AppResult<bool> {
    let update_result = coupons::Entity::update_many()
        .col_expr(
            coupons::Column::UsedCount,
            Expr::col(coupons::Column::UsedCount).add(1),
        )
        .filter(coupons::Column::Id.eq(coupon_id))
        .filter(
            Condition::any()
                .add(coupons::Column::MaxUses.lte(0))
                .add(Expr::col(coupons::Column::UsedCount).lt(Expr::col(coupons::Column::MaxUses))),
        )
        .exec(conn)
        .await?;
    Ok(update_result.rows_affected == 1)
}

async fn insert_purchase_row<C: ConnectionTrait>(conn: &C, purchase: &Purchase) -> AppResult<bool> {
    let am = purchases::ActiveModel {
        id: Set(purchase.id.clone()),
        user_id: Set(purchase.user_id.clone()),
        product_id: Set(purchase.product_id.clone()),
        organization_id: Set(purchase.organization_id.clone()),
        status: Set(purchase.status),
        bulk_coupon_id: Set(purchase.bulk_coupon_id.clone()),
        redeemed_bulk_coupon_id: Set(purchase.redeemed_bulk_coupon_id.clone()),
        merchant_charge_id: Set(purchase.merchant_charge_id.clone()),
        country: Set(purchase.country.clone()),
        total_amount: Set(purchase.total_amount),
        created_at: Set(purchase.created_at),
    };
    // 唯一索引 (redeemed_bulk_coupon_id, user_id) 冲突时不插入
    let inserted = purchases::Entity::insert(am)
        .on_conflict(
            OnConflict::columns([
                purchases::Column::RedeemedBulkCouponId,
                purchases::Column::UserId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(inserted == 1)
}

#[async_trait]
impl ResourceStore for DatabaseStore {
    async fn get_resource(&self, id: &str) -> AppResult<Option<Resource>> {
        let model = resources::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?;
        model.map(to_resource).transpose()
    }

    async fn get_child_ids(&self, parent_id: &str) -> AppResult<Vec<String>> {
        let links = resource_links::Entity::find()
            .filter(resource_links::Column::ParentId.eq(parent_id))
            .order_by_asc(resource_links::Column::Position)
            .order_by_asc(resource_links::Column::ChildId)
            .all(&self.db)
            .await?;
        Ok(links.into_iter().map(|l| l.child_id).collect())
    }

    async fn load_resource_graph(&self) -> AppResult<ResourceGraph> {
        let resource_models = resources::Entity::find().all(&self.db).await?;
        let link_models = resource_links::Entity::find().all(&self.db).await?;
        Ok(ResourceGraph {
            resources: resource_models
                .into_iter()
                .map(to_resource)
                .collect::<AppResult<_>>()?,
            links: link_models.into_iter().map(to_link).collect(),
        })
    }
}

#[async_trait]
impl CatalogStore for DatabaseStore {
    async fn get_product(&self, id: &str) -> AppResult<Option<Product>> {
        let Some(model) = products::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };
        let resource_ids = product_resources::Entity::find()
            .filter(product_resources::Column::ProductId.eq(id))
            .order_by_asc(product_resources::Column::ResourceId)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|r| r.resource_id)
            .collect();
        Ok(Some(Product {
            id: model.id,
            name: model.name,
            product_type: model.product_type,
            price: model.price,
            quantity_available: model.quantity_available,
            resource_ids,
        }))
    }

    async fn get_coupon(&self, code_or_id: &str) -> AppResult<Option<Coupon>> {
        let by_code = coupons::Entity::find()
            .filter(coupons::Column::Code.eq(code_or_id))
            .one(&self.db)
            .await?;
        if let Some(m) = by_code {
            return Ok(Some(m.into()));
        }
        let by_id = coupons::Entity::find_by_id(code_or_id.to_string())
            .one(&self.db)
            .await?;
        Ok(by_id.map(Into::into))
    }

    async fn get_coupon_with_bulk_purchases(
        &self,
        id: &str,
    ) -> AppResult<Option<CouponWithBulkPurchases>> {
        let Some(model) = coupons::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };
        let coupon: Coupon = model.into();

        let mut owner = Condition::any().add(purchases::Column::BulkCouponId.eq(id));
        if let Some(bulk_purchase_id) = coupon.bulk_purchase_id.as_deref() {
            owner = owner.add(purchases::Column::Id.eq(bulk_purchase_id));
        }
        let bulk_purchases = purchases::Entity::find()
            .filter(owner)
            .order_by_asc(purchases::Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();

        Ok(Some(CouponWithBulkPurchases {
            coupon,
            bulk_purchases,
        }))
    }

    async fn get_default_coupon(&self, product_ids: &[String]) -> AppResult<Option<Coupon>> {
        let mut scope = Condition::any().add(coupons::Column::RestrictedToProductId.is_null());
        if !product_ids.is_empty() {
            scope = scope.add(coupons::Column::RestrictedToProductId.is_in(product_ids.to_vec()));
        }
        let candidates = coupons::Entity::find()
            .filter(coupons::Column::IsDefault.eq(true))
            .filter(scope)
            .order_by_asc(coupons::Column::Id)
            .all(&self.db)
            .await?;

        // 指定商品的默认券优先于全局默认券
        let chosen = candidates
            .iter()
            .find(|c| c.restricted_to_product_id.is_some())
            .or_else(|| candidates.first())
            .cloned();
        Ok(chosen.map(Into::into))
    }

    async fn increment_coupon_usage_if_available(&self, coupon_id: &str) -> AppResult<bool> {
        take_coupon_use(&self.db, coupon_id).await
    }
}

#[async_trait]
impl PurchaseStore for DatabaseStore {
    async fn get_purchase(&self, id: &str) -> AppResult<Option<Purchase>> {
        let model = purchases::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn get_purchases_for_user(&self, user_id: &str) -> AppResult<Vec<Purchase>> {
        let list = purchases::Entity::find()
            .filter(purchases::Column::UserId.eq(user_id))
            .order_by_asc(purchases::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    async fn get_purchase_details(
        &self,
        purchase_id: &str,
        user_id: &str,
    ) -> AppResult<PurchaseDetails> {
        let purchase: Option<Purchase> = purchases::Entity::find_by_id(purchase_id.to_string())
            .filter(purchases::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .map(Into::into);

        let existing_purchase = match &purchase {
            Some(p) => purchases::Entity::find()
                .filter(purchases::Column::UserId.eq(user_id))
                .filter(purchases::Column::ProductId.eq(p.product_id.as_str()))
                .filter(purchases::Column::Status.eq(PurchaseStatus::Valid))
                .filter(purchases::Column::Id.ne(purchase_id))
                .order_by_asc(purchases::Column::CreatedAt)
                .one(&self.db)
                .await?
                .map(Into::into),
            None => None,
        };

        Ok(PurchaseDetails {
            purchase,
            existing_purchase,
        })
    }

    async fn find_seat_purchase(
        &self,
        bulk_coupon_id: &str,
        user_id: &str,
    ) -> AppResult<Option<Purchase>> {
        let model = purchases::Entity::find()
            .filter(purchases::Column::RedeemedBulkCouponId.eq(bulk_coupon_id))
            .filter(purchases::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn insert_purchase(&self, purchase: &Purchase) -> AppResult<bool> {
        insert_purchase_row(&self.db, purchase).await
    }

    async fn claim_seat(&self, purchase: &Purchase) -> AppResult<SeatClaim> {
        let Some(coupon_id) = purchase.redeemed_bulk_coupon_id.as_deref() else {
            return Err(AppError::ValidationError(format!(
                "purchase {} is not a seat purchase",
                purchase.id
            )));
        };

        // 先写座位再扣次数; 任一步失败都回滚, 计数只随新座位增加
        let txn = self.db.begin().await?;
        if !insert_purchase_row(&txn, purchase).await? {
            txn.rollback().await?;
            return Ok(SeatClaim::AlreadyHeld);
        }
        if !take_coupon_use(&txn, coupon_id).await? {
            txn.rollback().await?;
            return Ok(SeatClaim::Unavailable);
        }
        txn.commit().await?;
        Ok(SeatClaim::Claimed)
    }
}

#[async_trait]
impl MembershipStore for DatabaseStore {
    async fn get_memberships_for_user(
        &self,
        user_id: &str,
    ) -> AppResult<Vec<OrganizationMembership>> {
        let list = memberships::Entity::find()
            .filter(memberships::Column::UserId.eq(user_id))
            .order_by_asc(memberships::Column::CreatedAt)
            .order_by_asc(memberships::Column::Id)
            .all(&self.db)
            .await?;
        Ok(list.into_iter().map(Into::into).collect())
    }

    async fn get_organization(&self, id: &str) -> AppResult<Option<Organization>> {
        let model = organizations::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn get_user(&self, id: &str) -> AppResult<Option<User>> {
        let model = users::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }
}

#[async_trait]
impl EntitlementStore for DatabaseStore {
    async fn list_active_entitlements(
        &self,
        membership_ids: &[String],
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Entitlement>> {
        if membership_ids.is_empty() {
            return Ok(Vec::new());
        }
        let list = entitlements::Entity::find()
            .filter(entitlements::Column::OrganizationMembershipId.is_in(membership_ids.to_vec()))
            .filter(entitlements::Column::DeletedAt.is_null())
            .filter(
                Condition::any()
                    .add(entitlements::Column::ExpiresAt.is_null())
                    .add(entitlements::Column::ExpiresAt.gt(now)),
            )
            .order_by_asc(entitlements::Column::CreatedAt)
            .all(&self.db)
            .await?;
        list.into_iter().map(to_entitlement).collect()
    }

    async fn find_entitlements_for_source(&self, source_id: &str) -> AppResult<Vec<Entitlement>> {
        let list = entitlements::Entity::find()
            .filter(entitlements::Column::SourceId.eq(source_id))
            .order_by_asc(entitlements::Column::CreatedAt)
            .all(&self.db)
            .await?;
        list.into_iter().map(to_entitlement).collect()
    }

    async fn insert_entitlement(&self, entitlement: &Entitlement) -> AppResult<bool> {
        let am = entitlements::ActiveModel {
            id: Set(entitlement.id.clone()),
            user_id: Set(entitlement.user_id.clone()),
            organization_id: Set(entitlement.organization_id.clone()),
            organization_membership_id: Set(entitlement.organization_membership_id.clone()),
            entitlement_type: Set(entitlement.entitlement_type.clone()),
            source_id: Set(entitlement.source_id.clone()),
            source_type: Set(entitlement.source_type),
            resource_id: Set(entitlement.resource_id.clone()),
            metadata: Set(serde_json::to_value(&entitlement.metadata)?),
            expires_at: Set(entitlement.expires_at),
            deleted_at: Set(entitlement.deleted_at),
            created_at: Set(entitlement.created_at),
        };
        // (source_id, resource_id) 已存在（包括软删除）时跳过
        let inserted = entitlements::Entity::insert(am)
            .on_conflict(
                OnConflict::columns([
                    entitlements::Column::SourceId,
                    entitlements::Column::ResourceId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(inserted == 1)
    }

    async fn soft_delete_entitlements_for_source(
        &self,
        source_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = entitlements::Entity::update_many()
            .col_expr(entitlements::Column::DeletedAt, Expr::value(now))
            .filter(entitlements::Column::SourceId.eq(source_id))
            .filter(entitlements::Column::DeletedAt.is_null())
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn coupon_model(id: &str, code: &str) -> coupons::Model {
        coupons::Model {
            id: id.to_string(),
            code: Some(code.to_string()),
            percentage_discount: dec!(0.20),
            amount_discount: None,
            max_uses: 5,
            used_count: 5,
            expires: None,
            restricted_to_product_id: None,
            is_default: false,
            bulk_purchase_id: None,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_increment_reports_rows_affected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                },
            ])
            .into_connection();
        let store = DatabaseStore::new(db);

        assert!(store.increment_coupon_usage_if_available("c1").await.unwrap());
        assert!(!store.increment_coupon_usage_if_available("c1").await.unwrap());
    }

    fn exec(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    fn seat(id: &str) -> Purchase {
        Purchase {
            id: id.to_string(),
            user_id: "u1".to_string(),
            product_id: "p1".to_string(),
            organization_id: None,
            status: PurchaseStatus::Valid,
            bulk_coupon_id: None,
            redeemed_bulk_coupon_id: Some("team".to_string()),
            merchant_charge_id: None,
            country: None,
            total_amount: dec!(0),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_claim_seat_outcomes() {
        // insert ok + use taken; insert ok + no uses left; insert conflict
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(1), exec(1), exec(1), exec(0), exec(0)])
            .into_connection();
        let store = DatabaseStore::new(db);

        assert_eq!(store.claim_seat(&seat("s1")).await.unwrap(), SeatClaim::Claimed);
        assert_eq!(
            store.claim_seat(&seat("s2")).await.unwrap(),
            SeatClaim::Unavailable
        );
        assert_eq!(
            store.claim_seat(&seat("s3")).await.unwrap(),
            SeatClaim::AlreadyHeld
        );

        let mut plain = seat("s4");
        plain.redeemed_bulk_coupon_id = None;
        assert!(matches!(
            store.claim_seat(&plain).await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_region_restriction_is_an_error() {
        let model = resources::Model {
            id: "w1".to_string(),
            resource_type: crate::entities::ResourceType::Workshop,
            slug: "w1".to_string(),
            created_by_id: None,
            visibility: crate::entities::ResourceVisibility::Public,
            state: crate::entities::ResourceState::Published,
            region_restriction: Some(serde_json::json!({"mode": "only_in", "countries": "US"})),
            created_at: None,
            updated_at: None,
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![model]])
            .into_connection();
        let store = DatabaseStore::new(db);

        assert!(matches!(
            store.get_resource("w1").await,
            Err(AppError::SerdeJsonError(_))
        ));
    }

    #[tokio::test]
    async fn test_get_coupon_maps_model() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![coupon_model("c1", "SAVE20")]])
            .into_connection();
        let store = DatabaseStore::new(db);

        let coupon = store.get_coupon("SAVE20").await.unwrap().unwrap();
        assert_eq!(coupon.id, "c1");
        assert_eq!(coupon.percentage_discount, dec!(0.20));
        assert!(!coupon.has_redemptions_left());
    }

    #[tokio::test]
    async fn test_list_active_entitlements_skips_query_without_memberships() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let store = DatabaseStore::new(db);
        let list = store
            .list_active_entitlements(&[], Utc::now())
            .await
            .unwrap();
        assert!(list.is_empty());
    }
}
