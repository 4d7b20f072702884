//! Store seams used by the services. `DatabaseStore` backs them with Postgres via
//! sea-orm; `MemoryStore` keeps everything in process and is used by tests.

pub mod database;
pub mod memory;

pub use database::DatabaseStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppResult;
use crate::models::{
    Coupon, CouponWithBulkPurchases, Entitlement, Organization, OrganizationMembership, Product,
    Purchase, PurchaseDetails, Resource, ResourceGraph, SeatClaim, User,
};

#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn get_resource(&self, id: &str) -> AppResult<Option<Resource>>;

    /// Direct children ordered by link position.
    async fn get_child_ids(&self, parent_id: &str) -> AppResult<Vec<String>>;

    async fn load_resource_graph(&self) -> AppResult<ResourceGraph>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Product with the ids of the resources it sells.
    async fn get_product(&self, id: &str) -> AppResult<Option<Product>>;

    /// Looks the coupon up by code first, then by id.
    async fn get_coupon(&self, code_or_id: &str) -> AppResult<Option<Coupon>>;

    async fn get_coupon_with_bulk_purchases(
        &self,
        id: &str,
    ) -> AppResult<Option<CouponWithBulkPurchases>>;

    /// A default coupon that is unrestricted or restricted to one of `product_ids`.
    async fn get_default_coupon(&self, product_ids: &[String]) -> AppResult<Option<Coupon>>;

    /// Atomically bumps `used_count` when the coupon still has uses left.
    /// Returns `false` when no seat was taken.
    async fn increment_coupon_usage_if_available(&self, coupon_id: &str) -> AppResult<bool>;
}

#[async_trait]
pub trait PurchaseStore: Send + Sync {
    async fn get_purchase(&self, id: &str) -> AppResult<Option<Purchase>>;

    async fn get_purchases_for_user(&self, user_id: &str) -> AppResult<Vec<Purchase>>;

    async fn get_purchase_details(
        &self,
        purchase_id: &str,
        user_id: &str,
    ) -> AppResult<PurchaseDetails>;

    /// The seat purchase a user already holds from a bulk coupon, if any.
    async fn find_seat_purchase(
        &self,
        bulk_coupon_id: &str,
        user_id: &str,
    ) -> AppResult<Option<Purchase>>;

    /// Returns `false` when the user already holds a seat from the same bulk coupon.
    async fn insert_purchase(&self, purchase: &Purchase) -> AppResult<bool>;

    /// Inserts a seat purchase and takes one use of `redeemed_bulk_coupon_id` as a
    /// single unit. Either both are written or neither is.
    async fn claim_seat(&self, purchase: &Purchase) -> AppResult<SeatClaim>;
}

#[async_trait]
pub trait MembershipStore: Send + Sync {
    async fn get_memberships_for_user(&self, user_id: &str)
    -> AppResult<Vec<OrganizationMembership>>;

    async fn get_organization(&self, id: &str) -> AppResult<Option<Organization>>;

    async fn get_user(&self, id: &str) -> AppResult<Option<User>>;
}

#[async_trait]
pub trait EntitlementStore: Send + Sync {
    /// Entitlements for the memberships that are neither soft-deleted nor expired at `now`.
    async fn list_active_entitlements(
        &self,
        membership_ids: &[String],
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Entitlement>>;

    /// Every entitlement created from a source, soft-deleted ones included.
    async fn find_entitlements_for_source(&self, source_id: &str) -> AppResult<Vec<Entitlement>>;

    /// Returns `false` when `(source_id, resource_id)` already exists, even soft-deleted.
    async fn insert_entitlement(&self, entitlement: &Entitlement) -> AppResult<bool>;

    /// Marks live entitlements of a source deleted; returns how many changed.
    async fn soft_delete_entitlements_for_source(
        &self,
        source_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<u64>;
}
