use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::error::{AppError, AppResult};
use crate::models::{
    Coupon, CouponWithBulkPurchases, Entitlement, Organization, OrganizationMembership, Product,
    Purchase, PurchaseDetails, PurchaseStatus, Resource, ResourceGraph, ResourceLink, SeatClaim,
    User,
};
use crate::repositories::{
    CatalogStore, EntitlementStore, MembershipStore, PurchaseStore, ResourceStore,
};

#[derive(Default)]
struct State {
    resources: HashMap<String, Resource>,
    links: Vec<ResourceLink>,
    products: HashMap<String, Product>,
    coupons: HashMap<String, Coupon>,
    purchases: HashMap<String, Purchase>,
    users: HashMap<String, User>,
    organizations: HashMap<String, Organization>,
    memberships: Vec<OrganizationMembership>,
    entitlements: Vec<Entitlement>,
}

impl State {
    // 同一 id, 或同一用户在同一团队券下已有座位
    fn purchase_conflicts(&self, purchase: &Purchase) -> bool {
        if self.purchases.contains_key(&purchase.id) {
            return true;
        }
        purchase
            .redeemed_bulk_coupon_id
            .as_deref()
            .is_some_and(|coupon_id| {
                self.purchases.values().any(|p| {
                    p.user_id == purchase.user_id
                        && p.redeemed_bulk_coupon_id.as_deref() == Some(coupon_id)
                })
            })
    }

    fn take_coupon_use(&mut self, coupon_id: &str) -> bool {
        match self.coupons.get_mut(coupon_id) {
            Some(c) if c.max_uses <= 0 || c.used_count < c.max_uses => {
                c.used_count += 1;
                true
            }
            _ => false,
        }
    }
}

/// In-process store with the same uniqueness and conditional-update guarantees as the
/// database: one seat purchase per (bulk coupon, user), one entitlement per
/// (source, resource), and `used_count` never passing `max_uses`.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_resource(&self, resource: Resource) {
        let mut state = self.state.lock().await;
        state.resources.insert(resource.id.clone(), resource);
    }

    pub async fn put_link(&self, parent_id: &str, child_id: &str, position: f64) {
        let mut state = self.state.lock().await;
        state
            .links
            .retain(|l| !(l.parent_id == parent_id && l.child_id == child_id));
        state.links.push(ResourceLink {
            parent_id: parent_id.to_string(),
            child_id: child_id.to_string(),
            position,
        });
    }

    pub async fn put_product(&self, product: Product) {
        let mut state = self.state.lock().await;
        state.products.insert(product.id.clone(), product);
    }

    pub async fn put_coupon(&self, coupon: Coupon) {
        let mut state = self.state.lock().await;
        state.coupons.insert(coupon.id.clone(), coupon);
    }

    pub async fn put_purchase(&self, purchase: Purchase) {
        let mut state = self.state.lock().await;
        state.purchases.insert(purchase.id.clone(), purchase);
    }

    pub async fn put_user(&self, user: User) {
        let mut state = self.state.lock().await;
        state.users.insert(user.id.clone(), user);
    }

    pub async fn put_organization(&self, organization: Organization) {
        let mut state = self.state.lock().await;
        state
            .organizations
            .insert(organization.id.clone(), organization);
    }

    pub async fn put_membership(&self, membership: OrganizationMembership) {
        let mut state = self.state.lock().await;
        state.memberships.retain(|m| m.id != membership.id);
        state.memberships.push(membership);
    }

    pub async fn remove_membership(&self, membership_id: &str) {
        let mut state = self.state.lock().await;
        state.memberships.retain(|m| m.id != membership_id);
    }

    /// Replaces the status of a stored purchase, e.g. to simulate a refund.
    pub async fn set_purchase_status(&self, purchase_id: &str, status: PurchaseStatus) {
        let mut state = self.state.lock().await;
        if let Some(p) = state.purchases.get_mut(purchase_id) {
            p.status = status;
        }
    }

    pub async fn coupon(&self, id: &str) -> Option<Coupon> {
        self.state.lock().await.coupons.get(id).cloned()
    }

    pub async fn all_entitlements(&self) -> Vec<Entitlement> {
        self.state.lock().await.entitlements.clone()
    }

    pub async fn seat_purchases(&self, bulk_coupon_id: &str) -> Vec<Purchase> {
        self.state
            .lock()
            .await
            .purchases
            .values()
            .filter(|p| p.redeemed_bulk_coupon_id.as_deref() == Some(bulk_coupon_id))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn get_resource(&self, id: &str) -> AppResult<Option<Resource>> {
        Ok(self.state.lock().await.resources.get(id).cloned())
    }

    async fn get_child_ids(&self, parent_id: &str) -> AppResult<Vec<String>> {
        let state = self.state.lock().await;
        let mut links: Vec<&ResourceLink> = state
            .links
            .iter()
            .filter(|l| l.parent_id == parent_id)
            .collect();
        links.sort_by(|a, b| {
            a.position
                .total_cmp(&b.position)
                .then_with(|| a.child_id.cmp(&b.child_id))
        });
        Ok(links.into_iter().map(|l| l.child_id.clone()).collect())
    }

    async fn load_resource_graph(&self) -> AppResult<ResourceGraph> {
        let state = self.state.lock().await;
        Ok(ResourceGraph {
            resources: state.resources.values().cloned().collect(),
            links: state.links.clone(),
        })
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn get_product(&self, id: &str) -> AppResult<Option<Product>> {
        Ok(self.state.lock().await.products.get(id).cloned())
    }

    async fn get_coupon(&self, code_or_id: &str) -> AppResult<Option<Coupon>> {
        let state = self.state.lock().await;
        let by_code = state
            .coupons
            .values()
            .find(|c| c.code.as_deref() == Some(code_or_id));
        Ok(by_code.or_else(|| state.coupons.get(code_or_id)).cloned())
    }

    async fn get_coupon_with_bulk_purchases(
        &self,
        id: &str,
    ) -> AppResult<Option<CouponWithBulkPurchases>> {
        let state = self.state.lock().await;
        let Some(coupon) = state.coupons.get(id).cloned() else {
            return Ok(None);
        };
        let mut bulk_purchases: Vec<Purchase> = state
            .purchases
            .values()
            .filter(|p| {
                p.bulk_coupon_id.as_deref() == Some(coupon.id.as_str())
                    || coupon.bulk_purchase_id.as_deref() == Some(p.id.as_str())
            })
            .cloned()
            .collect();
        bulk_purchases.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(Some(CouponWithBulkPurchases {
            coupon,
            bulk_purchases,
        }))
    }

    async fn get_default_coupon(&self, product_ids: &[String]) -> AppResult<Option<Coupon>> {
        let state = self.state.lock().await;
        let mut defaults: Vec<&Coupon> = state
            .coupons
            .values()
            .filter(|c| c.default)
            .filter(|c| match &c.restricted_to_product_id {
                Some(pid) => product_ids.contains(pid),
                None => true,
            })
            .collect();
        // product-specific defaults win over global ones
        defaults.sort_by(|a, b| {
            b.restricted_to_product_id
                .is_some()
                .cmp(&a.restricted_to_product_id.is_some())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(defaults.first().map(|c| (*c).clone()))
    }

    async fn increment_coupon_usage_if_available(&self, coupon_id: &str) -> AppResult<bool> {
        Ok(self.state.lock().await.take_coupon_use(coupon_id))
    }
}

#[async_trait]
impl PurchaseStore for MemoryStore {
    async fn get_purchase(&self, id: &str) -> AppResult<Option<Purchase>> {
        Ok(self.state.lock().await.purchases.get(id).cloned())
    }

    async fn get_purchases_for_user(&self, user_id: &str) -> AppResult<Vec<Purchase>> {
        let state = self.state.lock().await;
        let mut purchases: Vec<Purchase> = state
            .purchases
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        purchases.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(purchases)
    }

    async fn get_purchase_details(
        &self,
        purchase_id: &str,
        user_id: &str,
    ) -> AppResult<PurchaseDetails> {
        let state = self.state.lock().await;
        let purchase = state
            .purchases
            .get(purchase_id)
            .filter(|p| p.user_id == user_id)
            .cloned();
        let existing_purchase = purchase.as_ref().and_then(|p| {
            state
                .purchases
                .values()
                .find(|other| {
                    other.id != p.id
                        && other.user_id == user_id
                        && other.product_id == p.product_id
                        && other.status == PurchaseStatus::Valid
                })
                .cloned()
        });
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
        let state = self.state.lock().await;
        Ok(state
            .purchases
            .values()
            .find(|p| {
                p.user_id == user_id && p.redeemed_bulk_coupon_id.as_deref() == Some(bulk_coupon_id)
            })
            .cloned())
    }

    async fn insert_purchase(&self, purchase: &Purchase) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        if state.purchase_conflicts(purchase) {
            return Ok(false);
        }
        state.purchases.insert(purchase.id.clone(), purchase.clone());
        Ok(true)
    }

    async fn claim_seat(&self, purchase: &Purchase) -> AppResult<SeatClaim> {
        let Some(coupon_id) = purchase.redeemed_bulk_coupon_id.as_deref() else {
            return Err(AppError::ValidationError(format!(
                "purchase {} is not a seat purchase",
                purchase.id
            )));
        };
        let mut state = self.state.lock().await;
        if state.purchase_conflicts(purchase) {
            return Ok(SeatClaim::AlreadyHeld);
        }
        if !state.take_coupon_use(coupon_id) {
            return Ok(SeatClaim::Unavailable);
        }
        state.purchases.insert(purchase.id.clone(), purchase.clone());
        Ok(SeatClaim::Claimed)
    }
}

#[async_trait]
impl MembershipStore for MemoryStore {
    async fn get_memberships_for_user(
        &self,
        user_id: &str,
    ) -> AppResult<Vec<OrganizationMembership>> {
        let state = self.state.lock().await;
        let mut memberships: Vec<OrganizationMembership> = state
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect();
        memberships.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(memberships)
    }

    async fn get_organization(&self, id: &str) -> AppResult<Option<Organization>> {
        Ok(self.state.lock().await.organizations.get(id).cloned())
    }

    async fn get_user(&self, id: &str) -> AppResult<Option<User>> {
        Ok(self.state.lock().await.users.get(id).cloned())
    }
}

#[async_trait]
impl EntitlementStore for MemoryStore {
    async fn list_active_entitlements(
        &self,
        membership_ids: &[String],
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Entitlement>> {
        let state = self.state.lock().await;
        Ok(state
            .entitlements
            .iter()
            .filter(|e| {
                e.organization_membership_id
                    .as_ref()
                    .is_some_and(|m| membership_ids.contains(m))
            })
            .filter(|e| e.is_active(now))
            .cloned()
            .collect())
    }

    async fn find_entitlements_for_source(&self, source_id: &str) -> AppResult<Vec<Entitlement>> {
        let state = self.state.lock().await;
        Ok(state
            .entitlements
            .iter()
            .filter(|e| e.source_id == source_id)
            .cloned()
            .collect())
    }

    async fn insert_entitlement(&self, entitlement: &Entitlement) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let exists = state.entitlements.iter().any(|e| {
            e.id == entitlement.id
                || (e.source_id == entitlement.source_id
                    && e.resource_id == entitlement.resource_id)
        });
        if exists {
            return Ok(false);
        }
        state.entitlements.push(entitlement.clone());
        Ok(true)
    }

    async fn soft_delete_entitlements_for_source(
        &self,
        source_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let mut state = self.state.lock().await;
        let mut changed = 0;
        for e in state
            .entitlements
            .iter_mut()
            .filter(|e| e.source_id == source_id && e.deleted_at.is_none())
        {
            e.deleted_at = Some(now);
            changed += 1;
        }
        Ok(changed)
    }
}
