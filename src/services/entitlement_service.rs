use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    COHORT_CONTENT_ACCESS, CONTENT_ACCESS, Entitlement, EntitlementMetadata, EntitlementSourceType,
    GrantOutcome, OrganizationMembership, ProductType, Purchase, Resource, ResourceType,
    RevokeOutcome, UserRole, WORKSHOP_CONTENT_ACCESS,
};
use crate::repositories::{
    CatalogStore, EntitlementStore, MembershipStore, PurchaseStore, ResourceStore,
};

/// Ledger of content access rows created from purchases.
#[derive(Clone)]
pub struct EntitlementService {
    entitlements: Arc<dyn EntitlementStore>,
    memberships: Arc<dyn MembershipStore>,
    purchases: Arc<dyn PurchaseStore>,
    catalog: Arc<dyn CatalogStore>,
    resources: Arc<dyn ResourceStore>,
}

impl EntitlementService {
    pub fn new(
        entitlements: Arc<dyn EntitlementStore>,
        memberships: Arc<dyn MembershipStore>,
        purchases: Arc<dyn PurchaseStore>,
        catalog: Arc<dyn CatalogStore>,
        resources: Arc<dyn ResourceStore>,
    ) -> Self {
        Self {
            entitlements,
            memberships,
            purchases,
            catalog,
            resources,
        }
    }

    /// Grants access to one resource bought by `purchase`. Cohort products grant
    /// each child of the cohort instead of the cohort itself. Rows whose
    /// (purchase, resource) already exist are counted as skipped.
    pub async fn grant(
        &self,
        purchase: &Purchase,
        product_type: ProductType,
        resource: &Resource,
    ) -> AppResult<GrantOutcome> {
        let membership = self.resolve_membership(purchase).await?;

        let (entitlement_type, targets) = if product_type == ProductType::Cohort {
            let children = self.resources.get_child_ids(&resource.id).await?;
            if children.is_empty() {
                log::warn!("Cohort {} has no content to grant", resource.id);
            }
            (COHORT_CONTENT_ACCESS, children)
        } else if resource.resource_type == ResourceType::Workshop {
            (WORKSHOP_CONTENT_ACCESS, vec![resource.id.clone()])
        } else {
            (CONTENT_ACCESS, vec![resource.id.clone()])
        };

        let mut outcome = GrantOutcome::default();
        for resource_id in targets {
            let entitlement = Entitlement {
                id: Uuid::new_v4().to_string(),
                user_id: purchase.user_id.clone(),
                organization_id: Some(membership.organization_id.clone()),
                organization_membership_id: Some(membership.id.clone()),
                entitlement_type: entitlement_type.to_string(),
                source_id: purchase.id.clone(),
                source_type: EntitlementSourceType::Purchase,
                metadata: EntitlementMetadata {
                    content_ids: vec![resource_id.clone()],
                },
                resource_id,
                expires_at: None,
                deleted_at: None,
                created_at: Utc::now(),
            };
            if self.entitlements.insert_entitlement(&entitlement).await? {
                outcome.created.push(entitlement.id);
            } else {
                outcome.skipped += 1;
            }
        }

        log::info!(
            "Granted entitlements for purchase {}: created={}, skipped={}",
            purchase.id,
            outcome.created.len(),
            outcome.skipped
        );
        Ok(outcome)
    }

    /// Grants every resource of the purchased product. `Ok(None)` for an unknown
    /// purchase; refunded and disputed purchases grant nothing.
    pub async fn grant_for_purchase(&self, purchase_id: &str) -> AppResult<Option<GrantOutcome>> {
        let Some(purchase) = self.purchases.get_purchase(purchase_id).await? else {
            return Ok(None);
        };
        if !purchase.status.grants_access() {
            log::info!(
                "Purchase {} is {}, nothing to grant",
                purchase.id,
                purchase.status
            );
            return Ok(Some(GrantOutcome::default()));
        }
        let Some(product) = self.catalog.get_product(&purchase.product_id).await? else {
            log::warn!(
                "Purchase {} references missing product {}",
                purchase.id,
                purchase.product_id
            );
            return Ok(Some(GrantOutcome::default()));
        };

        let mut outcome = GrantOutcome::default();
        for resource_id in &product.resource_ids {
            match self.resources.get_resource(resource_id).await? {
                Some(resource) => {
                    outcome.merge(self.grant(&purchase, product.product_type, &resource).await?)
                }
                None => log::warn!(
                    "Product {} references missing resource {resource_id}",
                    product.id
                ),
            }
        }
        Ok(Some(outcome))
    }

    /// Soft-deletes every live entitlement created from the purchase. Repeat calls return 0.
    pub async fn revoke_for_purchase(&self, purchase_id: &str) -> AppResult<u64> {
        let revoked = self
            .entitlements
            .soft_delete_entitlements_for_source(purchase_id, Utc::now())
            .await?;
        log::info!("Revoked {revoked} entitlements for purchase {purchase_id}");
        Ok(revoked)
    }

    /// Active entitlements across every organization the user belongs to.
    pub async fn list_active_for_user(&self, user_id: &str) -> AppResult<Vec<Entitlement>> {
        let membership_ids: Vec<String> = self
            .memberships
            .get_memberships_for_user(user_id)
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect();
        if membership_ids.is_empty() {
            return Ok(Vec::new());
        }
        let now = Utc::now();
        let list = self
            .entitlements
            .list_active_entitlements(&membership_ids, now)
            .await?;
        Ok(list.into_iter().filter(|e| e.is_active(now)).collect())
    }

    /// Fails with `Unauthorized` unless `actor` is a known admin.
    pub async fn require_admin(&self, actor: Option<&str>) -> AppResult<()> {
        let Some(actor) = actor else {
            return Err(AppError::Unauthorized("admin role required".to_string()));
        };
        match self.memberships.get_user(actor).await? {
            Some(user) if user.has_role(UserRole::Admin) => Ok(()),
            _ => {
                log::warn!("User {actor} attempted an admin-only entitlement change");
                Err(AppError::Unauthorized("admin role required".to_string()))
            }
        }
    }

    pub async fn admin_grant(
        &self,
        actor: Option<&str>,
        purchase_id: &str,
    ) -> AppResult<Option<GrantOutcome>> {
        self.require_admin(actor).await?;
        self.grant_for_purchase(purchase_id).await
    }

    pub async fn admin_revoke(
        &self,
        actor: Option<&str>,
        purchase_id: &str,
    ) -> AppResult<RevokeOutcome> {
        self.require_admin(actor).await?;
        let revoked = self.revoke_for_purchase(purchase_id).await?;
        Ok(RevokeOutcome {
            purchase_id: purchase_id.to_string(),
            revoked,
        })
    }

    // 优先使用购买时所在组织的成员身份, 否则取最早加入的组织
    async fn resolve_membership(&self, purchase: &Purchase) -> AppResult<OrganizationMembership> {
        let memberships = self
            .memberships
            .get_memberships_for_user(&purchase.user_id)
            .await?;
        let in_purchase_org = purchase.organization_id.as_deref().and_then(|org| {
            memberships
                .iter()
                .find(|m| m.organization_id == org)
                .cloned()
        });
        in_purchase_org
            .or_else(|| memberships.into_iter().next())
            .ok_or_else(|| {
                AppError::ValidationError(format!(
                    "user {} has no organization membership",
                    purchase.user_id
                ))
            })
    }
}
