use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    Purchase, PurchaseStatus, RedemptionResult, RejectionReason, SeatAvailability, SeatClaim,
};
use crate::repositories::{CatalogStore, PurchaseStore};
use crate::services::EntitlementService;

type CouponLocks = Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>;

/// Hands out seats from team (bulk) coupons: one seat per user, never more seats
/// than `max_uses`. The per-coupon lock only orders callers in this process; the
/// store's `claim_seat` is what keeps the count right across processes.
#[derive(Clone)]
pub struct SeatRedemptionService {
    catalog: Arc<dyn CatalogStore>,
    purchases: Arc<dyn PurchaseStore>,
    entitlements: EntitlementService,
    locks: CouponLocks,
}

impl SeatRedemptionService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        purchases: Arc<dyn PurchaseStore>,
        entitlements: EntitlementService,
    ) -> Self {
        Self {
            catalog,
            purchases,
            entitlements,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn coupon_lock(&self, coupon_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(coupon_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // 没有其他调用者持有或等待该锁时移除, 避免表项无限增长
    async fn release_coupon_lock(&self, coupon_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        if Arc::strong_count(&lock) == 2 {
            locks.remove(coupon_id);
        }
    }

    pub async fn redeem(&self, bulk_coupon_id: &str, user_id: &str) -> AppResult<RedemptionResult> {
        self.redeem_at(bulk_coupon_id, user_id, Utc::now()).await
    }

    pub async fn redeem_at(
        &self,
        bulk_coupon_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<RedemptionResult> {
        let lock = self.coupon_lock(bulk_coupon_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.redeem_locked(bulk_coupon_id, user_id, now).await
        };
        self.release_coupon_lock(bulk_coupon_id, lock).await;

        let result = result?;
        match &result {
            RedemptionResult::Redeemed {
                purchase,
                remaining_seats,
            } => log::info!(
                "User {user_id} redeemed a seat from {bulk_coupon_id}: purchase={}, remaining={remaining_seats}",
                purchase.id
            ),
            RedemptionResult::Rejected { reason } => {
                log::warn!("Seat redemption of {bulk_coupon_id} by {user_id} rejected: {reason}")
            }
        }
        Ok(result)
    }

    async fn redeem_locked(
        &self,
        bulk_coupon_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> AppResult<RedemptionResult> {
        let Some(found) = self
            .catalog
            .get_coupon_with_bulk_purchases(bulk_coupon_id)
            .await?
        else {
            return Ok(RedemptionResult::rejected(RejectionReason::NotFound));
        };
        let coupon = found.coupon;

        if !coupon.is_bulk() {
            return Ok(RedemptionResult::rejected(RejectionReason::NotBulkCoupon));
        }
        if coupon.expires.is_some_and(|e| e < now) {
            return Ok(RedemptionResult::rejected(RejectionReason::Expired));
        }

        if let Some(existing) = self
            .purchases
            .find_seat_purchase(&coupon.id, user_id)
            .await?
        {
            // 之前授予失败时在这里补齐, 已存在的权益会被跳过
            self.entitlements.grant_for_purchase(&existing.id).await?;
            return Ok(RedemptionResult::rejected(RejectionReason::AlreadyRedeemed));
        }

        if !coupon.has_redemptions_left() {
            return Ok(RedemptionResult::rejected(RejectionReason::SeatUnavailable));
        }

        let owner_product = found
            .bulk_purchases
            .iter()
            .find(|p| coupon.bulk_purchase_id.as_deref() == Some(p.id.as_str()))
            .or_else(|| found.bulk_purchases.first())
            .map(|p| p.product_id.clone());
        let Some(product_id) = coupon.restricted_to_product_id.clone().or(owner_product) else {
            log::warn!("Bulk coupon {} has no product to redeem", coupon.id);
            return Ok(RedemptionResult::rejected(RejectionReason::NotBulkCoupon));
        };

        let purchase = Purchase {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            product_id,
            organization_id: None,
            status: PurchaseStatus::Valid,
            bulk_coupon_id: None,
            redeemed_bulk_coupon_id: Some(coupon.id.clone()),
            merchant_charge_id: None,
            country: None,
            total_amount: Decimal::ZERO,
            created_at: now,
        };
        match self.purchases.claim_seat(&purchase).await? {
            SeatClaim::Claimed => {}
            SeatClaim::AlreadyHeld => {
                // 另一个进程已为该用户写入座位, 由它负责授予权益
                log::warn!(
                    "Seat for {user_id} on {} was claimed concurrently",
                    coupon.id
                );
                return Ok(RedemptionResult::rejected(RejectionReason::AlreadyRedeemed));
            }
            SeatClaim::Unavailable => {
                return Ok(RedemptionResult::rejected(RejectionReason::SeatUnavailable));
            }
        }

        self.entitlements.grant_for_purchase(&purchase.id).await?;

        Ok(RedemptionResult::Redeemed {
            purchase,
            remaining_seats: (coupon.number_of_redemptions_left() - 1).max(0),
        })
    }

    pub async fn remaining_seats(&self, bulk_coupon_id: &str) -> AppResult<Option<SeatAvailability>> {
        let coupon = self
            .catalog
            .get_coupon_with_bulk_purchases(bulk_coupon_id)
            .await?
            .map(|found| found.coupon)
            .filter(|c| c.is_bulk());
        Ok(coupon.map(|c| SeatAvailability {
            bulk_coupon_id: c.id.clone(),
            max_uses: c.max_uses,
            used_count: c.used_count,
            remaining: c.number_of_redemptions_left().max(0),
            has_redemptions_left: c.has_redemptions_left(),
        }))
    }
}
