use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Purchase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    NotFound,
    NotBulkCoupon,
    Expired,
    AlreadyRedeemed,
    SeatUnavailable,
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionReason::NotFound => write!(f, "not_found"),
            RejectionReason::NotBulkCoupon => write!(f, "not_bulk_coupon"),
            RejectionReason::Expired => write!(f, "expired"),
            RejectionReason::AlreadyRedeemed => write!(f, "already_redeemed"),
            RejectionReason::SeatUnavailable => write!(f, "seat_unavailable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RedemptionResult {
    Redeemed {
        purchase: Purchase,
        remaining_seats: i32,
    },
    Rejected {
        reason: RejectionReason,
    },
}

impl RedemptionResult {
    pub fn rejected(reason: RejectionReason) -> Self {
        RedemptionResult::Rejected { reason }
    }

    pub fn is_redeemed(&self) -> bool {
        matches!(self, RedemptionResult::Redeemed { .. })
    }
}

/// Outcome of writing a seat purchase together with its coupon use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatClaim {
    Claimed,
    /// The user already holds a seat from this coupon; nothing was written.
    AlreadyHeld,
    /// No uses left; nothing was written.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SeatAvailability {
    pub bulk_coupon_id: String,
    pub max_uses: i32,
    pub used_count: i32,
    pub remaining: i32,
    pub has_redemptions_left: bool,
}
