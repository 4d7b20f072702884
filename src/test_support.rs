//! Fixture builders shared by the unit tests.

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;

use crate::models::*;

pub fn at(year: i32, month: u32, day: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

pub fn resource(id: &str, resource_type: ResourceType) -> Resource {
    Resource {
        id: id.to_string(),
        resource_type,
        slug: id.to_string(),
        created_by_id: None,
        visibility: ResourceVisibility::Public,
        state: ResourceState::Published,
        region_restriction: None,
    }
}

pub fn private_resource(id: &str, resource_type: ResourceType) -> Resource {
    Resource {
        visibility: ResourceVisibility::Private,
        ..resource(id, resource_type)
    }
}

pub fn link(parent_id: &str, child_id: &str, position: f64) -> ResourceLink {
    ResourceLink {
        parent_id: parent_id.to_string(),
        child_id: child_id.to_string(),
        position,
    }
}

pub fn product(id: &str, price: &str, resource_ids: &[&str]) -> Product {
    Product {
        id: id.to_string(),
        name: id.to_string(),
        product_type: ProductType::SelfPaced,
        price: price.parse().unwrap(),
        quantity_available: -1,
        resource_ids: resource_ids.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn percent_coupon(id: &str, code: Option<&str>, rate: &str) -> Coupon {
    Coupon {
        id: id.to_string(),
        code: code.map(str::to_string),
        percentage_discount: rate.parse().unwrap(),
        amount_discount: None,
        max_uses: -1,
        used_count: 0,
        expires: None,
        restricted_to_product_id: None,
        default: false,
        bulk_purchase_id: None,
    }
}

pub fn fixed_coupon(id: &str, code: &str, amount: &str) -> Coupon {
    Coupon {
        amount_discount: Some(amount.parse().unwrap()),
        ..percent_coupon(id, Some(code), "0")
    }
}

pub fn bulk_coupon(id: &str, bulk_purchase_id: &str, max_uses: i32, used_count: i32) -> Coupon {
    Coupon {
        max_uses,
        used_count,
        bulk_purchase_id: Some(bulk_purchase_id.to_string()),
        ..percent_coupon(id, None, "1")
    }
}

pub fn purchase(id: &str, user_id: &str, product_id: &str, status: PurchaseStatus) -> Purchase {
    Purchase {
        id: id.to_string(),
        user_id: user_id.to_string(),
        product_id: product_id.to_string(),
        organization_id: None,
        status,
        bulk_coupon_id: None,
        redeemed_bulk_coupon_id: None,
        merchant_charge_id: None,
        country: None,
        total_amount: Decimal::ZERO,
        created_at: at(2024, 1, 1),
    }
}

pub fn membership(id: &str, organization_id: &str, user_id: &str) -> OrganizationMembership {
    OrganizationMembership {
        id: id.to_string(),
        organization_id: organization_id.to_string(),
        user_id: user_id.to_string(),
        role: MembershipRole::Member,
        created_at: at(2024, 1, 1),
    }
}

pub fn user(id: &str, roles: &[UserRole]) -> User {
    User {
        id: id.to_string(),
        roles: roles.to_vec(),
    }
}

pub fn entitlement(id: &str, source_id: &str, resource_id: &str, membership_id: &str) -> Entitlement {
    Entitlement {
        id: id.to_string(),
        user_id: "u1".to_string(),
        organization_id: Some("org1".to_string()),
        organization_membership_id: Some(membership_id.to_string()),
        entitlement_type: CONTENT_ACCESS.to_string(),
        source_id: source_id.to_string(),
        source_type: EntitlementSourceType::Purchase,
        resource_id: resource_id.to_string(),
        metadata: EntitlementMetadata {
            content_ids: vec![resource_id.to_string()],
        },
        expires_at: None,
        deleted_at: None,
        created_at: at(2024, 1, 1),
    }
}
