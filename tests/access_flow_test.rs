use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use courseware_backend::models::*;
use courseware_backend::repositories::MemoryStore;
use courseware_backend::services::*;

fn resource(id: &str, resource_type: ResourceType, visibility: ResourceVisibility) -> Resource {
    Resource {
        id: id.to_string(),
        resource_type,
        slug: id.to_string(),
        created_by_id: None,
        visibility,
        state: ResourceState::Published,
        region_restriction: None,
    }
}

fn purchase(id: &str, user_id: &str, product_id: &str) -> Purchase {
    Purchase {
        id: id.to_string(),
        user_id: user_id.to_string(),
        product_id: product_id.to_string(),
        organization_id: Some("org1".to_string()),
        status: PurchaseStatus::Valid,
        bulk_coupon_id: None,
        redeemed_bulk_coupon_id: None,
        merchant_charge_id: None,
        country: None,
        total_amount: Decimal::from(100),
        created_at: Utc::now(),
    }
}

fn membership(user_id: &str) -> OrganizationMembership {
    OrganizationMembership {
        id: format!("m-{user_id}"),
        organization_id: "org1".to_string(),
        user_id: user_id.to_string(),
        role: MembershipRole::Member,
        created_at: Utc::now(),
    }
}

struct World {
    store: Arc<MemoryStore>,
    entitlements: EntitlementService,
    authorization: AuthorizationService,
    redemption: SeatRedemptionService,
}

/// cohort c1 -> workshops w1, w2; w1 -> section s1 -> lesson l1; w2 -> lesson l2.
async fn world() -> World {
    let store = Arc::new(MemoryStore::new());
    store
        .put_resource(resource("c1", ResourceType::Cohort, ResourceVisibility::Private))
        .await;
    for (id, ty) in [
        ("w1", ResourceType::Workshop),
        ("w2", ResourceType::Workshop),
        ("s1", ResourceType::Section),
        ("l1", ResourceType::Lesson),
        ("l2", ResourceType::Lesson),
    ] {
        store
            .put_resource(resource(id, ty, ResourceVisibility::Private))
            .await;
    }
    store.put_link("c1", "w1", 0.0).await;
    store.put_link("c1", "w2", 1.0).await;
    store.put_link("w1", "s1", 0.0).await;
    store.put_link("s1", "l1", 0.0).await;
    store.put_link("w2", "l2", 0.0).await;

    store
        .put_product(Product {
            id: "cohort".to_string(),
            name: "Cohort".to_string(),
            product_type: ProductType::Cohort,
            price: Decimal::from(500),
            quantity_available: -1,
            resource_ids: vec!["c1".to_string()],
        })
        .await;
    store
        .put_product(Product {
            id: "solo".to_string(),
            name: "Workshop".to_string(),
            product_type: ProductType::SelfPaced,
            price: Decimal::from(100),
            quantity_available: -1,
            resource_ids: vec!["w2".to_string()],
        })
        .await;
    for u in ["u1", "u2", "u3", "u4", "u5"] {
        store.put_membership(membership(u)).await;
    }

    let entitlements = EntitlementService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
    );
    let authorization = AuthorizationService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        entitlements.clone(),
    );
    let redemption =
        SeatRedemptionService::new(store.clone(), store.clone(), entitlements.clone());
    World {
        store,
        entitlements,
        authorization,
        redemption,
    }
}

#[tokio::test]
async fn cohort_purchase_grants_nested_content_until_revoked() {
    let w = world().await;
    w.store.put_purchase(purchase("pur1", "u1", "cohort")).await;
    let ctx = AbilityContext::user("u1");

    assert!(!w.authorization.can_read(&ctx, "l1").await.unwrap());

    let outcome = w
        .entitlements
        .grant_for_purchase("pur1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome.created.len(), 2);

    let active = w.entitlements.list_active_for_user("u1").await.unwrap();
    assert!(active
        .iter()
        .all(|e| e.entitlement_type == COHORT_CONTENT_ACCESS));
    assert!(w.authorization.can_read(&ctx, "l1").await.unwrap());
    assert!(w.authorization.can_read(&ctx, "l2").await.unwrap());

    // 重复投递不会产生新记录
    let again = w
        .entitlements
        .grant_for_purchase("pur1")
        .await
        .unwrap()
        .unwrap();
    assert!(again.created.is_empty());
    assert_eq!(again.skipped, 2);

    assert_eq!(w.entitlements.revoke_for_purchase("pur1").await.unwrap(), 2);
    assert!(w.entitlements.list_active_for_user("u1").await.unwrap().is_empty());
    assert!(!w.authorization.can_read(&ctx, "l1").await.unwrap());
    assert_eq!(w.entitlements.revoke_for_purchase("pur1").await.unwrap(), 0);
}

#[tokio::test]
async fn workshop_grant_does_not_leak_to_sibling_workshop() {
    let w = world().await;
    w.store.put_purchase(purchase("pur2", "u2", "solo")).await;
    w.entitlements.grant_for_purchase("pur2").await.unwrap();

    let ctx = AbilityContext::user("u2");
    assert!(w.authorization.can_read(&ctx, "l2").await.unwrap());
    assert!(!w.authorization.can_read(&ctx, "l1").await.unwrap());
    assert!(!w
        .authorization
        .can_read(&AbilityContext::anonymous(), "l2")
        .await
        .unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_seat_redemptions_respect_max_uses() {
    let w = world().await;
    let mut owner = purchase("bulk", "buyer", "solo");
    owner.bulk_coupon_id = Some("team".to_string());
    w.store.put_purchase(owner).await;
    w.store
        .put_coupon(Coupon {
            id: "team".to_string(),
            code: None,
            percentage_discount: Decimal::ONE,
            amount_discount: None,
            max_uses: 3,
            used_count: 0,
            expires: None,
            restricted_to_product_id: None,
            default: false,
            bulk_purchase_id: Some("bulk".to_string()),
        })
        .await;

    let mut handles = Vec::new();
    for u in ["u1", "u2", "u3", "u4", "u5"] {
        let svc = w.redemption.clone();
        handles.push(tokio::spawn(async move { svc.redeem("team", u).await }));
    }
    let mut redeemed = 0;
    let mut unavailable = 0;
    for h in handles {
        match h.await.unwrap().unwrap() {
            RedemptionResult::Redeemed { .. } => redeemed += 1,
            RedemptionResult::Rejected {
                reason: RejectionReason::SeatUnavailable,
            } => unavailable += 1,
            other => panic!("unexpected result {other:?}"),
        }
    }
    assert_eq!(redeemed, 3);
    assert_eq!(unavailable, 2);
    assert_eq!(w.store.coupon("team").await.unwrap().used_count, 3);
    assert_eq!(w.store.seat_purchases("team").await.len(), 3);

    let seats = w.redemption.remaining_seats("team").await.unwrap().unwrap();
    assert_eq!(seats.remaining, 0);
    assert!(!seats.has_redemptions_left);
}
