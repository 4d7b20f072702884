pub mod ability;
pub mod admin;
pub mod bulk_coupon;
pub mod coupon;
pub mod entitlement;
pub mod pricing;

pub use ability::ability_config;
pub use admin::admin_config;
pub use bulk_coupon::bulk_coupon_config;
pub use coupon::coupon_config;
pub use entitlement::entitlement_config;
pub use pricing::pricing_config;

use actix_web::HttpRequest;

/// Requester country from the `country` query parameter, else the `X-Country` header.
pub(crate) fn requester_country(req: &HttpRequest, query_country: Option<&str>) -> Option<String> {
    query_country
        .map(str::to_string)
        .or_else(|| {
            req.headers()
                .get("X-Country")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .filter(|c| !c.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, http::StatusCode, test, web};
    use rust_decimal::Decimal;
    use serde_json::Value;

    use super::*;
    use crate::config::PricingConfig;
    use crate::middlewares::AuthMiddleware;
    use crate::models::*;
    use crate::repositories::MemoryStore;
    use crate::services::*;
    use crate::test_support::*;
    use crate::utils::JwtService;

    struct Services {
        jwt: JwtService,
        pricing: PricingService,
        entitlements: EntitlementService,
        redemption: SeatRedemptionService,
        authorization: AuthorizationService,
    }

    async fn seeded() -> Services {
        let store = Arc::new(MemoryStore::new());
        store.put_resource(resource("w1", ResourceType::Workshop)).await;
        store.put_resource(private_resource("l1", ResourceType::Lesson)).await;
        store.put_link("w1", "l1", 0.0).await;
        store.put_product(product("p1", "100", &["w1"])).await;
        store.put_coupon(percent_coupon("c20", Some("SAVE20"), "0.2")).await;
        let mut owner = purchase("bulk", "buyer", "p1", PurchaseStatus::Valid);
        owner.bulk_coupon_id = Some("team".into());
        store.put_purchase(owner).await;
        store.put_coupon(bulk_coupon("team", "bulk", 1, 0)).await;
        for u in ["u1", "u2"] {
            store
                .put_membership(membership(&format!("m-{u}"), "org1", u))
                .await;
        }

        let entitlements = EntitlementService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        );
        Services {
            jwt: JwtService::new("test-secret", 3600),
            pricing: PricingService::new(store.clone(), store.clone(), PricingConfig::default()),
            redemption: SeatRedemptionService::new(
                store.clone(),
                store.clone(),
                entitlements.clone(),
            ),
            authorization: AuthorizationService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                entitlements.clone(),
            ),
            entitlements,
        }
    }

    macro_rules! test_app {
        ($s:expr) => {
            test::init_service(
                App::new()
                    .wrap(AuthMiddleware::new($s.jwt.clone()))
                    .app_data(web::Data::new($s.pricing.clone()))
                    .app_data(web::Data::new($s.entitlements.clone()))
                    .app_data(web::Data::new($s.redemption.clone()))
                    .app_data(web::Data::new($s.authorization.clone()))
                    .service(
                        web::scope("/api/v1")
                            .configure(pricing_config)
                            .configure(coupon_config)
                            .configure(ability_config)
                            .configure(bulk_coupon_config)
                            .configure(entitlement_config)
                            .configure(admin_config),
                    ),
            )
            .await
        };
    }

    fn bearer(s: &Services, user_id: &str) -> (&'static str, String) {
        let token = s.jwt.generate_access_token(user_id).unwrap();
        ("Authorization", format!("Bearer {token}"))
    }

    #[actix_web::test]
    async fn test_get_price_with_coupon() {
        let s = seeded().await;
        let app = test_app!(s);

        let req = test::TestRequest::get()
            .uri("/api/v1/pricing/p1?coupon=SAVE20")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["appliedCouponId"], "c20");
        let total: Decimal = body["data"]["totalPrice"].as_str().unwrap().parse().unwrap();
        assert_eq!(total, Decimal::from(80));

        let req = test::TestRequest::get()
            .uri("/api/v1/pricing/missing")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_protected_routes_require_token() {
        let s = seeded().await;
        let app = test_app!(s);

        let req = test::TestRequest::get().uri("/api/v1/entitlements").to_request();
        let err = test::try_call_service(&app, req).await.err().unwrap();
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/api/v1/entitlements")
            .insert_header(("Authorization", "Bearer not-a-token"))
            .to_request();
        let err = test::try_call_service(&app, req).await.err().unwrap();
        assert_eq!(err.as_response_error().status_code(), StatusCode::UNAUTHORIZED);

        // 匿名可以查询公开内容
        let req = test::TestRequest::get()
            .uri("/api/v1/resources/w1/can-read")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["canRead"], true);
    }

    #[actix_web::test]
    async fn test_redeem_seat_then_read_lesson() {
        let s = seeded().await;
        let app = test_app!(s);

        let req = test::TestRequest::get()
            .uri("/api/v1/resources/l1/can-read")
            .insert_header(bearer(&s, "u1"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["canRead"], false);

        let req = test::TestRequest::post()
            .uri("/api/v1/bulk-coupons/team/redeem")
            .insert_header(bearer(&s, "u1"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/api/v1/resources/l1/can-read")
            .insert_header(bearer(&s, "u1"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["canRead"], true);

        let req = test::TestRequest::post()
            .uri("/api/v1/bulk-coupons/team/redeem")
            .insert_header(bearer(&s, "u2"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["data"]["reason"], "seat_unavailable");
    }

    #[actix_web::test]
    async fn test_admin_routes_need_admin_role() {
        let s = seeded().await;
        let app = test_app!(s);

        let req = test::TestRequest::delete()
            .uri("/api/v1/admin/purchases/bulk/entitlements")
            .insert_header(bearer(&s, "u1"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
