use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::new);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::pricing::get_price,
        handlers::coupon::validate_coupon,
        handlers::ability::get_abilities,
        handlers::ability::can_read_resource,
        handlers::bulk_coupon::redeem_seat,
        handlers::bulk_coupon::get_seats,
        handlers::entitlement::get_my_entitlements,
        handlers::admin::grant_purchase_entitlements,
        handlers::admin::revoke_purchase_entitlements,
    ),
    components(
        schemas(
            PriceBreakdown,
            PriceCalculation,
            AppliedDiscount,
            DiscountKind,
            RateSource,
            Coupon,
            CouponError,
            CouponValidation,
            ValidateCouponRequest,
            Product,
            ProductType,
            Purchase,
            PurchaseStatus,
            RedemptionResult,
            RejectionReason,
            SeatAvailability,
            Entitlement,
            EntitlementMetadata,
            EntitlementSourceType,
            GrantOutcome,
            RevokeOutcome,
            Rule,
            RuleEffect,
            RuleReason,
            Action,
            SubjectPredicate,
            CanReadResponse,
            Organization,
            OrganizationMembership,
            MembershipRole,
            UserRole,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "pricing", description = "Price computation API"),
        (name = "coupon", description = "Coupon validation API"),
        (name = "authorization", description = "Content ability API"),
        (name = "bulk-coupon", description = "Team seat redemption API"),
        (name = "entitlement", description = "Entitlement API"),
        (name = "admin", description = "Entitlement administration API"),
    ),
    info(
        title = "Courseware Backend API",
        version = "1.0.0",
        description = "Pricing, entitlement and content authorization REST API"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
