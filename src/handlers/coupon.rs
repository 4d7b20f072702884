use crate::models::*;
use crate::services::PricingService;
use actix_web::{HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    post,
    path = "/coupons/validate",
    tag = "coupon",
    request_body = ValidateCouponRequest,
    responses(
        (status = 200, description = "优惠码校验结果", body = CouponValidation)
    )
)]
pub async fn validate_coupon(
    pricing_service: web::Data<PricingService>,
    request: web::Json<ValidateCouponRequest>,
) -> Result<HttpResponse> {
    let request = request.into_inner();

    match pricing_service
        .validate_coupon_code(&request.code, &request.product_ids)
        .await
    {
        Ok(validation) => Ok(HttpResponse::Ok().json(ApiResponse::success(validation))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn coupon_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/coupons").route("/validate", web::post().to(validate_coupon)));
}
