use crate::error::AppError;
use crate::handlers::requester_country;
use crate::middlewares::get_current_user_id;
use crate::models::*;
use crate::services::PricingService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/pricing/{product_id}",
    tag = "pricing",
    params(
        ("product_id" = String, Path, description = "商品ID"),
        ("coupon" = Option<String>, Query, description = "优惠码"),
        ("quantity" = Option<u32>, Query, description = "购买数量, 默认 1"),
        ("country" = Option<String>, Query, description = "两位国家代码, 也可用 X-Country 头"),
        ("upgrade_from" = Option<String>, Query, description = "升级前的购买ID (需登录)")
    ),
    responses(
        (status = 200, description = "价格明细", body = PriceBreakdown),
        (status = 400, description = "请求参数错误"),
        (status = 404, description = "商品不存在")
    )
)]
pub async fn get_price(
    pricing_service: web::Data<PricingService>,
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<PriceQuery>,
) -> Result<HttpResponse> {
    let product_id = path.into_inner();
    let query = query.into_inner();

    let request = PriceRequest {
        product_id: product_id.clone(),
        coupon_code: query.coupon,
        quantity: query.quantity,
        country_code: requester_country(&req, query.country.as_deref()),
        upgrade_from_purchase_id: query.upgrade_from,
        user_id: get_current_user_id(&req),
    };

    match pricing_service.compute_price(&request).await {
        Ok(Some(breakdown)) => Ok(HttpResponse::Ok().json(ApiResponse::success(breakdown))),
        Ok(None) => Ok(AppError::NotFound(format!("Product {product_id} not found")).error_response()),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn pricing_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/pricing").route("/{product_id}", web::get().to(get_price)));
}
