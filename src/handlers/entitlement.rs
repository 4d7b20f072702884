use crate::error::AppError;
use crate::middlewares::get_current_user_id;
use crate::models::*;
use crate::services::EntitlementService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/entitlements",
    tag = "entitlement",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "当前用户的有效权益", body = Vec<Entitlement>),
        (status = 401, description = "未授权")
    )
)]
pub async fn get_my_entitlements(
    entitlement_service: web::Data<EntitlementService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let Some(user_id) = get_current_user_id(&req) else {
        return Ok(AppError::AuthError("Missing access token".to_string()).error_response());
    };

    match entitlement_service.list_active_for_user(&user_id).await {
        Ok(list) => Ok(HttpResponse::Ok().json(ApiResponse::success(list))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn entitlement_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/entitlements", web::get().to(get_my_entitlements));
}
