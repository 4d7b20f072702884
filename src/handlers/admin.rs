use crate::error::AppError;
use crate::middlewares::get_current_user_id;
use crate::models::*;
use crate::services::EntitlementService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    post,
    path = "/admin/purchases/{id}/entitlements",
    tag = "admin",
    params(
        ("id" = String, Path, description = "购买记录ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "授予结果", body = GrantOutcome),
        (status = 403, description = "需要管理员权限"),
        (status = 404, description = "购买记录不存在")
    )
)]
pub async fn grant_purchase_entitlements(
    entitlement_service: web::Data<EntitlementService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let actor = get_current_user_id(&req);
    let purchase_id = path.into_inner();

    match entitlement_service
        .admin_grant(actor.as_deref(), &purchase_id)
        .await
    {
        Ok(Some(outcome)) => Ok(HttpResponse::Ok().json(ApiResponse::success(outcome))),
        Ok(None) => {
            Ok(AppError::NotFound(format!("Purchase {purchase_id} not found")).error_response())
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/admin/purchases/{id}/entitlements",
    tag = "admin",
    params(
        ("id" = String, Path, description = "购买记录ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "撤销数量", body = RevokeOutcome),
        (status = 403, description = "需要管理员权限")
    )
)]
pub async fn revoke_purchase_entitlements(
    entitlement_service: web::Data<EntitlementService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let actor = get_current_user_id(&req);
    let purchase_id = path.into_inner();

    match entitlement_service
        .admin_revoke(actor.as_deref(), &purchase_id)
        .await
    {
        Ok(outcome) => Ok(HttpResponse::Ok().json(ApiResponse::success(outcome))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin").service(
            web::resource("/purchases/{id}/entitlements")
                .route(web::post().to(grant_purchase_entitlements))
                .route(web::delete().to(revoke_purchase_entitlements)),
        ),
    );
}
