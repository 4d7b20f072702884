use crate::handlers::requester_country;
use crate::middlewares::get_current_user_id;
use crate::models::*;
use crate::services::AuthorizationService;
use crate::utils::normalize_optional_country;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

fn ability_context(req: &HttpRequest, query_country: Option<&str>) -> crate::AppResult<AbilityContext> {
    let country = normalize_optional_country(requester_country(req, query_country).as_deref())?;
    Ok(AbilityContext {
        user_id: get_current_user_id(req),
        country,
    })
}

#[utoipa::path(
    get,
    path = "/abilities",
    tag = "authorization",
    params(
        ("resource_id" = Option<String>, Query, description = "只为该资源解析继承权限"),
        ("country" = Option<String>, Query, description = "两位国家代码, 也可用 X-Country 头")
    ),
    security(
        (),
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "按顺序排列的权限规则", body = Vec<Rule>),
        (status = 400, description = "国家代码无效")
    )
)]
pub async fn get_abilities(
    authorization_service: web::Data<AuthorizationService>,
    req: HttpRequest,
    query: web::Query<AbilityQuery>,
) -> Result<HttpResponse> {
    let ctx = match ability_context(&req, query.country.as_deref()) {
        Ok(ctx) => ctx,
        Err(e) => return Ok(e.error_response()),
    };

    match authorization_service
        .get_ability_rules(&ctx, query.resource_id.as_deref())
        .await
    {
        Ok(rules) => Ok(HttpResponse::Ok().json(ApiResponse::success(rules))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/resources/{id}/can-read",
    tag = "authorization",
    params(
        ("id" = String, Path, description = "资源ID"),
        ("country" = Option<String>, Query, description = "两位国家代码, 也可用 X-Country 头")
    ),
    security(
        (),
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "是否可读", body = CanReadResponse),
        (status = 400, description = "国家代码无效")
    )
)]
pub async fn can_read_resource(
    authorization_service: web::Data<AuthorizationService>,
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<AbilityQuery>,
) -> Result<HttpResponse> {
    let resource_id = path.into_inner();
    let ctx = match ability_context(&req, query.country.as_deref()) {
        Ok(ctx) => ctx,
        Err(e) => return Ok(e.error_response()),
    };

    match authorization_service.can_read(&ctx, &resource_id).await {
        Ok(can_read) => Ok(HttpResponse::Ok().json(ApiResponse::success(CanReadResponse {
            resource_id,
            can_read,
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn ability_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/abilities", web::get().to(get_abilities)).route(
        "/resources/{id}/can-read",
        web::get().to(can_read_resource),
    );
}
