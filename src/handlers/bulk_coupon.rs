use crate::error::AppError;
use crate::middlewares::get_current_user_id;
use crate::models::*;
use crate::services::SeatRedemptionService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, http::StatusCode, web};

fn rejection_status(reason: RejectionReason) -> StatusCode {
    match reason {
        RejectionReason::NotFound => StatusCode::NOT_FOUND,
        RejectionReason::NotBulkCoupon | RejectionReason::Expired => StatusCode::BAD_REQUEST,
        RejectionReason::AlreadyRedeemed | RejectionReason::SeatUnavailable => StatusCode::CONFLICT,
    }
}

#[utoipa::path(
    post,
    path = "/bulk-coupons/{id}/redeem",
    tag = "bulk-coupon",
    params(
        ("id" = String, Path, description = "团队券ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "兑换成功", body = RedemptionResult),
        (status = 400, description = "不是团队券或已过期", body = RedemptionResult),
        (status = 401, description = "未授权"),
        (status = 404, description = "团队券不存在", body = RedemptionResult),
        (status = 409, description = "已兑换或座位已满", body = RedemptionResult)
    )
)]
pub async fn redeem_seat(
    redemption_service: web::Data<SeatRedemptionService>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let Some(user_id) = get_current_user_id(&req) else {
        return Ok(AppError::AuthError("Missing access token".to_string()).error_response());
    };
    let coupon_id = path.into_inner();

    match redemption_service.redeem(&coupon_id, &user_id).await {
        Ok(result) => match result {
            RedemptionResult::Redeemed { .. } => {
                Ok(HttpResponse::Ok().json(ApiResponse::success(result)))
            }
            RedemptionResult::Rejected { reason } => {
                let code = reason.to_string().to_ascii_uppercase();
                Ok(HttpResponse::build(rejection_status(reason)).json(ApiResponse::failure(
                    result,
                    code,
                    format!("Seat redemption rejected: {reason}"),
                )))
            }
        },
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/bulk-coupons/{id}/seats",
    tag = "bulk-coupon",
    params(
        ("id" = String, Path, description = "团队券ID")
    ),
    responses(
        (status = 200, description = "剩余座位", body = SeatAvailability),
        (status = 404, description = "团队券不存在")
    )
)]
pub async fn get_seats(
    redemption_service: web::Data<SeatRedemptionService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let coupon_id = path.into_inner();

    match redemption_service.remaining_seats(&coupon_id).await {
        Ok(Some(seats)) => Ok(HttpResponse::Ok().json(ApiResponse::success(seats))),
        Ok(None) => {
            Ok(AppError::NotFound(format!("Bulk coupon {coupon_id} not found")).error_response())
        }
        Err(e) => Ok(e.error_response()),
    }
}

pub fn bulk_coupon_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/bulk-coupons")
            .route("/{id}/redeem", web::post().to(redeem_seat))
            .route("/{id}/seats", web::get().to(get_seats)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_status() {
        assert_eq!(rejection_status(RejectionReason::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            rejection_status(RejectionReason::SeatUnavailable),
            StatusCode::CONFLICT
        );
        assert_eq!(rejection_status(RejectionReason::Expired), StatusCode::BAD_REQUEST);
    }
}
