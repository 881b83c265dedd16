use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::middlewares::{current_user, require_admin};
use crate::models::*;
use crate::services::PartnershipService;

#[utoipa::path(
    post,
    path = "/partnerships/buy/{business_id}",
    tag = "partnerships",
    params(("business_id" = i64, Path, description = "业务ID")),
    request_body(content = BuyPartnershipRequest, description = "可省略，缺省购买 1 份"),
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "购买成功", body = PartnershipResponse),
        (status = 400, description = "名额已满或余额不足"),
        (status = 404, description = "业务不存在")
    )
)]
pub async fn buy_partnership(
    service: web::Data<PartnershipService>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: Option<web::Json<BuyPartnershipRequest>>,
) -> Result<HttpResponse> {
    let user = current_user(&req)?;
    let slots = body.and_then(|b| b.into_inner().slots);

    match service.buy(user.id, path.into_inner(), slots).await {
        Ok(p) => Ok(HttpResponse::Created().json(json!({
            "success": true,
            "message": "Partnership purchased successfully",
            "data": p
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/partnerships/mine",
    tag = "partnerships",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "我的合伙记录", body = [PartnershipResponse]))
)]
pub async fn my_partnerships(
    service: web::Data<PartnershipService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = current_user(&req)?;
    match service.list_mine(user.id).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({"success": true, "data": list}))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/partnerships/business/{business_id}",
    tag = "partnerships",
    params(("business_id" = i64, Path, description = "业务ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "业务的合伙人", body = [PartnershipResponse]),
        (status = 403, description = "需要管理员权限"),
        (status = 404, description = "业务不存在")
    )
)]
pub async fn business_partnerships(
    service: web::Data<PartnershipService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    match service.list_for_business(path.into_inner()).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({"success": true, "data": list}))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn partnership_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/partnerships")
            .route("/buy/{business_id}", web::post().to(buy_partnership))
            .route("/mine", web::get().to(my_partnerships))
            .route("/business/{business_id}", web::get().to(business_partnerships)),
    );
}
