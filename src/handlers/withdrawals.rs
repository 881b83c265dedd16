use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::middlewares::{current_user, require_admin};
use crate::models::*;
use crate::services::WithdrawalService;

#[utoipa::path(
    post,
    path = "/withdrawals",
    tag = "withdrawals",
    request_body = CreateWithdrawalRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "提现申请已提交，金额已从钱包冻结", body = WithdrawalResponse),
        (status = 400, description = "金额无效或余额不足")
    )
)]
pub async fn request_withdrawal(
    service: web::Data<WithdrawalService>,
    req: HttpRequest,
    body: web::Json<CreateWithdrawalRequest>,
) -> Result<HttpResponse> {
    let user = current_user(&req)?;
    let body = body.into_inner();

    match service
        .request_wallet(user.id, body.amount, body.business_id)
        .await
    {
        Ok(w) => Ok(HttpResponse::Created().json(json!({
            "success": true,
            "message": "Withdrawal request submitted",
            "data": w
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/withdrawals/profit/{business_id}",
    tag = "withdrawals",
    params(("business_id" = i64, Path, description = "业务ID")),
    request_body = ProfitWithdrawalRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "收益提现申请已提交", body = WithdrawalResponse),
        (status = 400, description = "金额无效或可提收益不足"),
        (status = 404, description = "不是该业务的合伙人")
    )
)]
pub async fn request_profit_withdrawal(
    service: web::Data<WithdrawalService>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<ProfitWithdrawalRequest>,
) -> Result<HttpResponse> {
    let user = current_user(&req)?;

    match service
        .request_profit(user.id, path.into_inner(), body.amount)
        .await
    {
        Ok(w) => Ok(HttpResponse::Created().json(json!({
            "success": true,
            "message": "Withdrawal request submitted",
            "data": w
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/withdrawals/{id}/status",
    tag = "withdrawals",
    params(("id" = i64, Path, description = "提现申请ID")),
    request_body = UpdateWithdrawalStatusRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "审批完成", body = WithdrawalResponse),
        (status = 400, description = "已处理"),
        (status = 403, description = "需要管理员权限"),
        (status = 404, description = "提现申请不存在")
    )
)]
pub async fn update_withdrawal_status(
    service: web::Data<WithdrawalService>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<UpdateWithdrawalStatusRequest>,
) -> Result<HttpResponse> {
    let admin = require_admin(&req)?;

    match service.decide(path.into_inner(), body.status, admin.id).await {
        Ok(w) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": format!("Withdrawal {}", w.status),
            "data": w
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/withdrawals/history",
    tag = "withdrawals",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "我的提现记录", body = [WithdrawalResponse]))
)]
pub async fn withdrawal_history(
    service: web::Data<WithdrawalService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = current_user(&req)?;
    match service.history(user.id).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({"success": true, "data": list}))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/withdrawals",
    tag = "withdrawals",
    params(WithdrawalListQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "全部提现申请", body = [WithdrawalResponse]),
        (status = 403, description = "需要管理员权限")
    )
)]
pub async fn list_withdrawals(
    service: web::Data<WithdrawalService>,
    req: HttpRequest,
    query: web::Query<WithdrawalListQuery>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    match service.list(query.status).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({"success": true, "data": list}))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn withdrawal_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/withdrawals")
            .route("", web::post().to(request_withdrawal))
            .route("", web::get().to(list_withdrawals))
            .route("/history", web::get().to(withdrawal_history))
            .route("/profit/{business_id}", web::post().to(request_profit_withdrawal))
            .route("/{id}/status", web::put().to(update_withdrawal_status)),
    );
}
