use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::middlewares::{current_user, require_admin};
use crate::models::*;
use crate::services::ContributionService;

#[utoipa::path(
    post,
    path = "/contributions",
    tag = "contributions",
    request_body = CreateContributionRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "出资成功", body = ContributionReceipt),
        (status = 400, description = "金额无效或超出剩余额度"),
        (status = 404, description = "业务不存在")
    )
)]
pub async fn create_contribution(
    service: web::Data<ContributionService>,
    req: HttpRequest,
    body: web::Json<CreateContributionRequest>,
) -> Result<HttpResponse> {
    let user = current_user(&req)?;
    let body = body.into_inner();

    match service.record(user.id, body.business_id, body.amount).await {
        Ok(receipt) => Ok(HttpResponse::Created().json(json!({
            "success": true,
            "message": "Contribution recorded",
            "data": receipt
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/contributions/business/{business_id}",
    tag = "contributions",
    params(("business_id" = i64, Path, description = "业务ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "业务的出资记录", body = [ContributionResponse]),
        (status = 404, description = "业务不存在")
    )
)]
pub async fn business_contributions(
    service: web::Data<ContributionService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.list_for_business(path.into_inner()).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({"success": true, "data": list}))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/contributions/mine",
    tag = "contributions",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "我的出资记录", body = [ContributionResponse]))
)]
pub async fn my_contributions(
    service: web::Data<ContributionService>,
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
    path = "/contributions/admin/all",
    tag = "contributions",
    params(PaginationParams),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "全部出资记录（分页）"),
        (status = 403, description = "需要管理员权限")
    )
)]
pub async fn all_contributions(
    service: web::Data<ContributionService>,
    req: HttpRequest,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    match service.list_all(&query.into_inner()).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({"success": true, "data": page}))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/contributions/{id}/approve",
    tag = "contributions",
    params(("id" = i64, Path, description = "出资记录ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "审核通过", body = ContributionResponse),
        (status = 400, description = "已审核"),
        (status = 403, description = "需要管理员权限"),
        (status = 404, description = "出资记录不存在")
    )
)]
pub async fn approve_contribution(
    service: web::Data<ContributionService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    match service.approve(path.into_inner()).await {
        Ok(c) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Contribution approved",
            "data": c
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/contributions/progress/{business_id}",
    tag = "contributions",
    params(("business_id" = i64, Path, description = "业务ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "募资进度", body = FundingProgress),
        (status = 404, description = "业务不存在")
    )
)]
pub async fn funding_progress(
    service: web::Data<ContributionService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.progress(path.into_inner()).await {
        Ok(progress) => Ok(HttpResponse::Ok().json(json!({"success": true, "data": progress}))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/contributions/leaderboard/{business_id}",
    tag = "contributions",
    params(("business_id" = i64, Path, description = "业务ID"), LeaderboardQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "出资排行榜", body = [LeaderboardEntry]),
        (status = 404, description = "业务不存在")
    )
)]
pub async fn leaderboard(
    service: web::Data<ContributionService>,
    path: web::Path<i64>,
    query: web::Query<LeaderboardQuery>,
) -> Result<HttpResponse> {
    match service.leaderboard(path.into_inner(), query.limit).await {
        Ok(board) => Ok(HttpResponse::Ok().json(json!({"success": true, "data": board}))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn contribution_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/contributions")
            .route("", web::post().to(create_contribution))
            .route("/mine", web::get().to(my_contributions))
            .route("/admin/all", web::get().to(all_contributions))
            .route("/business/{business_id}", web::get().to(business_contributions))
            .route("/progress/{business_id}", web::get().to(funding_progress))
            .route("/leaderboard/{business_id}", web::get().to(leaderboard))
            .route("/{id}/approve", web::put().to(approve_contribution)),
    );
}
