use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::middlewares::require_admin;
use crate::models::*;
use crate::services::ProfitService;

#[utoipa::path(
    post,
    path = "/statements/{business_id}",
    tag = "statements",
    params(("business_id" = i64, Path, description = "业务ID")),
    request_body = CreateStatementRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "月度报表已添加", body = StatementResponse),
        (status = 403, description = "需要管理员权限"),
        (status = 404, description = "业务不存在")
    )
)]
pub async fn add_statement(
    service: web::Data<ProfitService>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<CreateStatementRequest>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    match service
        .add_statement(path.into_inner(), body.into_inner())
        .await
    {
        Ok(statement) => Ok(HttpResponse::Created().json(json!({
            "success": true,
            "message": "Statement added",
            "data": statement
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/statements/{business_id}",
    tag = "statements",
    params(("business_id" = i64, Path, description = "业务ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "业务的月度报表", body = [StatementResponse]),
        (status = 404, description = "业务不存在")
    )
)]
pub async fn list_statements(
    service: web::Data<ProfitService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.list_statements(path.into_inner()).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({"success": true, "data": list}))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/statements/{business_id}/allocate-profit",
    tag = "statements",
    params(("business_id" = i64, Path, description = "业务ID")),
    request_body = AllocateProfitRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "收益已分配", body = ProfitAllocation),
        (status = 400, description = "金额无效或没有合伙人"),
        (status = 403, description = "需要管理员权限"),
        (status = 404, description = "业务不存在")
    )
)]
pub async fn allocate_profit(
    service: web::Data<ProfitService>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<AllocateProfitRequest>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    let body = body.into_inner();
    match service
        .allocate_profit(path.into_inner(), body.total_profit, body.month)
        .await
    {
        Ok(allocation) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Profit allocated successfully",
            "data": allocation
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/statements/{business_id}/profit-history",
    tag = "statements",
    params(("business_id" = i64, Path, description = "业务ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "历次收益分配", body = [ProfitAllocation]),
        (status = 404, description = "业务不存在")
    )
)]
pub async fn profit_history(
    service: web::Data<ProfitService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.profit_history(path.into_inner()).await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({"success": true, "data": list}))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn statement_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/statements")
            .route("/{business_id}", web::post().to(add_statement))
            .route("/{business_id}", web::get().to(list_statements))
            .route("/{business_id}/allocate-profit", web::post().to(allocate_profit))
            .route("/{business_id}/profit-history", web::get().to(profit_history)),
    );
}
