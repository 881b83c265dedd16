use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::middlewares::require_admin;
use crate::models::*;
use crate::services::BusinessService;

#[utoipa::path(
    post,
    path = "/businesses",
    tag = "businesses",
    request_body = CreateBusinessRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "业务已创建", body = BusinessResponse),
        (status = 400, description = "请求参数错误"),
        (status = 403, description = "需要管理员权限")
    )
)]
pub async fn create_business(
    service: web::Data<BusinessService>,
    req: HttpRequest,
    body: web::Json<CreateBusinessRequest>,
) -> Result<HttpResponse> {
    let admin = require_admin(&req)?;
    match service.create(admin.id, body.into_inner()).await {
        Ok(b) => Ok(HttpResponse::Created().json(json!({"success": true, "data": b}))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/businesses",
    tag = "businesses",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "全部业务", body = [BusinessResponse]))
)]
pub async fn list_businesses(service: web::Data<BusinessService>) -> Result<HttpResponse> {
    match service.list().await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({"success": true, "data": list}))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/businesses/{id}",
    tag = "businesses",
    params(("id" = i64, Path, description = "业务ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "业务详情", body = BusinessResponse),
        (status = 404, description = "业务不存在")
    )
)]
pub async fn get_business(
    service: web::Data<BusinessService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.get(path.into_inner()).await {
        Ok(b) => Ok(HttpResponse::Ok().json(json!({"success": true, "data": b}))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn business_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/businesses")
            .route("", web::post().to(create_business))
            .route("", web::get().to(list_businesses))
            .route("/{id}", web::get().to(get_business)),
    );
}
