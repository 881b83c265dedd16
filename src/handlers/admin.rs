use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::middlewares::require_admin;
use crate::models::*;
use crate::services::{AdminService, ContributionService, UserService, WalletService};

#[utoipa::path(
    post,
    path = "/admin/users",
    tag = "admin",
    request_body = CreateUserRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "用户已创建", body = UserResponse),
        (status = 400, description = "用户名无效或已被占用"),
        (status = 403, description = "需要管理员权限")
    )
)]
pub async fn create_user(
    service: web::Data<UserService>,
    req: HttpRequest,
    body: web::Json<CreateUserRequest>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    match service.create_user(body.into_inner()).await {
        Ok(user) => Ok(HttpResponse::Created().json(json!({"success": true, "data": user}))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/dashboard",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "后台概览", body = DashboardStats),
        (status = 403, description = "需要管理员权限")
    )
)]
pub async fn dashboard(
    service: web::Data<AdminService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    match service.dashboard().await {
        Ok(stats) => Ok(HttpResponse::Ok().json(json!({"success": true, "data": stats}))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/businesses/progress",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "全部业务的募资进度", body = [FundingProgress]),
        (status = 403, description = "需要管理员权限")
    )
)]
pub async fn businesses_progress(
    service: web::Data<ContributionService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    match service.all_progress().await {
        Ok(list) => Ok(HttpResponse::Ok().json(json!({"success": true, "data": list}))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/wallets/{user_id}/credit",
    tag = "admin",
    params(("user_id" = i64, Path, description = "用户ID")),
    request_body = CreditWalletRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "入账成功", body = WalletTransactionResponse),
        (status = 400, description = "金额无效"),
        (status = 403, description = "需要管理员权限"),
        (status = 404, description = "用户不存在")
    )
)]
pub async fn credit_wallet(
    service: web::Data<WalletService>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<CreditWalletRequest>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    let body = body.into_inner();
    match service
        .admin_credit(path.into_inner(), body.amount, body.description)
        .await
    {
        Ok(tx) => Ok(HttpResponse::Ok().json(json!({"success": true, "data": tx}))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/users", web::post().to(create_user))
            .route("/dashboard", web::get().to(dashboard))
            .route("/businesses/progress", web::get().to(businesses_progress))
            .route("/wallets/{user_id}/credit", web::post().to(credit_wallet)),
    );
}
