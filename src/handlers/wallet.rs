use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::middlewares::current_user;
use crate::services::WalletService;

#[utoipa::path(
    get,
    path = "/wallet/me",
    tag = "wallet",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "我的钱包及最近流水", body = WalletResponse))
)]
pub async fn my_wallet(
    service: web::Data<WalletService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = current_user(&req)?;
    match service.get_wallet(user.id).await {
        Ok(wallet) => Ok(HttpResponse::Ok().json(json!({"success": true, "data": wallet}))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn wallet_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/wallet").route("/me", web::get().to(my_wallet)));
}
