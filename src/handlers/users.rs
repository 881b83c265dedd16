use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::middlewares::current_user;
use crate::services::UserService;

#[utoipa::path(
    get,
    path = "/users/me",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "个人资料，含钱包余额与参与的业务", body = UserProfile),
        (status = 401, description = "未授权"),
        (status = 404, description = "用户不存在")
    )
)]
pub async fn get_me(service: web::Data<UserService>, req: HttpRequest) -> Result<HttpResponse> {
    let user = current_user(&req)?;
    match service.get_profile(user.id).await {
        Ok(profile) => Ok(HttpResponse::Ok().json(json!({"success": true, "data": profile}))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn user_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/users").route("/me", web::get().to(get_me)));
}
