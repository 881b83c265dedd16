use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::middlewares::current_user;
use crate::models::*;
use crate::services::NotificationService;

#[utoipa::path(
    get,
    path = "/notifications",
    tag = "notifications",
    params(PaginationParams),
    security(("bearer_auth" = [])),
    responses((status = 200, description = "我的通知，最新的在前"))
)]
pub async fn list_notifications(
    service: web::Data<NotificationService>,
    req: HttpRequest,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    let user = current_user(&req)?;
    match service.list(user.id, &query.into_inner()).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({"success": true, "data": page}))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/notifications/unread-count",
    tag = "notifications",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "未读数量", body = UnreadCount))
)]
pub async fn unread_count(
    service: web::Data<NotificationService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user = current_user(&req)?;
    match service.unread_count(user.id).await {
        Ok(count) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": UnreadCount { count }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/notifications/{id}/read",
    tag = "notifications",
    params(("id" = i64, Path, description = "通知ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "已标记为已读", body = NotificationResponse),
        (status = 403, description = "不是该通知的接收者"),
        (status = 404, description = "通知不存在")
    )
)]
pub async fn mark_read(
    service: web::Data<NotificationService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user = current_user(&req)?;
    match service.mark_read(user.id, path.into_inner()).await {
        Ok(n) => Ok(HttpResponse::Ok().json(json!({"success": true, "data": n}))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn notification_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/notifications")
            .route("", web::get().to(list_notifications))
            .route("/unread-count", web::get().to(unread_count))
            .route("/{id}/read", web::put().to(mark_read)),
    );
}
