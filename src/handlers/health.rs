use actix_web::{HttpResponse, Result, web};
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "服务正常"),
        (status = 503, description = "数据库不可用")
    )
)]
pub async fn health(pool: web::Data<DatabaseConnection>) -> Result<HttpResponse> {
    let backend = pool.get_database_backend();
    match pool
        .execute(Statement::from_string(backend, "SELECT 1".to_string()))
        .await
    {
        Ok(_) => Ok(HttpResponse::Ok().json(json!({"success": true, "data": {"status": "ok"}}))),
        Err(e) => {
            log::error!("Health check failed: {e}");
            Ok(HttpResponse::ServiceUnavailable().json(json!({
                "success": false,
                "message": "Database unavailable"
            })))
        }
    }
}

pub fn health_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health));
}
