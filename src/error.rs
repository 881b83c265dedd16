use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient balance")]
    InsufficientBalance,

    #[error("Insufficient profit balance")]
    InsufficientProfitBalance,

    #[error("Already processed: {0}")]
    AlreadyProcessed(String),

    #[error("No partners to allocate profit")]
    NoPartners,

    #[error("All partnership slots are filled")]
    SlotsFull,

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl AppError {
    /// 对外暴露的错误码
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::InvalidAmount(_) => "INVALID_AMOUNT",
            AppError::InsufficientBalance => "INSUFFICIENT_BALANCE",
            AppError::InsufficientProfitBalance => "INSUFFICIENT_PROFIT_BALANCE",
            AppError::AlreadyProcessed(_) => "ALREADY_PROCESSED",
            AppError::NoPartners => "NO_PARTNERS",
            AppError::SlotsFull => "SLOTS_FULL",
            AppError::AuthError(_) | AppError::JwtError(_) => "AUTH_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Forbidden => "FORBIDDEN",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }

    /// 对外暴露的错误信息，数据库与内部错误不泄露细节
    fn public_message(&self) -> String {
        match self {
            AppError::ValidationError(msg)
            | AppError::InvalidAmount(msg)
            | AppError::AlreadyProcessed(msg)
            | AppError::AuthError(msg)
            | AppError::NotFound(msg) => msg.clone(),
            AppError::InsufficientBalance => "Insufficient balance".to_string(),
            AppError::InsufficientProfitBalance => "Insufficient profit balance".to_string(),
            AppError::NoPartners => "No partners to allocate profit".to_string(),
            AppError::SlotsFull => "All partnership slots are filled".to_string(),
            AppError::JwtError(_) => "Invalid access token".to_string(),
            AppError::Forbidden => "Forbidden".to_string(),
            AppError::DatabaseError(_) => "Database error".to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidAmount(_)
            | AppError::InsufficientBalance
            | AppError::InsufficientProfitBalance
            | AppError::AlreadyProcessed(_)
            | AppError::NoPartners
            | AppError::SlotsFull => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) | AppError::JwtError(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        match self {
            AppError::DatabaseError(err) => log::error!("Database error: {err}"),
            AppError::Forbidden => log::warn!("Forbidden access"),
            AppError::AuthError(msg) => log::warn!("Authentication error: {msg}"),
            AppError::JwtError(err) => log::warn!("JWT error: {err}"),
            _ if status_code.is_server_error() => log::error!("Internal error: {self}"),
            _ if status_code == StatusCode::NOT_FOUND => {}
            _ => log::warn!("Request rejected: {self}"),
        }

        let message = self.public_message();
        HttpResponse::build(status_code).json(json!({
            "success": false,
            "message": message,
            "error": {
                "code": self.code(),
                "message": message
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_errors_are_bad_requests() {
        for err in [
            AppError::InvalidAmount("Amount must be positive".into()),
            AppError::InsufficientBalance,
            AppError::InsufficientProfitBalance,
            AppError::AlreadyProcessed("Withdrawal already processed".into()),
            AppError::NoPartners,
            AppError::SlotsFull,
        ] {
            assert_eq!(err.status_code(), StatusCode::BAD_REQUEST, "{err}");
        }
    }

    #[test]
    fn test_database_error_hides_details() {
        let err = AppError::DatabaseError(sea_orm::DbErr::Custom("relation users missing".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Database error");
        assert_eq!(err.code(), "DATABASE_ERROR");
    }

    #[test]
    fn test_not_found_keeps_message() {
        let err = AppError::NotFound("Business not found".into());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.public_message(), "Business not found");
    }
}
