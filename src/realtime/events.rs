use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{NotificationKind, notification_entity as notifications};
use crate::models::WithdrawalResponse;

/// 服务端推送给单个连接的事件
///
/// 序列化为 `{"event": "...", "data": {...}}`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum RealtimeEvent {
    NewNotification(NotificationPush),
    WithdrawalUpdate { withdrawal: WithdrawalResponse },
    Registered { user: i64 },
    Error { message: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPush {
    pub user: i64,
    /// 多行插入的通知没有回传主键
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<i64>,
    pub kind: NotificationKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl From<&notifications::Model> for NotificationPush {
    fn from(n: &notifications::Model) -> Self {
        Self {
            user: n.user_id,
            notification_id: Some(n.id),
            kind: n.kind,
            message: n.message.clone(),
            created_at: n.created_at,
        }
    }
}

/// 客户端发往服务端的事件
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// 将当前连接绑定到用户，`userOnline` 为兼容旧客户端的别名
    #[serde(rename = "register", alias = "userOnline")]
    Register(RegisterPayload),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    pub user_id: i64,
    pub token: String,
}
