use dashmap::DashMap;
use std::fmt;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::events::RealtimeEvent;

pub type EventSender = mpsc::UnboundedSender<RealtimeEvent>;

/// websocket 连接标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 在线用户目录
///
/// - `users`: 用户 → 当前连接，每个用户最多一个，后注册者覆盖（旧连接不会被通知或关闭）
/// - `connections`: 连接 → 推送通道
///
/// 查询结果只用于判断"此刻能否推送"，不在线不是错误。
#[derive(Default)]
pub struct PresenceDirectory {
    users: DashMap<i64, ConnectionId>,
    connections: DashMap<ConnectionId, EventSender>,
}

impl PresenceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新连接建立
    pub fn open(&self, connection_id: ConnectionId, sender: EventSender) {
        self.connections.insert(connection_id, sender);
        log::debug!("Realtime connection opened: {connection_id}");
    }

    /// 绑定用户到连接，返回被覆盖的旧连接
    pub fn register(&self, user_id: i64, connection_id: ConnectionId) -> Option<ConnectionId> {
        let previous = self.users.insert(user_id, connection_id);
        log::info!("User {user_id} registered with connection {connection_id}");
        previous.filter(|prev| *prev != connection_id)
    }

    /// 连接断开：移除连接以及所有指向它的用户，返回被移除的用户
    pub fn disconnect(&self, connection_id: ConnectionId) -> Vec<i64> {
        self.connections.remove(&connection_id);

        let mut removed = Vec::new();
        self.users.retain(|user_id, conn| {
            if *conn == connection_id {
                removed.push(*user_id);
                false
            } else {
                true
            }
        });
        for user_id in &removed {
            log::info!("User {user_id} disconnected ({connection_id})");
        }
        removed
    }

    pub fn lookup(&self, user_id: i64) -> Option<ConnectionId> {
        self.users.get(&user_id).map(|entry| *entry.value())
    }

    /// 尽力推送；用户不在线或通道已关闭时返回 false
    pub fn push(&self, user_id: i64, event: RealtimeEvent) -> bool {
        let Some(connection_id) = self.lookup(user_id) else {
            return false;
        };
        let Some(sender) = self
            .connections
            .get(&connection_id)
            .map(|entry| entry.value().clone())
        else {
            return false;
        };
        match sender.send(event) {
            Ok(()) => true,
            Err(_) => {
                log::debug!("Push to user {user_id} failed: connection {connection_id} closed");
                false
            }
        }
    }

    pub fn online_users(&self) -> usize {
        self.users.len()
    }
}
