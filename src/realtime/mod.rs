//! 实时推送：在线用户目录与 websocket 事件

pub mod events;
pub mod presence;

pub use events::{ClientEvent, NotificationPush, RealtimeEvent, RegisterPayload};
pub use presence::{ConnectionId, EventSender, PresenceDirectory};
