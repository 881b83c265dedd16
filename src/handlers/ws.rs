use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_web::{HttpRequest, HttpResponse, Result, rt, web};
use actix_ws::{Message, MessageStream, Session};
use tokio::sync::mpsc;

use crate::config::RealtimeConfig;
use crate::error::{AppError, AppResult};
use crate::realtime::{ClientEvent, ConnectionId, PresenceDirectory, RealtimeEvent, RegisterPayload};
use crate::utils::JwtService;

/// 校验 register 事件：令牌有效且 sub 与 userId 一致
fn authorize_register(jwt: &JwtService, payload: &RegisterPayload) -> AppResult<i64> {
    let claims = jwt.verify_access_token(&payload.token)?;
    if claims.user_id()? != payload.user_id {
        return Err(AppError::AuthError(
            "Token does not belong to this user".to_string(),
        ));
    }
    Ok(payload.user_id)
}

/// 处理一条客户端文本消息，返回需要回给该连接的事件
fn handle_client_text(
    text: &str,
    connection_id: ConnectionId,
    presence: &PresenceDirectory,
    jwt: &JwtService,
) -> RealtimeEvent {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            log::debug!("Unrecognized client message on {connection_id}: {e}");
            return RealtimeEvent::Error {
                message: "Unrecognized event".to_string(),
            };
        }
    };

    match event {
        ClientEvent::Register(payload) => match authorize_register(jwt, &payload) {
            Ok(user_id) => {
                if let Some(previous) = presence.register(user_id, connection_id) {
                    log::info!("User {user_id} moved from connection {previous} to {connection_id}");
                }
                log::debug!("{} users online", presence.online_users());
                RealtimeEvent::Registered { user: user_id }
            }
            Err(e) => {
                log::warn!(
                    "Rejected register for user {} on {connection_id}: {e}",
                    payload.user_id
                );
                RealtimeEvent::Error {
                    message: "Registration rejected".to_string(),
                }
            }
        },
    }
}

async fn send_event(session: &mut Session, event: &RealtimeEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(body) => session.text(body).await.is_ok(),
        Err(e) => {
            log::error!("Failed to serialize realtime event: {e}");
            true
        }
    }
}

async fn run_session(
    mut session: Session,
    mut msg_stream: MessageStream,
    mut outbound: mpsc::UnboundedReceiver<RealtimeEvent>,
    connection_id: ConnectionId,
    presence: Arc<PresenceDirectory>,
    jwt: Arc<JwtService>,
    config: RealtimeConfig,
) {
    let mut last_heartbeat = Instant::now();
    let client_timeout = Duration::from_secs(config.client_timeout_secs);
    let mut heartbeat = tokio::time::interval(Duration::from_secs(
        config.heartbeat_interval_secs.max(1),
    ));

    let close_reason = loop {
        tokio::select! {
            msg = msg_stream.recv() => match msg {
                Some(Ok(Message::Text(text))) => {
                    last_heartbeat = Instant::now();
                    let reply = handle_client_text(&text, connection_id, &presence, &jwt);
                    if !send_event(&mut session, &reply).await {
                        break None;
                    }
                }
                Some(Ok(Message::Ping(bytes))) => {
                    last_heartbeat = Instant::now();
                    if session.pong(&bytes).await.is_err() {
                        break None;
                    }
                }
                Some(Ok(Message::Pong(_))) => {
                    last_heartbeat = Instant::now();
                }
                Some(Ok(Message::Close(reason))) => break reason,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    log::warn!("Websocket protocol error on {connection_id}: {e}");
                    break None;
                }
                None => break None,
            },
            Some(event) = outbound.recv() => {
                if !send_event(&mut session, &event).await {
                    break None;
                }
            }
            _ = heartbeat.tick() => {
                if last_heartbeat.elapsed() > client_timeout {
                    log::info!("Websocket {connection_id} timed out");
                    break None;
                }
                if session.ping(b"").await.is_err() {
                    break None;
                }
            }
        }
    };

    presence.disconnect(connection_id);
    let _ = session.close(close_reason).await;
}

#[utoipa::path(
    get,
    path = "/ws",
    tag = "realtime",
    responses(
        (status = 101, description = "升级为 websocket；连接后发送 register 事件绑定用户"),
        (status = 400, description = "不是合法的 websocket 握手")
    )
)]
pub async fn ws_connect(
    req: HttpRequest,
    body: web::Payload,
    presence: web::Data<PresenceDirectory>,
    jwt: web::Data<JwtService>,
    config: web::Data<RealtimeConfig>,
) -> Result<HttpResponse> {
    let (response, session, msg_stream) = actix_ws::handle(&req, body)?;

    let connection_id = ConnectionId::new();
    let (tx, rx) = mpsc::unbounded_channel();
    presence.open(connection_id, tx);

    rt::spawn(run_session(
        session,
        msg_stream,
        rx,
        connection_id,
        presence.into_inner(),
        jwt.into_inner(),
        config.get_ref().clone(),
    ));

    Ok(response)
}

pub fn ws_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/ws", web::get().to(ws_connect));
}
