// src/handlers/realtime.rs

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, warn};

use crate::{
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::auth::User,
    realtime::{ClientCommand, ConnectionId, RealtimeHub, RealtimeMessage},
};

// GET /api/realtime
pub async fn realtime_socket(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Response {
    let hub = app_state.hub.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, hub, user))
}

async fn handle_socket(socket: WebSocket, hub: Arc<RealtimeHub>, user: User) {
    let (conn, mut outbound) = hub.connect(user.id);
    let (mut sink, mut stream) = socket.split();

    // Escritor: drena a fila da conexão até o hub descartar o sender
    let writer = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    warn!(%conn, "Falha ao serializar mensagem: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Grupos padrão: supervisores + área de origem (com catch-up)
    if user.is_supervisor() {
        if let Err(e) = hub.join_supervisors(conn, &user) {
            warn!(%conn, "Falha ao entrar em supervisors: {}", e);
        }
    }
    if let Err(e) = hub.join_area(conn, &user, &user.area_id).await {
        warn!(%conn, area_id = %user.area_id, "Falha ao entrar na área: {}", e);
    }

    while let Some(Ok(frame)) = stream.next().await {
        match frame {
            Message::Text(text) => handle_command(&hub, conn, &user, text.as_str()).await,
            Message::Close(_) => break,
            _ => {}
        }
    }

    hub.disconnect(conn);
    let _ = writer.await;
    debug!(%conn, user_id = %user.id, "WebSocket encerrado");
}

async fn handle_command(hub: &RealtimeHub, conn: ConnectionId, user: &User, raw: &str) {
    let command = match serde_json::from_str::<ClientCommand>(raw) {
        Ok(command) => command,
        Err(e) => {
            debug!(%conn, "Comando ignorado: {}", e);
            return;
        }
    };

    match command {
        ClientCommand::Ping => {
            hub.send_to(conn, &RealtimeMessage::Pong);
        }
        ClientCommand::JoinSupervisors => {
            if let Err(e) = hub.join_supervisors(conn, user) {
                warn!(%conn, "join-supervisors recusado: {}", e);
            }
        }
        ClientCommand::JoinArea { area_id } => {
            if let Err(e) = hub.join_area(conn, user, &area_id).await {
                warn!(%conn, %area_id, "join-area recusado: {}", e);
            }
        }
        ClientCommand::LeaveArea { area_id } => {
            hub.leave_area(conn, &area_id);
        }
    }
}
