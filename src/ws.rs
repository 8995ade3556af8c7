//! WebSocket transport: connection registry, rooms and the socket loop.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, info, info_span, instrument, warn};

use crate::gateway::Gateway;
use crate::handler::CommandHandler;
use crate::protocol::{ClientFrame, ServerEvent, ServerFrame};
use crate::server::AppState;
use crate::{ConnectionId, Pin};

/// [`Gateway`] that writes to live WebSocket connections.
///
/// Each connection owns an unbounded queue drained by its writer task, so
/// sending never blocks a session.
#[derive(Debug, Default)]
pub struct WsGateway {
    connections: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<ServerFrame>>>,
    rooms: RwLock<HashMap<Pin, HashSet<ConnectionId>>>,
}

impl WsGateway {
    /// Creates a gateway with no connections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection's outgoing queue.
    pub fn register(&self, conn: ConnectionId, sender: mpsc::UnboundedSender<ServerFrame>) {
        self.connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(conn, sender);
    }

    /// Forgets a connection and removes it from every room.
    pub fn unregister(&self, conn: ConnectionId) {
        self.connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&conn);
        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        for members in rooms.values_mut() {
            members.remove(&conn);
        }
        rooms.retain(|_, members| !members.is_empty());
    }

    /// Queues a frame for one connection. Returns `false` if it is gone.
    pub fn send_frame(&self, conn: ConnectionId, frame: ServerFrame) -> bool {
        let connections = self.connections.read().unwrap_or_else(PoisonError::into_inner);
        match connections.get(&conn) {
            Some(sender) => sender.send(frame).is_ok(),
            None => false,
        }
    }

    /// Connections currently in the room of `pin`.
    pub fn room_members(&self, pin: &Pin) -> HashSet<ConnectionId> {
        self.rooms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(pin)
            .cloned()
            .unwrap_or_default()
    }
}

impl Gateway for WsGateway {
    fn join_room(&self, pin: &Pin, conn: ConnectionId) {
        self.rooms
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(pin.clone())
            .or_default()
            .insert(conn);
    }

    fn leave_room(&self, pin: &Pin, conn: ConnectionId) {
        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(members) = rooms.get_mut(pin) {
            members.remove(&conn);
            if members.is_empty() {
                rooms.remove(pin);
            }
        }
    }

    fn close_room(&self, pin: &Pin) {
        self.rooms
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(pin);
    }

    fn broadcast(&self, pin: &Pin, event: ServerEvent) {
        let members = self.room_members(pin);
        debug!(pin = %pin, event = event.name(), recipients = members.len(), "Broadcasting");
        for conn in members {
            self.send_frame(conn, ServerFrame::Event(event.clone()));
        }
    }

    fn send_to(&self, conn: ConnectionId, event: ServerEvent) {
        if !self.send_frame(conn, ServerFrame::Event(event)) {
            debug!(conn = %conn, "Dropping event for closed connection");
        }
    }
}

/// `GET /ws`: upgrades to a game connection.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let conn = ConnectionId::next();
    ws.on_upgrade(move |socket| {
        handle_socket(socket, conn, state).instrument(info_span!("connection", conn = %conn))
    })
}

async fn handle_socket(socket: WebSocket, conn: ConnectionId, state: AppState) {
    info!("Client connected");
    let (mut sink, mut stream) = socket.split();
    let (sender, mut outgoing) = mpsc::unbounded_channel::<ServerFrame>();
    state.gateway().register(conn, sender);

    let writer = tokio::spawn(
        async move {
            while let Some(frame) = outgoing.recv().await {
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "Failed to serialize frame");
                        continue;
                    }
                };
                if sink.send(Message::Text(text.into())).await.is_err() {
                    debug!("Socket closed while writing");
                    break;
                }
            }
        }
        .in_current_span(),
    );

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                handle_text(state.handler(), state.gateway(), conn, text.as_str()).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(error = %e, "Socket error");
                break;
            }
        }
    }

    state.handler().disconnect(conn).await;
    state.gateway().unregister(conn);
    writer.abort();
    info!("Client disconnected");
}

/// Parses and dispatches one text frame, replying on the same connection.
#[instrument(skip(handler, gateway, text))]
pub async fn handle_text(
    handler: &CommandHandler,
    gateway: &WsGateway,
    conn: ConnectionId,
    text: &str,
) {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "Malformed client frame");
            gateway.send_to(
                conn,
                ServerEvent::Error {
                    reason: format!("Malformed message: {e}"),
                },
            );
            return;
        }
    };

    let ack = handler.dispatch(conn, frame.command).await;
    if let (Some(id), Some(data)) = (frame.id, ack) {
        gateway.send_frame(conn, ServerFrame::Ack { ack: id, data });
    }
}
