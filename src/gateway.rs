//! Boundary between the session engine and whatever delivers messages to
//! connections.

use tracing::instrument;

use crate::protocol::ServerEvent;
use crate::session::Outbound;
use crate::{ConnectionId, Pin};

/// Pub/sub room abstraction the engine pushes events through.
///
/// Calls must not block: sessions invoke the gateway from inside their
/// serialized mutation path.
pub trait Gateway: Send + Sync {
    /// Adds `conn` to the room of `pin`.
    fn join_room(&self, pin: &Pin, conn: ConnectionId);

    /// Removes `conn` from the room of `pin`.
    fn leave_room(&self, pin: &Pin, conn: ConnectionId);

    /// Removes every connection from the room of `pin`.
    fn close_room(&self, pin: &Pin);

    /// Sends `event` to every connection in the room of `pin`.
    fn broadcast(&self, pin: &Pin, event: ServerEvent);

    /// Sends `event` to a single connection.
    fn send_to(&self, conn: ConnectionId, event: ServerEvent);
}

/// Delivers queued session messages in order.
#[instrument(skip(gateway, pin, messages), fields(pin = %pin, count = messages.len()))]
pub fn deliver(gateway: &dyn Gateway, pin: &Pin, messages: Vec<Outbound>) {
    for message in messages {
        match message {
            Outbound::Subscribe(conn) => gateway.join_room(pin, conn),
            Outbound::Unsubscribe(conn) => gateway.leave_room(pin, conn),
            Outbound::Broadcast(event) => gateway.broadcast(pin, event),
            Outbound::SendTo(conn, event) => gateway.send_to(conn, event),
            Outbound::CloseRoom => gateway.close_room(pin),
        }
    }
}
