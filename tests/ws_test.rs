//! Tests for the WebSocket gateway and frame handling, without sockets.

use std::sync::Arc;

use tokio::sync::mpsc;

use letter_rush::{
    Ack, CommandHandler, ConnectionId, Gateway, Pin, RegistryOptions, ServerEvent, ServerFrame,
    SessionRegistry, WordSets, WsGateway, handle_text,
};

fn setup() -> (CommandHandler, Arc<WsGateway>) {
    let gateway = Arc::new(WsGateway::new());
    let words = WordSets::new().with_category("animal", ["bear"]);
    let registry = SessionRegistry::new(RegistryOptions::default(), Arc::new(words), gateway.clone());
    (CommandHandler::new(Arc::new(registry)), gateway)
}

fn connect(gateway: &WsGateway, id: u64) -> (ConnectionId, mpsc::UnboundedReceiver<ServerFrame>) {
    let conn = ConnectionId(id);
    let (sender, receiver) = mpsc::unbounded_channel();
    gateway.register(conn, sender);
    (conn, receiver)
}

fn drain(receiver: &mut mpsc::UnboundedReceiver<ServerFrame>) -> Vec<ServerFrame> {
    let mut frames = Vec::new();
    while let Ok(frame) = receiver.try_recv() {
        frames.push(frame);
    }
    frames
}

#[tokio::test]
async fn test_malformed_frame_gets_error_event() {
    let (handler, gateway) = setup();
    let (conn, mut inbox) = connect(&gateway, 1);

    handle_text(&handler, &gateway, conn, "{not json").await;
    handle_text(&handler, &gateway, conn, r#"{"id":1,"command":"fly"}"#).await;

    let frames = drain(&mut inbox);
    assert_eq!(frames.len(), 2);
    assert!(
        frames
            .iter()
            .all(|f| matches!(f, ServerFrame::Event(ServerEvent::Error { .. })))
    );
}

#[tokio::test]
async fn test_create_game_acks_and_subscribes() {
    let (handler, gateway) = setup();
    let (conn, mut inbox) = connect(&gateway, 1);

    handle_text(
        &handler,
        &gateway,
        conn,
        r#"{"id":9,"command":"create_game","payload":{"hostName":"Ana"}}"#,
    )
    .await;

    let pins = handler.registry().pins().await;
    assert_eq!(pins.len(), 1);
    let pin = pins[0].clone();
    // A round trip through the session guarantees its first flush happened.
    handler.registry().snapshot(&pin).await.unwrap();

    let frames = drain(&mut inbox);
    assert!(frames.contains(&ServerFrame::Ack {
        ack: 9,
        data: Ack::with_pin(pin.clone())
    }));
    assert!(
        frames
            .iter()
            .any(|f| matches!(f, ServerFrame::Event(ServerEvent::State(s)) if s.pin == pin))
    );
    assert!(gateway.room_members(&pin).contains(&conn));
}

#[tokio::test]
async fn test_frames_without_id_get_no_ack() {
    let (handler, gateway) = setup();
    let (conn, mut inbox) = connect(&gateway, 1);

    handle_text(
        &handler,
        &gateway,
        conn,
        r#"{"command":"join_game","payload":{"pin":"123456","name":"Bo"}}"#,
    )
    .await;
    assert!(drain(&mut inbox).is_empty());
}

#[tokio::test]
async fn test_rooms_route_broadcasts_and_direct_sends() {
    let gateway = WsGateway::new();
    let (a, mut inbox_a) = connect(&gateway, 1);
    let (b, mut inbox_b) = connect(&gateway, 2);
    let (_c, mut inbox_c) = connect(&gateway, 3);
    let pin = Pin::from_number(222_222).unwrap();

    gateway.join_room(&pin, a);
    gateway.join_room(&pin, b);
    gateway.broadcast(
        &pin,
        ServerEvent::PlayerCompleted { name: "Ana".into() },
    );
    gateway.send_to(
        a,
        ServerEvent::AnswerValidated {
            category: "animal".into(),
            valid: true,
        },
    );

    assert_eq!(drain(&mut inbox_a).len(), 2);
    assert_eq!(drain(&mut inbox_b).len(), 1);
    assert!(drain(&mut inbox_c).is_empty());

    gateway.leave_room(&pin, b);
    gateway.unregister(a);
    assert!(gateway.room_members(&pin).is_empty());
    assert!(!gateway.send_frame(a, ServerFrame::Ack { ack: 1, data: Ack::ok() }));

    gateway.join_room(&pin, b);
    gateway.close_room(&pin);
    gateway.broadcast(&pin, ServerEvent::GameOver { reason: "x".into() });
    assert!(drain(&mut inbox_b).is_empty());
}
