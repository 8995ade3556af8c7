//! Tests for the JSON shapes exchanged with clients.

use serde_json::json;

use letter_rush::{
    Ack, ClientFrame, Command, LeaderboardEntry, Phase, Pin, PlayerView, ServerEvent, ServerFrame,
    StateSnapshot,
};

fn pin() -> Pin {
    Pin::from_number(123_456).unwrap()
}

#[test]
fn test_create_game_frame_parses_loose_payload() {
    let frame: ClientFrame = serde_json::from_value(json!({
        "id": 7,
        "command": "create_game",
        "payload": {
            "hostName": "Ana",
            "totalRounds": "3",
            "roundSeconds": 45,
            "categories": ["animal", "food"]
        }
    }))
    .unwrap();

    assert_eq!(frame.id, Some(7));
    let Command::CreateGame(create) = frame.command else {
        panic!("expected create_game");
    };
    assert_eq!(create.host_name.as_deref(), Some("Ana"));
    assert_eq!(create.total_rounds, Some(json!("3")));
    assert_eq!(create.round_seconds, Some(json!(45)));
    assert_eq!(create.categories, Some(json!(["animal", "food"])));
}

#[test]
fn test_numeric_pin_is_accepted() {
    let frame: ClientFrame = serde_json::from_value(json!({
        "command": "join_game",
        "payload": { "pin": 123456, "name": "Bo" }
    }))
    .unwrap();

    assert_eq!(frame.id, None);
    let Command::JoinGame(join) = frame.command else {
        panic!("expected join_game");
    };
    assert_eq!(join.pin, "123456");
    assert_eq!(join.name.as_deref(), Some("Bo"));
}

#[test]
fn test_answer_update_frame() {
    let frame: ClientFrame = serde_json::from_str(
        r#"{"id":1,"command":"answer_update","payload":{"pin":"123456","category":"animal","value":"Bear"}}"#,
    )
    .unwrap();
    assert_eq!(frame.command.name(), "answer_update");
}

#[test]
fn test_unknown_command_is_rejected() {
    let result = serde_json::from_value::<ClientFrame>(json!({
        "command": "launch_rockets",
        "payload": {}
    }));
    assert!(result.is_err());
}

#[test]
fn test_ack_omits_absent_fields() {
    assert_eq!(serde_json::to_value(Ack::ok()).unwrap(), json!({ "ok": true }));
    assert_eq!(
        serde_json::to_value(Ack::with_pin(pin())).unwrap(),
        json!({ "ok": true, "pin": "123456" })
    );
    assert_eq!(
        serde_json::to_value(Ack::with_valid(false)).unwrap(),
        json!({ "ok": true, "valid": false })
    );
    assert_eq!(
        serde_json::to_value(Ack::rejected("Game not found")).unwrap(),
        json!({ "ok": false, "reason": "Game not found" })
    );
}

#[test]
fn test_ack_frame_shape() {
    let frame = ServerFrame::Ack {
        ack: 3,
        data: Ack::failed(),
    };
    assert_eq!(
        serde_json::to_value(frame).unwrap(),
        json!({ "ack": 3, "data": { "ok": false } })
    );
}

#[test]
fn test_event_frames_use_camel_case_data() {
    let frame = ServerFrame::Event(ServerEvent::RoundOver {
        leaderboard: vec![LeaderboardEntry {
            name: "Ana".into(),
            score: 20,
        }],
        next_letter: 'K',
        post_ends_ts: 1_000,
    });
    assert_eq!(
        serde_json::to_value(frame).unwrap(),
        json!({
            "event": "round_over",
            "data": {
                "leaderboard": [{ "name": "Ana", "score": 20 }],
                "nextLetter": "K",
                "postEndsTs": 1000
            }
        })
    );

    let started = ServerEvent::RoundStarted {
        letter: 'B',
        deadline_ts: 5,
    };
    assert_eq!(
        serde_json::to_value(started).unwrap(),
        json!({ "event": "round_started", "data": { "letter": "B", "deadlineTs": 5 } })
    );
}

#[test]
fn test_state_snapshot_shape() {
    let snapshot = StateSnapshot {
        pin: pin(),
        round: 1,
        total_rounds: 5,
        letter: None,
        next_letter: None,
        categories: vec!["animal".into()],
        started: false,
        phase: Phase::Prep,
        prep_ends_ts: None,
        deadline_ts: None,
        post_ends_ts: None,
        round_seconds: 60,
        players: vec![PlayerView {
            name: "Host".into(),
            completed: false,
            score: 0,
        }],
    };
    assert_eq!(
        serde_json::to_value(ServerEvent::State(snapshot)).unwrap(),
        json!({
            "event": "state",
            "data": {
                "pin": "123456",
                "round": 1,
                "totalRounds": 5,
                "letter": null,
                "nextLetter": null,
                "categories": ["animal"],
                "started": false,
                "phase": "prep",
                "prepEndsTs": null,
                "deadlineTs": null,
                "postEndsTs": null,
                "roundSeconds": 60,
                "players": [{ "name": "Host", "completed": false, "score": 0 }]
            }
        })
    );
}

#[test]
fn test_event_names_match_wire_tags() {
    let events = [
        ServerEvent::GameOver {
            reason: "Host disconnected".into(),
        },
        ServerEvent::PlayerCompleted { name: "Ana".into() },
        ServerEvent::AnswerValidated {
            category: "food".into(),
            valid: true,
        },
        ServerEvent::GameFinished {
            leaderboard: Vec::new(),
        },
        ServerEvent::Error {
            reason: "bad".into(),
        },
    ];
    for event in events {
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], event.name());
    }
}

#[test]
fn test_pin_round_trips_as_string() {
    let value = serde_json::to_value(pin()).unwrap();
    assert_eq!(value, json!("123456"));
    assert!(serde_json::from_value::<Pin>(json!("012345")).is_err());
}
