// Verify wire format matches what relay browser clients expect.
// These tests ensure protocol compatibility is never broken.

use pwachat_core::types::{Role, StoredMessage};
use pwachat_protocol::{ClientEvent, EventPayload, ServerEvent};

#[test]
fn hello_serialization() {
    let ev = ServerEvent::Hello {
        connection_id: "abc-123".to_string(),
        seq: 0,
    };
    let json = serde_json::to_string(&ev).unwrap();

    assert!(json.contains(r#""type":"hello""#));
    assert!(json.contains(r#""connectionId":"abc-123""#));
    assert!(json.contains(r#""seq":0"#));
}

#[test]
fn pong_serializes_without_seq() {
    let json = serde_json::to_string(&ServerEvent::Pong).unwrap();
    assert_eq!(json, r#"{"type":"pong"}"#);
}

#[test]
fn streaming_end_tag_is_snake_case() {
    let json = serde_json::to_string(&ServerEvent::StreamingEnd { seq: 7 }).unwrap();
    assert!(json.contains(r#""type":"streaming_end""#));
    assert!(json.contains(r#""seq":7"#));
}

#[test]
fn message_event_carries_stored_message_fields() {
    let msg = StoredMessage {
        id: "out-abc-1234".to_string(),
        text: "hello".to_string(),
        timestamp: 1_700_000_000_000,
        role: Role::Assistant,
        media_url: None,
        has_images: None,
        image_count: None,
    };
    let json = serde_json::to_string(&ServerEvent::Message { msg, seq: 5 }).unwrap();

    assert!(json.contains(r#""type":"message""#));
    assert!(json.contains(r#""role":"assistant""#));
    assert!(json.contains(r#""timestamp":1700000000000"#));
    assert!(json.contains(r#""seq":5"#));
    // absent optionals must not appear on the wire
    assert!(!json.contains("mediaUrl"));
    assert!(!json.contains("hasImages"));
}

#[test]
fn message_event_includes_media_and_image_metadata_when_set() {
    let msg = StoredMessage {
        id: "in-abc-1234".to_string(),
        text: "look".to_string(),
        timestamp: 1,
        role: Role::User,
        media_url: Some("/media/x.png".to_string()),
        has_images: Some(true),
        image_count: Some(2),
    };
    let json = serde_json::to_string(&msg).unwrap();

    assert!(json.contains(r#""mediaUrl":"/media/x.png""#));
    assert!(json.contains(r#""hasImages":true"#));
    assert!(json.contains(r#""imageCount":2"#));
    assert!(json.contains(r#""role":"user""#));
}

#[test]
fn history_round_trip() {
    let ev = ServerEvent::History {
        messages: vec![],
        seq: 1,
    };
    let json = serde_json::to_string(&ev).unwrap();
    assert!(json.contains(r#""messages":[]"#));

    let back: ServerEvent = serde_json::from_str(&json).unwrap();
    match back {
        ServerEvent::History { messages, seq } => {
            assert!(messages.is_empty());
            assert_eq!(seq, 1);
        }
        other => panic!("expected history event, got {other:?}"),
    }
}

#[test]
fn client_message_parses_with_images() {
    let json = r#"{"type":"message","text":"hi","images":[{"type":"image","data":"aGk=","mimeType":"image/png"}]}"#;
    let ev: ClientEvent = serde_json::from_str(json).unwrap();
    match ev {
        ClientEvent::Message { text, images } => {
            assert_eq!(text, "hi");
            assert_eq!(images.len(), 1);
            assert_eq!(images[0].mime_type, "image/png");
        }
        other => panic!("expected message event, got {other:?}"),
    }
}

#[test]
fn client_message_images_default_to_empty() {
    let ev: ClientEvent = serde_json::from_str(r#"{"type":"message","text":"hi"}"#).unwrap();
    match ev {
        ClientEvent::Message { images, .. } => assert!(images.is_empty()),
        other => panic!("expected message event, got {other:?}"),
    }
}

#[test]
fn client_ping_and_resync_parse() {
    assert!(matches!(
        serde_json::from_str::<ClientEvent>(r#"{"type":"ping"}"#).unwrap(),
        ClientEvent::Ping
    ));
    assert!(matches!(
        serde_json::from_str::<ClientEvent>(r#"{"type":"resync"}"#).unwrap(),
        ClientEvent::Resync
    ));
}

#[test]
fn unknown_client_event_fails_to_parse() {
    assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"reaction","emoji":"x"}"#).is_err());
    assert!(serde_json::from_str::<ClientEvent>(r#"not json"#).is_err());
}

#[test]
fn payload_into_event_stamps_seq() {
    let ev = EventPayload::Streaming {
        text: "hel".to_string(),
    }
    .into_event(3);
    assert_eq!(ev.seq(), Some(3));

    let json = serde_json::to_string(&ev).unwrap();
    assert!(json.contains(r#""type":"streaming""#));
    assert!(json.contains(r#""text":"hel""#));
}
