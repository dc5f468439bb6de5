use agentcord_agent::{AgentEvent, AgentOutput, HandledStatus, RequestId, SequencedEvent, SystemLevel};
use serde_json::json;

#[test]
fn test_chat_event_serializes_with_kind_tag() {
    let event = AgentEvent::OutputChat {
        content: "hello".to_string(),
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json, json!({"type": "output.chat", "content": "hello"}));
}

#[test]
fn test_system_event_serializes_level_lowercase() {
    let event = AgentEvent::OutputSystem {
        level: SystemLevel::Warning,
        message: "disk almost full".to_string(),
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "output.system");
    assert_eq!(json["level"], "warning");
}

#[test]
fn test_input_handled_carries_request_id() {
    let request_id = RequestId::from("req-1");
    let event = AgentEvent::InputHandled {
        request_id: request_id.clone(),
        status: HandledStatus::Success,
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "input.handled");
    assert_eq!(json["request_id"], "req-1");
    assert_eq!(event.handled_request(), Some(&request_id));
}

#[test]
fn test_kind_matches_serde_tag() {
    let events = vec![
        AgentEvent::InputReceived {
            request_id: RequestId::new(),
            message: "hi".to_string(),
        },
        AgentEvent::OutputChat {
            content: "x".to_string(),
        },
        AgentEvent::OutputSystem {
            level: SystemLevel::Info,
            message: "x".to_string(),
        },
        AgentEvent::InputHandled {
            request_id: RequestId::new(),
            status: HandledStatus::Error,
        },
        AgentEvent::Idle,
    ];
    for event in events {
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.kind());
    }
}

#[test]
fn test_sequenced_event_flattens_payload() {
    let event = SequencedEvent {
        seq: 7,
        event: AgentEvent::Idle,
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json, json!({"seq": 7, "type": "idle"}));

    let parsed: SequencedEvent = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, event);
}

#[test]
fn test_request_ids_are_unique() {
    assert_ne!(RequestId::new(), RequestId::new());
}

#[test]
fn test_agent_output_into_event() {
    assert_eq!(
        AgentOutput::chat("hi").into_event(),
        AgentEvent::OutputChat {
            content: "hi".to_string()
        }
    );
    assert_eq!(
        AgentOutput::system(SystemLevel::Error, "boom").into_event(),
        AgentEvent::OutputSystem {
            level: SystemLevel::Error,
            message: "boom".to_string()
        }
    );
}
