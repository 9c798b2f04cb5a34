use fp_protocol::*;

#[test]
fn test_pipeline_config_deserialization_from_yaml() {
    let yaml_str = r#"
version: 1
steps:
  - id: step_review
    name: Code review
    order: 0
    color: purple
    instructions: Review the diff.
  - id: step_docs
    name: Docs
    order: 1
"#;

    let config: PipelineConfig =
        serde_yaml::from_str(yaml_str).expect("Failed to deserialize PipelineConfig");

    assert_eq!(config.version, 1);
    assert_eq!(config.steps.len(), 2);
    assert_eq!(config.steps[0].id, "step_review");
    assert_eq!(config.steps[0].instructions, "Review the diff.");
    assert_eq!(config.steps[1].color, "");
    assert!(config.steps[1].created_at.is_none());
}

#[test]
fn test_feature_status_serialization() {
    let cases = [
        (FeatureStatus::Backlog, "backlog"),
        (FeatureStatus::InProgress, "in_progress"),
        (FeatureStatus::WaitingApproval, "waiting_approval"),
        (FeatureStatus::Verified, "verified"),
        (FeatureStatus::Completed, "completed"),
        (FeatureStatus::pipeline("step_a"), "pipeline_step_a"),
    ];

    for (status, expected) in cases {
        let json = serde_json::to_value(&status).expect("Failed to serialize FeatureStatus");
        assert_eq!(json, expected);

        let back: FeatureStatus =
            serde_json::from_value(json).expect("Failed to deserialize FeatureStatus");
        assert_eq!(back, status);
    }
}

#[test]
fn test_feature_status_rejects_unknown_values() {
    let err = "shipping".parse::<FeatureStatus>().unwrap_err();
    assert_eq!(err, ParseStatusError("shipping".to_string()));
    assert_eq!(err.to_string(), "unknown feature status: shipping");
    let _: &dyn std::error::Error = &err;
    assert!("pipeline_".parse::<FeatureStatus>().is_err());
    assert!(serde_json::from_str::<FeatureStatus>("\"nope\"").is_err());
}

#[test]
fn test_session_status_serialization() {
    let json = serde_json::to_value(SessionStatus::Cancelled).expect("Failed to serialize");
    assert_eq!(json, "cancelled");

    let deserialized: SessionStatus =
        serde_json::from_value(json).expect("Failed to deserialize SessionStatus");
    assert_eq!(deserialized, SessionStatus::Cancelled);

    assert!(SessionStatus::Passed.is_terminal());
    assert!(SessionStatus::Error.is_terminal());
    assert!(!SessionStatus::Running.is_terminal());
    assert!(!SessionStatus::Pending.is_terminal());
}

#[test]
fn test_canonical_event_wire_shape() {
    let event = CanonicalEvent::assistant_text("done");
    let json = serde_json::to_value(&event).expect("Failed to serialize CanonicalEvent");

    assert_eq!(json["type"], "assistant");
    assert_eq!(json["blocks"][0]["type"], "text");
    assert_eq!(json["blocks"][0]["text"], "done");

    let start = CanonicalEvent::SessionStart {
        session_id: "t1".to_string(),
    };
    let json = serde_json::to_value(&start).expect("Failed to serialize SessionStart");
    assert_eq!(json["type"], "session_start");
    assert_eq!(json["session_id"], "t1");

    let complete = CanonicalEvent::Complete { session_id: None };
    let json = serde_json::to_value(&complete).expect("Failed to serialize Complete");
    assert_eq!(json, serde_json::json!({"type": "complete"}));
}

#[test]
fn test_canonical_event_tool_blocks() {
    let json = r#"{
        "type": "assistant",
        "blocks": [
            {"type": "tool_use", "id": "tu_1", "name": "Read", "input": {"path": "a.rs"}},
            {"type": "tool_result", "tool_use_id": "tu_1", "content": "fn main() {}"}
        ]
    }"#;

    let event: CanonicalEvent = serde_json::from_str(json).expect("Failed to parse event");
    match event {
        CanonicalEvent::Assistant { blocks } => {
            assert_eq!(blocks.len(), 2);
            assert!(matches!(&blocks[0], ContentBlock::ToolUse { name, .. } if name == "Read"));
            assert!(matches!(
                &blocks[1],
                ContentBlock::ToolResult { is_error: false, .. }
            ));
        }
        other => panic!("Expected assistant event, got {other:?}"),
    }
}

#[test]
fn test_global_config_defaults_from_empty_toml() {
    let config: GlobalConfig = toml::from_str("").expect("Failed to parse empty config");

    assert_eq!(config.sessions.scrollback_bytes, 50_000);
    assert_eq!(config.sessions.throttle_ms, 100);
    assert_eq!(config.sessions.batch_bytes, 8 * 1024);
    assert_eq!(config.agents.liveness_secs, 30);
    assert!(!config.agents.skip_tests);
}

#[test]
fn test_global_config_partial_override() {
    let config: GlobalConfig = toml::from_str(
        r#"
[sessions]
throttle_ms = 25

[agents]
skip_tests = true
"#,
    )
    .expect("Failed to parse config");

    assert_eq!(config.sessions.throttle_ms, 25);
    assert_eq!(config.sessions.scrollback_bytes, 50_000);
    assert!(config.agents.skip_tests);
}

#[test]
fn test_op_enum_serialization() {
    use uuid::Uuid;

    let op = Op::StartSession {
        scope: "/work/app".to_string(),
        command: "cargo test".to_string(),
        target_file: Some("tests/api.rs".to_string()),
    };

    let json = serde_json::to_value(&op).expect("Failed to serialize Op");
    assert_eq!(json["type"], "startSession");
    assert!(json["payload"].is_object());

    let deserialized: Op = serde_json::from_value(json).expect("Failed to deserialize Op");
    match deserialized {
        Op::StartSession {
            scope, target_file, ..
        } => {
            assert_eq!(scope, "/work/app");
            assert!(target_file.is_some());
        }
        _ => panic!("Wrong variant"),
    }

    let stop_op = Op::StopSession {
        session_id: Uuid::new_v4(),
    };
    let json = serde_json::to_value(&stop_op).expect("Failed to serialize Op::StopSession");
    assert_eq!(json["type"], "stopSession");
}

#[test]
fn test_session_event_serialization() {
    use uuid::Uuid;

    let id = Uuid::new_v4();
    let event = SessionEvent::Completed {
        session_id: id,
        scope: "/work/app".to_string(),
        command: "npm test".to_string(),
        status: SessionStatus::Failed,
        exit_code: Some(1),
        error: None,
        duration_ms: 1200,
        timestamp: chrono::Utc::now(),
    };

    let json = serde_json::to_value(&event).expect("Failed to serialize SessionEvent");
    assert_eq!(json["type"], "completed");
    assert_eq!(json["payload"]["status"], "failed");
    assert_eq!(json["payload"]["exit_code"], 1);
    assert_eq!(event.session_id(), id);
}
