//! Message protocol shapes on both directions of the wire.

use lively_core::Patch;
use lively_liveview::protocol::{decode, encode, Inbound, Outbound};
use lively_liveview::LiveViewError;
use rmpv::Value;

fn to_value(message: &Outbound) -> Value {
    let bytes = encode(message).unwrap();
    rmpv::decode::read_value(&mut bytes.as_slice()).unwrap()
}

fn from_value(value: &Value) -> Result<Inbound, LiveViewError> {
    let mut bytes = Vec::new();
    rmpv::encode::write_value(&mut bytes, value).unwrap();
    decode(&bytes)
}

#[test]
fn apply_patch_wraps_patches_in_a_single_list() {
    let message = Outbound::ApplyPatch {
        patches: vec![Patch::AlterText {
            key: "0.0".into(),
            text: Some("b".into()),
        }],
    };

    assert_eq!(
        to_value(&message),
        Value::Array(vec![
            Value::from(1),
            Value::Array(vec![Value::Array(vec![
                Value::from(3),
                Value::from("0.0"),
                Value::from("b"),
            ])]),
        ])
    );
}

#[test]
fn remove_node_patches_are_two_element_lists() {
    let message = Outbound::ApplyPatch {
        patches: vec![Patch::RemoveNode { key: "0.3".into() }],
    };
    assert_eq!(
        to_value(&message),
        Value::Array(vec![
            Value::from(1),
            Value::Array(vec![Value::Array(vec![
                Value::from(1),
                Value::from("0.3"),
            ])]),
        ])
    );
}

#[test]
fn execute_js_is_a_flat_array() {
    let message = Outbound::ExecuteJs {
        code: "alert(1)".into(),
        variable: None,
        timeout_secs: Some(2.0),
        wait_for_result: true,
        uid: "abc123".into(),
    };
    assert_eq!(
        to_value(&message),
        Value::Array(vec![
            Value::from(101),
            Value::from("alert(1)"),
            Value::Nil,
            Value::F64(2.0),
            Value::from(true),
            Value::from("abc123"),
        ])
    );
}

#[test]
fn navigation_results_carry_path_flags_and_patches() {
    let message = Outbound::NavigationResult {
        path: "/target".into(),
        fullreload: true,
        component_uid: None,
        patches: Vec::new(),
        is_final: true,
    };
    assert_eq!(
        to_value(&message),
        Value::Array(vec![
            Value::from(121),
            Value::from("/target"),
            Value::from(true),
            Value::Nil,
            Value::Array(Vec::new()),
            Value::from(true),
        ])
    );
}

#[test]
fn component_unknown_nests_its_payload() {
    let message = Outbound::ComponentUnknown {
        uid: "does-not-exist".into(),
        must_reload: true,
    };
    assert_eq!(
        to_value(&message),
        Value::Array(vec![
            Value::from(130),
            Value::Array(vec![Value::from("does-not-exist"), Value::from(true)]),
        ])
    );
}

#[test]
fn dispatch_component_event_decodes() {
    let value = Value::Array(vec![
        Value::from(100),
        Value::from("root-uid"),
        Value::from("0.1"),
        Value::from("click"),
        Value::from(""),
        Value::from(false),
    ]);
    assert_eq!(
        from_value(&value).unwrap(),
        Inbound::DispatchComponentEvent {
            root_uid: "root-uid".into(),
            uid: "0.1".into(),
            event: "click".into(),
            value: String::new(),
            is_document_event: false,
        }
    );
}

#[test]
fn js_results_keep_their_value_and_exception() {
    let value = Value::Array(vec![
        Value::from(111),
        Value::from(42),
        Value::Nil,
        Value::from("abc123"),
    ]);
    assert_eq!(
        from_value(&value).unwrap(),
        Inbound::JsExecutionResult {
            result: Value::from(42),
            exception: None,
            uid: "abc123".into(),
        }
    );

    let value = Value::Array(vec![
        Value::from(111),
        Value::Nil,
        Value::from("ReferenceError"),
        Value::from("abc123"),
    ]);
    match from_value(&value).unwrap() {
        Inbound::JsExecutionResult { exception, .. } => {
            assert_eq!(exception.as_deref(), Some("ReferenceError"));
        }
        other => panic!("expected JsExecutionResult, got {other:?}"),
    }
}

#[test]
fn navigate_to_decodes_headers_as_pairs() {
    let value = Value::Array(vec![
        Value::from(120),
        Value::from("prev-root"),
        Value::Nil,
        Value::from("/about"),
        Value::Map(vec![(Value::from("referer"), Value::from("/home"))]),
    ]);
    assert_eq!(
        from_value(&value).unwrap(),
        Inbound::NavigateTo {
            prev_root_uid: "prev-root".into(),
            next_uid: None,
            path: "/about".into(),
            headers: vec![("referer".into(), "/home".into())],
        }
    );
}

#[test]
fn unknown_opcodes_are_rejected() {
    let value = Value::Array(vec![Value::from(77)]);
    assert!(matches!(
        from_value(&value),
        Err(LiveViewError::UnknownOpcode(77))
    ));
}

#[test]
fn server_opcodes_are_not_valid_inbound() {
    let value = Value::Array(vec![Value::from(1), Value::Array(vec![])]);
    assert!(matches!(from_value(&value), Err(LiveViewError::Decode(_))));
}

#[test]
fn garbage_fails_to_decode() {
    assert!(matches!(
        decode(&[0xC1, 0xFF, 0x00]),
        Err(LiveViewError::Decode(_))
    ));
}
