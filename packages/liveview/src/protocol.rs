//! The binary message protocol: MessagePack arrays whose first element is an
//! operation code.

use lively_core::Patch;
use rmpv::Value;
use serde::Serialize;

use crate::error::LiveViewError;

/// Top-level operation codes for messages in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventOpCode {
    /// S→C: apply one or more virtual-DOM patches.
    ApplyPatch = 1,
    /// C→S: dispatch a component-bound event.
    DispatchComponentEvent = 100,
    /// S→C: execute a JavaScript snippet on the client.
    ExecuteJs = 101,
    /// C→S: result of a previously requested JS execution.
    JsExecutionResult = 111,
    /// C→S: navigation request.
    NavigateTo = 120,
    /// S→C: streamed navigation patches, terminated by `is_final`.
    NavigationResult = 121,
    /// S→C: a referenced component UID is unknown on the server.
    ComponentUnknown = 130,
}

impl TryFrom<i64> for EventOpCode {
    type Error = LiveViewError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(EventOpCode::ApplyPatch),
            100 => Ok(EventOpCode::DispatchComponentEvent),
            101 => Ok(EventOpCode::ExecuteJs),
            111 => Ok(EventOpCode::JsExecutionResult),
            120 => Ok(EventOpCode::NavigateTo),
            121 => Ok(EventOpCode::NavigationResult),
            130 => Ok(EventOpCode::ComponentUnknown),
            other => Err(LiveViewError::UnknownOpcode(other)),
        }
    }
}

/// Client-to-server messages.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// `[100, root_uid, uid, event_name, value, is_document_event]`
    DispatchComponentEvent {
        root_uid: String,
        uid: String,
        event: String,
        value: String,
        is_document_event: bool,
    },
    /// `[111, result, exception_or_null, uid]`
    JsExecutionResult {
        result: Value,
        exception: Option<String>,
        uid: String,
    },
    /// `[120, prev_root_uid, next_uid_or_null, path, headers_map]`
    NavigateTo {
        prev_root_uid: String,
        next_uid: Option<String>,
        path: String,
        headers: Vec<(String, String)>,
    },
}

/// Server-to-client messages.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// `[1, patches]`
    ApplyPatch { patches: Vec<Patch> },
    /// `[101, code, variable_or_null, timeout_or_null, wait_for_result, uid]`
    ExecuteJs {
        code: String,
        variable: Option<String>,
        timeout_secs: Option<f64>,
        wait_for_result: bool,
        uid: String,
    },
    /// `[121, path, fullreload, component_uid_or_null, patches, is_final]`
    NavigationResult {
        path: String,
        fullreload: bool,
        component_uid: Option<String>,
        patches: Vec<Patch>,
        is_final: bool,
    },
    /// `[130, [uid, must_reload]]`
    ComponentUnknown { uid: String, must_reload: bool },
}

/// Serialize an outbound message to MessagePack bytes.
pub fn encode(message: &Outbound) -> Result<Vec<u8>, LiveViewError> {
    fn pack<T: Serialize>(value: &T) -> Result<Vec<u8>, LiveViewError> {
        rmp_serde::to_vec(value).map_err(|e| LiveViewError::Encode(e.to_string()))
    }

    match message {
        Outbound::ApplyPatch { patches } => pack(&(EventOpCode::ApplyPatch as u8, patches)),
        Outbound::ExecuteJs {
            code,
            variable,
            timeout_secs,
            wait_for_result,
            uid,
        } => pack(&(
            EventOpCode::ExecuteJs as u8,
            code,
            variable,
            timeout_secs,
            wait_for_result,
            uid,
        )),
        Outbound::NavigationResult {
            path,
            fullreload,
            component_uid,
            patches,
            is_final,
        } => pack(&(
            EventOpCode::NavigationResult as u8,
            path,
            fullreload,
            component_uid,
            patches,
            is_final,
        )),
        Outbound::ComponentUnknown { uid, must_reload } => pack(&(
            EventOpCode::ComponentUnknown as u8,
            (uid, must_reload),
        )),
    }
}

/// Decode an inbound MessagePack message.
pub fn decode(bytes: &[u8]) -> Result<Inbound, LiveViewError> {
    let value = rmpv::decode::read_value(&mut &bytes[..])
        .map_err(|e| LiveViewError::Decode(format!("not valid MessagePack: {e}")))?;

    let Value::Array(items) = value else {
        return Err(LiveViewError::Decode("expected a MessagePack array".into()));
    };
    if items.is_empty() {
        return Err(LiveViewError::Decode("empty message".into()));
    }

    let opcode = items[0]
        .as_i64()
        .ok_or_else(|| LiveViewError::Decode("opcode must be an integer".into()))?;

    match EventOpCode::try_from(opcode)? {
        EventOpCode::DispatchComponentEvent => {
            let [root_uid, uid, event, value, is_document_event] = rest::<5>(&items)?;
            Ok(Inbound::DispatchComponentEvent {
                root_uid: as_string(root_uid, "root_uid")?,
                uid: as_string(uid, "uid")?,
                event: as_string(event, "event_name")?,
                value: as_lossy_string(value),
                is_document_event: as_bool(is_document_event, "is_document_event")?,
            })
        }
        EventOpCode::JsExecutionResult => {
            let [result, exception, uid] = rest::<3>(&items)?;
            Ok(Inbound::JsExecutionResult {
                result: result.clone(),
                exception: as_opt_string(exception),
                uid: as_string(uid, "uid")?,
            })
        }
        EventOpCode::NavigateTo => {
            let [prev_root_uid, next_uid, path, headers] = rest::<4>(&items)?;
            Ok(Inbound::NavigateTo {
                prev_root_uid: as_string(prev_root_uid, "prev_root_uid")?,
                next_uid: as_opt_string(next_uid),
                path: as_string(path, "path")?,
                headers: as_headers(headers)?,
            })
        }
        other => Err(LiveViewError::Decode(format!(
            "opcode {other:?} is not valid client-to-server"
        ))),
    }
}

fn rest<const N: usize>(items: &[Value]) -> Result<[&Value; N], LiveViewError> {
    static NIL: Value = Value::Nil;

    let payload = &items[1..];
    if payload.len() < N {
        return Err(LiveViewError::Decode(format!(
            "expected {N} payload elements, got {}",
            payload.len()
        )));
    }
    let mut out = [&NIL; N];
    for (slot, value) in out.iter_mut().zip(payload.iter()) {
        *slot = value;
    }
    Ok(out)
}

fn as_string(value: &Value, field: &str) -> Result<String, LiveViewError> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| LiveViewError::Decode(format!("{field} must be a string")))
}

fn as_opt_string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_owned)
}

/// Event values are usually strings; anything else is carried as its display
/// form so handlers always see text.
fn as_lossy_string(value: &Value) -> String {
    match value {
        Value::Nil => String::new(),
        Value::String(s) => s.as_str().unwrap_or_default().to_owned(),
        other => other.to_string(),
    }
}

fn as_bool(value: &Value, field: &str) -> Result<bool, LiveViewError> {
    value
        .as_bool()
        .ok_or_else(|| LiveViewError::Decode(format!("{field} must be a boolean")))
}

fn as_headers(value: &Value) -> Result<Vec<(String, String)>, LiveViewError> {
    match value {
        Value::Nil => Ok(Vec::new()),
        Value::Map(entries) => entries
            .iter()
            .map(|(key, val)| {
                let key = key
                    .as_str()
                    .ok_or_else(|| LiveViewError::Decode("header names must be strings".into()))?;
                let val = val
                    .as_str()
                    .ok_or_else(|| LiveViewError::Decode("header values must be strings".into()))?;
                Ok((key.to_owned(), val.to_owned()))
            })
            .collect(),
        _ => Err(LiveViewError::Decode("headers must be a map".into())),
    }
}
