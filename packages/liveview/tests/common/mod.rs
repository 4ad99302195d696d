//! Wire helpers: a MessagePack WebSocket client talking to a served
//! connection over an in-memory duplex stream.

#![allow(dead_code)]

use lively_websocket::{Frame, OpCode};
use rmpv::Value;
use tokio::io::{AsyncWriteExt, DuplexStream};

/// Send one binary message, masked the way a browser would.
pub async fn send_value(client: &mut DuplexStream, value: &Value) {
    let mut bytes = Vec::new();
    rmpv::encode::write_value(&mut bytes, value).unwrap();
    let wire = Frame::binary(bytes).serialize(true, &mut []).unwrap();
    client.write_all(&wire).await.unwrap();
}

/// Read server frames until a binary message arrives, decoded as MessagePack.
pub async fn recv_value(client: &mut DuplexStream) -> Value {
    loop {
        let frame = Frame::parse(client, false, None, &mut [])
            .await
            .expect("server frame");
        match frame.opcode {
            OpCode::Binary => {
                return rmpv::decode::read_value(&mut frame.payload.as_ref()).unwrap();
            }
            OpCode::Ping | OpCode::Pong => continue,
            other => panic!("unexpected frame opcode {other:?}"),
        }
    }
}

/// View a decoded value as an array, panicking with context otherwise.
pub fn arr(value: &Value) -> &[Value] {
    value
        .as_array()
        .unwrap_or_else(|| panic!("expected an array, got {value:?}"))
}

/// Shorthand for a `DISPATCH_COMPONENT_EVENT` message.
pub fn dispatch_event(root_uid: &str, uid: &str, event: &str, value: &str, document: bool) -> Value {
    Value::Array(vec![
        Value::from(100),
        Value::from(root_uid),
        Value::from(uid),
        Value::from(event),
        Value::from(value),
        Value::from(document),
    ])
}
