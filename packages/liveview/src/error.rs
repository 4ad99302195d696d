//! Transport error taxonomy.

use lively_core::{ComponentError, JsExecutionError};
use lively_websocket::WsError;

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum LiveViewError {
    #[error(transparent)]
    Component(#[from] ComponentError),

    #[error(transparent)]
    Ws(#[from] WsError),

    #[error(transparent)]
    Js(#[from] JsExecutionError),

    /// The inbound message was not a MessagePack array we understand.
    #[error("malformed message: {0}")]
    Decode(String),

    /// The first element of the message named no known operation.
    #[error("unknown event opcode {0}")]
    UnknownOpcode(i64),

    /// Serializing an outbound message failed.
    #[error("failed to encode message: {0}")]
    Encode(String),

    /// The peer went away; outbound messages have nowhere to go.
    #[error("websocket connection closed")]
    ConnectionClosed,

    /// A timeout was supplied for a fire-and-forget JS execution, or another
    /// invalid combination of JS request arguments.
    #[error("invalid js request: {0}")]
    InvalidJsRequest(String),

    /// The user's event handler failed; logged, never fatal for the socket.
    #[error("event handler failed: {0}")]
    Handler(String),
}
