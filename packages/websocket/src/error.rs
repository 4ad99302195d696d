//! WebSocket error taxonomy.

use crate::opcodes::CloseCode;

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum WsError {
    /// The peer violated the framing rules: reserved bits, oversized control
    /// frames, missing mask, invalid opcode.
    #[error("websocket protocol error: {0}")]
    Protocol(String),

    /// The announced payload length exceeds the configured limit.
    #[error("payload of {size} exceeds limit of {limit} bytes")]
    PayloadTooBig { size: u64, limit: usize },

    /// A frame extension failed to encode or decode.
    #[error("websocket extension error: {0}")]
    Extension(String),

    /// The underlying stream failed or closed mid-frame.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl WsError {
    /// The close code a server should answer this error with.
    pub fn close_code(&self) -> CloseCode {
        match self {
            WsError::Protocol(_) | WsError::Extension(_) => CloseCode::ProtocolError,
            WsError::PayloadTooBig { .. } => CloseCode::MessageTooBig,
            WsError::Io(_) => CloseCode::AbnormalClosure,
        }
    }
}
