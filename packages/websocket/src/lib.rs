//! RFC 6455 WebSocket frame codec with the permessage-deflate extension.
//!
//! This crate covers the wire layer only: parsing and serializing frames over
//! any async byte stream, masking, control-frame rules and per-connection
//! compression state. The HTTP upgrade handshake and the message protocol on
//! top belong to the host and the transport crate.

pub mod error;
pub mod extension;
pub mod frame;
pub mod opcodes;

pub use error::WsError;
pub use extension::{FrameExtension, PerMessageDeflate};
pub use frame::{apply_mask, Frame};
pub use opcodes::{CloseCode, OpCode};
