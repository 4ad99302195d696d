//! Frame extensions: transformations applied while serializing and parsing,
//! with permessage-deflate (RFC 7692) as the concrete implementation.

use bytes::Bytes;
use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress};

use crate::error::WsError;
use crate::frame::Frame;
use crate::opcodes::OpCode;

/// The trailing bytes of every `Z_SYNC_FLUSH` block, stripped on encode and
/// re-appended on decode per RFC 7692 §7.2.1.
const DEFLATE_TAIL: [u8; 4] = [0x00, 0x00, 0xFF, 0xFF];

/// A WebSocket frame extension. Encode runs on outgoing frames in
/// registration order, decode on incoming frames in reverse order.
pub trait FrameExtension: Send {
    /// The extension name as it appears in `Sec-WebSocket-Extensions`.
    fn name(&self) -> &str;

    fn encode(&mut self, frame: Frame) -> Result<Frame, WsError>;

    fn decode(&mut self, frame: Frame) -> Result<Frame, WsError>;
}

/// permessage-deflate: compresses non-control frames with raw DEFLATE.
///
/// The compressor and decompressor are stateful and per-connection; the
/// `no_context_takeover` flags reset them between messages. The window-bits
/// parameter is validated to `[8, 15]`; decompression always runs with a full
/// 32K window, which accepts any smaller client window.
pub struct PerMessageDeflate {
    client_no_context_takeover: bool,
    server_no_context_takeover: bool,
    client_max_window_bits: u8,
    compressor: Compress,
    decompressor: Decompress,
}

impl PerMessageDeflate {
    pub const NAME: &'static str = "permessage-deflate";

    pub fn new(
        client_no_context_takeover: bool,
        server_no_context_takeover: bool,
        client_max_window_bits: u8,
    ) -> Result<Self, WsError> {
        if !(8..=15).contains(&client_max_window_bits) {
            return Err(WsError::Extension(format!(
                "client_max_window_bits must be between 8 and 15, got {client_max_window_bits}"
            )));
        }
        Ok(Self {
            client_no_context_takeover,
            server_no_context_takeover,
            client_max_window_bits,
            compressor: Compress::new(Compression::default(), false),
            decompressor: Decompress::new(false),
        })
    }

    pub fn client_max_window_bits(&self) -> u8 {
        self.client_max_window_bits
    }

    fn deflate(&mut self, input: &[u8]) -> Result<Vec<u8>, WsError> {
        let mut output = Vec::with_capacity(input.len() + 64);
        let mut consumed = 0usize;
        loop {
            if output.len() == output.capacity() {
                output.reserve(input.len().max(64));
            }
            let before = self.compressor.total_in();
            self.compressor
                .compress_vec(&input[consumed..], &mut output, FlushCompress::Sync)
                .map_err(|e| WsError::Extension(format!("deflate failed: {e}")))?;
            consumed += (self.compressor.total_in() - before) as usize;
            if consumed >= input.len() && output.len() < output.capacity() {
                break;
            }
        }
        Ok(output)
    }

    fn inflate(&mut self, input: &[u8]) -> Result<Vec<u8>, WsError> {
        let mut output = Vec::with_capacity(input.len().saturating_mul(2).max(64));
        let mut consumed = 0usize;
        loop {
            if output.len() == output.capacity() {
                output.reserve(input.len().max(64));
            }
            let before = self.decompressor.total_in();
            self.decompressor
                .decompress_vec(&input[consumed..], &mut output, FlushDecompress::Sync)
                .map_err(|e| WsError::Extension(format!("inflate failed: {e}")))?;
            consumed += (self.decompressor.total_in() - before) as usize;
            if consumed >= input.len() && output.len() < output.capacity() {
                break;
            }
        }
        Ok(output)
    }
}

impl FrameExtension for PerMessageDeflate {
    fn name(&self) -> &str {
        Self::NAME
    }

    /// Compress with `Z_SYNC_FLUSH`, strip the 4-byte tail and set RSV1 on
    /// the first (non-continuation) frame of the message. Control frames pass
    /// through.
    fn encode(&mut self, mut frame: Frame) -> Result<Frame, WsError> {
        if frame.opcode.is_control() {
            return Ok(frame);
        }

        let mut compressed = self.deflate(&frame.payload)?;
        if compressed.ends_with(&DEFLATE_TAIL) {
            compressed.truncate(compressed.len() - DEFLATE_TAIL.len());
        }
        frame.payload = Bytes::from(compressed);

        if frame.opcode != OpCode::Continuation {
            frame.rsv1 = true;
        }

        if self.server_no_context_takeover {
            self.compressor = Compress::new(Compression::default(), false);
        }
        Ok(frame)
    }

    /// Re-append the tail, decompress, and clear RSV1 on non-continuation
    /// frames so the frame check passes. Control frames pass through.
    fn decode(&mut self, mut frame: Frame) -> Result<Frame, WsError> {
        if frame.opcode.is_control() {
            return Ok(frame);
        }

        let mut input = frame.payload.to_vec();
        input.extend_from_slice(&DEFLATE_TAIL);
        frame.payload = Bytes::from(self.inflate(&input)?);

        if frame.opcode != OpCode::Continuation {
            frame.rsv1 = false;
        }

        if self.client_no_context_takeover {
            self.decompressor = Decompress::new(false);
        }
        Ok(frame)
    }
}

impl std::fmt::Debug for PerMessageDeflate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerMessageDeflate")
            .field(
                "client_no_context_takeover",
                &self.client_no_context_takeover,
            )
            .field(
                "server_no_context_takeover",
                &self.server_no_context_takeover,
            )
            .field("client_max_window_bits", &self.client_max_window_bits)
            .finish()
    }
}
