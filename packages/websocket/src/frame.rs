//! WebSocket frame parsing and serialization per RFC 6455.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::WsError;
use crate::extension::FrameExtension;
use crate::opcodes::{CloseCode, OpCode};

/// XOR `data` with a 4-byte mask, in place.
pub fn apply_mask(data: &mut [u8], mask: [u8; 4]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= mask[i % 4];
    }
}

/// A single WebSocket frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub fin: bool,
    pub rsv1: bool,
    pub rsv2: bool,
    pub rsv3: bool,
    pub opcode: OpCode,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(opcode: OpCode, payload: impl Into<Bytes>) -> Self {
        Self {
            fin: true,
            rsv1: false,
            rsv2: false,
            rsv3: false,
            opcode,
            payload: payload.into(),
        }
    }

    pub fn binary(payload: impl Into<Bytes>) -> Self {
        Self::new(OpCode::Binary, payload)
    }

    pub fn text(payload: impl Into<String>) -> Self {
        let payload: String = payload.into();
        Self::new(OpCode::Text, payload.into_bytes())
    }

    pub fn ping(payload: impl Into<Bytes>) -> Self {
        Self::new(OpCode::Ping, payload)
    }

    pub fn pong(payload: impl Into<Bytes>) -> Self {
        Self::new(OpCode::Pong, payload)
    }

    /// A close frame carrying a status code and a UTF-8 reason. The reason is
    /// truncated so the control-frame payload never exceeds 125 bytes.
    pub fn close(code: CloseCode, reason: &str) -> Self {
        let mut payload = Vec::with_capacity(2 + reason.len().min(123));
        payload.extend_from_slice(&code.code().to_be_bytes());
        let mut reason = reason.as_bytes();
        if reason.len() > 123 {
            reason = &reason[..123];
        }
        payload.extend_from_slice(reason);
        Self::new(OpCode::Close, payload)
    }

    /// Decode a close frame's payload into (code, reason). An empty payload
    /// means no status was sent (1005).
    pub fn parse_close(&self) -> (u16, String) {
        if self.payload.len() < 2 {
            return (CloseCode::NoStatusReceived.code(), String::new());
        }
        let code = u16::from_be_bytes([self.payload[0], self.payload[1]]);
        let reason = String::from_utf8_lossy(&self.payload[2..]).into_owned();
        (code, reason)
    }

    /// Check reserved bits and control-frame rules.
    ///
    /// Extensions must have cleared RSV1 during decode before this runs; any
    /// reserved bit still set is a protocol error.
    pub fn check(&self) -> Result<(), WsError> {
        if self.rsv1 || self.rsv2 || self.rsv3 {
            return Err(WsError::Protocol("reserved bits must be 0".into()));
        }
        if self.opcode.is_control() {
            if self.payload.len() > 125 {
                return Err(WsError::Protocol(
                    "control frame too long (greater than 125 bytes)".into(),
                ));
            }
            if !self.fin {
                return Err(WsError::Protocol(
                    "control frames must not be fragmented".into(),
                ));
            }
        }
        Ok(())
    }

    /// Read one frame off the connection.
    ///
    /// Servers set `mask_required`: client frames must arrive masked and are
    /// unmasked here. `max_size` bounds the announced payload length.
    /// Extensions decode in reverse registration order before the frame is
    /// checked.
    pub async fn parse<R>(
        reader: &mut R,
        mask_required: bool,
        max_size: Option<usize>,
        extensions: &mut [Box<dyn FrameExtension>],
    ) -> Result<Frame, WsError>
    where
        R: AsyncRead + Unpin,
    {
        let mut head = [0u8; 2];
        reader.read_exact(&mut head).await?;
        let [head1, head2] = head;

        let fin = head1 & 0b1000_0000 != 0;
        let rsv1 = head1 & 0b0100_0000 != 0;
        let rsv2 = head1 & 0b0010_0000 != 0;
        let rsv3 = head1 & 0b0001_0000 != 0;
        let opcode = OpCode::try_from(head1 & 0b0000_1111)?;

        let masked = head2 & 0b1000_0000 != 0;
        if mask_required && !masked {
            return Err(WsError::Protocol("masking required but not received".into()));
        }

        let length = match head2 & 0b0111_1111 {
            126 => {
                let mut ext = [0u8; 2];
                reader.read_exact(&mut ext).await?;
                u64::from(u16::from_be_bytes(ext))
            }
            127 => {
                let mut ext = [0u8; 8];
                reader.read_exact(&mut ext).await?;
                u64::from_be_bytes(ext)
            }
            short => u64::from(short),
        };

        if let Some(limit) = max_size {
            if length > limit as u64 {
                return Err(WsError::PayloadTooBig {
                    size: length,
                    limit,
                });
            }
        }

        let mask = if masked {
            let mut key = [0u8; 4];
            reader.read_exact(&mut key).await?;
            Some(key)
        } else {
            None
        };

        let mut payload = vec![0u8; length as usize];
        reader.read_exact(&mut payload).await?;
        if let Some(key) = mask {
            apply_mask(&mut payload, key);
        }

        let mut frame = Frame {
            fin,
            rsv1,
            rsv2,
            rsv3,
            opcode,
            payload: Bytes::from(payload),
        };

        for extension in extensions.iter_mut().rev() {
            frame = extension.decode(frame)?;
        }

        frame.check()?;
        Ok(frame)
    }

    /// Serialize into wire bytes. Clients pass `mask = true`: a fresh 4-byte
    /// key is generated per frame. Extensions encode in registration order
    /// first.
    pub fn serialize(
        mut self,
        mask: bool,
        extensions: &mut [Box<dyn FrameExtension>],
    ) -> Result<Vec<u8>, WsError> {
        self.check()?;

        for extension in extensions.iter_mut() {
            self = extension.encode(self)?;
        }

        let mut head1 = self.opcode as u8;
        if self.fin {
            head1 |= 0b1000_0000;
        }
        if self.rsv1 {
            head1 |= 0b0100_0000;
        }
        if self.rsv2 {
            head1 |= 0b0010_0000;
        }
        if self.rsv3 {
            head1 |= 0b0001_0000;
        }

        let mask_bit = if mask { 0b1000_0000u8 } else { 0 };
        let length = self.payload.len();

        let mut output = Vec::with_capacity(length + 14);
        output.push(head1);
        if length < 126 {
            output.push(mask_bit | length as u8);
        } else if length < 65536 {
            output.push(mask_bit | 126);
            output.extend_from_slice(&(length as u16).to_be_bytes());
        } else {
            output.push(mask_bit | 127);
            output.extend_from_slice(&(length as u64).to_be_bytes());
        }

        if mask {
            let key: [u8; 4] = rand::random();
            output.extend_from_slice(&key);
            let mut payload = self.payload.to_vec();
            apply_mask(&mut payload, key);
            output.extend_from_slice(&payload);
        } else {
            output.extend_from_slice(&self.payload);
        }

        Ok(output)
    }
}
