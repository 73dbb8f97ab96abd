//! Frame types and outbound frame encoding per [RFC 6455 Section 5.2](https://datatracker.ietf.org/doc/html/rfc6455#section-5.2).
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |         (16 or 64 bits)       |
//! |N|V|V|V|       |S|             |                               |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! ```
//!
//! Outbound frames are server-to-client: the FIN bit is always set, the
//! engine never fragments its own output, and per RFC 6455 server frames are
//! never masked. The length field mirrors the decoder's thresholds: values
//! below 126 are embedded in the second header byte, values up to 65535 use
//! the 126 marker plus a 16-bit big-endian length, and anything larger uses
//! the 127 marker plus a 64-bit big-endian length.

use bytes::{BufMut, BytesMut};

use crate::{close::CloseCode, FrameError};

/// Largest header the encoder emits: 2 base bytes plus an 8-byte length.
pub(crate) const MAX_HEAD_SIZE: usize = 10;

/// A close reason may occupy at most 123 bytes so the code and reason
/// together fit the 125-byte control frame limit.
pub const MAX_CLOSE_REASON: usize = 123;

/// WebSocket operation code identifying the frame type.
///
/// Data frames carry application payload (`Text`, `Binary`, and
/// `Continuation` for fragmented messages); control frames (`Close`, `Ping`,
/// `Pong`) manage the connection, are never fragmented, and carry at most
/// 125 payload bytes. Opcodes 0x3-0x7 and 0xB-0xF are reserved and rejected
/// during decoding.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OpCode {
    Continuation,
    Text,
    Binary,
    Close,
    Ping,
    Pong,
}

impl OpCode {
    /// Returns `true` for `Close`, `Ping` and `Pong`.
    pub fn is_control(&self) -> bool {
        matches!(*self, OpCode::Close | OpCode::Ping | OpCode::Pong)
    }

    /// Returns `true` for `Continuation`, `Text` and `Binary`.
    pub fn is_data(&self) -> bool {
        !self.is_control()
    }
}

impl TryFrom<u8> for OpCode {
    type Error = FrameError;

    /// Interprets the low opcode nibble of a frame header. Reserved values
    /// (0x3-0x7, 0xB-0xF) yield `FrameError::InvalidOpCode`.
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x0 => Ok(Self::Continuation),
            0x1 => Ok(Self::Text),
            0x2 => Ok(Self::Binary),
            0x8 => Ok(Self::Close),
            0x9 => Ok(Self::Ping),
            0xA => Ok(Self::Pong),
            _ => Err(FrameError::InvalidOpCode(value)),
        }
    }
}

impl From<OpCode> for u8 {
    fn from(val: OpCode) -> Self {
        match val {
            OpCode::Continuation => 0x0,
            OpCode::Text => 0x1,
            OpCode::Binary => 0x2,
            OpCode::Close => 0x8,
            OpCode::Ping => 0x9,
            OpCode::Pong => 0xA,
        }
    }
}

/// Builds the header for an outbound server frame of `len` payload bytes.
pub fn encode_header(opcode: OpCode, len: u64) -> BytesMut {
    let mut head = BytesMut::with_capacity(MAX_HEAD_SIZE);
    head.put_u8(0x80 | u8::from(opcode));

    if len < 126 {
        head.put_u8(len as u8);
    } else if len <= u64::from(u16::MAX) {
        head.put_u8(126);
        head.put_u16(len as u16);
    } else {
        head.put_u8(127);
        head.put_u64(len);
    }

    head
}

/// Builds a complete outbound frame: header followed by `payload`.
pub fn encode_frame(opcode: OpCode, payload: &[u8]) -> BytesMut {
    let mut frame = encode_header(opcode, payload.len() as u64);
    frame.extend_from_slice(payload);
    frame
}

/// Builds a complete close frame: 2 big-endian code bytes followed by the
/// reason, truncated to [`MAX_CLOSE_REASON`] bytes on a character boundary.
pub fn encode_close(code: CloseCode, reason: &str) -> BytesMut {
    let mut cut = reason.len().min(MAX_CLOSE_REASON);
    while !reason.is_char_boundary(cut) {
        cut -= 1;
    }
    let reason = &reason.as_bytes()[..cut];

    let mut frame = encode_header(OpCode::Close, (2 + reason.len()) as u64);
    frame.put_u16(u16::from(code));
    frame.extend_from_slice(reason);
    frame
}
