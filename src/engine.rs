//! Streaming frame decode driven by transport readiness.
//!
//! [`FrameEngine`] is the per-connection state machine: the transport layer
//! calls [`FrameEngine::read_ready`] whenever bytes are available, and the
//! engine loops read -> decode, consuming exactly what the current phase
//! needs, until the buffered input runs out. Completed frames and messages
//! are pushed upward through the [`Session`] callbacks; pong and close
//! replies are written back through the [`Transport`].
//!
//! One engine instance belongs to exactly one connection and is driven by
//! `&mut` from a single task; nothing here blocks or locks. Insufficient
//! input simply returns control to the caller, who re-invokes on the next
//! readable event.

use std::io;

use bytes::BytesMut;

use crate::close::CloseCode;
use crate::frame::{self, OpCode};
use crate::mask;
use crate::utf8::{self, Utf8Progress};
use crate::{FrameError, Result};

/// Default per-invocation read chunk, also the scratch buffer size.
pub const DEFAULT_READ_CHUNK: usize = 4096;

/// The scratch buffer must fit the largest fixed-size phase (8-byte
/// extended length) in a single read.
const MIN_READ_CHUNK: usize = 16;

/// Byte connection the engine reads frames from and writes replies to.
///
/// The transport owns buffering and readiness notification; the engine only
/// asks it for bytes that the caller reported as available.
pub trait Transport {
    /// Reads up to `buf.len()` bytes. Must return
    /// `min(buf.len(), bytes currently available)`; it is never called
    /// unless the caller reported pending input.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Queues `bytes` for transmission. Backpressure and partial writes are
    /// the transport's concern, not the engine's.
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Tears the connection down. Idempotent.
    fn close(&mut self);
}

/// Upward dispatch target for decoded frames and messages.
///
/// All callbacks are one-way notifications; every method defaults to a
/// no-op so a session only implements what it cares about.
pub trait Session {
    /// A text frame finished decoding. `text` is this frame's newly decoded
    /// contribution, which may lag the raw payload when a codepoint is split
    /// across fragments.
    fn on_text_frame(&mut self, _text: &str, _is_final: bool) {}

    /// A binary frame finished decoding; `payload` is this frame's bytes.
    fn on_binary_frame(&mut self, _payload: &[u8], _is_final: bool) {}

    /// A complete (possibly reassembled) text message.
    fn on_text_message(&mut self, _text: &str) {}

    /// A complete (possibly reassembled) binary message.
    fn on_binary_message(&mut self, _payload: &[u8]) {}

    /// A pong frame arrived.
    fn on_pong(&mut self, _payload: &[u8]) {}

    /// The peer sent a close frame. Fired once with the code as received
    /// (1005 when absent), immediately before the engine writes its close
    /// reply and tears the connection down.
    fn on_close(&mut self, _code: u16, _reason: &str) {}
}

/// Decode phase; each phase knows exactly how many bytes it needs.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Phase {
    /// The 2-byte base header.
    Header,
    /// A 2- or 8-byte big-endian extended length field.
    ExtendedLength,
    /// The 4-byte masking key.
    Mask,
    /// Payload bytes, consumable in partial reads.
    Payload,
}

/// Data type of an open fragmented message.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum FragmentKind {
    Text,
    Binary,
}

/// Per-connection framing state machine.
///
/// Created when the upgrade handshake completes and dropped at connection
/// teardown. All decode state lives here; nothing survives [`is_closed`]
/// turning true.
///
/// [`is_closed`]: FrameEngine::is_closed
pub struct FrameEngine {
    phase: Phase,
    /// Exact bytes required to complete the current phase.
    needed: usize,
    /// FIN bit of the frame being parsed.
    fin: bool,
    /// Opcode of the frame being parsed.
    opcode: OpCode,
    /// Declared payload length after extended-length resolution.
    payload_len: usize,
    /// Masking key of the current frame.
    mask: [u8; 4],
    /// Current frame's unmasked payload, cleared per frame.
    payload: BytesMut,
    /// Current logical message accumulated across fragments.
    message: BytesMut,
    /// Open fragmented sequence, if any. At most one per connection.
    fragment: Option<FragmentKind>,
    /// Offset into `message` where undecoded text begins. Emitted frame
    /// deltas never cross this mark, so a codepoint split across fragments
    /// stays buffered until its continuation arrives.
    message_start: usize,
    closed: bool,
    max_message_size: usize,
    scratch: Box<[u8]>,
}

impl FrameEngine {
    /// Creates an engine enforcing `max_message_size` with the default
    /// read chunk size.
    pub fn new(max_message_size: usize) -> Self {
        Self::with_read_chunk_size(max_message_size, DEFAULT_READ_CHUNK)
    }

    /// Creates an engine with an explicit per-read chunk bound. Values below
    /// the fixed-phase minimum are clamped up.
    pub fn with_read_chunk_size(max_message_size: usize, read_chunk_size: usize) -> Self {
        Self {
            phase: Phase::Header,
            needed: 2,
            fin: true,
            opcode: OpCode::Continuation,
            payload_len: 0,
            mask: [0; 4],
            payload: BytesMut::new(),
            message: BytesMut::new(),
            fragment: None,
            message_start: 0,
            closed: false,
            max_message_size,
            scratch: vec![0; read_chunk_size.max(MIN_READ_CHUNK)].into_boxed_slice(),
        }
    }

    /// Whether the connection has been torn down (peer close, protocol
    /// violation, or transport failure). A closed engine ignores all
    /// further input.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Drives the decoder with `available` bytes pending on the transport.
    ///
    /// Loops read -> decode until no complete step can be made with the
    /// remaining input, then returns; the caller re-invokes on the next
    /// readable event. A peer-initiated close completes with `Ok(())` and
    /// [`is_closed`] turning true; protocol violations, invalid UTF-8 and
    /// transport failures return the error after the connection has already
    /// been torn down.
    ///
    /// [`is_closed`]: FrameEngine::is_closed
    pub fn read_ready<T: Transport, S: Session>(
        &mut self,
        io: &mut T,
        session: &mut S,
        mut available: usize,
    ) -> Result<()> {
        loop {
            if self.closed || available == 0 {
                return Ok(());
            }
            if available < self.needed && self.phase != Phase::Payload {
                // Fixed-size phases wait for their full field.
                return Ok(());
            }

            let want = self.needed.min(self.scratch.len());
            let n = match io.read(&mut self.scratch[..want]) {
                Ok(0) => return Ok(()),
                Ok(n) => n,
                Err(err) => {
                    #[cfg(feature = "logging")]
                    log::warn!("transport read failed: {err}");
                    self.teardown(io);
                    return Err(FrameError::Io(err));
                }
            };
            available = available.saturating_sub(n);

            match self.phase {
                Phase::Header => {
                    debug_assert_eq!(n, 2);
                    let header = [self.scratch[0], self.scratch[1]];
                    self.parse_header(header, io)?;
                }
                Phase::ExtendedLength => {
                    debug_assert!(n == 2 || n == 8);
                    let mut field = [0u8; 8];
                    field[..n].copy_from_slice(&self.scratch[..n]);
                    self.parse_extended_length(&field[..n], io)?;
                }
                Phase::Mask => {
                    debug_assert_eq!(n, 4);
                    let key = [
                        self.scratch[0],
                        self.scratch[1],
                        self.scratch[2],
                        self.scratch[3],
                    ];
                    self.parse_mask(key, io, session)?;
                }
                Phase::Payload => {
                    let offset = self.payload.len();
                    mask::apply_mask(&mut self.scratch[..n], self.mask, offset);
                    self.payload.extend_from_slice(&self.scratch[..n]);

                    if self.payload.len() < self.payload_len {
                        // Frame still incomplete; keep what we have and wait.
                        self.needed -= n;
                        continue;
                    }

                    self.needed = 2;
                    self.phase = Phase::Header;
                    self.dispatch_frame(io, session)?;
                }
            }
        }
    }

    /// Validates the 2-byte base header and picks the next phase.
    fn parse_header<T: Transport>(&mut self, header: [u8; 2], io: &mut T) -> Result<()> {
        let [b1, b2] = header;
        let fin = b1 & 0x80 != 0;
        let len_code = b2 & 0x7F;

        // Client-to-server frames must be masked.
        if b2 & 0x80 == 0 {
            return self.protocol_error(io, FrameError::UnmaskedFrame);
        }
        // No extensions are negotiated, so RSV1-RSV3 must be clear.
        if b1 & 0x70 != 0 {
            return self.protocol_error(io, FrameError::ReservedBitsNotZero);
        }
        let opcode = match OpCode::try_from(b1 & 0x0F) {
            Ok(opcode) => opcode,
            Err(err) => return self.protocol_error(io, err),
        };
        if matches!(opcode, OpCode::Ping | OpCode::Close) && len_code > 125 {
            return self.protocol_error(io, FrameError::ControlFrameTooLarge);
        }
        if !fin && opcode.is_control() {
            return self.protocol_error(io, FrameError::FragmentedControlFrame);
        }
        // A new data frame while a fragmented message is open would
        // interleave two messages.
        if self.fragment.is_some() && matches!(opcode, OpCode::Text | OpCode::Binary) {
            return self.protocol_error(io, FrameError::InterleavedFragments);
        }

        self.fin = fin;
        self.opcode = opcode;

        if matches!(opcode, OpCode::Text | OpCode::Binary) {
            self.message.clear();
            self.message_start = 0;
            if !fin {
                self.fragment = Some(match opcode {
                    OpCode::Text => FragmentKind::Text,
                    _ => FragmentKind::Binary,
                });
            }
        }

        match len_code {
            126 => {
                self.needed = 2;
                self.phase = Phase::ExtendedLength;
            }
            127 => {
                self.needed = 8;
                self.phase = Phase::ExtendedLength;
            }
            short => {
                self.payload_len = usize::from(short);
                self.needed = 4;
                self.phase = Phase::Mask;
            }
        }

        Ok(())
    }

    /// Resolves a 16- or 64-bit big-endian extended length field.
    fn parse_extended_length<T: Transport>(&mut self, field: &[u8], io: &mut T) -> Result<()> {
        let declared = match *field {
            [hi, lo] => u64::from(u16::from_be_bytes([hi, lo])),
            [a, b, c, d, e, f, g, h] => u64::from_be_bytes([a, b, c, d, e, f, g, h]),
            _ => unreachable!("extended length field is 2 or 8 bytes"),
        };

        if declared > self.max_message_size as u64 {
            #[cfg(feature = "logging")]
            log::warn!(
                "declared payload length {declared} exceeds limit {}",
                self.max_message_size
            );
            // Policy: oversized declarations close without a close reply.
            self.teardown(io);
            return Err(FrameError::MessageTooLarge);
        }

        self.payload_len = declared as usize;
        self.needed = 4;
        self.phase = Phase::Mask;
        Ok(())
    }

    /// Stores the masking key and transitions to the payload phase. A
    /// zero-length payload is still a complete frame and dispatches
    /// immediately.
    fn parse_mask<T: Transport, S: Session>(
        &mut self,
        key: [u8; 4],
        io: &mut T,
        session: &mut S,
    ) -> Result<()> {
        self.mask = key;
        self.payload.clear();

        // Bound buffered-but-incomplete bytes across fragments before
        // reserving space for this frame.
        if self.opcode.is_data() && self.message.len() + self.payload_len > self.max_message_size
        {
            self.teardown(io);
            return Err(FrameError::MessageTooLarge);
        }

        if self.payload_len == 0 {
            self.needed = 2;
            self.phase = Phase::Header;
            return self.dispatch_frame(io, session);
        }

        self.payload.reserve(self.payload_len);
        self.needed = self.payload_len;
        self.phase = Phase::Payload;
        Ok(())
    }

    /// Routes a completed frame by opcode.
    fn dispatch_frame<T: Transport, S: Session>(
        &mut self,
        io: &mut T,
        session: &mut S,
    ) -> Result<()> {
        match self.opcode {
            OpCode::Continuation => match self.fragment {
                Some(FragmentKind::Text) => self.deliver_text(io, session),
                Some(FragmentKind::Binary) => {
                    self.deliver_binary(session);
                    Ok(())
                }
                None => self.protocol_error(io, FrameError::InvalidContinuation),
            },
            OpCode::Text => self.deliver_text(io, session),
            OpCode::Binary => {
                self.deliver_binary(session);
                Ok(())
            }
            OpCode::Close => self.handle_close(io, session),
            OpCode::Ping => {
                #[cfg(feature = "logging")]
                log::debug!("ping received ({} bytes)", self.payload.len());

                let cap = self.payload.len().min(125);
                let pong = frame::encode_frame(OpCode::Pong, &self.payload[..cap]);
                if let Err(_err) = io.write(&pong) {
                    #[cfg(feature = "logging")]
                    log::warn!("writing pong reply failed: {_err}");
                }
                Ok(())
            }
            OpCode::Pong => {
                session.on_pong(&self.payload);
                Ok(())
            }
        }
    }

    /// Appends this frame to the message, advances the incremental UTF-8
    /// decode, and emits frame/message callbacks.
    fn deliver_text<T: Transport, S: Session>(
        &mut self,
        io: &mut T,
        session: &mut S,
    ) -> Result<()> {
        let fin = self.fin;
        self.message.extend_from_slice(&self.payload);

        match utf8::decode(&self.message[self.message_start..]) {
            Utf8Progress::Valid(text) => {
                session.on_text_frame(text, fin);
                self.message_start = self.message.len();
            }
            Utf8Progress::Incomplete { prefix } => {
                // A partial codepoint may be completed by the next fragment,
                // but a final frame leaves nothing to complete it.
                if fin {
                    self.teardown(io);
                    return Err(FrameError::InvalidUtf8);
                }
                if !prefix.is_empty() {
                    session.on_text_frame(prefix, false);
                    self.message_start += prefix.len();
                }
            }
            Utf8Progress::Invalid => {
                self.teardown(io);
                return Err(FrameError::InvalidUtf8);
            }
        }

        if fin {
            match std::str::from_utf8(&self.message) {
                Ok(text) => session.on_text_message(text),
                Err(_) => {
                    self.teardown(io);
                    return Err(FrameError::InvalidUtf8);
                }
            }
            self.finish_message();
        }

        Ok(())
    }

    /// Appends this frame to the message and emits frame/message callbacks.
    fn deliver_binary<S: Session>(&mut self, session: &mut S) {
        let fin = self.fin;
        self.message.extend_from_slice(&self.payload);
        session.on_binary_frame(&self.payload, fin);

        if fin {
            session.on_binary_message(&self.message);
            self.finish_message();
        }
    }

    /// Close frame: notify the session with the code as received, validate,
    /// reply with the validated code/reason, and tear down. Parsing never
    /// resumes after this frame.
    fn handle_close<T: Transport, S: Session>(
        &mut self,
        io: &mut T,
        session: &mut S,
    ) -> Result<()> {
        let (raw_code, reason_bytes): (u16, &[u8]) = if self.payload.len() >= 2 {
            (
                u16::from_be_bytes([self.payload[0], self.payload[1]]),
                &self.payload[2..],
            )
        } else {
            (u16::from(CloseCode::NoStatus), &[])
        };

        session.on_close(raw_code, &String::from_utf8_lossy(reason_bytes));

        let empty_payload = self.payload.is_empty();
        let (code, reason) = match std::str::from_utf8(reason_bytes) {
            Err(_) => (CloseCode::Protocol, ""),
            Ok(reason) => {
                let code = CloseCode::from(raw_code);
                if code == CloseCode::NoStatus {
                    if empty_payload {
                        (CloseCode::Normal, reason)
                    } else {
                        // 1005 is a placeholder and must not appear on the
                        // wire; a 1-byte payload lands here as well.
                        (CloseCode::Protocol, reason)
                    }
                } else if code.is_allowed() {
                    (code, reason)
                } else {
                    (CloseCode::Protocol, "")
                }
            }
        };

        #[cfg(feature = "logging")]
        log::debug!("close reply with code {} reason {reason:?}", u16::from(code));

        let reply = frame::encode_close(code, reason);
        if let Err(_err) = io.write(&reply) {
            #[cfg(feature = "logging")]
            log::warn!("writing close reply failed: {_err}");
        }
        self.teardown(io);
        Ok(())
    }

    /// Sends a 1002 close reply and tears the connection down.
    fn protocol_error<T: Transport>(&mut self, io: &mut T, err: FrameError) -> Result<()> {
        #[cfg(feature = "logging")]
        log::warn!("protocol violation: {err}");

        let reply = frame::encode_close(CloseCode::Protocol, "");
        if let Err(_werr) = io.write(&reply) {
            #[cfg(feature = "logging")]
            log::warn!("writing close reply failed: {_werr}");
        }
        self.teardown(io);
        Err(err)
    }

    /// Clears per-message state once a FIN frame completes the message.
    fn finish_message(&mut self) {
        self.fragment = None;
        self.message.clear();
        self.message_start = 0;
        self.payload.clear();
    }

    /// Closes the transport and discards all buffered state.
    fn teardown<T: Transport>(&mut self, io: &mut T) {
        io.close();
        self.closed = true;
        self.needed = 0;
        self.payload = BytesMut::new();
        self.message = BytesMut::new();
        self.message_start = 0;
        self.fragment = None;
    }
}
