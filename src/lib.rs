//! # wsframe
//! Streaming implementation of WebSocket framing (RFC 6455): incremental
//! frame decoding from arbitrary transport read chunks, protocol validation,
//! fragmented-message reassembly, payload unmasking, incremental UTF-8
//! validation of text messages, close-code validation and outbound frame
//! encoding.
//!
//! The crate deliberately stops below the HTTP layer: the upgrade handshake,
//! socket ownership and event loop all belong to the caller. Once a
//! connection is upgraded, hand its bytes to a [`FrameEngine`] and it takes
//! over framing:
//!
//! - the caller reports "bytes are available" via [`FrameEngine::read_ready`];
//! - the engine pulls exactly what its current decode phase needs through
//!   the [`Transport`] trait, never blocking and never over-reading;
//! - completed frames and reassembled messages are delivered through the
//!   [`Session`] trait;
//! - ping and close replies flow back out through the same transport.
//!
//! Decoding is fully resumable: a 16 MB message arriving one byte at a time
//! produces the same callbacks as the whole message in a single read.
//!
//! # Features
//! - `logging`: emits protocol-violation and close diagnostics through the
//!   `log` crate.
//! - `simd`: accelerates UTF-8 validation with `simdutf8`.
//!
//! # Example
//! ```rust
//! use wsframe::{FrameEngine, Session, Transport};
//!
//! /// Transport over a pre-buffered byte vector.
//! struct Buffered {
//!     input: Vec<u8>,
//!     output: Vec<u8>,
//! }
//!
//! impl Transport for Buffered {
//!     fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
//!         let n = buf.len().min(self.input.len());
//!         buf[..n].copy_from_slice(&self.input[..n]);
//!         self.input.drain(..n);
//!         Ok(n)
//!     }
//!     fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
//!         self.output.extend_from_slice(bytes);
//!         Ok(())
//!     }
//!     fn close(&mut self) {}
//! }
//!
//! struct Printer;
//!
//! impl Session for Printer {
//!     fn on_text_message(&mut self, text: &str) {
//!         println!("message: {text}");
//!     }
//! }
//!
//! fn main() -> wsframe::Result<()> {
//!     // A masked client frame carrying "hi".
//!     let mut io = Buffered {
//!         input: vec![0x81, 0x82, 0x01, 0x02, 0x03, 0x04, b'h' ^ 0x01, b'i' ^ 0x02],
//!         output: Vec::new(),
//!     };
//!     let mut engine = FrameEngine::new(1 << 20);
//!     let available = io.input.len();
//!     engine.read_ready(&mut io, &mut Printer, available)?;
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod close;
pub mod engine;
pub mod frame;
mod mask;
mod utf8;

use thiserror::Error;

pub use close::CloseCode;
pub use engine::{FrameEngine, Session, Transport};
pub use frame::{encode_close, encode_frame, encode_header, OpCode};

/// A result type for framing operations, using `FrameError` as the error
/// type.
pub type Result<T> = std::result::Result<T, FrameError>;

/// Errors that terminate a WebSocket connection.
///
/// By the time one of these is returned from
/// [`read_ready`](FrameEngine::read_ready), the engine has already written
/// any close reply the violation calls for and torn the transport down; the
/// error exists so the caller can log and drop its side of the connection.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FrameError {
    /// A client frame arrived without the mask bit set.
    #[error("Client frame is not masked")]
    UnmaskedFrame,

    /// One of RSV1-RSV3 was set with no extension negotiated.
    #[error("Reserved bits are not zero")]
    ReservedBitsNotZero,

    /// The opcode nibble is one of the reserved values.
    #[error("Invalid opcode (byte={0})")]
    InvalidOpCode(u8),

    /// A ping or close frame declared a payload above 125 bytes.
    #[error("Control frame too large")]
    ControlFrameTooLarge,

    /// A control frame arrived with the FIN bit clear.
    #[error("Control frame must not be fragmented")]
    FragmentedControlFrame,

    /// A new data frame started while a fragmented message was still open.
    #[error("Data frame interleaved with an open fragmented message")]
    InterleavedFragments,

    /// A continuation frame arrived with no fragmented message open.
    #[error("Invalid continuation frame")]
    InvalidContinuation,

    /// A frame or reassembled message exceeded the configured maximum.
    #[error("Frame too large")]
    MessageTooLarge,

    /// A text message failed UTF-8 validation.
    #[error("Invalid UTF-8")]
    InvalidUtf8,

    /// The transport failed while reading.
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
}
