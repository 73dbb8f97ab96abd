//! Close status codes as defined in [RFC 6455 Section 7.4](https://datatracker.ietf.org/doc/html/rfc6455#section-7.4).
//!
//! A close frame carries an optional 2-byte status code followed by a UTF-8
//! reason string. Codes in the 3000-4999 range are reserved for libraries,
//! frameworks and applications and are accepted as-is; outside that range only
//! the explicitly registered codes are considered legal in a close reply.

/// Status code sent or received in a WebSocket close frame.
///
/// Codes that cannot appear on the wire (`NoStatus`, `Abnormal`) still have
/// variants because close handling reconstructs them: a close frame with an
/// empty payload resolves to `NoStatus` before validation maps it to `Normal`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CloseCode {
    /// 1000: normal closure, the purpose of the connection has been fulfilled.
    Normal,
    /// 1001: endpoint is going away (server shutdown, browser navigation).
    Away,
    /// 1002: protocol error.
    Protocol,
    /// 1003: received a data type the endpoint cannot accept.
    Unsupported,
    /// 1005: reserved placeholder meaning no status code was present.
    NoStatus,
    /// 1006: reserved placeholder meaning the connection dropped without a close frame.
    Abnormal,
    /// 1007: payload data inconsistent with the message type (e.g. non-UTF-8 text).
    Invalid,
    /// 1008: message violates the endpoint's policy.
    Policy,
    /// 1009: message too big to process.
    Size,
    /// 1010: client expected an extension the server did not negotiate.
    Extension,
    /// 1011: server encountered an unexpected condition.
    Error,
    /// Any other code, including the 3000-4999 application range.
    Other(u16),
}

impl CloseCode {
    /// Whether the code falls in the 3000-4999 range reserved for
    /// registered libraries and private application use.
    pub fn is_application(self) -> bool {
        matches!(self, CloseCode::Other(code) if (3000..=4999).contains(&code))
    }

    /// Whether the code may be echoed back in a close reply unchanged.
    ///
    /// `NoStatus` is not listed here: it never travels on the wire and close
    /// handling resolves it separately depending on whether the peer's close
    /// payload was empty.
    pub fn is_allowed(self) -> bool {
        matches!(
            self,
            CloseCode::Normal
                | CloseCode::Away
                | CloseCode::Protocol
                | CloseCode::Unsupported
                | CloseCode::Invalid
                | CloseCode::Policy
                | CloseCode::Size
                | CloseCode::Extension
                | CloseCode::Error
        ) || self.is_application()
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        match code {
            1000 => CloseCode::Normal,
            1001 => CloseCode::Away,
            1002 => CloseCode::Protocol,
            1003 => CloseCode::Unsupported,
            1005 => CloseCode::NoStatus,
            1006 => CloseCode::Abnormal,
            1007 => CloseCode::Invalid,
            1008 => CloseCode::Policy,
            1009 => CloseCode::Size,
            1010 => CloseCode::Extension,
            1011 => CloseCode::Error,
            other => CloseCode::Other(other),
        }
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        match code {
            CloseCode::Normal => 1000,
            CloseCode::Away => 1001,
            CloseCode::Protocol => 1002,
            CloseCode::Unsupported => 1003,
            CloseCode::NoStatus => 1005,
            CloseCode::Abnormal => 1006,
            CloseCode::Invalid => 1007,
            CloseCode::Policy => 1008,
            CloseCode::Size => 1009,
            CloseCode::Extension => 1010,
            CloseCode::Error => 1011,
            CloseCode::Other(other) => other,
        }
    }
}
