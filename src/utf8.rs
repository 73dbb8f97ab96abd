//! Incremental UTF-8 validation for text payloads.
//!
//! Fragmented text messages may split a multi-byte codepoint across frame
//! boundaries, so a plain valid/invalid check is not enough: trailing bytes
//! that form a valid prefix of a codepoint must be deferred until the next
//! fragment arrives, while a byte sequence that can never become valid is a
//! protocol violation regardless of how many fragments are still pending.

/// Outcome of validating the undecoded tail of a text message.
pub enum Utf8Progress<'a> {
    /// The whole input is valid text.
    Valid(&'a str),
    /// The input ends in the middle of a codepoint. `prefix` holds the valid
    /// text before the partial sequence and may be empty.
    Incomplete { prefix: &'a str },
    /// The input contains a byte sequence that no continuation can repair.
    Invalid,
}

/// Classifies `bytes` as valid, incomplete or invalid UTF-8.
///
/// With the `simd` feature enabled this goes through `simdutf8`'s compat API,
/// which preserves the `valid_up_to`/`error_len` error details the
/// classification depends on.
pub fn decode(bytes: &[u8]) -> Utf8Progress<'_> {
    #[cfg(feature = "simd")]
    let checked = simdutf8::compat::from_utf8(bytes);
    #[cfg(not(feature = "simd"))]
    let checked = std::str::from_utf8(bytes);

    match checked {
        Ok(text) => Utf8Progress::Valid(text),
        // `error_len` is only `None` when the error is an incomplete sequence
        // at the very end of the input.
        Err(err) if err.error_len().is_some() => Utf8Progress::Invalid,
        Err(err) => {
            let valid = err.valid_up_to();
            // SAFETY: the validator reported `valid` bytes of well-formed UTF-8.
            let prefix = unsafe { std::str::from_utf8_unchecked(&bytes[..valid]) };
            Utf8Progress::Incomplete { prefix }
        }
    }
}
