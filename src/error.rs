//! Stitch-file format error types

use thiserror::Error;

/// Errors that can occur while decoding a stitch file.
///
/// `BadSignature` and `BadOffset` are terminal: the buffer is not a usable
/// stitch file and nothing is returned. `TruncatedStream` is only raised
/// under [`crate::decoder::TruncationPolicy::Strict`]; the default policy
/// keeps whatever was decoded before the buffer ran out.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("not a stitch file: bad signature")]
    BadSignature,

    #[error("invalid section offset {offset} (buffer is {len} bytes)")]
    BadOffset { offset: u32, len: usize },

    #[error("stitch stream truncated at byte {offset}")]
    TruncatedStream { offset: usize },

    #[error("unexpected end of data at byte {offset} (needed {needed} more)")]
    UnexpectedEof { offset: usize, needed: usize },
}

impl From<FormatError> for String {
    fn from(err: FormatError) -> Self {
        err.to_string()
    }
}
