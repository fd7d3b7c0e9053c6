use std::io;

use bstr::BString;
use thiserror::Error;

/// A syntax error found while classifying a single line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// The offset field has an odd number of hex digits.
    #[error("malformed offset {0:?}: odd number of hex digits")]
    MalformedOffset(BString),
    /// The offset field does not fit in 63 bits.
    #[error("offset {0:?} is too large")]
    OffsetTooLarge(BString),
    /// A data byte is not exactly two hex digits.
    #[error("malformed hex byte {0:?}")]
    MalformedByte(BString),
    /// A hex field is directly followed by something other than a separator.
    #[error("illegal character {0:?} in hex data")]
    IllegalCharacter(char),
    /// Text other than spaces or a comment follows a label name.
    #[error("illegal text after label: {0:?}")]
    IllegalLabelTrailer(BString),
}

/// Errors surfaced by [`Decoder`](crate::Decoder).
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A line failed to scan.
    #[error("{source} at {line}:{column}")]
    Syntax {
        /// What went wrong.
        source: ScanError,
        /// 1-based line number.
        line: usize,
        /// 1-based byte column.
        column: usize,
    },
    /// An offset moved backwards relative to data already seen.
    #[error("offset rewind at line {line}: {offset:#X} precedes {expected:#X}")]
    OffsetRewind {
        /// Where the offending run would start.
        offset: u64,
        /// The first offset after the data already seen.
        expected: u64,
        /// 1-based line number of the offending offset.
        line: usize,
    },
    /// The underlying reader failed.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// A previous call already failed.
    #[error("decoder used after an earlier error")]
    Poisoned,
}

impl From<DecodeError> for io::Error {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Io(err) => err,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

/// Errors surfaced by [`Encoder`](crate::Encoder).
///
/// Everything except [`EncodeError::Io`] is a misuse of the encoder rather
/// than a problem with the data.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The encoder was already closed.
    #[error("encoder is closed")]
    Closed,
    /// A relative seek resolved to a negative offset.
    #[error("seek to a negative offset")]
    NegativeSeek,
    /// A seek resolved to an offset with bit 63 set.
    #[error("offset {0:#X} is out of range")]
    OffsetOutOfRange(u64),
    /// The underlying writer failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<EncodeError> for io::Error {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::Io(err) => err,
            EncodeError::NegativeSeek | EncodeError::OffsetOutOfRange(_) => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
            EncodeError::Closed => io::Error::other(err),
        }
    }
}
