//! Scanner: classifies one physical line of a dump at a time.
//!
//! Each line is one of
//! - a data line: an optional offset field followed by up to 16 hex byte
//!   pairs (the decorative ASCII column after them is never read),
//! - a label line: `:name`, optionally followed by spaces and a `#` comment,
//! - anything else (blank lines, comments, free text), which carries nothing.
//!
//! Scanning a line is a pure function of the line's bytes: [`Cursor`] is a
//! `Copy` position over an immutable slice, so no state outlives the line.

use std::io::{self, BufRead};

use bstr::{BString, ByteSlice};

use crate::{
    error::{DecodeError, ScanError},
    run::ByteRun,
};

/// Highest representable offset; bit 63 is always clear.
pub const MAX_OFFSET: u64 = i64::MAX as u64;

/// One classified line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// A line with an offset field, a byte run, or both.
    Data {
        /// The explicit offset of the first byte, if shown.
        offset: Option<u64>,
        /// The bytes on the line.
        bytes: ByteRun,
    },
    /// A `:name` line.
    Label(String),
    /// A blank line, a comment, or other text with no data.
    Empty,
}

/// Pulls lines from a reader and classifies them.
#[derive(Debug)]
pub struct Scanner<R> {
    reader: R,
    line: Vec<u8>,
    line_no: usize,
}

impl<R: BufRead> Scanner<R> {
    /// Wraps `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            line_no: 0,
        }
    }

    /// Reads the next physical line into the line buffer, without its line
    /// terminator. Returns `false` at end of input.
    ///
    /// # Errors
    ///
    /// Propagates errors from the underlying reader.
    pub fn read_line(&mut self) -> io::Result<bool> {
        self.line.clear();
        if self.reader.read_until(b'\n', &mut self.line)? == 0 {
            return Ok(false);
        }
        self.line_no += 1;
        if self.line.last() == Some(&b'\n') {
            self.line.pop();
            if self.line.last() == Some(&b'\r') {
                self.line.pop();
            }
        }
        Ok(true)
    }

    /// Classifies the line most recently read by [`Scanner::read_line`].
    ///
    /// # Errors
    ///
    /// Returns the [`ScanError`] describing the first syntax problem.
    pub fn scan_line(&self) -> Result<Line, ScanError> {
        scan_line(&self.line)
    }

    /// Reads and classifies the next line. Returns `None` at end of input.
    ///
    /// # Errors
    ///
    /// Syntax errors carry the line number and column they were found at.
    pub fn next_line(&mut self) -> Result<Option<Line>, DecodeError> {
        if !self.read_line()? {
            return Ok(None);
        }
        Cursor::new(&self.line)
            .scan()
            .map(Some)
            .map_err(|(source, column)| DecodeError::Syntax {
                source,
                line: self.line_no,
                column,
            })
    }

    /// 1-based number of the line most recently read, or 0 before the first.
    pub fn line_number(&self) -> usize {
        self.line_no
    }

    /// The raw bytes of the line most recently read.
    pub fn line(&self) -> &[u8] {
        &self.line
    }
}

/// Classifies a single line (without its terminator).
///
/// # Errors
///
/// Returns the [`ScanError`] describing the first syntax problem.
pub fn scan_line(line: &[u8]) -> Result<Line, ScanError> {
    Cursor::new(line).scan().map_err(|(err, _)| err)
}

/// Whether `name` can appear on a `:name` line.
#[must_use]
pub fn is_label_name(name: &str) -> bool {
    let mut bytes = name.bytes();
    bytes.next().is_some_and(is_label_start) && bytes.all(is_label_char)
}

fn is_hex(b: u8) -> bool {
    b.is_ascii_digit() || (b'A'..=b'F').contains(&b)
}

fn is_separator(b: u8) -> bool {
    b == b' ' || b == b'-'
}

fn is_label_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'-'
}

fn is_label_char(b: u8) -> bool {
    is_label_start(b) || b.is_ascii_digit()
}

fn hex_value(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        _ => b - b'A' + 10,
    }
}

type ScanResult<T> = Result<T, (ScanError, usize)>;

/// Read position within one line.
#[derive(Debug, Clone, Copy)]
struct Cursor<'a> {
    line: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(line: &'a [u8]) -> Self {
        Self { line, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.line.get(self.pos).copied()
    }

    fn rest(&self) -> &'a [u8] {
        &self.line[self.pos..]
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a [u8] {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        &self.line[start..self.pos]
    }

    fn skip_separators(&mut self) {
        self.take_while(is_separator);
    }

    /// 1-based column of the current position.
    fn column(&self) -> usize {
        self.pos + 1
    }

    fn fail<T>(&self, err: ScanError) -> ScanResult<T> {
        Err((err, self.column()))
    }

    fn scan(mut self) -> ScanResult<Line> {
        let offset = match self.peek() {
            Some(b) if is_hex(b) => Some(self.offset()?),
            Some(b':') => {
                self.pos += 1;
                return self.label();
            }
            _ => None,
        };

        self.skip_separators();
        let mut bytes = ByteRun::new();
        while !bytes.is_full() && self.peek().is_some_and(is_hex) {
            bytes.push(self.hex_byte()?);
            self.skip_separators();
        }

        if offset.is_none() && bytes.is_empty() {
            return Ok(Line::Empty);
        }
        Ok(Line::Data { offset, bytes })
    }

    fn offset(&mut self) -> ScanResult<u64> {
        let start = *self;
        let digits = self.take_while(is_hex);
        if digits.len() % 2 == 1 {
            return start.fail(ScanError::MalformedOffset(BString::from(digits)));
        }
        if digits.len() > 2 * size_of::<u64>() {
            return start.fail(ScanError::OffsetTooLarge(BString::from(digits)));
        }
        let value = digits
            .iter()
            .fold(0u64, |acc, &d| (acc << 4) | u64::from(hex_value(d)));
        if value > MAX_OFFSET {
            return start.fail(ScanError::OffsetTooLarge(BString::from(digits)));
        }
        self.expect_field_end()?;
        Ok(value)
    }

    fn hex_byte(&mut self) -> ScanResult<u8> {
        let start = *self;
        let digits = self.take_while(is_hex);
        if digits.len() != 2 {
            return start.fail(ScanError::MalformedByte(BString::from(digits)));
        }
        self.expect_field_end()?;
        Ok((hex_value(digits[0]) << 4) | hex_value(digits[1]))
    }

    /// A hex field must be followed by a separator or the end of the line.
    fn expect_field_end(&self) -> ScanResult<()> {
        match self.peek() {
            None => Ok(()),
            Some(b) if is_separator(b) => Ok(()),
            Some(b) => self.fail(ScanError::IllegalCharacter(char::from(b))),
        }
    }

    /// A `:` with no name before the trailer is a no-op line.
    fn label(&mut self) -> ScanResult<Line> {
        let name = if self.peek().is_some_and(is_label_start) {
            self.take_while(is_label_char)
        } else {
            &[][..]
        };
        self.take_while(|b| b == b' ');
        match self.peek() {
            None | Some(b'#') if name.is_empty() => Ok(Line::Empty),
            None | Some(b'#') => Ok(Line::Label(name.to_str_lossy().into_owned())),
            Some(_) => self.fail(ScanError::IllegalLabelTrailer(BString::from(self.rest()))),
        }
    }
}
