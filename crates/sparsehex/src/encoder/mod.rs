//! Encoder: renders bytes and labels as dump text.
//!
//! Bytes are laid out in rows aligned to 16-byte boundaries. A row that
//! starts mid-line is indented to its column and carries no offset field; the
//! next row's offset anchors it. When no next row will come (a seek or the
//! end of the dump), the encoder writes a *forced* row instead: the buffered
//! bytes, or nothing at all, behind an explicit offset.
//!
//! Labels split rows so that every labeled offset starts a row, with the
//! `:name` lines written just before it.

use std::io::{self, SeekFrom};

use crate::{
    error::EncodeError,
    labels::LabelTable,
    options::EncoderOptions,
    run::{ByteRun, LINE_WIDTH},
    scanner::MAX_OFFSET,
};

#[cfg(test)]
mod tests;

static NO_LABELS: LabelTable = LabelTable::new();

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Writes a dump of the bytes written to it.
///
/// [`Encoder::seek_to`] (or [`io::Seek`]) moves the offset the next write
/// lands at; nothing is written for the bytes skipped over. Seeks are
/// deferred: a seek that no write follows leaves no trace in the output.
///
/// The dump is only complete after [`Encoder::close`] or
/// [`Encoder::finish`]. Dropping an open encoder loses the last partial row.
///
/// ```rust
/// use std::io::{Seek, SeekFrom, Write};
///
/// use sparsehex::Encoder;
///
/// let mut enc = Encoder::new(Vec::new());
/// enc.write_all(b"ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_`").unwrap();
/// enc.seek(SeekFrom::Current(0x100)).unwrap();
/// enc.write_all(b"abcdefghijklmnop").unwrap();
/// let text = String::from_utf8(enc.finish().unwrap()).unwrap();
/// assert_eq!(
///     text,
///     "00000000  41 42 43 44 45 46 47 48  49 4A 4B 4C 4D 4E 4F 50  |ABCDEFGHIJKLMNOP|\n\
///      00000010  51 52 53 54 55 56 57 58  59 5A 5B 5C 5D 5E 5F 60  |QRSTUVWXYZ[\\]^_`|\n\
///      \n\
///      00000120  61 62 63 64 65 66 67 68  69 6A 6B 6C 6D 6E 6F 70  |abcdefghijklmnop|\n"
/// );
/// ```
#[derive(Debug)]
pub struct Encoder<'l, W> {
    sink: W,
    labels: &'l LabelTable,
    options: EncoderOptions,

    /// Offset of the first byte in `line`.
    line_ofs: u64,
    line: ByteRun,
    /// Lowest labeled offset not yet written, at or after `line_ofs`.
    next_label: Option<u64>,
    seek_target: Option<u64>,

    /// A row without an offset field was written (or a write started) and
    /// has not been anchored yet.
    anchor_owed: bool,
    wrote_anything: bool,
    closed: bool,

    scratch: Vec<u8>,
}

impl<W: io::Write> Encoder<'static, W> {
    /// Creates an encoder without labels.
    pub fn new(sink: W) -> Self {
        Self::with_labels(sink, &NO_LABELS)
    }
}

impl<'l, W: io::Write> Encoder<'l, W> {
    /// Creates an encoder that writes `labels` at their offsets.
    ///
    /// Names are written verbatim; names that fail
    /// [`is_label_name`](crate::is_label_name) produce text the decoder
    /// rejects. Labels at offsets no write reaches are left out.
    pub fn with_labels(sink: W, labels: &'l LabelTable) -> Self {
        Self::with_options(sink, labels, EncoderOptions::default())
    }

    /// Creates an encoder with labels and non-default options.
    pub fn with_options(sink: W, labels: &'l LabelTable, options: EncoderOptions) -> Self {
        Self {
            sink,
            labels,
            options,
            line_ofs: 0,
            line: ByteRun::new(),
            next_label: labels.first_offset_from(0),
            seek_target: None,
            anchor_owed: false,
            wrote_anything: false,
            closed: false,
            scratch: Vec::with_capacity(96),
        }
    }

    /// The labels this encoder writes.
    pub fn labels(&self) -> &'l LabelTable {
        self.labels
    }

    /// The options this encoder was created with.
    pub fn options(&self) -> EncoderOptions {
        self.options
    }

    /// Offset the next written byte will be placed at.
    pub fn position(&self) -> u64 {
        self.seek_target.unwrap_or_else(|| self.cursor())
    }

    /// A reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    fn cursor(&self) -> u64 {
        self.line_ofs + self.line.len() as u64
    }

    /// Moves the position the next write lands at.
    ///
    /// [`SeekFrom::End`] behaves like [`SeekFrom::Current`]: the end of the
    /// dump is wherever the last write stopped.
    ///
    /// # Errors
    ///
    /// [`EncodeError::NegativeSeek`] and [`EncodeError::OffsetOutOfRange`]
    /// for targets outside `0..=MAX_OFFSET`, [`EncodeError::Closed`] after
    /// close.
    pub fn seek_to(&mut self, pos: SeekFrom) -> Result<u64, EncodeError> {
        self.ensure_open()?;
        let target = match pos {
            SeekFrom::Start(ofs) => ofs,
            SeekFrom::Current(delta) | SeekFrom::End(delta) => self
                .position()
                .checked_add_signed(delta)
                .ok_or(EncodeError::NegativeSeek)?,
        };
        if target > MAX_OFFSET {
            return Err(EncodeError::OffsetOutOfRange(target));
        }
        self.seek_target = Some(target);
        Ok(target)
    }

    /// Dumps `buf` at the current position.
    ///
    /// Even an empty `buf` counts: it makes sure an offset line (and any
    /// labels) for the current position end up in the dump.
    ///
    /// # Errors
    ///
    /// [`EncodeError::Closed`] after close, [`EncodeError::OffsetOutOfRange`]
    /// if the bytes would run past `MAX_OFFSET` or would need an offset line
    /// beyond it, and failures of the underlying writer.
    pub fn write_all_bytes(&mut self, mut buf: &[u8]) -> Result<(), EncodeError> {
        self.ensure_open()?;
        let end = self.position().saturating_add(buf.len() as u64);
        if end > MAX_OFFSET && !self.ends_on_anchored_row(end, buf.is_empty()) {
            return Err(EncodeError::OffsetOutOfRange(end));
        }
        self.honor_seek()?;

        self.anchor_owed = true;
        while !buf.is_empty() {
            let want = self.row_want();
            let n = self.line.fill(buf, want);
            buf = &buf[n..];
            if self.line.len() == want {
                self.complete_row()?;
            }
        }
        Ok(())
    }

    /// Finishes the dump: writes the last partial row, or an empty row if
    /// the last row written had no offset, followed by labels at the final
    /// position. The underlying writer is flushed, not closed.
    ///
    /// # Errors
    ///
    /// [`EncodeError::Closed`] if already closed, and failures of the
    /// underlying writer.
    pub fn close(&mut self) -> Result<(), EncodeError> {
        self.ensure_open()?;
        self.wrap_up()?;
        if self.wrote_anything {
            self.write_labels_at_row()?;
        }
        self.closed = true;
        self.sink.flush()?;
        Ok(())
    }

    /// Closes the encoder if it is still open and returns the writer.
    ///
    /// # Errors
    ///
    /// As [`Encoder::close`].
    pub fn finish(mut self) -> Result<W, EncodeError> {
        if !self.closed {
            self.close()?;
        }
        Ok(self.sink)
    }

    fn ensure_open(&self) -> Result<(), EncodeError> {
        if self.closed {
            return Err(EncodeError::Closed);
        }
        Ok(())
    }

    /// Whether a write ending at `end`, one past `MAX_OFFSET`, can be written.
    /// No offset line can follow it, so its last row has to start on a
    /// 16-byte boundary and carry its own offset.
    fn ends_on_anchored_row(&self, end: u64, empty: bool) -> bool {
        if empty || end != MAX_OFFSET + 1 {
            return false;
        }
        let row_start = match self.seek_target {
            Some(target) if target != self.cursor() => target,
            _ => self.line_ofs,
        };
        let from = row_start.max(MAX_OFFSET - (LINE_WIDTH as u64 - 1));
        let last_start = self
            .labels
            .iter_from(from)
            .map(|(ofs, _)| ofs)
            .take_while(|&ofs| ofs < end)
            .last()
            .unwrap_or(from);
        column(last_start) == 0
    }

    /// Bytes the current row needs before it can be written: up to the next
    /// 16-byte boundary, or up to the next label if that comes first.
    #[expect(clippy::cast_possible_truncation)]
    fn row_want(&self) -> usize {
        let want = LINE_WIDTH - column(self.line_ofs);
        match self.next_label {
            Some(label) if label < self.line_ofs + want as u64 => {
                label.saturating_sub(self.line_ofs) as usize
            }
            _ => want,
        }
    }

    fn complete_row(&mut self) -> io::Result<()> {
        self.anchor_owed = column(self.line_ofs) != 0;
        self.write_labels_at_row()?;
        if !self.line.is_empty() {
            self.write_row(false)?;
        }
        Ok(())
    }

    fn honor_seek(&mut self) -> io::Result<()> {
        let Some(target) = self.seek_target.take() else {
            return Ok(());
        };
        if target == self.cursor() {
            return Ok(());
        }
        self.wrap_up()?;
        if self.wrote_anything && self.next_label == Some(self.line_ofs) {
            // Labels at the end of a segment need an offset line of their own,
            // or the decoder would bind them to the next segment.
            self.write_labels_at_row()?;
            self.write_row(true)?;
        }
        if self.wrote_anything {
            self.sink.write_all(b"\n")?;
        }
        tracing::trace!(from = self.line_ofs, to = target, "seek honored");
        self.line_ofs = target;
        self.next_label = self.labels.first_offset_from(target);
        Ok(())
    }

    /// Writes whatever is buffered, or an empty row if an anchor is owed,
    /// behind an explicit offset.
    fn wrap_up(&mut self) -> io::Result<()> {
        if self.anchor_owed || !self.line.is_empty() {
            tracing::trace!(offset = self.line_ofs, len = self.line.len(), "forced row");
            self.write_labels_at_row()?;
            self.write_row(true)?;
            self.anchor_owed = false;
        }
        Ok(())
    }

    fn write_labels_at_row(&mut self) -> io::Result<()> {
        if self.next_label != Some(self.line_ofs) {
            return Ok(());
        }
        let labels = self.labels;
        for name in labels.names_at(self.line_ofs) {
            self.sink.write_all(b":")?;
            self.sink.write_all(name.as_bytes())?;
            self.sink.write_all(b"\n")?;
        }
        self.wrote_anything = true;
        self.next_label = labels.first_offset_after(self.line_ofs);
        Ok(())
    }

    fn write_row(&mut self, force_offset: bool) -> io::Result<()> {
        self.scratch.clear();
        render_row(
            &mut self.scratch,
            self.line_ofs,
            &self.line,
            force_offset,
            self.options,
        );
        self.sink.write_all(&self.scratch)?;
        self.line_ofs += self.line.len() as u64;
        self.line.clear();
        self.wrote_anything = true;
        Ok(())
    }
}

impl<W: io::Write> io::Write for Encoder<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_all_bytes(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

impl<W: io::Write> io::Seek for Encoder<'_, W> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(self.seek_to(pos)?)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.position())
    }
}

#[expect(clippy::cast_possible_truncation)]
fn column(ofs: u64) -> usize {
    (ofs % LINE_WIDTH as u64) as usize
}

/// Number of digits in the offset field: at least 8, always even.
fn offset_digits(ofs: u64) -> usize {
    let digits = (u64::BITS - ofs.leading_zeros()).div_ceil(4) as usize;
    digits.next_multiple_of(2).max(8)
}

/// Appends one row to `out`:
///
/// ```text
/// 00000010  00 01 02 03 04 05 06 07  08 09 0A 0B 0C 0D 0E 0F  |................|
/// ```
///
/// Unforced rows starting mid-line leave the offset field blank and indent
/// their bytes to their columns; forced rows always show the offset and
/// start at the first column.
fn render_row(
    out: &mut Vec<u8>,
    ofs: u64,
    bytes: &[u8],
    force_offset: bool,
    options: EncoderOptions,
) {
    let skip_left = if force_offset { 0 } else { column(ofs) };

    let digits = offset_digits(ofs);
    if skip_left == 0 {
        out.extend((0..digits).rev().map(|i| hex_digit(ofs >> (4 * i))));
    } else {
        out.resize(out.len() + digits, b' ');
    }
    out.extend_from_slice(b"  ");

    for col in 0..LINE_WIDTH {
        match col.checked_sub(skip_left).and_then(|i| bytes.get(i)) {
            Some(&b) => out.extend_from_slice(&[
                hex_digit(u64::from(b >> 4)),
                hex_digit(u64::from(b)),
                b' ',
            ]),
            None => out.extend_from_slice(b"   "),
        }
        if col == 7 {
            out.push(b' ');
        }
    }

    if options.omit_ascii_column {
        while out.last() == Some(&b' ') {
            out.pop();
        }
    } else {
        out.resize(out.len() + skip_left, b' ');
        out.extend_from_slice(b" |");
        out.extend(bytes.iter().map(|&b| printable(b)));
        out.push(b'|');
    }
    out.push(b'\n');
}

#[expect(clippy::cast_possible_truncation)]
fn hex_digit(nibble: u64) -> u8 {
    HEX_DIGITS[(nibble & 0xF) as usize]
}

fn printable(b: u8) -> u8 {
    if (b.is_ascii_graphic() || b == b' ') && b != b'|' {
        b
    } else {
        b'.'
    }
}

/// Dumps `data` as if written at `offset`, writing the labels that fall
/// within it.
///
/// ```rust
/// use sparsehex::LabelTable;
///
/// let labels: LabelTable = [("start", 0x10), ("foo", 0x18), ("end", 0x30)]
///     .into_iter()
///     .collect();
/// let data: Vec<u8> = (b'A'..b'A' + 0x20).collect();
/// let text = sparsehex::dump(&data, 0x10, &labels).unwrap();
/// assert_eq!(
///     text,
///     [
///         ":start",
///         "00000010  41 42 43 44 45 46 47 48                           |ABCDEFGH|",
///         ":foo",
///         "                                   49 4A 4B 4C 4D 4E 4F 50          |IJKLMNOP|",
///         "00000020  51 52 53 54 55 56 57 58  59 5A 5B 5C 5D 5E 5F 60  |QRSTUVWXYZ[\\]^_`|",
///         ":end",
///         "",
///     ]
///     .join("\n")
/// );
/// ```
///
/// Empty `data` produces an empty dump.
///
/// # Errors
///
/// [`EncodeError::OffsetOutOfRange`] if the data would extend past
/// `MAX_OFFSET`, or end there on a row without its own offset.
pub fn dump(data: &[u8], offset: u64, labels: &LabelTable) -> Result<String, EncodeError> {
    dump_with_options(data, offset, labels, EncoderOptions::default())
}

/// [`dump`] with non-default options.
///
/// # Errors
///
/// As [`dump`].
pub fn dump_with_options(
    data: &[u8],
    offset: u64,
    labels: &LabelTable,
    options: EncoderOptions,
) -> Result<String, EncodeError> {
    let mut enc = Encoder::with_options(Vec::new(), labels, options);
    enc.seek_to(SeekFrom::Start(offset))?;
    if !data.is_empty() {
        enc.write_all_bytes(data)?;
    }
    let text = enc.finish()?;
    String::from_utf8(text).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err).into())
}
