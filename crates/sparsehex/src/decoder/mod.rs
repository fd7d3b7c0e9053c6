//! Decoder: turns dump text back into byte segments and labels.
//!
//! Lines without an offset field are collected into a pending buffer until a
//! line with an offset arrives; that offset, minus the number of pending bytes,
//! fixes where the whole run starts. Labels seen while bytes are pending are
//! resolved at the same moment. A run that starts exactly where the current
//! segment ends extends it; a run that starts later is parked as the next
//! segment, and the caller has to [`Decoder::advance`] past the gap to see it.
//!
//! ```rust
//! use std::io::Read;
//!
//! use sparsehex::{Advance, Decoder};
//!
//! let input = "\
//! 0010  00 01 02 03 04 05 06 07  08 09 0A 0B 0C 0D 0E 0F
//! 0040  20 01 02 03 04 05 06 07  08 09 0A 0B
//! ";
//! let mut dec = Decoder::new(input.as_bytes());
//! assert_eq!(dec.advance().unwrap(), Advance::Gap(0x10));
//! let mut first = Vec::new();
//! dec.read_to_end(&mut first).unwrap();
//! assert_eq!(first.len(), 16);
//!
//! assert_eq!(dec.advance().unwrap(), Advance::Gap(0x20));
//! assert_eq!(dec.offset(), 0x40);
//! let mut second = Vec::new();
//! dec.read_to_end(&mut second).unwrap();
//! assert_eq!(second.len(), 0xC);
//!
//! assert_eq!(dec.advance().unwrap(), Advance::EndOfInput);
//! ```

use std::{
    io::{self, BufRead, Read},
    mem,
};

use crate::{
    error::DecodeError,
    labels::LabelTable,
    scanner::{Line, Scanner},
};

/// Result of [`Decoder::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Positioned at the next segment; the payload is the number of bytes
    /// between the end of the previous segment and its start.
    Gap(u64),
    /// No segments remain.
    EndOfInput,
}

/// A run of bytes contiguous in offset space.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Segment {
    /// Offset of the first byte.
    pub offset: u64,
    /// The bytes.
    pub data: Vec<u8>,
}

impl Segment {
    /// Offset one past the last byte.
    #[must_use]
    pub fn end(&self) -> u64 {
        self.offset + self.data.len() as u64
    }
}

/// What one pull of input lines produced.
#[derive(Debug)]
enum Pull {
    /// Bytes continuing the current segment.
    Segment(Vec<u8>),
    /// A segment starting after the current one ends.
    Gap(Segment),
    EndOfInput,
}

/// Reads a dump from `R` and serves its bytes one segment at a time.
///
/// [`Read`] returns bytes of the current segment only and reports end of file
/// at the segment boundary; [`Decoder::advance`] moves on to the next one.
#[derive(Debug)]
pub struct Decoder<R> {
    scanner: Scanner<R>,
    labels: LabelTable,

    /// Offset of `data[pos]`.
    ready_ofs: u64,
    data: Vec<u8>,
    pos: usize,
    next: Option<Segment>,

    entered: bool,
    exhausted: bool,
    poisoned: bool,
}

impl<R: BufRead> Decoder<R> {
    /// Creates a decoder reading dump text from `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            scanner: Scanner::new(reader),
            labels: LabelTable::new(),
            ready_ofs: 0,
            data: Vec::new(),
            pos: 0,
            next: None,
            entered: false,
            exhausted: false,
            poisoned: false,
        }
    }

    /// Labels resolved so far. Labels declared ahead of the offset that
    /// anchors them appear once that offset has been read.
    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Consumes the decoder, returning the labels resolved so far.
    pub fn into_labels(self) -> LabelTable {
        self.labels
    }

    /// Offset of the next byte [`Decoder::read_segment`] would return.
    pub fn offset(&self) -> u64 {
        self.ready_ofs
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// One past the last byte known to belong to the current segment.
    fn end(&self) -> u64 {
        self.ready_ofs + self.remaining() as u64
    }

    /// Copies bytes of the current segment into `buf`. Returns `Ok(0)` once
    /// the segment is exhausted; call [`Decoder::advance`] to continue with
    /// the next one.
    ///
    /// Before the first [`Decoder::advance`], this reads the first segment
    /// only if it starts at offset 0.
    ///
    /// # Errors
    ///
    /// Syntax errors, offset rewinds and reader failures. After an error the
    /// decoder is poisoned.
    pub fn read_segment(&mut self, buf: &mut [u8]) -> Result<usize, DecodeError> {
        self.check_poisoned()?;
        loop {
            if self.remaining() > 0 {
                let take = self.remaining().min(buf.len());
                buf[..take].copy_from_slice(&self.data[self.pos..self.pos + take]);
                self.pos += take;
                self.ready_ofs += take as u64;
                self.entered = true;
                return Ok(take);
            }
            if buf.is_empty() || self.next.is_some() || self.exhausted {
                return Ok(0);
            }
            match self.guarded_pull()? {
                Pull::Segment(bytes) => self.install(bytes),
                Pull::Gap(next) => self.next = Some(next),
                Pull::EndOfInput => self.exhausted = true,
            }
        }
    }

    /// Appends the rest of the current segment to `out`, returning how many
    /// bytes were appended.
    ///
    /// # Errors
    ///
    /// As [`Decoder::read_segment`].
    pub fn read_segment_to_end(&mut self, out: &mut Vec<u8>) -> Result<usize, DecodeError> {
        self.check_poisoned()?;
        let start = out.len();
        loop {
            if self.remaining() > 0 {
                out.extend_from_slice(&self.data[self.pos..]);
                self.ready_ofs += self.remaining() as u64;
                self.pos = self.data.len();
                continue;
            }
            if self.next.is_some() || self.exhausted {
                break;
            }
            match self.guarded_pull()? {
                Pull::Segment(bytes) => self.install(bytes),
                Pull::Gap(next) => self.next = Some(next),
                Pull::EndOfInput => self.exhausted = true,
            }
        }
        let n = out.len() - start;
        if n > 0 {
            self.entered = true;
        }
        Ok(n)
    }

    /// Skips whatever is left of the current segment and moves to the next.
    ///
    /// The first call positions the decoder at the first segment without
    /// skipping anything, and reports that segment's start offset as the gap.
    ///
    /// # Errors
    ///
    /// Syntax errors, offset rewinds and reader failures. After an error the
    /// decoder is poisoned.
    pub fn advance(&mut self) -> Result<Advance, DecodeError> {
        self.check_poisoned()?;
        let first = !mem::replace(&mut self.entered, true);
        if first && self.remaining() == 0 && self.next.is_none() && !self.exhausted {
            match self.guarded_pull()? {
                Pull::Segment(bytes) => {
                    self.install(bytes);
                    return Ok(Advance::Gap(self.ready_ofs));
                }
                Pull::Gap(next) => self.next = Some(next),
                Pull::EndOfInput => self.exhausted = true,
            }
        }

        // Drop the rest of the current segment.
        let discarded = self.remaining();
        self.ready_ofs += discarded as u64;
        self.data.clear();
        self.pos = 0;
        while self.next.is_none() && !self.exhausted {
            match self.guarded_pull()? {
                Pull::Segment(bytes) => self.ready_ofs += bytes.len() as u64,
                Pull::Gap(next) => self.next = Some(next),
                Pull::EndOfInput => self.exhausted = true,
            }
        }

        let Some(next) = self.next.take() else {
            return Ok(Advance::EndOfInput);
        };
        let gap = next.offset - self.ready_ofs;
        tracing::trace!(offset = next.offset, gap, len = next.data.len(), "entering segment");
        self.ready_ofs = next.offset;
        self.install(next.data);
        Ok(Advance::Gap(gap))
    }

    /// Iterates the remaining segments, each read in full.
    pub fn segments(self) -> Segments<R> {
        Segments {
            decoder: self,
            deferred: None,
        }
    }

    fn install(&mut self, bytes: Vec<u8>) {
        self.data = bytes;
        self.pos = 0;
    }

    fn check_poisoned(&self) -> Result<(), DecodeError> {
        if self.poisoned {
            return Err(DecodeError::Poisoned);
        }
        Ok(())
    }

    fn guarded_pull(&mut self) -> Result<Pull, DecodeError> {
        let pulled = self.pull();
        if let Err(err) = &pulled {
            tracing::debug!(line = self.scanner.line_number(), error = %err, "decode failed");
            self.poisoned = true;
        }
        pulled
    }

    /// Reads lines until some bytes are known to continue the current
    /// segment, a later segment has been found, or the input ends.
    fn pull(&mut self) -> Result<Pull, DecodeError> {
        let mut pending: Vec<u8> = Vec::new();
        let mut unresolved: Vec<(String, usize)> = Vec::new();
        loop {
            let Some(line) = self.scanner.next_line()? else {
                // Without a closing offset, trailing bytes and labels are taken
                // to continue the current segment.
                let end = self.end();
                for (name, rel) in unresolved {
                    self.resolve(name, end + rel as u64);
                }
                if pending.is_empty() {
                    return Ok(Pull::EndOfInput);
                }
                return Ok(Pull::Segment(pending));
            };

            let (offset, bytes) = match line {
                Line::Empty => continue,
                Line::Label(name) => {
                    unresolved.push((name, pending.len()));
                    continue;
                }
                Line::Data {
                    offset: None,
                    bytes,
                } => {
                    pending.extend_from_slice(&bytes);
                    continue;
                }
                Line::Data {
                    offset: Some(offset),
                    bytes,
                } => (offset, bytes),
            };

            let end = self.end();
            let line = self.scanner.line_number();
            let rewind = move |start: u64| DecodeError::OffsetRewind {
                offset: start,
                expected: end,
                line,
            };
            let start = offset
                .checked_sub(pending.len() as u64)
                .ok_or_else(|| rewind(0))?;
            for (name, rel) in unresolved.drain(..) {
                self.resolve(name, start + rel as u64);
            }
            if start < end {
                return Err(rewind(start));
            }

            pending.extend_from_slice(&bytes);
            if start > end {
                return Ok(Pull::Gap(Segment {
                    offset: start,
                    data: pending,
                }));
            }
            if !pending.is_empty() {
                return Ok(Pull::Segment(pending));
            }
        }
    }

    fn resolve(&mut self, name: String, offset: u64) {
        tracing::trace!(label = %name, offset, "label resolved");
        self.labels.set(name, offset);
    }
}

impl<R: BufRead> Read for Decoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_segment(buf)?)
    }
}

/// Iterator over the segments of a [`Decoder`], created by
/// [`Decoder::segments`].
#[derive(Debug)]
pub struct Segments<R> {
    decoder: Decoder<R>,
    /// Error hit while reading ahead past a segment that was yielded.
    deferred: Option<DecodeError>,
}

impl<R> Segments<R> {
    /// Labels resolved so far.
    pub fn labels(&self) -> &LabelTable {
        &self.decoder.labels
    }

    /// Consumes the iterator, returning the labels resolved so far.
    pub fn into_labels(self) -> LabelTable {
        self.decoder.labels
    }
}

impl<R: BufRead> Iterator for Segments<R> {
    type Item = Result<Segment, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.deferred.take() {
            return Some(Err(err));
        }
        let decoder = &mut self.decoder;
        if decoder.poisoned {
            return None;
        }
        match decoder.advance() {
            Ok(Advance::EndOfInput) => None,
            Ok(Advance::Gap(_)) => {
                let offset = decoder.offset();
                let mut data = Vec::new();
                match decoder.read_segment_to_end(&mut data) {
                    Ok(_) => Some(Ok(Segment { offset, data })),
                    Err(err) if data.is_empty() => Some(Err(err)),
                    Err(err) => {
                        self.deferred = Some(err);
                        Some(Ok(Segment { offset, data }))
                    }
                }
            }
            Err(err) => Some(Err(err)),
        }
    }
}

/// Decodes a complete dump held in memory.
///
/// ```rust
/// let (segments, labels) = sparsehex::decode_all(b"\
/// :entry
///                                      41 42 43
/// 0010  44
/// ").unwrap();
/// assert_eq!(segments.len(), 1);
/// assert_eq!(segments[0].offset, 0x0D);
/// assert_eq!(segments[0].data, b"ABCD");
/// assert_eq!(labels.get("entry"), Some(0x0D));
/// ```
///
/// # Errors
///
/// The first [`DecodeError`] encountered.
pub fn decode_all(text: &[u8]) -> Result<(Vec<Segment>, LabelTable), DecodeError> {
    let mut segments = Decoder::new(text).segments();
    let mut out = Vec::new();
    for segment in segments.by_ref() {
        out.push(segment?);
    }
    Ok((out, segments.into_labels()))
}
