//! Annotated, sparse hex dumps.
//!
//! A dump is line-oriented text: each data line holds up to 16 bytes, an
//! optional offset field and a decorative ASCII column. Offsets may jump
//! ahead, so one document describes any number of disjoint byte ranges, and
//! `:name` lines attach labels to offsets.
//!
//! ```text
//! # Comments start with '#' and blank lines are ignored.
//! 00000010  00 01 02 03 04 05 06 07  08 09 0A 0B 0C 0D 0E 0F  |................|
//! :foo
//!                                41 42 43 44 45 46 47 48          |ABCDEFGH|
//! FF000020  49 4A 4B 4C                                       |IJKL|
//! ```
//!
//! [`Decoder`] reads such text back into byte segments and a
//! [`LabelTable`]; [`Encoder`] writes it.
//!
//! ```rust
//! use sparsehex::{LabelTable, decode_all, dump};
//!
//! let labels: LabelTable = [("entry", 0x1004)].into_iter().collect();
//! let text = dump(b"\x55\x48\x89\xE5\xC3", 0x1000, &labels).unwrap();
//!
//! let (segments, decoded) = decode_all(text.as_bytes()).unwrap();
//! assert_eq!(segments.len(), 1);
//! assert_eq!(segments[0].offset, 0x1000);
//! assert_eq!(segments[0].data, b"\x55\x48\x89\xE5\xC3");
//! assert_eq!(decoded, labels);
//! ```

mod decoder;
mod encoder;
mod error;
mod labels;
mod options;
mod run;
mod scanner;


pub use decoder::{Advance, Decoder, Segment, Segments, decode_all};
pub use encoder::{Encoder, dump, dump_with_options};
pub use error::{DecodeError, EncodeError, ScanError};
pub use labels::{LabelTable, LabelsFrom};
pub use options::EncoderOptions;
pub use run::{ByteRun, LINE_WIDTH, RunTooLong};
pub use scanner::{Line, MAX_OFFSET, Scanner, is_label_name, scan_line};
