/// Configuration options for the [`Encoder`](crate::Encoder).
///
/// These options only affect decoration; every setting produces text the
/// [`Decoder`](crate::Decoder) reads back to the same bytes and labels.
///
/// # Examples
///
/// ```rust
/// use sparsehex::{EncoderOptions, LabelTable};
///
/// let options = EncoderOptions {
///     omit_ascii_column: true,
///     ..Default::default()
/// };
/// let text = sparsehex::dump_with_options(b"AB", 0, &LabelTable::new(), options).unwrap();
/// assert_eq!(text, "00000000  41 42\n");
/// ```
///
/// # Default
///
/// All options default to `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderOptions {
    /// Whether to leave out the `|...|` column that renders each line's bytes
    /// as ASCII.
    ///
    /// The column is never read back, so dropping it makes dumps smaller and
    /// diffs quieter. Padding that only served to align the column is
    /// trimmed as well.
    ///
    /// # Default
    ///
    /// `false`
    pub omit_ascii_column: bool,
}
