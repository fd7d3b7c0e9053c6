use core::{fmt, hash};

/// Maximum number of bytes carried by one dump line.
pub const LINE_WIDTH: usize = 16;

/// Up to [`LINE_WIDTH`] bytes, stored inline.
///
/// This is the unit the scanner produces per data line and the unit the
/// encoder accumulates before rendering a line.
#[derive(Clone, Copy, Default)]
pub struct ByteRun {
    bytes: [u8; LINE_WIDTH],
    len: u8,
}

impl ByteRun {
    /// An empty run.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bytes: [0; LINE_WIDTH],
            len: 0,
        }
    }

    /// Number of bytes held.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether the run holds no bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the run holds [`LINE_WIDTH`] bytes.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.len() == LINE_WIDTH
    }

    /// The bytes held.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len()]
    }

    /// Appends one byte.
    ///
    /// # Panics
    ///
    /// Panics if the run is already full.
    pub fn push(&mut self, byte: u8) {
        assert!(!self.is_full(), "byte run overflow");
        self.bytes[self.len()] = byte;
        self.len += 1;
    }

    /// Copies bytes from `src` until the run holds `want` bytes or `src` is
    /// exhausted. Returns how many bytes were taken from `src`.
    #[expect(clippy::cast_possible_truncation)]
    pub(crate) fn fill(&mut self, src: &[u8], want: usize) -> usize {
        debug_assert!(want <= LINE_WIDTH, "want {want} exceeds line width");
        let have = self.len();
        let n = want.saturating_sub(have).min(src.len());
        self.bytes[have..have + n].copy_from_slice(&src[..n]);
        self.len = (have + n) as u8;
        n
    }

    /// Empties the run.
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl AsRef<[u8]> for ByteRun {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl core::ops::Deref for ByteRun {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl PartialEq for ByteRun {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for ByteRun {}

impl hash::Hash for ByteRun {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state);
    }
}

impl fmt::Debug for ByteRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ByteRun[")?;
        for (i, b) in self.as_slice().iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{b:02X}")?;
        }
        f.write_str("]")
    }
}

/// Error returned when converting a slice longer than [`LINE_WIDTH`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{0} bytes do not fit in a {LINE_WIDTH}-byte run")]
pub struct RunTooLong(pub usize);

impl TryFrom<&[u8]> for ByteRun {
    type Error = RunTooLong;

    fn try_from(src: &[u8]) -> Result<Self, Self::Error> {
        if src.len() > LINE_WIDTH {
            return Err(RunTooLong(src.len()));
        }
        let mut run = Self::new();
        run.fill(src, src.len());
        Ok(run)
    }
}
