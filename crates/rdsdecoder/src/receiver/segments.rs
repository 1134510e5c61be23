//! Assembles strings from fixed-size segments
//!
//! RDS transmits its strings a few characters at a time. The
//! programme service name is sent two characters per group,
//! and RadioText is sent two or four characters per group.
//! Each group carries the *address* of its segment, so the
//! segments may be received in any order, repeatedly, and with
//! gaps. The [`SegmentedAssembler`] tracks which characters
//! have been received so far.

use arrayvec::ArrayVec;

/// Maximum length of a segmented string, in characters
///
/// This is the length of a version A RadioText message.
pub const MAX_SEGMENTED_LENGTH: usize = 64;

// unfilled characters
const BLANK: char = ' ';

/// Segmented string assembler
///
/// The assembler has a fixed length, which may be changed with
/// [`set_length()`](SegmentedAssembler::set_length). Segments
/// are written with
/// [`set_segment()`](SegmentedAssembler::set_segment). Writes
/// which fall outside the length are clipped and silently
/// discarded. Broadcast data is noisy, and a stray segment
/// address is no reason to stop decoding.
///
/// ```
/// use rdsdecoder::SegmentedAssembler;
///
/// let mut ps = SegmentedAssembler::new(8);
/// ps.set_segment(1, &['B', 'C']);
/// assert_eq!("  BC    ", ps.value());
/// assert!(!ps.is_complete());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentedAssembler {
    // current content, blank-filled
    buffer: ArrayVec<char, MAX_SEGMENTED_LENGTH>,

    // bit n set when character n has been written
    filled: u64,
}

impl SegmentedAssembler {
    /// New assembler of the given `length`, in characters
    ///
    /// The `length` is capped at [`MAX_SEGMENTED_LENGTH`].
    pub fn new(length: usize) -> Self {
        let mut out = Self {
            buffer: ArrayVec::new(),
            filled: 0,
        };
        out.reinitialize(length);
        out
    }

    /// Change length
    ///
    /// If `length` differs from the current length, all content
    /// is discarded and the assembler is re-initialized to
    /// `length` blank characters. If the length is unchanged,
    /// this method does nothing. The `length` is capped at
    /// [`MAX_SEGMENTED_LENGTH`].
    pub fn set_length(&mut self, length: usize) {
        if usize::min(length, MAX_SEGMENTED_LENGTH) != self.len() {
            self.reinitialize(length);
        }
    }

    /// Discard all content, keeping the current length
    pub fn clear(&mut self) {
        let len = self.len();
        self.reinitialize(len);
    }

    /// Write a segment
    ///
    /// All segments are assumed to be `chars.len()` long. The
    /// segment is written to characters
    /// `offset * chars.len()` and up, and those characters are
    /// marked as filled. Any characters which do not fit are
    /// discarded.
    pub fn set_segment(&mut self, offset: usize, chars: &[char]) {
        let start = offset.saturating_mul(chars.len());
        for (pos, c) in (start..self.len()).zip(chars.iter()) {
            self.buffer[pos] = *c;
            self.filled |= 1u64 << pos;
        }
    }

    /// True if every character has been filled
    ///
    /// A zero-length assembler is never complete.
    pub fn is_complete(&self) -> bool {
        !self.is_empty() && self.filled == fill_mask(self.len())
    }

    /// Length, in characters
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// True if the length is zero
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Number of characters filled so far
    pub fn filled_count(&self) -> u32 {
        self.filled.count_ones()
    }

    /// Current content
    ///
    /// Characters which have not been filled are blank.
    pub fn value(&self) -> String {
        self.buffer.iter().collect()
    }

    /// Content preceding the first `terminator`
    ///
    /// If the `terminator` is not present, returns the entire
    /// content.
    pub fn value_until(&self, terminator: char) -> String {
        self.buffer
            .iter()
            .take_while(|c| **c != terminator)
            .collect()
    }

    fn reinitialize(&mut self, length: usize) {
        let length = usize::min(length, MAX_SEGMENTED_LENGTH);
        self.buffer.clear();
        self.buffer.extend(std::iter::repeat(BLANK).take(length));
        self.filled = 0;
    }
}

impl Default for SegmentedAssembler {
    fn default() -> Self {
        Self::new(0)
    }
}

// bitmask with the low `len` bits set
fn fill_mask(len: usize) -> u64 {
    if len >= u64::BITS as usize {
        u64::MAX
    } else {
        (1u64 << len) - 1
    }
}
