//! Raw RDS block records and block sources
//!
//! RDS-capable FM tuners deliver one *block* at a time. Each block
//! is a three-byte record:
//!
//! ```txt
//! +--------+--------+--------+
//! |  LSB   |  MSB   | status |
//! +--------+--------+--------+
//!   16-bit data,      bits 0–2: block position
//!   little-endian     bit 7:    uncorrectable error
//! ```
//!
//! This layout is shared by the Linux V4L2 radio interface and
//! most RDS-capable tuner drivers. Records are decoded into a
//! [`Block`], which is consumed immediately by the decoder.

use std::fmt;
use std::io;
use std::sync::mpsc;

use byteorder::{LittleEndian, ReadBytesExt};
use thiserror::Error;

/// Length of one raw block record, in bytes
pub const RECORD_LENGTH: usize = 3;

// status byte layout
const STATUS_POSITION_MASK: u8 = 0x07;
const STATUS_ERROR: u8 = 0x80;

/// Position of a block within its group
///
/// Every RDS group is four blocks long, transmitted in the
/// cyclic order A, B, C, D. Version B groups carry an
/// alternate offset word C′ in place of C. Position E is
/// used by the MMBS paging system, which shares the RDS
/// subcarrier.
///
/// The decoder only interprets positions A through D. All
/// other positions are accepted and ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::IntoStaticStr)]
pub enum BlockPosition {
    /// Block A: always the programme identification code
    A,

    /// Block B: group type, version, and flags
    B,

    /// Block C: group-specific payload
    C,

    /// Block D: group-specific payload
    D,

    /// Block C′, the version B offset word for block C
    AltC,

    /// Block E (MMBS)
    E,

    /// Undefined position code `6` or `7`
    Reserved(u8),
}

impl BlockPosition {
    /// Position code, as it appears in the status byte
    pub fn code(&self) -> u8 {
        match self {
            BlockPosition::A => 0,
            BlockPosition::B => 1,
            BlockPosition::C => 2,
            BlockPosition::D => 3,
            BlockPosition::AltC => 4,
            BlockPosition::E => 5,
            BlockPosition::Reserved(code) => *code & STATUS_POSITION_MASK,
        }
    }
}

impl From<u8> for BlockPosition {
    /// Decode from the low three bits of a status byte
    fn from(status: u8) -> Self {
        match status & STATUS_POSITION_MASK {
            0 => BlockPosition::A,
            1 => BlockPosition::B,
            2 => BlockPosition::C,
            3 => BlockPosition::D,
            4 => BlockPosition::AltC,
            5 => BlockPosition::E,
            code => BlockPosition::Reserved(code),
        }
    }
}

impl fmt::Display for BlockPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockPosition::AltC => write!(f, "C'"),
            BlockPosition::Reserved(code) => write!(f, "reserved({})", code),
            _ => write!(f, "{}", <&'static str>::from(self)),
        }
    }
}

/// One RDS block
///
/// A block is a 16-bit data word, its position within the
/// group, and a flag which is set when the tuner could not
/// correct errors in the block.
///
/// ```
/// use rdsdecoder::{Block, BlockPosition};
///
/// let blk = Block::from_record([0x34, 0x12, 0x00]);
/// assert_eq!(blk.data(), 0x1234);
/// assert_eq!(blk.position(), BlockPosition::A);
/// assert!(!blk.is_corrupted());
///
/// let blk = Block::from_record([0x34, 0x12, 0x83]);
/// assert_eq!(blk.position(), BlockPosition::D);
/// assert!(blk.is_corrupted());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Block {
    data: u16,
    position: BlockPosition,
    corrupted: bool,
}

impl Block {
    /// An error-free block
    pub fn new(data: u16, position: BlockPosition) -> Self {
        Self {
            data,
            position,
            corrupted: false,
        }
    }

    /// A block flagged with an uncorrectable error
    pub fn new_corrupted(data: u16, position: BlockPosition) -> Self {
        Self {
            data,
            position,
            corrupted: true,
        }
    }

    /// Decode a raw three-byte record
    pub fn from_record(record: [u8; RECORD_LENGTH]) -> Self {
        let status = record[2];
        Self {
            data: u16::from_le_bytes([record[0], record[1]]),
            position: BlockPosition::from(status),
            corrupted: status & STATUS_ERROR != 0,
        }
    }

    /// Encode as a raw three-byte record
    pub fn to_record(&self) -> [u8; RECORD_LENGTH] {
        let data = self.data.to_le_bytes();
        let status = self.position.code() | if self.corrupted { STATUS_ERROR } else { 0 };
        [data[0], data[1], status]
    }

    /// 16-bit data word
    pub fn data(&self) -> u16 {
        self.data
    }

    /// Block position
    pub fn position(&self) -> BlockPosition {
        self.position
    }

    /// True if the tuner flagged this block as uncorrectable
    pub fn is_corrupted(&self) -> bool {
        self.corrupted
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:04x}", self.position, self.data)?;
        if self.corrupted {
            write!(f, " (corrupted)")?;
        }
        Ok(())
    }
}

/// Error reading from a [`BlockSource`]
///
/// Source errors are fatal to the decoder's worker.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The source has no more blocks
    #[error("end of RDS block stream")]
    EndOfStream,

    /// The source could not be read
    #[error("unable to read RDS block: {0}")]
    Io(#[from] io::Error),
}

impl SourceError {
    /// True if the source simply ran out of data
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, SourceError::EndOfStream)
    }
}

/// A blocking, sequential source of RDS blocks
///
/// The decoder's worker thread takes exclusive ownership of its
/// source and calls [`read_block()`](BlockSource::read_block)
/// once per block. Implementations should block until a block
/// is available. Any error ends the worker.
pub trait BlockSource: Send {
    /// Read the next block
    fn read_block(&mut self) -> Result<Block, SourceError>;
}

impl<S> BlockSource for Box<S>
where
    S: BlockSource + ?Sized,
{
    fn read_block(&mut self) -> Result<Block, SourceError> {
        (**self).read_block()
    }
}

/// Blocks pushed through a channel
///
/// The source ends when every sender has been dropped.
impl BlockSource for mpsc::Receiver<Block> {
    fn read_block(&mut self) -> Result<Block, SourceError> {
        self.recv().map_err(|_| SourceError::EndOfStream)
    }
}

/// Reads raw block records from a byte stream
///
/// Wraps any [`io::Read`], such as an RDS-capable radio device,
/// a file of captured records, or standard input. A stream
/// which ends partway through a record reports
/// [`SourceError::EndOfStream`].
///
/// ```
/// use rdsdecoder::{BlockPosition, BlockSource, RecordReader};
///
/// let raw: &[u8] = &[0x04, 0xc2, 0x00, 0x08, 0x20, 0x01];
/// let mut rdr = RecordReader::new(raw);
///
/// let blk = rdr.read_block().unwrap();
/// assert_eq!((blk.data(), blk.position()), (0xc204, BlockPosition::A));
/// let blk = rdr.read_block().unwrap();
/// assert_eq!((blk.data(), blk.position()), (0x2008, BlockPosition::B));
/// assert!(rdr.read_block().unwrap_err().is_end_of_stream());
/// ```
#[derive(Debug)]
pub struct RecordReader<R> {
    inner: R,
}

impl<R> RecordReader<R>
where
    R: io::Read,
{
    /// Read records from `inner`
    ///
    /// Records are read with small reads; wrap unbuffered
    /// files in an [`io::BufReader`].
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Release the underlying reader
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R> BlockSource for RecordReader<R>
where
    R: io::Read + Send,
{
    fn read_block(&mut self) -> Result<Block, SourceError> {
        let data = self
            .inner
            .read_u16::<LittleEndian>()
            .map_err(end_of_stream)?;
        let status = self.inner.read_u8().map_err(end_of_stream)?;

        Ok(Block {
            data,
            position: BlockPosition::from(status),
            corrupted: status & STATUS_ERROR != 0,
        })
    }
}

// short reads mean the stream is over
fn end_of_stream(err: io::Error) -> SourceError {
    match err.kind() {
        io::ErrorKind::UnexpectedEof => SourceError::EndOfStream,
        _ => SourceError::Io(err),
    }
}
