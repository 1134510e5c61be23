//! Group context from block B
//!
//! Block B of every group describes the group which contains it:
//!
//! ```txt
//!  15   12  11   10   9     5  4                   0
//! +-------+----+----+--------+---------------------+
//! | type  | B0 | TP |  PTY   | group-specific bits |
//! +-------+----+----+--------+---------------------+
//! ```
//!
//! The group-specific bits are needed to decode blocks C and D
//! of the same group.

use std::fmt;

/// Basic tuning and switching information (PS name)
pub const GROUP_BASIC_TUNING: u8 = 0;

/// Programme item number and slow labelling codes (ECC)
pub const GROUP_SLOW_LABELLING: u8 = 1;

/// RadioText
pub const GROUP_RADIOTEXT: u8 = 2;

/// Group version
///
/// Version A groups carry payload in both blocks C and D.
/// Version B groups repeat the programme identification code
/// in block C.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::IntoStaticStr,
)]
pub enum GroupVersion {
    /// Version A
    A,

    /// Version B
    B,
}

/// Group context
///
/// Decoded from block B. The context is valid only for the
/// remaining blocks of the same group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GroupContext {
    group_type: u8,
    version: GroupVersion,
    traffic_programme: bool,
    programme_type: u8,
    detail: GroupDetail,
}

/// Group-type-specific fields from block B
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GroupDetail {
    /// Group type 0
    BasicTuning(BasicTuning),

    /// Group type 2
    RadioText(RadioText),

    /// Not interpreted by this decoder
    Uninterpreted,
}

/// Type 0 fields
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BasicTuning {
    /// Traffic announcement in progress
    pub traffic_announcement: bool,

    /// Music (true) or speech (false)
    pub music: bool,

    /// Decoder identification bit for this segment
    pub decoder_ident: bool,

    /// Service name segment address, 0–3
    ///
    /// Block D carries two characters for this segment.
    pub ps_segment: u8,
}

/// Type 2 fields
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RadioText {
    /// Text A/B flag
    ///
    /// Stations toggle this flag when they begin a new message.
    pub text_ab: bool,

    /// Character offset of this group's text
    pub text_offset: usize,
}

impl GroupContext {
    /// Decode the context from a block B data word
    pub fn from_block_b(data: u16) -> Self {
        let group_type = ((data >> 12) & 0xf) as u8;
        let version = if (data >> 11) & 1 == 0 {
            GroupVersion::A
        } else {
            GroupVersion::B
        };

        let detail = match group_type {
            GROUP_BASIC_TUNING => GroupDetail::BasicTuning(BasicTuning {
                traffic_announcement: (data >> 4) & 1 == 1,
                music: (data >> 3) & 1 == 1,
                decoder_ident: (data >> 2) & 1 == 1,
                ps_segment: (data & 0x3) as u8,
            }),
            GROUP_RADIOTEXT => GroupDetail::RadioText(RadioText {
                text_ab: (data >> 4) & 1 == 1,
                text_offset: (data & 0xf) as usize * radiotext_segment_length(version),
            }),
            _ => GroupDetail::Uninterpreted,
        };

        Self {
            group_type,
            version,
            traffic_programme: (data >> 10) & 1 == 1,
            programme_type: ((data >> 5) & 0x1f) as u8,
            detail,
        }
    }

    /// Group type, 0–15
    pub fn group_type(&self) -> u8 {
        self.group_type
    }

    /// Group version
    pub fn version(&self) -> GroupVersion {
        self.version
    }

    /// Traffic programme flag
    pub fn traffic_programme(&self) -> bool {
        self.traffic_programme
    }

    /// Programme type code, 0–31
    pub fn programme_type(&self) -> u8 {
        self.programme_type
    }

    /// Type-specific fields
    pub fn detail(&self) -> &GroupDetail {
        &self.detail
    }
}

impl fmt::Display for GroupContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "group {}{} (PTY {}{})",
            self.group_type,
            self.version,
            self.programme_type,
            if self.traffic_programme { ", TP" } else { "" }
        )
    }
}

/// Characters of RadioText carried per group
///
/// Version A groups send four characters in blocks C and D.
/// Version B groups send two characters in block D.
pub fn radiotext_segment_length(version: GroupVersion) -> usize {
    match version {
        GroupVersion::A => 4,
        GroupVersion::B => 2,
    }
}

/// Maximum RadioText length, in characters
///
/// Sixteen segment addresses are available in either version.
pub fn radiotext_length(version: GroupVersion) -> usize {
    16 * radiotext_segment_length(version)
}
