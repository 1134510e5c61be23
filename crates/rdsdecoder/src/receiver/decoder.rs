//! Block decoder state machine
//!
//! Blocks are decoded one at a time. The nominal order within a
//! group is A → B → C → D, but the order is not enforced:
//!
//! * Block A is decoded on its own.
//!
//! * Block B replaces the current [`GroupContext`].
//!
//! * Blocks C and D are decoded against whatever context
//!   exists. If there is none, they are ignored.
//!
//! * Any corrupted block discards the context. The rest of
//!   that group's C and D blocks are ignored until the next
//!   block B arrives.
//!
//! Radio reception is noisy, and isolated block errors are
//! common. This is the only error handling the decoder needs.

#[cfg(not(test))]
use log::{debug, trace};

#[cfg(test)]
use std::println as debug;
#[cfg(test)]
use std::println as trace;

use super::group::{
    radiotext_length, GroupContext, GroupDetail, GroupVersion, GROUP_SLOW_LABELLING,
};
use super::segments::SegmentedAssembler;
use crate::block::{Block, BlockPosition};
use crate::fields::FieldUpdate;

/// Length of the programme service name
pub const SERVICE_NAME_LENGTH: usize = 8;

/// Marks the logical end of a RadioText message
pub const TEXT_TERMINATOR: char = '\r';

/// RDS block decoder
///
/// Accepts one [`Block`] at a time via
/// [`input()`](BlockDecoder::input) and reports a
/// [`FieldUpdate`] whenever a block yields a field value. The
/// decoder does not remember field values, only the partially
/// received strings, so most updates will repeat the previous
/// value.
#[derive(Clone, Debug)]
pub struct BlockDecoder {
    // context from the last block B, if still valid
    group: Option<GroupContext>,

    service_name: SegmentedAssembler,
    text: SegmentedAssembler,

    // last RadioText A/B flag
    text_ab: Option<bool>,

    // clear the text when the A/B flag toggles
    text_ab_reset: bool,

    // report a completely-filled text without a terminator
    complete_text: bool,
}

impl BlockDecoder {
    /// New decoder
    ///
    /// If `text_ab_reset` is set, a change in the RadioText
    /// A/B flag discards the partially-received text. If
    /// `complete_text` is set, a text which fills every
    /// character without a terminator is reported.
    pub fn new(text_ab_reset: bool, complete_text: bool) -> Self {
        Self {
            group: None,
            service_name: SegmentedAssembler::new(SERVICE_NAME_LENGTH),
            text: SegmentedAssembler::default(),
            text_ab: None,
            text_ab_reset,
            complete_text,
        }
    }

    /// Reset to zero initial conditions
    ///
    /// Discards the group context and all partially-received
    /// strings.
    pub fn reset(&mut self) {
        self.group = None;
        self.service_name = SegmentedAssembler::new(SERVICE_NAME_LENGTH);
        self.text = SegmentedAssembler::default();
        self.text_ab = None;
    }

    /// Decode one block
    ///
    /// Returns a field value if this block completes one.
    pub fn input(&mut self, block: &Block) -> Option<FieldUpdate> {
        if block.is_corrupted() {
            if let Some(ctx) = self.group.take() {
                trace!("decoder: corrupted block {}; dropped {}", block, ctx);
            }
            return None;
        }

        match block.position() {
            BlockPosition::A => Some(FieldUpdate::Identity(block.data())),
            BlockPosition::B => {
                self.decode_b(block.data());
                None
            }
            BlockPosition::C => self.decode_c(block.data()),
            BlockPosition::D => self.decode_d(block.data()),
            _ => None,
        }
    }

    /// Current group context, if any
    pub fn group(&self) -> Option<&GroupContext> {
        self.group.as_ref()
    }

    /// Partially-received service name
    pub fn service_name(&self) -> &SegmentedAssembler {
        &self.service_name
    }

    /// Partially-received text
    pub fn text(&self) -> &SegmentedAssembler {
        &self.text
    }

    fn decode_b(&mut self, data: u16) {
        let ctx = GroupContext::from_block_b(data);
        trace!("decoder: {}", ctx);

        if let GroupDetail::RadioText(rt) = ctx.detail() {
            self.text.set_length(radiotext_length(ctx.version()));
            if self.text_ab_reset && self.text_ab.map_or(false, |flag| flag != rt.text_ab) {
                debug!("decoder: text A/B flag changed; discarding partial text");
                self.text.clear();
            }
            self.text_ab = Some(rt.text_ab);
        }

        self.group = Some(ctx);
    }

    fn decode_c(&mut self, data: u16) -> Option<FieldUpdate> {
        let ctx = self.group?;
        match (ctx.version(), ctx.detail()) {
            // version B repeats the PI code
            (GroupVersion::B, _) => Some(FieldUpdate::Identity(data)),
            (GroupVersion::A, GroupDetail::RadioText(rt)) => {
                let offset = rt.text_offset;
                self.assemble_text(offset, data)
            }
            (GroupVersion::A, _) if ctx.group_type() == GROUP_SLOW_LABELLING => {
                // variant 0 carries the ECC
                if (data >> 12) & 0x7 == 0 {
                    Some(FieldUpdate::Country((data & 0xff) as u8))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn decode_d(&mut self, data: u16) -> Option<FieldUpdate> {
        let ctx = self.group?;
        match ctx.detail() {
            GroupDetail::BasicTuning(bt) => {
                self.service_name
                    .set_segment(bt.ps_segment as usize, &decode_chars(data));
                if self.service_name.is_complete() {
                    Some(FieldUpdate::Name(self.service_name.value()))
                } else {
                    None
                }
            }
            GroupDetail::RadioText(rt) => {
                // version A: second half of the chunk begun in block C
                let offset = match ctx.version() {
                    GroupVersion::A => rt.text_offset + 2,
                    GroupVersion::B => rt.text_offset,
                };
                self.assemble_text(offset, data)
            }
            GroupDetail::Uninterpreted => None,
        }
    }

    // write two characters of text at character `offset`
    fn assemble_text(&mut self, offset: usize, data: u16) -> Option<FieldUpdate> {
        let chars = decode_chars(data);
        self.text.set_segment(offset / chars.len(), &chars);

        // a full buffer may still hold a terminator from an earlier pair
        if chars.contains(&TEXT_TERMINATOR) || (self.complete_text && self.text.is_complete()) {
            Some(FieldUpdate::Text(self.text.value_until(TEXT_TERMINATOR)))
        } else {
            None
        }
    }
}

impl Default for BlockDecoder {
    fn default() -> Self {
        Self::new(true, true)
    }
}

// two characters per block, high byte first
fn decode_chars(data: u16) -> [char; 2] {
    let [hi, lo] = data.to_be_bytes();
    [char::from(hi), char::from(lo)]
}

#[cfg(test)]
mod tests {
    use super::*;

    const PI: u16 = 0xc204;

    fn blk(position: BlockPosition, data: u16) -> Block {
        Block::new(data, position)
    }

    fn chars(s: &str) -> u16 {
        let b = s.as_bytes();
        u16::from_be_bytes([b[0], b[1]])
    }

    // block B for group 0A at `segment`
    fn block_b_0a(segment: u16) -> u16 {
        segment & 0x3
    }

    // block B for group 2A/2B at `address`
    fn block_b_2(version: GroupVersion, ab: bool, address: u16) -> u16 {
        let ver = match version {
            GroupVersion::A => 0,
            GroupVersion::B => 1,
        };
        0x2000 | ver << 11 | (ab as u16) << 4 | (address & 0xf)
    }

    // run a whole group, collecting every update
    fn group(dec: &mut BlockDecoder, b: u16, c: u16, d: u16) -> Vec<FieldUpdate> {
        [
            blk(BlockPosition::A, PI),
            blk(BlockPosition::B, b),
            blk(BlockPosition::C, c),
            blk(BlockPosition::D, d),
        ]
        .iter()
        .filter_map(|bl| dec.input(bl))
        .collect()
    }

    #[test]
    fn test_decode_chars() {
        assert_eq!(['B', 'C'], decode_chars(chars("BC")));
        assert_eq!(['\r', ' '], decode_chars(0x0d20));
        assert_eq!(['é', '\0'], decode_chars(0xe900));
    }

    #[test]
    fn test_block_a() {
        let mut dec = BlockDecoder::default();
        assert_eq!(
            Some(FieldUpdate::Identity(0x1234)),
            dec.input(&blk(BlockPosition::A, 0x1234))
        );
        assert!(dec.group().is_none());
    }

    #[test]
    fn test_service_name_any_order() {
        const NAME: &str = "ZABCEFGH";

        for order in [[0, 1, 2, 3], [3, 1, 0, 2], [2, 3, 1, 0]] {
            let mut dec = BlockDecoder::default();
            let mut out = vec![];
            for (i, &seg) in order.iter().enumerate() {
                let d = chars(&NAME[seg * 2..seg * 2 + 2]);
                let upd = group(&mut dec, block_b_0a(seg as u16), 0xffff, d);

                // PI from block A, every group
                assert_eq!(FieldUpdate::Identity(PI), upd[0]);
                out.extend(upd.into_iter().skip(1));
                if i < 3 {
                    assert!(out.is_empty());
                }
            }
            assert_eq!(vec![FieldUpdate::Name(NAME.to_owned())], out);
        }
    }

    #[test]
    fn test_service_name_segment_one() {
        let mut dec = BlockDecoder::default();
        group(&mut dec, block_b_0a(1), 0, chars("BC"));
        assert_eq!("  BC    ", dec.service_name().value());

        group(&mut dec, block_b_0a(0), 0, chars("AA"));
        group(&mut dec, block_b_0a(2), 0, chars("DD"));
        let upd = group(&mut dec, block_b_0a(3), 0, chars("EE"));
        match upd.last() {
            Some(FieldUpdate::Name(ps)) => assert_eq!("BC", &ps[2..4]),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_missing_context() {
        let mut dec = BlockDecoder::default();

        // C and D without B are ignored
        assert_eq!(None, dec.input(&blk(BlockPosition::C, 0x00e1)));
        assert_eq!(None, dec.input(&blk(BlockPosition::D, chars("AB"))));
        assert_eq!(0, dec.service_name().filled_count());

        // so are the positions we don't decode
        assert_eq!(None, dec.input(&blk(BlockPosition::AltC, PI)));
        assert_eq!(None, dec.input(&blk(BlockPosition::E, PI)));
        assert_eq!(None, dec.input(&blk(BlockPosition::Reserved(7), PI)));
    }

    #[test]
    fn test_corrupted_block() {
        let mut dec = BlockDecoder::default();
        assert_eq!(None, dec.input(&blk(BlockPosition::B, block_b_0a(0))));
        assert!(dec.group().is_some());

        // a corrupted C drops the context, so D is ignored
        assert_eq!(
            None,
            dec.input(&Block::new_corrupted(0, BlockPosition::C))
        );
        assert!(dec.group().is_none());
        assert_eq!(None, dec.input(&blk(BlockPosition::D, chars("AB"))));
        assert_eq!(0, dec.service_name().filled_count());

        // a corrupted A is not decoded either
        assert_eq!(
            None,
            dec.input(&Block::new_corrupted(0x1111, BlockPosition::A))
        );

        // but the next group's A is
        assert_eq!(
            Some(FieldUpdate::Identity(PI)),
            dec.input(&blk(BlockPosition::A, PI))
        );
    }

    #[test]
    fn test_country_code() {
        let mut dec = BlockDecoder::default();

        // 1A, variant 0
        let upd = group(&mut dec, 0x1000, 0x00e1, 0);
        assert_eq!(
            vec![FieldUpdate::Identity(PI), FieldUpdate::Country(0xe1)],
            upd
        );

        // 1A, variant 3 is not ECC
        let upd = group(&mut dec, 0x1000, 0x30e2, 0);
        assert_eq!(vec![FieldUpdate::Identity(PI)], upd);

        // 1B: block C is the PI again
        let upd = group(&mut dec, 0x1800, 0xc205, 0);
        assert_eq!(
            vec![FieldUpdate::Identity(PI), FieldUpdate::Identity(0xc205)],
            upd
        );
    }

    #[test]
    fn test_version_b_identity() {
        let mut dec = BlockDecoder::default();

        // 0B: C is PI, D is still the service name
        dec.input(&blk(BlockPosition::B, 0x0800 | 2));
        assert_eq!(
            Some(FieldUpdate::Identity(0x4321)),
            dec.input(&blk(BlockPosition::C, 0x4321))
        );
        assert_eq!(None, dec.input(&blk(BlockPosition::D, chars("XY"))));
        assert_eq!("    XY  ", dec.service_name().value());
    }

    #[test]
    fn test_uninterpreted_group() {
        let mut dec = BlockDecoder::default();
        let upd = group(&mut dec, 0x4000, 0x1234, 0x5678);
        assert_eq!(vec![FieldUpdate::Identity(PI)], upd);
        assert_eq!(4, dec.group().unwrap().group_type());
    }

    #[test]
    fn test_text_2a_terminator() {
        const TEXT: &str = "Hello W\rxyz";
        let mut dec = BlockDecoder::default();

        // address 0: "Hell"
        let upd = group(
            &mut dec,
            block_b_2(GroupVersion::A, false, 0),
            chars("He"),
            chars("ll"),
        );
        assert_eq!(vec![FieldUpdate::Identity(PI)], upd);
        assert_eq!(64, dec.text().len());

        // address 1: "o W\r" ends the message at the eighth character
        let upd = group(
            &mut dec,
            block_b_2(GroupVersion::A, false, 1),
            chars(&TEXT[4..6]),
            chars(&TEXT[6..8]),
        );
        assert_eq!(
            vec![
                FieldUpdate::Identity(PI),
                FieldUpdate::Text("Hello W".to_owned())
            ],
            upd
        );

        // address 2: no terminator here, so nothing to report
        let upd = group(
            &mut dec,
            block_b_2(GroupVersion::A, false, 2),
            chars("xy"),
            chars("z "),
        );
        assert_eq!(vec![FieldUpdate::Identity(PI)], upd);
        assert!(dec.text().value().starts_with("Hello W\rxyz "));
    }

    #[test]
    fn test_text_terminator_in_block_c() {
        let mut dec = BlockDecoder::default();
        dec.input(&blk(BlockPosition::B, block_b_2(GroupVersion::A, false, 0)));
        assert_eq!(
            Some(FieldUpdate::Text("A".to_owned())),
            dec.input(&blk(BlockPosition::C, chars("A\r")))
        );
    }

    #[test]
    fn test_text_2b() {
        let mut dec = BlockDecoder::default();

        // 2B: block C is PI, block D has two characters
        let upd = group(
            &mut dec,
            block_b_2(GroupVersion::B, false, 0),
            PI,
            chars("Hi"),
        );
        assert_eq!(
            vec![FieldUpdate::Identity(PI), FieldUpdate::Identity(PI)],
            upd
        );
        assert_eq!(32, dec.text().len());

        let upd = group(
            &mut dec,
            block_b_2(GroupVersion::B, false, 1),
            PI,
            chars("!\r"),
        );
        assert_eq!(Some(&FieldUpdate::Text("Hi!".to_owned())), upd.last());
    }

    #[test]
    fn test_text_complete() {
        let mut dec = BlockDecoder::default();
        let mut last = None;
        for addr in 0..16 {
            let upd = group(
                &mut dec,
                block_b_2(GroupVersion::B, false, addr),
                PI,
                chars("ab"),
            );
            last = upd.into_iter().nth(2);
            if addr < 15 {
                assert_eq!(None, last);
            }
        }
        assert_eq!(Some(FieldUpdate::Text("ab".repeat(16))), last);

        // disabled
        let mut dec = BlockDecoder::new(true, false);
        for addr in 0..16 {
            let upd = group(
                &mut dec,
                block_b_2(GroupVersion::B, false, addr),
                PI,
                chars("ab"),
            );
            assert_eq!(2, upd.len());
        }
        assert!(dec.text().is_complete());
    }

    #[test]
    fn test_text_terminated_then_padded() {
        // "Hello\r", then spaces to fill every address, sent twice
        let mut dec = BlockDecoder::default();
        let mut texts = vec![];
        for _cycle in 0..2 {
            for addr in 0..16u16 {
                let (c, d) = match addr {
                    0 => ("He", "ll"),
                    1 => ("o\r", "  "),
                    _ => ("  ", "  "),
                };
                let upd = group(
                    &mut dec,
                    block_b_2(GroupVersion::A, false, addr),
                    chars(c),
                    chars(d),
                );
                texts.extend(upd.into_iter().filter_map(|u| match u {
                    FieldUpdate::Text(rt) => Some(rt),
                    _ => None,
                }));
            }
        }

        // the full buffer is reported without its terminator
        assert!(dec.text().is_complete());
        assert!(texts.len() > 2);
        assert!(texts.iter().all(|rt| rt == "Hello"));
    }

    #[test]
    fn test_text_ab_reset() {
        let mut dec = BlockDecoder::default();
        group(
            &mut dec,
            block_b_2(GroupVersion::A, false, 3),
            chars("ab"),
            chars("cd"),
        );
        assert_eq!(4, dec.text().filled_count());

        // same flag keeps the text
        group(
            &mut dec,
            block_b_2(GroupVersion::A, false, 4),
            chars("ef"),
            chars("gh"),
        );
        assert_eq!(8, dec.text().filled_count());

        // toggled flag starts over
        group(
            &mut dec,
            block_b_2(GroupVersion::A, true, 0),
            chars("AB"),
            chars("CD"),
        );
        assert_eq!(4, dec.text().filled_count());
        assert!(dec.text().value().starts_with("ABCD    "));

        // unless disabled
        let mut dec = BlockDecoder::new(false, true);
        group(
            &mut dec,
            block_b_2(GroupVersion::A, false, 3),
            chars("ab"),
            chars("cd"),
        );
        group(
            &mut dec,
            block_b_2(GroupVersion::A, true, 0),
            chars("AB"),
            chars("CD"),
        );
        assert_eq!(8, dec.text().filled_count());
    }

    #[test]
    fn test_text_version_change() {
        let mut dec = BlockDecoder::default();
        group(
            &mut dec,
            block_b_2(GroupVersion::A, false, 0),
            chars("ab"),
            chars("cd"),
        );
        assert_eq!(64, dec.text().len());

        // switching versions changes the length and discards text
        group(
            &mut dec,
            block_b_2(GroupVersion::B, false, 0),
            PI,
            chars("xy"),
        );
        assert_eq!(32, dec.text().len());
        assert_eq!(2, dec.text().filled_count());
    }

    #[test]
    fn test_reset() {
        let mut dec = BlockDecoder::default();
        group(&mut dec, block_b_0a(0), 0, chars("AB"));
        group(
            &mut dec,
            block_b_2(GroupVersion::A, false, 0),
            chars("ab"),
            chars("cd"),
        );

        dec.reset();
        assert!(dec.group().is_none());
        assert_eq!(0, dec.service_name().filled_count());
        assert_eq!(SERVICE_NAME_LENGTH, dec.service_name().len());
        assert!(dec.text().is_empty());

        // reset twice is harmless
        dec.reset();
        assert!(dec.group().is_none());
    }
}
