//! # rdsdecoder: RDS Group Decoding
//!
//! This crate decodes the
//! [Radio Data System](https://en.wikipedia.org/wiki/Radio_Data_System)
//! (RDS) data which FM broadcast stations transmit alongside their
//! audio. It reconstructs the station's
//!
//! * programme identification (PI) code;
//! * extended country code (ECC);
//! * eight-character programme service (PS) name; and
//! * RadioText (RT) message
//!
//! and notifies interested [listeners](Listener) whenever one of
//! them changes.
//!
//! ## Disclaimer
//!
//! This crate is dual-licensed MIT and Apache 2.0. Read these licenses
//! carefully as they may affect your rights.
//!
//! ## Example
//!
//! You will first need an RDS-capable FM tuner. The tuner
//! demodulates the RDS subcarrier and delivers *blocks*: 16-bit
//! data words tagged with their position in the group and an
//! error flag. On Linux, RDS-capable radio devices like
//! `/dev/radio0` deliver blocks as three-byte records, which
//! [`RdsDecoder::open()`] reads directly. Tuning the radio is
//! beyond the scope of this crate.
//!
//! ```
//! use std::sync::Arc;
//! use rdsdecoder::{DecoderEvent, FnListener, RdsDecoderBuilder, RecordReader};
//!
//! # let recorded_records: &[u8] = &[0x04, 0xc2, 0x00];
//! #
//! // any io::Read of raw records will do, like a file or device
//! let source = RecordReader::new(recorded_records);
//!
//! let decoder = RdsDecoderBuilder::new()
//!     .with_text_ab_reset(true)   // forget old text when a new message starts
//!     .build(source);
//!
//! // listeners run on the decoder's worker thread
//! decoder.add_listener(Arc::new(FnListener::new(|_state, evt| {
//!     match evt {
//!         DecoderEvent::Changed(update) => println!("{}", update),
//!         DecoderEvent::Reset => println!("retuned"),
//!     }
//!     Ok(())
//! })));
//!
//! decoder.start().expect("unable to start decoder");
//!
//! // call decoder.reset() whenever the tuner changes frequency
//!
//! // the worker exits when the source ends or fails
//! let err = decoder.join().unwrap_err();
//! assert!(err.is_end_of_stream());
//! assert_eq!(Some(0xc204), decoder.identity());
//! ```
//!
//! The decoder is created via a [builder](RdsDecoderBuilder).
//! Blocks may come from any [`BlockSource`]: a [`RecordReader`]
//! over a file, device, or standard input, or an
//! [`mpsc::Receiver<Block>`](std::sync::mpsc::Receiver) fed by
//! another thread.
//!
//! Listeners may implement the [`Listener`] trait, which has
//! one method per field, or wrap a closure in an [`FnListener`].
//! Listeners are only told about *changes*. Stations repeat
//! every field many times per second, and repeats are not
//! reported. The current value of any field can also be queried
//! at any time, from any thread, via the decoder or its
//! [`DecoderState`].
//!
//! ## Background
//!
//! RDS data is sent in *groups* of four 26-bit blocks, A
//! through D. After error correction, each block carries 16
//! bits of data.
//!
//! * Block A always carries the PI code, which identifies the
//!   station.
//! * Block B describes the group: its type, 0 through 15, and
//!   its version, A or B.
//! * Blocks C and D carry data specific to the group type.
//!
//! Long strings, like the PS name and RadioText, are sent a
//! few characters at a time. Each group carries the address of
//! its fragment, and fragments may arrive in any order. The
//! [`BlockDecoder`] reassembles them. Errors are common. A
//! block which the tuner could not correct discards the rest
//! of its group.
//!
//! This crate decodes group types 0 (PS name), 1 (ECC), and 2
//! (RadioText). All other types are accepted and ignored.

mod block;
mod builder;
mod fields;
mod listener;
mod receiver;

pub use block::{Block, BlockPosition, BlockSource, RecordReader, SourceError, RECORD_LENGTH};
pub use builder::RdsDecoderBuilder;
pub use fields::{format_country, format_identity, DecodedFields, Field, FieldUpdate};
pub use listener::{DecoderEvent, FnListener, Listener, ListenerId, ListenerResult};
pub use receiver::{
    radiotext_length, radiotext_segment_length, BasicTuning, BlockDecoder, DecoderError,
    DecoderState, GroupContext, GroupDetail, GroupVersion, RadioText, RdsDecoder,
    SegmentedAssembler, GROUP_BASIC_TUNING, GROUP_RADIOTEXT, GROUP_SLOW_LABELLING,
    MAX_SEGMENTED_LENGTH, SERVICE_NAME_LENGTH, TEXT_TERMINATOR,
};
