use std::path::Path;

use crate::block::BlockSource;
use crate::receiver::{open_source, DecoderError, RdsDecoder};

/// Builds an RDS decoder
///
/// The builder comes with a sensible set of default options.
/// All you really need to provide is a [`BlockSource`], which
/// is given to [`build()`](RdsDecoderBuilder::build). To read
/// from a radio device or a file of raw block records, use
/// [`open()`](RdsDecoderBuilder::open) instead.
///
/// The API specified by the builder is part of this crate's
/// API. The actual default values are *not*, however, and
/// are subject to revision in any minor release. If you
/// care very strongly about a setting, be sure to configure
/// it here.
///
/// ```
/// use std::sync::mpsc;
/// use rdsdecoder::{Block, RdsDecoderBuilder};
///
/// let (_tx, rx) = mpsc::channel::<Block>();
/// let decoder = RdsDecoderBuilder::new()
///     .with_text_ab_reset(false)
///     .with_thread_name("rds-fm1")
///     .build(rx);
/// assert!(!decoder.is_running());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RdsDecoderBuilder {
    text_ab_reset: bool,
    complete_text: bool,
    thread_name: String,
}

impl RdsDecoderBuilder {
    /// New decoder with "sensible" defaults
    pub fn new() -> Self {
        Self {
            text_ab_reset: true,
            complete_text: true,
            thread_name: "rds-decoder".to_owned(),
        }
    }

    /// Build a decoder which reads from `source`
    ///
    /// The decoder is created stopped. Its worker takes
    /// ownership of the source once
    /// [started](RdsDecoder::start).
    pub fn build<S>(&self, source: S) -> RdsDecoder
    where
        S: BlockSource + 'static,
    {
        RdsDecoder::with_source(self, Box::new(source))
    }

    /// Build a decoder which reads a radio device or file
    ///
    /// `path` is read as a stream of three-byte block records.
    /// This is the format of Linux radio devices, like
    /// `/dev/radio0`, which support RDS. Fails with
    /// [`DecoderError::Unavailable`] if the path cannot be
    /// opened for reading.
    pub fn open<P>(&self, path: P) -> Result<RdsDecoder, DecoderError>
    where
        P: AsRef<Path>,
    {
        Ok(RdsDecoder::with_source(self, open_source(path)?))
    }

    /// Clear the RadioText when its A/B flag changes (default: on)
    ///
    /// Stations toggle the A/B flag when they begin sending a
    /// new message. When enabled, any partially-received text
    /// is discarded on the toggle so that old and new messages
    /// are not mixed.
    pub fn with_text_ab_reset(&mut self, enable: bool) -> &mut Self {
        self.text_ab_reset = enable;
        self
    }

    /// Report unterminated RadioText once full (default: on)
    ///
    /// Messages which fill every character position need no
    /// end-of-text marker, and many stations omit it. When
    /// enabled, the text is reported once every character
    /// has been received.
    pub fn with_complete_text(&mut self, enable: bool) -> &mut Self {
        self.complete_text = enable;
        self
    }

    /// Worker thread name
    pub fn with_thread_name<S>(&mut self, name: S) -> &mut Self
    where
        S: Into<String>,
    {
        self.thread_name = name.into();
        self
    }

    /// Clear RadioText on A/B flag change?
    pub fn text_ab_reset(&self) -> bool {
        self.text_ab_reset
    }

    /// Report unterminated RadioText?
    pub fn complete_text(&self) -> bool {
        self.complete_text
    }

    /// Worker thread name
    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }
}

impl std::default::Default for RdsDecoderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::mpsc;

    use crate::block::{Block, BlockPosition};

    #[test]
    fn test_builder_options() {
        let mut cfg = RdsDecoderBuilder::default();
        assert!(cfg.text_ab_reset());
        assert!(cfg.complete_text());
        assert_eq!("rds-decoder", cfg.thread_name());

        cfg.with_text_ab_reset(false)
            .with_complete_text(false)
            .with_thread_name(String::from("rds-test"));
        assert!(!cfg.text_ab_reset());
        assert!(!cfg.complete_text());
        assert_eq!("rds-test", cfg.thread_name());
        assert_ne!(RdsDecoderBuilder::new(), cfg);
    }

    #[test]
    fn test_build_unterminated_text() {
        // a full 2B text with no terminator
        let (tx, rx) = mpsc::channel();
        for addr in 0..16u16 {
            tx.send(Block::new(0x2800 | addr, BlockPosition::B)).unwrap();
            tx.send(Block::new(0x4142, BlockPosition::D)).unwrap();
        }
        drop(tx);

        let decoder = RdsDecoderBuilder::new()
            .with_complete_text(false)
            .with_thread_name("rds-test")
            .build(rx);
        decoder.start().unwrap();
        assert!(decoder.join().unwrap_err().is_end_of_stream());
        assert_eq!(None, decoder.text());
    }

    #[test]
    fn test_open_missing() {
        let err = RdsDecoderBuilder::new()
            .open("/nonexistent/dev/radio0")
            .unwrap_err();
        assert!(matches!(err, DecoderError::Unavailable { .. }));
        assert!(!err.is_end_of_stream());
    }
}
