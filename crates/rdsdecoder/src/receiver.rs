//! Decoder lifecycle and ingestion worker

mod decoder;
mod group;
mod segments;

pub use decoder::{BlockDecoder, SERVICE_NAME_LENGTH, TEXT_TERMINATOR};
pub use group::{
    radiotext_length, radiotext_segment_length, BasicTuning, GroupContext, GroupDetail,
    GroupVersion, RadioText, GROUP_BASIC_TUNING, GROUP_RADIOTEXT, GROUP_SLOW_LABELLING,
};
pub use segments::{SegmentedAssembler, MAX_SEGMENTED_LENGTH};

use std::fmt;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

#[cfg(not(test))]
use log::{debug, info, warn};

#[cfg(test)]
use std::println as debug;
#[cfg(test)]
use std::println as info;
#[cfg(test)]
use std::println as warn;

use thiserror::Error;

use crate::block::{BlockSource, RecordReader, SourceError, RECORD_LENGTH};
use crate::builder::RdsDecoderBuilder;
use crate::fields::{DecodedFields, FieldStore, FieldUpdate};
use crate::listener::{Listener, ListenerId, Listeners};

/// Fatal decoder error
#[derive(Error, Debug)]
pub enum DecoderError {
    /// The radio device or file could not be opened
    #[error("RDS source {path:?} is not available: {source}")]
    Unavailable {
        /// Path which was opened
        path: PathBuf,

        /// Reason
        source: io::Error,
    },

    /// The block source failed or ran out of data
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The worker thread could not be created
    #[error("unable to start RDS worker thread: {0}")]
    Spawn(#[source] io::Error),

    /// The worker thread panicked
    #[error("RDS worker thread panicked")]
    WorkerPanicked,
}

impl DecoderError {
    /// True if the block source simply ran out of data
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, DecoderError::Source(err) if err.is_end_of_stream())
    }
}

/// An RDS decoder with its own worker thread
///
/// The decoder reads [blocks](crate::Block) from a
/// [`BlockSource`] on a dedicated worker thread. It decodes the
/// station's programme identification code, extended country
/// code, programme service name, and RadioText. Whenever one of
/// these changes, registered [listeners](Listener) are
/// notified.
///
/// The decoder is created stopped. Call
/// [`start()`](RdsDecoder::start) to begin decoding. Call
/// [`reset()`](RdsDecoder::reset) whenever the tuner changes
/// frequency.
///
/// All methods take `&self`. The decoder may be shared between
/// threads, and every method may be called from any thread.
///
/// ```
/// use std::sync::mpsc;
/// use rdsdecoder::{Block, BlockPosition, RdsDecoderBuilder};
///
/// let (tx, rx) = mpsc::channel();
/// let decoder = RdsDecoderBuilder::new().build(rx);
/// decoder.start().expect("unable to start");
///
/// tx.send(Block::new(0xc204, BlockPosition::A)).unwrap();
/// drop(tx);
///
/// // the worker ends when the source does
/// let err = decoder.join().unwrap_err();
/// assert!(err.is_end_of_stream());
/// assert_eq!(Some(0xc204), decoder.identity());
/// assert!(!decoder.is_running());
/// ```
pub struct RdsDecoder {
    state: Arc<DecoderState>,
    engine: Arc<Mutex<Engine>>,
    worker: Mutex<Option<JoinHandle<Result<(), DecoderError>>>>,
    thread_name: String,
}

impl RdsDecoder {
    /// Decode records from a radio device or file
    ///
    /// Opens `path` with default settings. See
    /// [`RdsDecoderBuilder::open()`].
    pub fn open<P>(path: P) -> Result<Self, DecoderError>
    where
        P: AsRef<Path>,
    {
        RdsDecoderBuilder::default().open(path)
    }

    /// Start decoding
    ///
    /// Does nothing if the decoder is already running. If a
    /// worker from a previous [`stop()`](RdsDecoder::stop) has
    /// not yet exited, it resumes. Otherwise, a new worker is
    /// started.
    ///
    /// If the previous worker ended with an error which has not
    /// been collected by [`join()`](RdsDecoder::join), that
    /// error is returned here and the decoder remains stopped.
    pub fn start(&self) -> Result<(), DecoderError> {
        let mut lifecycle = self.state.lifecycle();
        if lifecycle.running {
            return Ok(());
        }

        if lifecycle.worker_active {
            debug!("decoder: resuming active worker");
            lifecycle.running = true;
            return Ok(());
        }

        // a failed worker is reported, not restarted
        if let Some(previous) = self.take_worker() {
            join_worker(previous)?;
        }

        let state = Arc::clone(&self.state);
        let engine = Arc::clone(&self.engine);
        let handle = thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || run_worker(state, engine))
            .map_err(DecoderError::Spawn)?;

        lifecycle.running = true;
        lifecycle.worker_active = true;
        *self.worker_slot() = Some(handle);
        info!("decoder: started");
        Ok(())
    }

    /// Stop decoding
    ///
    /// Does nothing if the decoder is already stopped. The
    /// worker exits before it decodes its next block, but it
    /// may still be waiting on the source when this method
    /// returns. No notifications are sent while stopped.
    pub fn stop(&self) {
        let mut lifecycle = self.state.lifecycle();
        if lifecycle.running {
            lifecycle.running = false;
            info!("decoder: stopped");
        }
    }

    /// Reset all fields and restart
    ///
    /// Stops the decoder, forgets every decoded field and all
    /// partially-received data, notifies every listener's
    /// [`on_reset()`](Listener::on_reset), and starts the
    /// decoder again. Call this whenever the tuner changes
    /// frequency.
    ///
    /// May be called at any time, including before
    /// [`start()`](RdsDecoder::start).
    pub fn reset(&self) -> Result<(), DecoderError> {
        self.state.clear();
        info!("decoder: reset");
        self.state.listeners.notify_reset(&self.state);
        self.start()
    }

    /// Wait for the worker to exit
    ///
    /// Blocks until the worker exits, either because the
    /// decoder was stopped or because the source failed.
    /// Source failures, including the end of the stream, are
    /// returned as errors. Returns immediately if there is no
    /// worker.
    ///
    /// A stopped worker which is blocked reading its source
    /// will not exit until the source produces another block.
    pub fn join(&self) -> Result<(), DecoderError> {
        let previous = self.take_worker();
        match previous {
            Some(handle) => join_worker(handle),
            None => Ok(()),
        }
    }

    /// Stop decoding and wait for the worker to exit
    pub fn close(&self) -> Result<(), DecoderError> {
        self.stop();
        self.join()
    }

    /// True if the decoder is running
    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Register a listener
    ///
    /// Returns a handle which may be used to
    /// [remove](RdsDecoder::remove_listener) it.
    pub fn add_listener(&self, listener: Arc<dyn Listener>) -> ListenerId {
        let id = self.state.listeners.add(listener);
        debug!("decoder: added listener {}", id);
        id
    }

    /// Remove a listener
    ///
    /// Returns `false` if the listener was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let removed = self.state.listeners.remove(id);
        if removed {
            debug!("decoder: removed listener {}", id);
        }
        removed
    }

    /// Shared decoder state
    ///
    /// The state may be retained and queried from other
    /// threads.
    pub fn state(&self) -> &Arc<DecoderState> {
        &self.state
    }

    /// Programme identification code, if known
    pub fn identity(&self) -> Option<u16> {
        self.state.identity()
    }

    /// Extended country code, if known
    pub fn country(&self) -> Option<u8> {
        self.state.country()
    }

    /// Programme service name, if known
    pub fn service_name(&self) -> Option<String> {
        self.state.service_name()
    }

    /// RadioText message, if known
    pub fn text(&self) -> Option<String> {
        self.state.text()
    }

    /// All decoded fields
    pub fn fields(&self) -> DecodedFields {
        self.state.fields()
    }

    fn take_worker(&self) -> Option<JoinHandle<Result<(), DecoderError>>> {
        self.worker_slot().take()
    }

    fn worker_slot(&self) -> MutexGuard<'_, Option<JoinHandle<Result<(), DecoderError>>>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RdsDecoder {
    // decoder reading from `source`, stopped
    pub(crate) fn with_source(cfg: &RdsDecoderBuilder, source: Box<dyn BlockSource>) -> Self {
        let engine = Engine {
            source,
            decoder: BlockDecoder::new(cfg.text_ab_reset(), cfg.complete_text()),
            generation: 0,
        };

        Self {
            state: Arc::new(DecoderState::new()),
            engine: Arc::new(Mutex::new(engine)),
            worker: Mutex::new(None),
            thread_name: cfg.thread_name().to_owned(),
        }
    }
}

impl Drop for RdsDecoder {
    /// Stops the worker without waiting for it
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for RdsDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RdsDecoder")
            .field("state", &self.state)
            .field("thread_name", &self.thread_name)
            .finish_non_exhaustive()
    }
}

/// Decoder state shared with listeners
///
/// Every [`Listener`] callback receives the decoder state. It
/// reports the last-known value of each field and whether the
/// decoder is running. Each field is read atomically, but the
/// fields are updated independently of one another.
#[derive(Debug)]
pub struct DecoderState {
    fields: FieldStore,
    listeners: Listeners,
    lifecycle: Mutex<Lifecycle>,

    // incremented by every reset
    generation: AtomicU64,
}

impl DecoderState {
    pub(crate) fn new() -> Self {
        Self {
            fields: FieldStore::default(),
            listeners: Listeners::default(),
            lifecycle: Mutex::new(Lifecycle::default()),
            generation: AtomicU64::new(0),
        }
    }

    /// Programme identification code, if known
    pub fn identity(&self) -> Option<u16> {
        self.fields.identity()
    }

    /// Extended country code, if known
    pub fn country(&self) -> Option<u8> {
        self.fields.country()
    }

    /// Programme service name, if known
    pub fn service_name(&self) -> Option<String> {
        self.fields.service_name()
    }

    /// RadioText message, if known
    pub fn text(&self) -> Option<String> {
        self.fields.text()
    }

    /// All decoded fields
    pub fn fields(&self) -> DecodedFields {
        self.fields.snapshot()
    }

    /// True if the decoder is running
    pub fn is_running(&self) -> bool {
        self.lifecycle().running
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Store a decoded value and notify listeners if it changed
    ///
    /// `generation` is the reset generation the value was decoded
    /// under. Values decoded before the latest reset are
    /// discarded. Listeners are only notified while the decoder
    /// is running. Returns true if the value changed.
    pub(crate) fn publish(&self, update: FieldUpdate, generation: u64) -> bool {
        // checked and stored under the lifecycle lock, like clear()
        let (change, running) = {
            let lifecycle = self.lifecycle();
            if generation != self.generation() {
                debug!("decoder: {} decoded before reset; discarded", update);
                return false;
            }

            match self.fields.apply(update) {
                Some(change) => (change, lifecycle.running),
                None => return false,
            }
        };

        if running {
            debug!("decoder: {}", change);
            self.listeners.notify_change(self, &change);
        } else {
            debug!("decoder: {} (stopped; not notified)", change);
        }
        true
    }

    // Stop, forget every field, and begin a new reset generation
    fn clear(&self) {
        let mut lifecycle = self.lifecycle();
        if lifecycle.running {
            lifecycle.running = false;
            info!("decoder: stopped");
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.fields.clear();
    }

    // Called by the worker before each block. Returns false,
    // and marks the worker inactive, if the worker should exit.
    fn keep_running(&self) -> bool {
        let mut lifecycle = self.lifecycle();
        if !lifecycle.running {
            lifecycle.worker_active = false;
        }
        lifecycle.running
    }

    // the worker is gone and cannot resume
    fn worker_failed(&self) {
        let mut lifecycle = self.lifecycle();
        lifecycle.running = false;
        lifecycle.worker_active = false;
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Lifecycle {
    // decoder should decode and notify
    running: bool,

    // a worker thread holds the engine
    worker_active: bool,
}

// State owned by whichever worker is active
struct Engine {
    source: Box<dyn BlockSource>,
    decoder: BlockDecoder,

    // reset generation the decoder was last cleared at
    generation: u64,
}

impl Engine {
    // apply any reset which happened since the last block
    fn sync(&mut self, generation: u64) {
        if generation != self.generation {
            debug!("worker: clearing decoder for reset");
            self.decoder.reset();
            self.generation = generation;
        }
    }
}

// Worker thread body
//
// Holds the engine for its entire life. Checks the running
// flag once per block.
fn run_worker(state: Arc<DecoderState>, engine: Arc<Mutex<Engine>>) -> Result<(), DecoderError> {
    let _guard = WorkerGuard(&state);
    let mut engine = engine.lock().unwrap_or_else(PoisonError::into_inner);
    info!("worker: started");

    while state.keep_running() {
        let block = match engine.source.read_block() {
            Ok(block) => block,
            Err(err) => {
                state.worker_failed();
                if err.is_end_of_stream() {
                    info!("worker: {}", err);
                } else {
                    warn!("worker: {}", err);
                }
                return Err(err.into());
            }
        };

        let generation = state.generation();
        engine.sync(generation);
        if let Some(update) = engine.decoder.input(&block) {
            state.publish(update, generation);
        }
    }

    info!("worker: exited");
    Ok(())
}

fn join_worker(handle: JoinHandle<Result<(), DecoderError>>) -> Result<(), DecoderError> {
    match handle.join() {
        Ok(res) => res,
        Err(_) => Err(DecoderError::WorkerPanicked),
    }
}

// Marks the decoder stopped if the worker panics
struct WorkerGuard<'a>(&'a DecoderState);

impl<'a> Drop for WorkerGuard<'a> {
    fn drop(&mut self) {
        if thread::panicking() {
            warn!("worker: panicked");
            self.0.worker_failed();
        }
    }
}

/// Open a radio device or file as a block source
pub(crate) fn open_source<P>(path: P) -> Result<Box<dyn BlockSource>, DecoderError>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| DecoderError::Unavailable {
        path: path.to_path_buf(),
        source,
    })?;

    info!("decoder: reading records from {:?}", path);
    Ok(Box::new(RecordReader::new(BufReader::with_capacity(
        RECORD_LENGTH * 64,
        file,
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    use crate::block::{Block, BlockPosition};
    use crate::listener::{DecoderEvent, FnListener, ListenerResult};

    const TIMEOUT: Duration = Duration::from_secs(5);

    // listener which forwards events to a channel
    fn forwarder() -> (Arc<dyn Listener>, mpsc::Receiver<DecoderEvent>) {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let listener = FnListener::new(move |_state: &DecoderState, evt: DecoderEvent| {
            tx.lock().unwrap().send(evt)?;
            Ok(())
        });
        (Arc::new(listener), rx)
    }

    fn block_a(pi: u16) -> Block {
        Block::new(pi, BlockPosition::A)
    }

    fn next_event(rx: &mpsc::Receiver<DecoderEvent>) -> DecoderEvent {
        rx.recv_timeout(TIMEOUT).expect("expected an event")
    }

    fn changed_identity(pi: u16) -> DecoderEvent {
        DecoderEvent::Changed(FieldUpdate::Identity(pi))
    }

    // one 0A group
    fn ps_group(tx: &mpsc::Sender<Block>, segment: u16, text: &str) {
        let b = text.as_bytes();
        for blk in [
            Block::new(0xc204, BlockPosition::A),
            Block::new(segment & 0x3, BlockPosition::B),
            Block::new(0, BlockPosition::C),
            Block::new(u16::from_be_bytes([b[0], b[1]]), BlockPosition::D),
        ] {
            tx.send(blk).unwrap();
        }
    }

    #[test]
    fn test_publish_requires_running() {
        let state = DecoderState::new();
        let (listener, rx) = forwarder();
        state.listeners.add(listener);

        // stored, but not notified
        assert!(state.publish(FieldUpdate::Identity(1), 0));
        assert_eq!(Some(1), state.identity());
        assert!(rx.try_recv().is_err());

        // notified once per distinct value
        state.lifecycle().running = true;
        assert!(!state.publish(FieldUpdate::Identity(1), 0));
        assert!(state.publish(FieldUpdate::Identity(2), 0));
        assert!(!state.publish(FieldUpdate::Identity(2), 0));
        assert!(state.publish(FieldUpdate::Text("hello".to_owned()), 0));
        assert_eq!(changed_identity(2), rx.try_recv().unwrap());
        assert_eq!(
            DecoderEvent::Changed(FieldUpdate::Text("hello".to_owned())),
            rx.try_recv().unwrap()
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_publish_after_reset_discarded() {
        let state = DecoderState::new();
        let (listener, rx) = forwarder();
        state.listeners.add(listener);
        state.lifecycle().running = true;

        assert!(state.publish(FieldUpdate::Identity(0x1111), 0));
        assert_eq!(changed_identity(0x1111), rx.try_recv().unwrap());

        // a reset lands while the worker is still decoding
        state.clear();
        assert!(!state.is_running());
        assert_eq!(1, state.generation());
        state.lifecycle().running = true;

        // values from the old station never reach the store
        assert!(!state.publish(FieldUpdate::Identity(0x2222), 0));
        assert!(!state.publish(FieldUpdate::Name("OLDSTATN".to_owned()), 0));
        assert_eq!(DecodedFields::default(), state.fields());
        assert!(rx.try_recv().is_err());

        // the new station's do
        assert!(state.publish(FieldUpdate::Identity(0x3333), 1));
        assert_eq!(changed_identity(0x3333), rx.try_recv().unwrap());
    }

    #[test]
    fn test_listener_order_and_failures() {
        struct Failing;
        impl Listener for Failing {
            fn on_identity_change(&self, _state: &DecoderState, _pi: u16) -> ListenerResult {
                Err("no thanks".into())
            }
        }

        struct Panicking;
        impl Listener for Panicking {
            fn on_identity_change(&self, _state: &DecoderState, _pi: u16) -> ListenerResult {
                panic!("listener panic");
            }
        }

        let state = DecoderState::new();
        state.lifecycle().running = true;

        let order = Arc::new(Mutex::new(vec![]));
        for i in 0..2 {
            let order = order.clone();
            state.listeners.add(Arc::new(FnListener::new(
                move |st: &DecoderState, _evt: DecoderEvent| {
                    // listeners may query the state from a callback
                    assert_eq!(Some(0x1234), st.identity());
                    order.lock().unwrap().push(i);
                    Ok(())
                },
            )));
            state.listeners.add(Arc::new(Failing));
            state.listeners.add(Arc::new(Panicking));
        }
        assert_eq!(6, state.listener_count());

        state.publish(FieldUpdate::Identity(0x1234), 0);
        assert_eq!(vec![0, 1], *order.lock().unwrap());
    }

    #[test]
    fn test_start_stop() {
        let (tx, rx) = mpsc::channel();
        let decoder = RdsDecoderBuilder::new().build(rx);
        assert!(!decoder.is_running());

        // stop before start is harmless
        decoder.stop();
        assert!(!decoder.is_running());

        decoder.start().unwrap();
        decoder.start().unwrap();
        assert!(decoder.is_running());
        assert!(decoder.state().is_running());

        decoder.stop();
        decoder.stop();
        assert!(!decoder.is_running());

        // the stopped worker exits after its next block
        tx.send(block_a(1)).unwrap();
        decoder.join().unwrap();
        assert!(decoder.join().is_ok());
    }

    #[test]
    fn test_notify_distinct_values() {
        let (tx, rx) = mpsc::channel();
        let decoder = RdsDecoderBuilder::new().build(rx);
        let (listener, events) = forwarder();
        decoder.add_listener(listener);
        decoder.start().unwrap();

        for pi in [0x1234, 0x1234, 0x1234, 0x5678, 0x5678, 0x1234] {
            tx.send(block_a(pi)).unwrap();
        }
        assert_eq!(changed_identity(0x1234), next_event(&events));
        assert_eq!(changed_identity(0x5678), next_event(&events));
        assert_eq!(changed_identity(0x1234), next_event(&events));

        // service name arrives once all four segments do
        ps_group(&tx, 3, "GH");
        ps_group(&tx, 1, "CD");
        ps_group(&tx, 0, "AB");
        ps_group(&tx, 2, "EF");
        ps_group(&tx, 2, "EF");
        tx.send(block_a(0x4444)).unwrap();

        assert_eq!(changed_identity(0xc204), next_event(&events));
        assert_eq!(
            DecoderEvent::Changed(FieldUpdate::Name("ABCDEFGH".to_owned())),
            next_event(&events)
        );
        assert_eq!(changed_identity(0x4444), next_event(&events));
        assert_eq!(Some("ABCDEFGH".to_owned()), decoder.service_name());

        drop(tx);
        assert!(decoder.join().unwrap_err().is_end_of_stream());
        assert!(!decoder.is_running());
    }

    #[test]
    fn test_no_notifications_while_stopped() {
        let (tx, rx) = mpsc::channel();
        let decoder = RdsDecoderBuilder::new().build(rx);
        let (listener, events) = forwarder();
        decoder.add_listener(listener);
        decoder.start().unwrap();

        tx.send(block_a(1)).unwrap();
        assert_eq!(changed_identity(1), next_event(&events));

        // the worker may or may not decode this block
        // before it exits, but it must not notify
        decoder.stop();
        tx.send(block_a(2)).unwrap();
        decoder.join().unwrap();
        assert!(events.try_recv().is_err());

        // notifications resume with a new worker
        decoder.start().unwrap();
        tx.send(block_a(3)).unwrap();
        let mut last = next_event(&events);
        if last == changed_identity(2) {
            last = next_event(&events);
        }
        assert_eq!(changed_identity(3), last);
    }

    #[test]
    fn test_reset() {
        let (tx, rx) = mpsc::channel();
        let decoder = RdsDecoderBuilder::new().build(rx);
        let (listener, events) = forwarder();
        decoder.add_listener(listener);

        // reset before start starts the decoder
        decoder.reset().unwrap();
        assert_eq!(DecoderEvent::Reset, next_event(&events));
        assert!(decoder.is_running());

        ps_group(&tx, 0, "AB");
        ps_group(&tx, 1, "CD");
        ps_group(&tx, 2, "EF");
        assert_eq!(changed_identity(0xc204), next_event(&events));

        // wait for all three groups to decode
        tx.send(block_a(0x1111)).unwrap();
        assert_eq!(changed_identity(0x1111), next_event(&events));

        decoder.reset().unwrap();
        decoder.reset().unwrap();
        assert_eq!(DecoderEvent::Reset, next_event(&events));
        assert_eq!(DecoderEvent::Reset, next_event(&events));
        assert_eq!(DecodedFields::default(), decoder.fields());
        assert!(decoder.is_running());

        // partial service name was discarded too
        ps_group(&tx, 3, "GH");
        tx.send(block_a(0x2222)).unwrap();
        assert_eq!(changed_identity(0xc204), next_event(&events));
        assert_eq!(changed_identity(0x2222), next_event(&events));
        assert_eq!(None, decoder.service_name());
    }

    #[test]
    fn test_remove_listener() {
        let (tx, rx) = mpsc::channel();
        let decoder = RdsDecoderBuilder::new().build(rx);
        let (first, first_events) = forwarder();
        let (second, second_events) = forwarder();
        let first_id = decoder.add_listener(first);
        decoder.add_listener(second);
        decoder.start().unwrap();

        tx.send(block_a(1)).unwrap();
        assert_eq!(changed_identity(1), next_event(&first_events));
        assert_eq!(changed_identity(1), next_event(&second_events));

        assert!(decoder.remove_listener(first_id));
        assert!(!decoder.remove_listener(first_id));
        assert_eq!(1, decoder.state().listener_count());

        tx.send(block_a(2)).unwrap();
        assert_eq!(changed_identity(2), next_event(&second_events));
        assert!(first_events.try_recv().is_err());
        assert_eq!(Some(2), decoder.identity());
    }

    #[test]
    fn test_failed_worker_reported_by_start() {
        let (tx, rx) = mpsc::channel::<Block>();
        let decoder = RdsDecoderBuilder::new().build(rx);
        decoder.start().unwrap();
        drop(tx);

        let begin = Instant::now();
        while decoder.is_running() {
            assert!(begin.elapsed() < TIMEOUT);
            thread::sleep(Duration::from_millis(5));
        }

        assert!(decoder.start().unwrap_err().is_end_of_stream());
        assert!(!decoder.is_running());
    }

    #[test]
    fn test_records_to_end_of_stream() {
        let mut raw = vec![];
        for blk in [
            Block::new(0xc204, BlockPosition::A),
            Block::new(0x1000, BlockPosition::B),
            Block::new(0x00e1, BlockPosition::C),
            Block::new_corrupted(0x0000, BlockPosition::D),
        ] {
            raw.extend_from_slice(&blk.to_record());
        }

        let decoder = RdsDecoderBuilder::new().build(RecordReader::new(io::Cursor::new(raw)));
        decoder.start().unwrap();
        assert!(decoder.join().unwrap_err().is_end_of_stream());
        assert_eq!(Some(0xc204), decoder.identity());
        assert_eq!(Some(0xe1), decoder.country());
        assert_eq!(None, decoder.text());
    }

    #[test]
    fn test_open_unavailable() {
        match RdsDecoder::open("/nonexistent/radio0") {
            Err(DecoderError::Unavailable { path, .. }) => {
                assert_eq!(PathBuf::from("/nonexistent/radio0"), path)
            }
            _ => panic!("expected an unavailable source"),
        }
    }
}
