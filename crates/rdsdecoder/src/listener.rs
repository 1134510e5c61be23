//! Change notification
//!
//! Listeners are notified, in registration order, whenever a
//! decoded field changes value or the decoder is reset.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[cfg(not(test))]
use log::warn;

#[cfg(test)]
use std::println as warn;

use crate::fields::FieldUpdate;
use crate::receiver::DecoderState;

/// Result of a listener callback
///
/// Listener errors are logged and otherwise ignored. They
/// never prevent other listeners from being notified.
pub type ListenerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Receives decoder notifications
///
/// Implement only the methods you need. Every method has a
/// default implementation which does nothing.
///
/// Callbacks run synchronously on the decoder's worker thread.
/// A slow callback delays decoding of the blocks which follow.
/// Callbacks receive the decoder's [`DecoderState`], which
/// may be queried for the current value of any field.
///
/// Notifications are only sent while the decoder is running.
/// Callbacks which fail, either by returning an error or by
/// panicking, are logged and otherwise ignored.
pub trait Listener: Send + Sync {
    /// The programme identification code has changed
    fn on_identity_change(&self, _state: &DecoderState, _pi: u16) -> ListenerResult {
        Ok(())
    }

    /// The extended country code has changed
    fn on_country_change(&self, _state: &DecoderState, _ecc: u8) -> ListenerResult {
        Ok(())
    }

    /// The programme service name has changed
    fn on_name_change(&self, _state: &DecoderState, _ps: &str) -> ListenerResult {
        Ok(())
    }

    /// A new RadioText message has been received
    fn on_text_change(&self, _state: &DecoderState, _rt: &str) -> ListenerResult {
        Ok(())
    }

    /// The decoder has been reset
    ///
    /// This usually means the tuner has changed frequency. All
    /// fields are now unknown.
    fn on_reset(&self, _state: &DecoderState) -> ListenerResult {
        Ok(())
    }
}

/// A decoder notification
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DecoderEvent {
    /// A field has a new value
    Changed(FieldUpdate),

    /// All fields have been cleared
    Reset,
}

impl fmt::Display for DecoderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecoderEvent::Changed(update) => fmt::Display::fmt(update, f),
            DecoderEvent::Reset => write!(f, "RESET"),
        }
    }
}

/// A listener from a closure
///
/// Receives every notification as a [`DecoderEvent`].
///
/// ```
/// use std::sync::Arc;
/// use rdsdecoder::{DecoderEvent, FnListener, Listener};
///
/// let listener: Arc<dyn Listener> = Arc::new(FnListener::new(|_state, evt| {
///     if let DecoderEvent::Changed(update) = evt {
///         println!("{}", update);
///     }
///     Ok(())
/// }));
/// ```
pub struct FnListener<F> {
    callback: F,
}

impl<F> FnListener<F>
where
    F: Fn(&DecoderState, DecoderEvent) -> ListenerResult + Send + Sync,
{
    /// Wrap `callback`
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> fmt::Debug for FnListener<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnListener").finish_non_exhaustive()
    }
}

impl<F> Listener for FnListener<F>
where
    F: Fn(&DecoderState, DecoderEvent) -> ListenerResult + Send + Sync,
{
    fn on_identity_change(&self, state: &DecoderState, pi: u16) -> ListenerResult {
        (self.callback)(state, DecoderEvent::Changed(FieldUpdate::Identity(pi)))
    }

    fn on_country_change(&self, state: &DecoderState, ecc: u8) -> ListenerResult {
        (self.callback)(state, DecoderEvent::Changed(FieldUpdate::Country(ecc)))
    }

    fn on_name_change(&self, state: &DecoderState, ps: &str) -> ListenerResult {
        (self.callback)(state, DecoderEvent::Changed(FieldUpdate::Name(ps.to_owned())))
    }

    fn on_text_change(&self, state: &DecoderState, rt: &str) -> ListenerResult {
        (self.callback)(state, DecoderEvent::Changed(FieldUpdate::Text(rt.to_owned())))
    }

    fn on_reset(&self, state: &DecoderState) -> ListenerResult {
        (self.callback)(state, DecoderEvent::Reset)
    }
}

/// Opaque listener registration handle
///
/// Returned by
/// [`RdsDecoder::add_listener()`](crate::RdsDecoder::add_listener)
/// and used to remove the listener later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type Registration = (ListenerId, Arc<dyn Listener>);

/// Registered listeners, in registration order
#[derive(Default)]
pub(crate) struct Listeners {
    next_id: AtomicU64,
    entries: Mutex<Vec<Registration>>,
}

impl Listeners {
    pub fn add(&self, listener: Arc<dyn Listener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, listener));
        id
    }

    /// Remove a listener; false if it was not registered
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Notify every listener of a field change
    pub fn notify_change(&self, state: &DecoderState, update: &FieldUpdate) {
        self.dispatch("change", |listener| match update {
            FieldUpdate::Identity(pi) => listener.on_identity_change(state, *pi),
            FieldUpdate::Country(ecc) => listener.on_country_change(state, *ecc),
            FieldUpdate::Name(ps) => listener.on_name_change(state, ps),
            FieldUpdate::Text(rt) => listener.on_text_change(state, rt),
        });
    }

    /// Notify every listener of a reset
    pub fn notify_reset(&self, state: &DecoderState) {
        self.dispatch("reset", |listener| listener.on_reset(state));
    }

    // The registry is copied before dispatch so callbacks may
    // add or remove listeners.
    fn dispatch<F>(&self, what: &str, callback: F)
    where
        F: Fn(&dyn Listener) -> ListenerResult,
    {
        let entries: Vec<Registration> = self.lock().clone();
        for (id, listener) in entries {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(listener.as_ref()))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!("listener {}: {} callback failed: {}", id, what, err),
                Err(_) => warn!("listener {}: {} callback panicked", id, what),
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Registration>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<ListenerId> = self.lock().iter().map(|(id, _)| *id).collect();
        f.debug_struct("Listeners").field("ids", &ids).finish()
    }
}
