//! Transient failure notification
//!
//! Every failure a policy decides to retry is reported once, before the
//! wait. Observers registered on the policy see the failure first, in
//! registration order, and any of them can mark it handled. An unhandled
//! failure is logged through `tracing` with `transient = true`.
//!
//! Observers only watch; they cannot change the retry decision.

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

/// A retried failure, as seen by observers
pub struct TransientEvent<'a, E> {
    error: &'a E,
    attempt: u32,
    delay: Duration,
    category: &'a str,
    handled: bool,
}

impl<'a, E> TransientEvent<'a, E> {
    pub(crate) fn new(error: &'a E, attempt: u32, delay: Duration, category: &'a str) -> Self {
        Self {
            error,
            attempt,
            delay,
            category,
            handled: false,
        }
    }

    /// The failure that will be retried
    pub fn error(&self) -> &'a E {
        self.error
    }

    /// The attempt that failed (1-indexed)
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// How long the run will wait before the next attempt
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Category of the policy that produced the event
    pub fn category(&self) -> &'a str {
        self.category
    }

    /// Mark the event handled
    ///
    /// Later observers are skipped and the failure is not logged.
    pub fn handle(&mut self) {
        self.handled = true;
    }

    /// Whether an observer has handled the event
    pub fn is_handled(&self) -> bool {
        self.handled
    }
}

/// Receives retried failures
///
/// Implemented for any `Fn(&mut TransientEvent<'_, E>) + Send + Sync`.
///
/// A panic inside an observer is not caught: it unwinds out of the
/// `execute*` call that triggered the notification and ends that run.
pub trait TransientObserver<E>: Send + Sync {
    /// Called once per retried failure, before the wait
    fn on_transient(&self, event: &mut TransientEvent<'_, E>);
}

impl<E, F> TransientObserver<E> for F
where
    F: Fn(&mut TransientEvent<'_, E>) + Send + Sync,
{
    fn on_transient(&self, event: &mut TransientEvent<'_, E>) {
        self(event)
    }
}

/// Handle returned when registering an observer, used to remove it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type ObserverEntry<E> = (ObserverId, Arc<dyn TransientObserver<E>>);

/// Ordered, thread-safe list of transient observers
///
/// Registration may happen while runs are in flight. Each notification
/// works on a snapshot of the list taken at the time it fires, so an
/// observer added or removed mid-notification takes effect from the next
/// one.
pub struct TransientObservers<E> {
    entries: RwLock<Vec<ObserverEntry<E>>>,
    next_id: AtomicU64,
}

impl<E> Default for TransientObservers<E> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<E> TransientObservers<E> {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observer
    pub fn add(&self, observer: Arc<dyn TransientObserver<E>>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, observer));
        id
    }

    /// Remove a previously added observer
    ///
    /// Returns `false` if the id is unknown.
    pub fn remove(&self, id: ObserverId) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.iter().position(|(entry_id, _)| *entry_id == id) {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Number of registered observers
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no observer is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<Arc<dyn TransientObserver<E>>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect()
    }

    /// Independent copy of this list sharing the same observers
    pub(crate) fn duplicate(&self) -> Self {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Self {
            entries: RwLock::new(entries),
            next_id: AtomicU64::new(self.next_id.load(Ordering::Relaxed)),
        }
    }
}

impl<E: fmt::Display> TransientObservers<E> {
    /// Report a retried failure
    ///
    /// Returns whether an observer handled it. Unhandled failures are
    /// logged at WARN level.
    pub fn notify(&self, error: &E, attempt: u32, delay: Duration, category: &str) -> bool {
        let mut event = TransientEvent::new(error, attempt, delay, category);

        for observer in self.snapshot() {
            observer.on_transient(&mut event);
            if event.is_handled() {
                return true;
            }
        }

        tracing::warn!(
            transient = true,
            category = %category,
            attempt = attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "transient failure, will retry"
        );
        false
    }
}

impl<E> fmt::Debug for TransientObservers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransientObservers")
            .field("len", &self.len())
            .finish()
    }
}

/// An observer that records retried failures
///
/// Clones share the same counters, so a clone can be registered on a
/// policy while the original is kept for inspection. Useful for metrics
/// collection and tests.
#[derive(Debug, Clone, Default)]
pub struct TransientStats {
    inner: Arc<StatsInner>,
    handle_events: bool,
}

#[derive(Debug, Default)]
struct StatsInner {
    notifications: AtomicU32,
    delays: Mutex<Vec<Duration>>,
}

impl TransientStats {
    /// Create a stats observer that leaves events unhandled
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stats observer that marks every event handled
    ///
    /// Registered first, it silences the default log.
    pub fn handling() -> Self {
        Self {
            inner: Arc::default(),
            handle_events: true,
        }
    }

    /// Number of events seen
    pub fn notifications(&self) -> u32 {
        self.inner.notifications.load(Ordering::SeqCst)
    }

    /// Delay reported by each event, in order
    pub fn delays(&self) -> Vec<Duration> {
        self.inner
            .delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<E> TransientObserver<E> for TransientStats {
    fn on_transient(&self, event: &mut TransientEvent<'_, E>) {
        self.inner.notifications.fetch_add(1, Ordering::SeqCst);
        self.inner
            .delays
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.delay());
        if self.handle_events {
            event.handle();
        }
    }
}
