//! Resettable event
//!
//! An [`Event`] notifies threads and tasks that a condition has occurred.
//! It has two states, set and unset. Every waiter unblocks when the event
//! becomes set, and a wait on an event that is already set returns at once.
//! [`reset`](Event::reset) re-arms it for another round.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//! use syncgate::Event;
//!
//! let ready = Arc::new(Event::new());
//!
//! let waiter = {
//!     let ready = Arc::clone(&ready);
//!     thread::spawn(move || ready.wait())
//! };
//!
//! assert!(ready.set());
//! waiter.join().unwrap();
//!
//! // Already set: returns without blocking
//! ready.wait();
//! ```

use crate::startgroup::StartGroup;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, trace};

/// A one-bit sticky condition with a broadcast wakeup
///
/// `set` publishes the flag before it releases the gate. Waiters check the
/// flag, capture the gate's live generation, then check the flag again before
/// blocking, so a `set` racing with the capture is never missed.
pub struct Event {
    state: AtomicBool,
    gate: StartGroup,
}

impl Event {
    /// Create an unset event
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: AtomicBool::new(false),
            gate: StartGroup::new(),
        }
    }

    /// Move the event to the set state, waking every waiter
    ///
    /// Returns `true` if this call changed the state and `false` if the
    /// event was already set.
    pub fn set(&self) -> bool {
        let changed = self
            .state
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if changed {
            trace!("Event set, releasing waiters");
            self.gate.release();
        }
        changed
    }

    /// Move the event back to the unset state
    ///
    /// Returns `true` if this call changed the state. Once reset, new waits
    /// block until the next [`set`](Self::set).
    pub fn reset(&self) -> bool {
        self.state
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Whether the event is currently set
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.state.load(Ordering::Acquire)
    }

    /// Block until the event is set
    pub fn wait(&self) {
        if self.is_set() {
            return;
        }

        let generation = self.gate.live_generation();
        if self.is_set() {
            return;
        }
        generation.wait();
    }

    /// Block until the event is set or `timeout` elapses
    ///
    /// Returns `true` if the event was set, or became set, in time.
    #[must_use]
    pub fn try_wait(&self, timeout: Duration) -> bool {
        if self.is_set() {
            return true;
        }

        let generation = self.gate.live_generation();
        if self.is_set() {
            return true;
        }

        let signalled = generation.wait_timeout(timeout);
        if !signalled {
            debug!("Event wait timed out after {:?}", timeout);
        }
        signalled
    }

    /// Wait for the event to be set without blocking the thread
    pub async fn wait_async(&self) {
        if self.is_set() {
            return;
        }

        let released = self.gate.wait_async();
        if self.is_set() {
            return;
        }
        released.await;
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event").field("set", &self.is_set()).finish()
    }
}
