//! Reusable broadcast gate
//!
//! A [`StartGroup`] lets any number of threads or tasks wait for a release
//! event. Every waiter that registered before a [`release`](StartGroup::release)
//! wakes together, and the gate re-arms at once for the next cohort.
//!
//! A typical use is a set of workers that need to know when a shared resource
//! becomes available but do not need exclusive access to it.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//! use syncgate::StartGroup;
//!
//! let gate = Arc::new(StartGroup::new());
//!
//! let workers: Vec<_> = (0..4)
//!     .map(|_| {
//!         let gate = Arc::clone(&gate);
//!         thread::spawn(move || gate.wait())
//!     })
//!     .collect();
//!
//! // Release until every worker has made it through.
//! while !workers.iter().all(|worker| worker.is_finished()) {
//!     gate.release();
//!     thread::yield_now();
//! }
//! ```

use crate::generation::{Generation, Notifier, Released};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// A reusable one-to-many release signal
///
/// # Design
///
/// - **Generation swap**: the gate holds the live generation behind a mutex
///   that is locked only to clone or replace an `Arc`
/// - **Automatic re-arm**: `release` installs a fresh generation before it
///   wakes the old one, so later waiters block until the next release
/// - **No lingering registrations**: timed-out waiters and dropped futures
///   leave nothing behind in the gate
pub struct StartGroup {
    notifier: Notifier,
}

impl StartGroup {
    /// Create an armed start group
    #[must_use]
    pub fn new() -> Self {
        Self {
            notifier: Notifier::new(),
        }
    }

    /// Block until the next [`release`](Self::release)
    ///
    /// The wait is bound to the generation that is live when this call
    /// captures it; a release that completed earlier does not count.
    pub fn wait(&self) {
        self.notifier.current().wait();
    }

    /// Block until the next release or until `timeout` elapses
    ///
    /// Returns `true` if released in time and `false` on timeout.
    #[must_use]
    pub fn try_wait(&self, timeout: Duration) -> bool {
        let generation = self.notifier.current();
        let released = generation.wait_timeout(timeout);
        if !released {
            debug!(
                "Start group wait on generation {} timed out after {:?}",
                generation.epoch(),
                timeout
            );
        }
        released
    }

    /// Future that resolves on the next release
    ///
    /// The generation is captured now, so a release issued after this call
    /// returns wakes the future even if it has not been polled yet.
    pub fn wait_async(&self) -> Released {
        self.notifier.released()
    }

    /// Wake every current waiter and re-arm the gate
    ///
    /// Releasing with nobody waiting is a no-op apart from advancing the
    /// generation.
    pub fn release(&self) {
        self.notifier.release();
    }

    /// Capture the live generation for callers that check their own
    /// condition between capture and wait
    pub(crate) fn live_generation(&self) -> Arc<Generation> {
        self.notifier.current()
    }

    /// Number of releases issued so far
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.notifier.epoch()
    }
}

impl Default for StartGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StartGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartGroup")
            .field("generation", &self.generation())
            .finish()
    }
}
