//! Generation-swap broadcast machinery
//!
//! A [`Generation`] is one epoch of a broadcast signal. Waiters capture the
//! live generation and block on it. A release swaps a fresh generation in
//! under the lock and completes the retired one only after unlocking, so every
//! waiter that captured the old generation is woken and every waiter that
//! arrives later lands on the new one.
//!
//! Both [`StartGroup`](crate::StartGroup) and [`Semaphore`](crate::Semaphore)
//! own a [`Notifier`]; the semaphore keeps its own rather than embedding a
//! start group.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};
use std::time::Duration;
use tracing::trace;

/// Completion state of a single generation
struct GenerationState {
    /// Set once by `release`, never cleared
    released: bool,
    /// Wakers of pending [`Released`] futures, indexed by their slot
    wakers: Vec<Option<Waker>>,
    /// Slots vacated by dropped futures, reused before the list grows
    free: Vec<usize>,
}

/// One epoch of a broadcast signal
///
/// Blocked threads park on the condvar; async waiters park their wakers in
/// the state. A retired generation is kept alive only by the `Arc`s its
/// waiters still hold.
pub(crate) struct Generation {
    epoch: u64,
    state: Mutex<GenerationState>,
    condvar: Condvar,
}

impl Generation {
    fn new(epoch: u64) -> Self {
        Self {
            epoch,
            state: Mutex::new(GenerationState {
                released: false,
                wakers: Vec::new(),
                free: Vec::new(),
            }),
            condvar: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GenerationState> {
        // The guarded state is a flag and a waker list; a panicking holder
        // cannot leave it torn.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of releases that preceded this generation
    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Block until this generation is released
    pub(crate) fn wait(&self) {
        let state = self.lock();
        let _state = self
            .condvar
            .wait_while(state, |state| !state.released)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Block until this generation is released or `timeout` elapses
    ///
    /// Returns `true` if the generation was released in time. A timed-out
    /// caller leaves nothing behind: condvar waiters are not registered
    /// anywhere once they return.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> bool {
        let state = self.lock();
        let (state, _) = self
            .condvar
            .wait_timeout_while(state, timeout, |state| !state.released)
            .unwrap_or_else(PoisonError::into_inner);
        state.released
    }

    /// Complete this generation, waking every thread and task parked on it
    ///
    /// One-shot: a second call finds the flag already set and does nothing.
    fn release(&self) {
        let wakers = {
            let mut state = self.lock();
            if state.released {
                return;
            }
            state.released = true;
            state.free.clear();
            std::mem::take(&mut state.wakers)
        };

        self.condvar.notify_all();
        for waker in wakers.into_iter().flatten() {
            waker.wake();
        }
    }

    /// Register `waker` in `slot`, or report that the generation is already released
    fn register(&self, slot: &mut Option<usize>, waker: &Waker) -> bool {
        let mut state = self.lock();
        if state.released {
            return true;
        }

        match *slot {
            Some(index) => {
                let entry = &mut state.wakers[index];
                if !entry.as_ref().is_some_and(|current| current.will_wake(waker)) {
                    *entry = Some(waker.clone());
                }
            }
            None => match state.free.pop() {
                Some(index) => {
                    state.wakers[index] = Some(waker.clone());
                    *slot = Some(index);
                }
                None => {
                    *slot = Some(state.wakers.len());
                    state.wakers.push(Some(waker.clone()));
                }
            },
        }
        false
    }

    fn deregister(&self, index: usize) {
        let mut state = self.lock();
        // After release the list has been drained and the index is gone.
        if let Some(entry) = state.wakers.get_mut(index) {
            *entry = None;
            state.free.push(index);
        }
    }
}

/// Holder of the live generation
///
/// The mutex is held only for the `Arc` clone or swap, never while waiting.
pub(crate) struct Notifier {
    live: Mutex<Arc<Generation>>,
}

impl Notifier {
    pub(crate) fn new() -> Self {
        Self {
            live: Mutex::new(Arc::new(Generation::new(0))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Arc<Generation>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Capture the live generation
    pub(crate) fn current(&self) -> Arc<Generation> {
        Arc::clone(&self.lock())
    }

    /// Epoch of the live generation, i.e. the number of releases so far
    pub(crate) fn epoch(&self) -> u64 {
        self.lock().epoch()
    }

    /// Future bound to the generation that is live right now
    pub(crate) fn released(&self) -> Released {
        Released::new(self.current())
    }

    /// Retire the live generation and install a fresh one
    ///
    /// The swap happens under the lock; the retired generation is completed
    /// after the lock is dropped. Returns the retired generation's epoch.
    pub(crate) fn release(&self) -> u64 {
        let retired = {
            let mut live = self.lock();
            let next = Arc::new(Generation::new(live.epoch() + 1));
            std::mem::replace(&mut *live, next)
        };

        retired.release();
        trace!(
            "Released generation {} ({} holders)",
            retired.epoch(),
            Arc::strong_count(&retired) - 1
        );
        retired.epoch()
    }
}

/// Future that resolves when its captured generation is released
///
/// Returned by [`StartGroup::wait_async`](crate::StartGroup::wait_async). The
/// generation is captured when the future is created, not when it is first
/// polled. Dropping a pending future removes its waker from the generation.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Released {
    generation: Arc<Generation>,
    /// Index of this future's waker in the generation, once registered
    slot: Option<usize>,
}

impl Released {
    pub(crate) fn new(generation: Arc<Generation>) -> Self {
        Self {
            generation,
            slot: None,
        }
    }
}

impl Future for Released {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        if this.generation.register(&mut this.slot, cx.waker()) {
            this.slot = None;
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

impl Drop for Released {
    fn drop(&mut self) {
        if let Some(index) = self.slot.take() {
            self.generation.deregister(index);
        }
    }
}

impl std::fmt::Debug for Released {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Released")
            .field("epoch", &self.generation.epoch())
            .field("registered", &self.slot.is_some())
            .finish()
    }
}
