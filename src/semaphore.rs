//! Bounded counting semaphore
//!
//! Provides a counter constrained to `[0, capacity]` with a blocking (or
//! timeout-bounded) decrement and a non-blocking increment. Use it to signal
//! that units of some resource are available; it does not track which caller
//! holds what.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//! use std::time::Duration;
//! use syncgate::Semaphore;
//!
//! let sem = Arc::new(Semaphore::new(0, 4));
//!
//! let consumer = {
//!     let sem = Arc::clone(&sem);
//!     thread::spawn(move || sem.take())
//! };
//!
//! assert!(sem.give());
//! consumer.join().unwrap();
//! assert!(sem.is_empty());
//! assert!(!sem.try_take(Duration::from_millis(1)));
//! ```

use crate::error::{Error, Result};
use crate::generation::Notifier;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// A bounded counter with blocking decrement and non-blocking increment
///
/// # Design
///
/// - **Lock-free counting**: `give` and every decrement attempt are
///   compare-and-swap loops on a single atomic; no caller ever observes a
///   count outside `[0, capacity]`
/// - **Wake on empty to non-empty**: a `give` that moves the count off zero
///   releases a private generation-swap notifier and every blocked taker
///   retries its CAS
/// - **Not FIFO**: woken takers race for the count; losers re-block
/// - **Deadline-based timeouts**: `try_take` measures every wait against one
///   deadline, so retries never restart the timeout
///
/// # Example
///
/// ```rust
/// use syncgate::Semaphore;
///
/// let sem = Semaphore::new(3, 5);
/// assert_eq!(sem.count(), 3);
///
/// assert!(sem.give());
/// assert!(sem.give());
/// assert!(!sem.give()); // full
/// assert!(sem.is_full());
/// ```
pub struct Semaphore {
    /// Current count, always within `[0, capacity]`
    count: AtomicUsize,
    /// Maximum count, fixed at construction
    capacity: usize,
    /// Callers currently parked in a take
    waiting: AtomicUsize,
    /// Wakes parked takers when the count leaves zero
    notifier: Notifier,
}

/// Keeps [`Semaphore::waiters`] accurate even if an async take is dropped
/// while parked
struct Parked<'a> {
    waiting: &'a AtomicUsize,
}

impl<'a> Parked<'a> {
    fn new(waiting: &'a AtomicUsize) -> Self {
        waiting.fetch_add(1, Ordering::Relaxed);
        Self { waiting }
    }
}

impl Drop for Parked<'_> {
    fn drop(&mut self) {
        self.waiting.fetch_sub(1, Ordering::Relaxed);
    }
}

impl Semaphore {
    /// Create a semaphore holding `initial` out of `capacity` units
    ///
    /// # Errors
    ///
    /// Returns [`Error::ZeroCapacity`] if `capacity` is 0 and
    /// [`Error::InitialExceedsCapacity`] if `initial > capacity`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use syncgate::{Error, Semaphore};
    ///
    /// assert!(Semaphore::try_new(1, 1).is_ok());
    /// assert_eq!(
    ///     Semaphore::try_new(2, 1).unwrap_err(),
    ///     Error::InitialExceedsCapacity { initial: 2, capacity: 1 }
    /// );
    /// ```
    pub fn try_new(initial: usize, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::ZeroCapacity);
        }
        if initial > capacity {
            return Err(Error::InitialExceedsCapacity { initial, capacity });
        }
        Ok(Self::with_count(initial, capacity))
    }

    /// Create a semaphore holding `initial` out of `capacity` units
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0 or `initial > capacity`. Both are
    /// programming errors; use [`try_new`](Self::try_new) to validate
    /// untrusted values.
    #[must_use]
    pub fn new(initial: usize, capacity: usize) -> Self {
        match Self::try_new(initial, capacity) {
            Ok(semaphore) => semaphore,
            Err(error) => panic!("{error}"),
        }
    }

    /// Construct from values already known to be valid
    pub(crate) fn with_count(initial: usize, capacity: usize) -> Self {
        debug_assert!(capacity > 0 && initial <= capacity);
        Self {
            count: AtomicUsize::new(initial),
            capacity,
            waiting: AtomicUsize::new(0),
            notifier: Notifier::new(),
        }
    }

    /// Decrement the count, blocking while it is zero
    pub fn take(&self) {
        loop {
            if self.take_now() {
                return;
            }

            // Capture the generation before re-checking the count: a give
            // that lands after the re-check must release this generation.
            let generation = self.notifier.current();
            if self.count.load(Ordering::Acquire) > 0 {
                continue;
            }

            let _parked = Parked::new(&self.waiting);
            generation.wait();
        }
    }

    /// Decrement the count, blocking for at most `timeout`
    ///
    /// Returns `true` on success and `false` if the timeout elapsed first.
    /// Time spent across wakeups that lost the race to another taker counts
    /// against the same timeout.
    #[must_use]
    pub fn try_take(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.take();
            return true;
        };

        loop {
            if self.take_now() {
                return true;
            }

            let generation = self.notifier.current();
            if self.count.load(Ordering::Acquire) > 0 {
                continue;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!("Semaphore take timed out after {:?}", timeout);
                return false;
            }

            let _parked = Parked::new(&self.waiting);
            // The outcome is re-checked by the CAS at the top of the loop.
            let _ = generation.wait_timeout(remaining);
        }
    }

    /// Decrement the count, awaiting while it is zero
    ///
    /// Same retry loop as [`take`](Self::take), but parks the task's waker
    /// instead of the thread. Dropping the future abandons the take without
    /// consuming a unit.
    pub async fn take_async(&self) {
        loop {
            if self.take_now() {
                return;
            }

            let released = self.notifier.released();
            if self.count.load(Ordering::Acquire) > 0 {
                continue;
            }

            let _parked = Parked::new(&self.waiting);
            released.await;
        }
    }

    /// Single non-blocking decrement attempt
    ///
    /// Returns `false` only if the count was observed at zero.
    ///
    /// # Example
    ///
    /// ```rust
    /// use syncgate::Semaphore;
    ///
    /// let sem = Semaphore::new(1, 1);
    /// assert!(sem.take_now());
    /// assert!(!sem.take_now());
    /// ```
    #[must_use]
    pub fn take_now(&self) -> bool {
        let mut current = self.count.load(Ordering::Acquire);

        loop {
            if current == 0 {
                return false;
            }

            match self.count.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual, // Lost a race, retry with the fresh value
            }
        }
    }

    /// Increment the count without blocking
    ///
    /// Returns `false`, leaving the count unchanged, if the semaphore is
    /// full. A CAS that loses to a concurrent take is retried; one that loses
    /// to a concurrent give is retried only while there is still room.
    pub fn give(&self) -> bool {
        let mut current = self.count.load(Ordering::Acquire);

        loop {
            if current == self.capacity {
                trace!("Semaphore full at {}, give refused", self.capacity);
                return false;
            }

            match self.count.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        if current == 0 {
            trace!(
                "Semaphore count left zero, waking {} takers",
                self.waiting.load(Ordering::Relaxed)
            );
            self.notifier.release();
        }
        true
    }

    /// Whether the count is zero
    ///
    /// Like every observer here this is a single atomic read and may be
    /// stale by the time the caller acts on it.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Whether the count equals the capacity
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.count() == self.capacity
    }

    /// Current count
    #[must_use]
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Maximum count, fixed at construction
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of callers currently parked waiting to take
    ///
    /// For monitoring only.
    #[must_use]
    pub fn waiters(&self) -> usize {
        self.waiting.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Semaphore")
            .field("count", &self.count())
            .field("capacity", &self.capacity)
            .field("waiters", &self.waiters())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_semaphore_new() {
        let sem = Semaphore::new(3, 5);
        assert_eq!(sem.count(), 3);
        assert_eq!(sem.capacity(), 5);
        assert_eq!(sem.waiters(), 0);
        assert!(!sem.is_empty());
        assert!(!sem.is_full());
    }

    #[test]
    fn test_try_new_rejects_initial_above_capacity() {
        assert_eq!(
            Semaphore::try_new(2, 1).unwrap_err(),
            Error::InitialExceedsCapacity {
                initial: 2,
                capacity: 1
            }
        );
    }

    #[test]
    fn test_try_new_rejects_zero_capacity() {
        assert_eq!(Semaphore::try_new(0, 0).unwrap_err(), Error::ZeroCapacity);
    }

    #[test]
    #[should_panic(expected = "initial count 2 larger than capacity 1")]
    fn test_semaphore_initial_above_capacity_panics() {
        let _sem = Semaphore::new(2, 1);
    }

    #[test]
    fn test_give_until_full() {
        let sem = Semaphore::new(0, 1);
        assert!(sem.give());
        assert!(sem.is_full());

        assert!(!sem.give());
        assert_eq!(sem.count(), 1);
    }

    #[test]
    fn test_give_then_take() {
        let sem = Semaphore::new(0, 1);
        assert!(sem.give());
        sem.take();
        assert!(sem.is_empty());
    }

    #[test]
    fn test_count_tracks_give() {
        let sem = Semaphore::new(3, 5);
        assert_eq!(sem.count(), 3);
        assert!(sem.give());
        assert_eq!(sem.count(), 4);
    }

    #[test]
    fn test_take_now() {
        let sem = Semaphore::new(2, 2);
        assert!(sem.take_now());
        assert!(sem.take_now());
        assert!(!sem.take_now());
        assert_eq!(sem.count(), 0);
    }

    #[test]
    fn test_try_take_available() {
        let sem = Semaphore::new(1, 1);
        assert!(sem.try_take(Duration::from_millis(1)));
        assert!(sem.is_empty());
    }

    #[test]
    fn test_try_take_empty_times_out() {
        let sem = Semaphore::new(0, 1);
        let start = Instant::now();
        assert!(!sem.try_take(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert_eq!(sem.waiters(), 0);
    }

    #[test]
    fn test_try_take_keeps_deadline_across_wakeups() {
        use std::sync::atomic::AtomicBool;

        let sem = Arc::new(Semaphore::new(0, 1));
        let stop = Arc::new(AtomicBool::new(false));

        // Wake every parked taker over and over while the count stays at
        // zero, so each wakeup is a lost race.
        let waker = {
            let sem = Arc::clone(&sem);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut wakeups = 0_u32;
                while !stop.load(Ordering::SeqCst) {
                    sem.notifier.release();
                    wakeups += 1;
                    thread::sleep(Duration::from_micros(500));
                }
                wakeups
            })
        };

        let timeout = Duration::from_millis(100);
        let start = Instant::now();
        let took = sem.try_take(timeout);
        let elapsed = start.elapsed();

        stop.store(true, Ordering::SeqCst);
        let wakeups = waker.join().unwrap();

        assert!(!took);
        assert!(elapsed >= timeout, "gave up early after {elapsed:?}");
        assert!(elapsed < timeout * 3, "deadline restarted: {elapsed:?}");
        assert!(wakeups > 1);
        assert_eq!(sem.count(), 0);
        assert_eq!(sem.waiters(), 0);
    }

    #[test]
    fn test_try_take_zero_timeout_does_not_block() {
        let sem = Semaphore::new(0, 1);
        assert!(!sem.try_take(Duration::ZERO));
    }

    #[test]
    fn test_try_take_unbounded_timeout() {
        let sem = Semaphore::new(1, 1);
        assert!(sem.try_take(Duration::MAX));
    }

    #[test]
    fn test_take_blocks_until_give() {
        let sem = Arc::new(Semaphore::new(0, 1));

        let taker = {
            let sem = Arc::clone(&sem);
            thread::spawn(move || sem.take())
        };

        while sem.waiters() == 0 {
            thread::yield_now();
        }
        assert!(!taker.is_finished());

        assert!(sem.give());
        taker.join().unwrap();
        assert_eq!(sem.count(), 0);
        assert_eq!(sem.waiters(), 0);
    }

    #[test]
    fn test_debug_output() {
        let sem = Semaphore::new(1, 2);
        assert_eq!(
            format!("{sem:?}"),
            "Semaphore { count: 1, capacity: 2, waiters: 0 }"
        );
    }
}
