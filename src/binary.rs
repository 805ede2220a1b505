//! Binary semaphore: a [`Semaphore`] with capacity 1

use crate::semaphore::Semaphore;
use std::time::Duration;

/// A semaphore that is either full (1) or empty (0)
///
/// # Example
///
/// ```rust
/// use syncgate::Binary;
///
/// let sem = Binary::new(false);
/// assert!(sem.give());
/// assert!(sem.is_full());
/// assert!(!sem.give());
///
/// sem.take();
/// assert!(sem.is_empty());
/// ```
#[derive(Debug)]
pub struct Binary {
    inner: Semaphore,
}

impl Binary {
    /// Create a binary semaphore, initially full when `full` is true
    #[must_use]
    pub fn new(full: bool) -> Self {
        Self {
            inner: Semaphore::with_count(usize::from(full), 1),
        }
    }

    /// See [`Semaphore::take`]
    pub fn take(&self) {
        self.inner.take();
    }

    /// See [`Semaphore::try_take`]
    #[must_use]
    pub fn try_take(&self, timeout: Duration) -> bool {
        self.inner.try_take(timeout)
    }

    /// See [`Semaphore::take_async`]
    pub async fn take_async(&self) {
        self.inner.take_async().await;
    }

    /// See [`Semaphore::take_now`]
    #[must_use]
    pub fn take_now(&self) -> bool {
        self.inner.take_now()
    }

    /// Fill the semaphore; returns `false` if it was already full
    pub fn give(&self) -> bool {
        self.inner.give()
    }

    /// See [`Semaphore::is_empty`]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// See [`Semaphore::is_full`]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    /// See [`Semaphore::count`]
    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.count()
    }

    /// See [`Semaphore::waiters`]
    #[must_use]
    pub fn waiters(&self) -> usize {
        self.inner.waiters()
    }

    /// Borrow the underlying counting semaphore
    #[must_use]
    pub fn as_semaphore(&self) -> &Semaphore {
        &self.inner
    }
}

impl From<Binary> for Semaphore {
    fn from(binary: Binary) -> Self {
        binary.inner
    }
}
