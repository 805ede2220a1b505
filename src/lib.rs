//! Signaling primitives for coordinating threads and tasks on conditions
//!
//! This crate provides synchronization primitives for waiting on a condition
//! rather than for mutual exclusion. Each one blocks the calling thread, and
//! also offers a future for use on an async runtime such as
//! [compio](https://github.com/compio-rs/compio).
//!
//! # Primitives
//!
//! - [`StartGroup`] - Reusable broadcast gate that wakes every waiter on release
//! - [`Semaphore`] - Bounded counter with blocking take and non-blocking give
//! - [`Binary`] - Semaphore with capacity 1
//! - [`Event`] - Resettable latch built on a start group
//!
//! None of them hold a lock while a caller is waiting. Each instance is
//! independent; share it across threads with an `Arc`.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//! use syncgate::{Event, Semaphore};
//!
//! let slots = Arc::new(Semaphore::new(0, 8));
//! let done = Arc::new(Event::new());
//!
//! let worker = {
//!     let slots = Arc::clone(&slots);
//!     let done = Arc::clone(&done);
//!     thread::spawn(move || {
//!         slots.take();
//!         done.set();
//!     })
//! };
//!
//! assert!(slots.give());
//! done.wait();
//! worker.join().unwrap();
//! ```

mod binary;
pub mod error;
mod event;
mod generation;
mod semaphore;
mod startgroup;

pub use binary::Binary;
pub use error::{Error, Result};
pub use event::Event;
pub use generation::Released;
pub use semaphore::Semaphore;
pub use startgroup::StartGroup;
