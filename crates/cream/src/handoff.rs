//! FIFO handoff between the accept loop and the worker pool.
//!
//! One producer appends connection handles, any number of consumers block in
//! [`Handoff::pop`] until an item arrives. Ordering is strict FIFO with
//! respect to `push`; which worker wins a wakeup is unspecified. `pop` has no
//! timeout and is only interruptible by [`Handoff::invalidate`], which drains
//! the queue through a destroy callback and makes every later call fail.
//!
//! The queue is a `Mutex<VecDeque>` paired with a `Condvar`; the wait loop
//! re-checks its predicate, so spurious wakeups are harmless.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use thiserror::Error;

/// Returned by every operation after [`Handoff::invalidate`] has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("handoff has been invalidated")]
pub struct HandoffInvalidated;

struct State<T> {
    queue: VecDeque<T>,
    invalid: bool,
}

/// Blocking FIFO of owned items, shared between one producer and `W`
/// consumers.
pub struct Handoff<T> {
    state: Mutex<State<T>>,
    ready: Condvar,
}

impl<T> Handoff<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                queue: VecDeque::new(),
                invalid: false,
            }),
            ready: Condvar::new(),
        }
    }

    /// Append `item` and wake at most one blocked consumer.
    pub fn push(&self, item: T) -> Result<(), HandoffInvalidated> {
        let mut state = self.state.lock().expect("handoff mutex poisoned");
        if state.invalid {
            return Err(HandoffInvalidated);
        }
        state.queue.push_back(item);
        self.ready.notify_one();
        Ok(())
    }

    /// Remove and return the head item, blocking until one is available or
    /// the handoff is invalidated.
    pub fn pop(&self) -> Result<T, HandoffInvalidated> {
        let mut state = self.state.lock().expect("handoff mutex poisoned");
        loop {
            if state.invalid {
                return Err(HandoffInvalidated);
            }
            if let Some(item) = state.queue.pop_front() {
                return Ok(item);
            }
            state = self.ready.wait(state).expect("handoff condvar poisoned");
        }
    }

    /// Drain every queued item through `destroy`, wake all blocked
    /// consumers, and make every subsequent operation fail.
    pub fn invalidate(&self, mut destroy: impl FnMut(T)) -> Result<(), HandoffInvalidated> {
        let mut state = self.state.lock().expect("handoff mutex poisoned");
        if state.invalid {
            return Err(HandoffInvalidated);
        }
        for item in state.queue.drain(..) {
            destroy(item);
        }
        state.invalid = true;
        self.ready.notify_all();
        Ok(())
    }

    /// Number of items currently queued.
    pub fn len(&self) -> usize {
        self.state.lock().expect("handoff mutex poisoned").queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for Handoff<T> {
    fn default() -> Self {
        Self::new()
    }
}
