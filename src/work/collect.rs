//! Fan-out/fan-in completion barrier.
//!
//! The submitter fixes the number of units up front, hands one shared
//! `WorkCollect` to every unit, and blocks in [`WorkCollect::wait`] until each
//! unit has called [`WorkCollect::signal_one`] exactly once.
//!
//! Signalling more times than expected is a programming error and panics.
//! Waiting on a collect whose expected count does not match the number of
//! dispatched units never returns.

use std::sync::{Condvar, Mutex, PoisonError};

/// A counted completion barrier carrying an owner payload.
#[derive(Debug)]
pub struct WorkCollect<T = ()> {
    expected: usize,
    completed: Mutex<usize>,
    done: Condvar,
    payload: T,
}

impl<T> WorkCollect<T> {
    /// Create a barrier expecting `expected` completions.
    pub fn new(expected: usize, payload: T) -> Self {
        Self {
            expected,
            completed: Mutex::new(0),
            done: Condvar::new(),
            payload,
        }
    }

    /// Reset for reuse with a new expected count and payload.
    ///
    /// Requires exclusive access, so no unit can still be holding it.
    pub fn init(&mut self, expected: usize, payload: T) {
        self.expected = expected;
        *self
            .completed
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner) = 0;
        self.payload = payload;
    }

    /// The owner payload handed to every unit.
    pub fn payload(&self) -> &T {
        &self.payload
    }

    /// Number of completions this barrier waits for.
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Number of completions signalled so far.
    pub fn completed(&self) -> usize {
        *self.completed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one finished unit, waking the submitter on the last one.
    pub fn signal_one(&self) {
        let mut completed = self.completed.lock().unwrap_or_else(PoisonError::into_inner);
        assert!(
            *completed < self.expected,
            "work collect signalled {} times, expected {}",
            *completed + 1,
            self.expected
        );
        *completed += 1;
        if *completed == self.expected {
            self.done.notify_all();
        }
    }

    /// Block until every expected unit has signalled.
    pub fn wait(&self) {
        let mut completed = self.completed.lock().unwrap_or_else(PoisonError::into_inner);
        while *completed < self.expected {
            completed = self
                .done
                .wait(completed)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}
