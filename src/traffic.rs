//! Traffic controller: serializes concurrent access to conundrum keys
//! across fire-and-forget sequence executions.
//!
//! The gate is a single shared resource, not one token per conundrum key
//! (open question #2 — see DESIGN.md). Output modifier state
//! (Shift/Alt/Control) is global to the synthesized keystroke stream, so
//! two executions touching *different* conundrum keys at the same moment
//! could still corrupt each other's modifier state if interleaved — the
//! controller therefore admits at most one crossing at a time across the
//! whole profile, FIFO-ordered by arrival (a classic ticket lock), rather
//! than keyed per base key.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

struct State {
    now_serving: u64,
}

/// FIFO mutual-exclusion gate for conundrum-key crossings.
pub struct TrafficController {
    next_ticket: AtomicU64,
    state: Mutex<State>,
    cond: Condvar,
}

impl TrafficController {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_ticket: AtomicU64::new(0),
            state: Mutex::new(State { now_serving: 0 }),
            cond: Condvar::new(),
        })
    }

    /// Block until this execution is at the front of the FIFO queue, then
    /// hold the gate until the returned guard is dropped. A binding marked
    /// `supremacy` should never call this and instead proceed
    /// unconditionally.
    pub fn request_crossing(self: &Arc<Self>) -> CrossingGuard {
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        while state.now_serving != ticket {
            self.cond.wait(&mut state);
        }
        CrossingGuard { controller: Arc::clone(self), ticket }
    }

    fn release_crossing(&self, ticket: u64) {
        let mut state = self.state.lock();
        debug_assert_eq!(state.now_serving, ticket);
        state.now_serving = ticket + 1;
        self.cond.notify_all();
    }
}

/// RAII crossing permit. Dropping it (including via unwind during a
/// panicking execution) releases the gate to the next waiter.
pub struct CrossingGuard {
    controller: Arc<TrafficController>,
    ticket: u64,
}

impl Drop for CrossingGuard {
    fn drop(&mut self) {
        self.controller.release_crossing(self.ticket);
    }
}
