//! Per-key gesture state machine.
//!
//! One isolated instance per input key; no cross-key state is shared, the
//! same per-key `HashMap` bookkeeping shape a debounce state machine would
//! use, just specialized to a single already-known key instead of keyed
//! by map.

use std::time::{Duration, Instant};

use super::{GestureTimingConfig, GestureType, PressRecord, PressType};

const MAX_PRESSES: usize = 4;

pub struct GestureMachine {
    config: GestureTimingConfig,
    press_history: Vec<PressRecord>,
    key_down_time: Option<Instant>,
    window_deadline: Option<Instant>,
    waiting_for_release: bool,
    key_down_was_within_window: bool,
    press_limit_reached: bool,
    await_jail_until: Option<Instant>,
}

impl GestureMachine {
    pub fn new(config: GestureTimingConfig) -> Self {
        Self {
            config,
            press_history: Vec::with_capacity(MAX_PRESSES),
            key_down_time: None,
            window_deadline: None,
            waiting_for_release: false,
            key_down_was_within_window: false,
            press_limit_reached: false,
            await_jail_until: None,
        }
    }

    /// Reset in place (not reallocated) on profile change.
    pub fn reset(&mut self, config: GestureTimingConfig) {
        self.config = config;
        self.clear();
    }

    /// Clear all ephemeral state while keeping the current configuration;
    /// used by `reset` and by the orchestrator's `destroy`.
    pub fn clear(&mut self) {
        self.press_history.clear();
        self.key_down_time = None;
        self.window_deadline = None;
        self.waiting_for_release = false;
        self.key_down_was_within_window = false;
        self.press_limit_reached = false;
        self.await_jail_until = None;
    }

    #[cfg(test)]
    pub(crate) fn press_history_len(&self) -> usize {
        self.press_history.len()
    }

    fn start_fresh_sequence(&mut self, t_now: Instant) {
        if !self.waiting_for_release {
            self.press_history.clear();
            self.press_limit_reached = false;
        }
        self.key_down_was_within_window = false;
        self.window_deadline = Some(t_now + self.config.initial_window());
    }

    /// Step 4.1 `handle_key_down`.
    pub fn handle_key_down(&mut self, t_now: Instant) {
        if let Some(jail) = self.await_jail_until {
            if t_now < jail {
                return;
            }
        }
        if self.key_down_time.is_some() {
            return; // OS key-repeat autoburst
        }
        if self.press_limit_reached {
            return;
        }

        match self.window_deadline {
            Some(deadline) if t_now <= deadline => {
                self.key_down_was_within_window = true;
                self.window_deadline = Some(t_now + self.config.extension_window());
            }
            _ => self.start_fresh_sequence(t_now),
        }

        self.key_down_time = Some(t_now);

        if self.press_history.len() == 3 {
            self.window_deadline = None;
            self.waiting_for_release = true;
        }
    }

    /// Step 4.1 `handle_key_up`. Returns `Some(gesture)` only for the
    /// synchronous 4-press resolution; 1-3 press sequences resolve later
    /// via `finalize`.
    pub fn handle_key_up(&mut self, t_now: Instant) -> Option<GestureType> {
        let key_down_time = self.key_down_time.take()?;
        let hold = t_now.saturating_duration_since(key_down_time);

        if self.press_limit_reached {
            return None;
        }

        if hold >= self.config.cancel_threshold() {
            self.press_history.clear();
            self.window_deadline = None;
            self.waiting_for_release = false;
            return None;
        }

        let press_type = self.config.classify_hold(hold);

        let counts_toward_sequence =
            self.press_history.is_empty() || self.key_down_was_within_window || self.waiting_for_release;
        if !counts_toward_sequence {
            self.press_history.clear();
        }

        self.press_history.push(PressRecord { press_type });
        if self.press_history.len() >= MAX_PRESSES {
            self.press_history.truncate(MAX_PRESSES);
            self.press_limit_reached = true;
            self.window_deadline = None;
            self.waiting_for_release = false;
            return Some(self.resolve(t_now));
        }

        None
    }

    /// Periodic finalization check, driven by the orchestrator's ~20ms
    /// timer. Resolves 1-3 press sequences once the elongating window has
    /// elapsed with no key currently held.
    pub fn finalize(&mut self, t_now: Instant) -> Option<GestureType> {
        if self.press_history.is_empty() {
            return None;
        }
        if self.key_down_time.is_some() {
            return None;
        }
        if self.waiting_for_release {
            return None;
        }
        match self.window_deadline {
            Some(deadline) if t_now > deadline => Some(self.resolve(t_now)),
            _ => None,
        }
    }

    fn resolve(&mut self, t_now: Instant) -> GestureType {
        let n = self.press_history.len().min(MAX_PRESSES);
        let press_type = self
            .press_history
            .last()
            .map(|r| r.press_type)
            .unwrap_or(PressType::Normal);
        let gesture = GestureType::from_count_and_type(n, press_type);

        self.await_jail_until = match n {
            3 => Some(t_now + Duration::from_millis(120)),
            4 => Some(t_now + Duration::from_millis(200)),
            _ => None,
        };

        self.press_history.clear();
        self.press_limit_reached = false;
        self.window_deadline = None;
        self.waiting_for_release = false;

        gesture
    }
}

#[cfg(test)]
#[path = "test/machine_tests.rs"]
mod machine_tests;
