//! `Instant` carries no epoch; the whole crate reports timestamps as
//! milliseconds elapsed since process start instead, using this one
//! shared reference point.

use std::time::Instant;

use once_cell::sync::Lazy;

static START: Lazy<Instant> = Lazy::new(Instant::now);

pub fn elapsed_ms(at: Instant) -> u64 {
    at.saturating_duration_since(*START).as_millis() as u64
}

pub fn now_ms() -> u64 {
    elapsed_ms(Instant::now())
}
