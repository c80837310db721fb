//! Gesture classification: turns a single input key's press pattern into
//! one of 12 gesture types.

mod machine;
mod orchestrator;

pub use machine::GestureMachine;
pub use orchestrator::{GestureListener, GestureOrchestrator};

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keys::InputKey;

/// Seven positive integer millisecond thresholds governing classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureTimingConfig {
    pub multi_press_window: u32,
    pub long_press_min: u32,
    pub long_press_max: u32,
    pub super_long_min: u32,
    pub super_long_max: u32,
    pub cancel_threshold: u32,
    pub debounce_delay: u32,
}

#[derive(Debug, Error)]
#[error(
    "invalid gesture timing configuration: require long_press_max < super_long_min <= \
     super_long_max < cancel_threshold (got {long_press_max} < {super_long_min} <= \
     {super_long_max} < {cancel_threshold})"
)]
pub struct InvalidTimingConfig {
    long_press_max: u32,
    super_long_min: u32,
    super_long_max: u32,
    cancel_threshold: u32,
}

impl GestureTimingConfig {
    pub fn validate(&self) -> Result<(), InvalidTimingConfig> {
        if self.long_press_max < self.super_long_min
            && self.super_long_min <= self.super_long_max
            && self.super_long_max < self.cancel_threshold
        {
            Ok(())
        } else {
            Err(InvalidTimingConfig {
                long_press_max: self.long_press_max,
                super_long_min: self.super_long_min,
                super_long_max: self.super_long_max,
                cancel_threshold: self.cancel_threshold,
            })
        }
    }

    pub(crate) fn initial_window(&self) -> Duration {
        Duration::from_millis(self.multi_press_window as u64)
    }

    /// `round(multi_press_window * 0.8)`.
    pub(crate) fn extension_window(&self) -> Duration {
        let ms = (self.multi_press_window as f64 * 0.8).round() as u64;
        Duration::from_millis(ms)
    }

    pub(crate) fn cancel_threshold(&self) -> Duration {
        Duration::from_millis(self.cancel_threshold as u64)
    }

    pub(crate) fn classify_hold(&self, hold: Duration) -> PressType {
        let hold_ms = hold.as_millis() as u32;
        if hold_ms >= self.long_press_min && hold_ms <= self.long_press_max {
            PressType::Long
        } else if hold_ms >= self.super_long_min && hold_ms <= self.super_long_max {
            PressType::SuperLong
        } else {
            PressType::Normal
        }
    }
}

impl Default for GestureTimingConfig {
    /// A tighter ~90ms window is equally valid for a snappier feel; this
    /// default matches the production profile value (see DESIGN.md).
    fn default() -> Self {
        Self {
            multi_press_window: 350,
            long_press_min: 80,
            long_press_max: 145,
            super_long_min: 146,
            super_long_max: 400,
            cancel_threshold: 900,
            debounce_delay: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PressType {
    Normal,
    Long,
    SuperLong,
}

/// One of the 12 gesture classifications: `single`/`double`/`triple`/
/// `quadruple` crossed with `normal`/`long`/`super_long` (base names omit
/// the `normal` suffix).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GestureType {
    Single,
    Double,
    Triple,
    Quadruple,
    SingleLong,
    DoubleLong,
    TripleLong,
    QuadrupleLong,
    SingleSuperLong,
    DoubleSuperLong,
    TripleSuperLong,
    QuadrupleSuperLong,
}

impl GestureType {
    pub(crate) fn from_count_and_type(count: usize, press_type: PressType) -> Self {
        use GestureType::*;
        use PressType::*;
        match (count.clamp(1, 4), press_type) {
            (1, Normal) => Single,
            (2, Normal) => Double,
            (3, Normal) => Triple,
            (4, Normal) => Quadruple,
            (1, Long) => SingleLong,
            (2, Long) => DoubleLong,
            (3, Long) => TripleLong,
            (4, Long) => QuadrupleLong,
            (1, SuperLong) => SingleSuperLong,
            (2, SuperLong) => DoubleSuperLong,
            (3, SuperLong) => TripleSuperLong,
            (_, SuperLong) => QuadrupleSuperLong,
        }
    }

    pub fn as_str(self) -> &'static str {
        use GestureType::*;
        match self {
            Single => "single",
            Double => "double",
            Triple => "triple",
            Quadruple => "quadruple",
            SingleLong => "single_long",
            DoubleLong => "double_long",
            TripleLong => "triple_long",
            QuadrupleLong => "quadruple_long",
            SingleSuperLong => "single_super_long",
            DoubleSuperLong => "double_super_long",
            TripleSuperLong => "triple_super_long",
            QuadrupleSuperLong => "quadruple_super_long",
        }
    }
}

impl std::fmt::Display for GestureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct PressRecord {
    pub press_type: PressType,
}

/// Emitted from the core to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureEvent {
    pub input_key: InputKey,
    pub gesture_type: GestureType,
    pub timestamp_ms: u64,
    pub hold_duration_ms: Option<u32>,
}
