//! Macro profile data model: the external JSON-like representation of
//! bindings and sequence steps. Parsing/validating profile *files* is an
//! external collaborator's job; this module only defines the shape and
//! the structural validation rules the sequence executor enforces at
//! execution time.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::gesture::{GestureTimingConfig, GestureType};
use crate::keys::{OutputKey, QualifiedKey};
use crate::timing::BufferTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsRange {
    pub min: u32,
    pub max: u32,
}

impl MsRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min > 0 && self.min <= self.max
    }
}

/// Default `key_down_duration` when a step omits it.
pub const DEFAULT_KEY_DOWN_DURATION: MsRange = MsRange::new(15, 27);
/// Default `hold_through_next` release delay when unspecified.
pub const DEFAULT_RELEASE_DELAY: MsRange = MsRange::new(7, 18);
/// Default `dual_key_offset` in milliseconds when unspecified.
pub const DEFAULT_DUAL_KEY_OFFSET_MS: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DualKeySpec {
    pub key: QualifiedKey,
    #[serde(default)]
    pub dual_key_offset: Option<u32>,
    #[serde(default)]
    pub dual_key_down_duration: Option<MsRange>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldThroughNext {
    #[serde(default)]
    pub release_delay: Option<MsRange>,
}

/// A unit of output within a sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceStep {
    /// Required unless this is a scroll step.
    #[serde(default)]
    pub key: Option<QualifiedKey>,

    #[serde(default)]
    pub buffer_tier: Option<BufferTier>,
    #[serde(default)]
    pub min_delay: Option<u32>,
    #[serde(default)]
    pub max_delay: Option<u32>,

    #[serde(default)]
    pub key_down_duration: Option<MsRange>,

    #[serde(default = "default_echo_hits")]
    pub echo_hits: u32,

    #[serde(default)]
    pub dual_key: Option<DualKeySpec>,

    #[serde(default)]
    pub hold_through_next: Option<HoldThroughNext>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub scroll_direction: Option<ScrollDirection>,
    #[serde(default)]
    pub scroll_magnitude: Option<u32>,
}

fn default_echo_hits() -> u32 {
    1
}

impl SequenceStep {
    pub fn is_scroll(&self) -> bool {
        self.scroll_direction.is_some()
    }

    /// Resolve the step's effective buffer delay bounds, preferring the
    /// explicit `(min_delay, max_delay)` pair over a named tier.
    pub fn buffer_bounds(&self) -> Option<(u32, u32)> {
        if let (Some(min), Some(max)) = (self.min_delay, self.max_delay) {
            return Some((min, max));
        }
        self.buffer_tier.map(crate::timing::plain_buffer_tier_bounds)
    }

    pub fn key_down_bounds(&self) -> MsRange {
        self.key_down_duration.unwrap_or(DEFAULT_KEY_DOWN_DURATION)
    }

    /// Validate this step in isolation.
    pub fn validate(&self, step_index: usize) -> Result<(), ValidationError> {
        if self.key.is_none() && !self.is_scroll() {
            return Err(ValidationError::StepHasNoAction { step_index });
        }

        let tier_ok = self.buffer_tier.is_some() && self.min_delay.is_none() && self.max_delay.is_none();
        let explicit_ok = match (self.min_delay, self.max_delay) {
            (Some(min), Some(max)) => min >= 25 && max.saturating_sub(min) >= 4,
            _ => false,
        };
        if !(tier_ok || explicit_ok) {
            return Err(ValidationError::InvalidBufferSpec { step_index });
        }

        if let Some(range) = self.key_down_duration {
            if !range.is_valid() {
                return Err(ValidationError::InvalidKeyDownDuration { step_index });
            }
        }

        if !(1..=6).contains(&self.echo_hits) {
            return Err(ValidationError::InvalidEchoHits { step_index, got: self.echo_hits });
        }

        if let Some(dual) = &self.dual_key {
            if let Some(primary) = &self.key {
                if dual.key.raw() == primary.raw() {
                    return Err(ValidationError::DualKeySameAsPrimary { step_index });
                }
            }
            if dual.dual_key_offset.is_some_and(|o| o < 1) {
                return Err(ValidationError::InvalidDualKeyOffset { step_index });
            }
        }

        Ok(())
    }
}

/// `(input_key, gesture_type)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureTrigger {
    pub key: crate::keys::InputKey,
    pub gesture: GestureType,
}

/// `(name, trigger, sequence, enabled)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroBinding {
    pub name: String,
    pub trigger: GestureTrigger,
    pub sequence: Vec<SequenceStep>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Opt-in bypass of the entire traffic-controller protocol.
    #[serde(default)]
    pub supremacy: bool,
}

fn default_enabled() -> bool {
    true
}

impl MacroBinding {
    /// Aggregate validation across the whole sequence: at most 4 distinct
    /// bases, at most 6 steps per base, each step individually valid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (i, step) in self.sequence.iter().enumerate() {
            step.validate(i)?;
        }

        let mut bases: Vec<OutputKey> = Vec::new();
        let mut counts: std::collections::HashMap<OutputKey, usize> = std::collections::HashMap::new();
        for step in &self.sequence {
            if let Some(key) = &step.key {
                let base = key.raw();
                if !bases.contains(&base) {
                    bases.push(base);
                }
                *counts.entry(base).or_insert(0) += 1;
            }
            if let Some(dual) = &step.dual_key {
                let base = dual.key.raw();
                if !bases.contains(&base) {
                    bases.push(base);
                }
                *counts.entry(base).or_insert(0) += 1;
            }
        }

        if bases.len() > 4 {
            return Err(ValidationError::TooManyDistinctBases { count: bases.len() });
        }
        for (base, count) in counts {
            if count > 6 {
                return Err(ValidationError::TooManyStepsForBase { base, count });
            }
        }
        Ok(())
    }
}

/// `(gesture_timing_configuration, [bindings])`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroProfile {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub gesture_timing_configuration: GestureTimingConfig,
    pub bindings: Vec<MacroBinding>,
}

impl MacroProfile {
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}
