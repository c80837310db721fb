//! Structured, user-facing error types. Everything else in the crate
//! (platform glue, the demo binary) uses `anyhow::Result`; these two enums
//! exist only where a caller needs to match on *why* something failed.

use thiserror::Error;

use crate::keys::OutputKey;

/// A sequence or one of its steps failed validation. Reported as an
/// `error` execution event; execution never starts and no OS side-effects
/// occur.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("step {step_index}: buffer spec must be a tier, or an explicit range with min_delay >= 25 and (max_delay - min_delay) >= 4")]
    InvalidBufferSpec { step_index: usize },

    #[error("step {step_index}: key_down_duration must satisfy 0 < min <= max")]
    InvalidKeyDownDuration { step_index: usize },

    #[error("step {step_index}: echo_hits must be in [1, 6], got {got}")]
    InvalidEchoHits { step_index: usize, got: u32 },

    #[error("step {step_index}: dual_key must differ from the primary key's base")]
    DualKeySameAsPrimary { step_index: usize },

    #[error("step {step_index}: dual_key_offset must be >= 1ms")]
    InvalidDualKeyOffset { step_index: usize },

    #[error("step {step_index}: a step needs either a key or a scroll direction")]
    StepHasNoAction { step_index: usize },

    #[error("sequence references {count} distinct base keys, exceeding the limit of 4")]
    TooManyDistinctBases { count: usize },

    #[error("base key {base} appears in {count} steps, exceeding the per-base limit of 6")]
    TooManyStepsForBase { base: OutputKey, count: usize },
}

/// Profile compilation failure: logged; the executor then runs without
/// traffic-controller assistance (all keys treated as safe).
///
/// [`crate::compiler::compile`] itself is infallible: by the time a
/// [`crate::profile::MacroProfile`] exists, every qualified key in it has
/// already been deserialized successfully. This type is the contract for
/// the external profile-parsing collaborator named in spec §1/§6, which
/// turns raw `"MOD+MOD+BASE"` text into that typed form and needs a
/// matchable error to report a bad one found during loading.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("binding {binding} step {step_index} has an unparseable qualified key: {message}")]
    UnparseableKey {
        binding: String,
        step_index: usize,
        message: String,
    },
}
