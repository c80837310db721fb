//! Audio and TTS side-effect collaborators: a sequence step's opaque
//! `name` can route to volume control, mic/deafen toggling, or a
//! text-to-speech timer instead of (or alongside) a keystroke. The engine
//! never drives OS audio or a TTS engine itself — it only classifies the
//! step name and calls into whichever collaborator the host supplied.
//! `Noop*` are the defaults and `LoggingCollaborator` is a decorator for
//! demos and tests, a fire-and-forget side-effect dispatch shape.

use std::sync::Arc;

use crate::keys::OutputKey;
use crate::profile::SequenceStep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeLevel {
    Low,
    Medium,
    High,
}

pub trait AudioCollaborator: Send + Sync {
    fn set_volume(&self, level: VolumeLevel);
    fn set_mic_mute(&self, muted: bool);
    /// Generic hotkey-adjacent notification: invoked for step names the
    /// audio app also has its own hotkey bound
    /// to (Mic Toggle, Deafen), so a host collaborator can mirror state
    /// (e.g. an overlay icon) without this crate knowing mic/deafen state.
    fn press_hotkey(&self, name: &str);
}

pub trait TtsCollaborator: Send + Sync {
    fn timer_start(&self, id: &str, seconds: u32, message: &str);
}

pub struct NoopAudioCollaborator;

impl AudioCollaborator for NoopAudioCollaborator {
    fn set_volume(&self, _level: VolumeLevel) {}
    fn set_mic_mute(&self, _muted: bool) {}
    fn press_hotkey(&self, _name: &str) {}
}

pub struct NoopTtsCollaborator;

impl TtsCollaborator for NoopTtsCollaborator {
    fn timer_start(&self, _id: &str, _seconds: u32, _message: &str) {}
}

/// Wraps another collaborator, logging every call before delegating.
pub struct LoggingCollaborator<T> {
    inner: T,
}

impl<T> LoggingCollaborator<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

impl<T: AudioCollaborator> AudioCollaborator for LoggingCollaborator<T> {
    fn set_volume(&self, level: VolumeLevel) {
        log::debug!("audio collaborator: set_volume({level:?})");
        self.inner.set_volume(level);
    }
    fn set_mic_mute(&self, muted: bool) {
        log::debug!("audio collaborator: set_mic_mute({muted})");
        self.inner.set_mic_mute(muted);
    }
    fn press_hotkey(&self, name: &str) {
        log::debug!("audio collaborator: press_hotkey({name:?})");
        self.inner.press_hotkey(name);
    }
}

impl<T: TtsCollaborator> TtsCollaborator for LoggingCollaborator<T> {
    fn timer_start(&self, id: &str, seconds: u32, message: &str) {
        log::debug!("tts collaborator: timer_start({id:?}, {seconds}s, {message:?})");
        self.inner.timer_start(id, seconds, message);
    }
}

/// The side effect a step's `name` routes to, and whether it replaces the
/// keystroke entirely or merely accompanies it.
pub enum StepSideEffect {
    /// `"Volume: Low|Medium|High"` on an `END` step: skip the keystroke.
    Volume(VolumeLevel),
    /// `"Mic Toggle"` / `"Deafen"`: the hotkey is bound in the external
    /// app too, so the keystroke still fires.
    MicToggle,
    Deafen,
    /// `"Timer placeholder - ... 'MSG' after N seconds"` on an `END` step:
    /// skip the keystroke, start a named TTS timer instead.
    Timer { id: String, seconds: u32, message: String },
    None,
}

impl StepSideEffect {
    /// Whether dispatching this side effect should suppress the step's own
    /// keystroke: Volume and Timer skip; Mic Toggle and Deafen still press
    /// the bound hotkey.
    pub fn skips_keystroke(&self) -> bool {
        matches!(self, StepSideEffect::Volume(_) | StepSideEffect::Timer { .. })
    }
}

/// Classify a step by its `name` and whether its primary key is `END`
/// (only `END` steps participate in the Volume/Timer patterns).
pub fn classify_step(step: &SequenceStep) -> StepSideEffect {
    let Some(name) = step.name.as_deref() else {
        return StepSideEffect::None;
    };
    let is_end = step.key.as_ref().is_some_and(|k| k.raw() == OutputKey::End);

    if is_end {
        if let Some(level) = parse_volume(name) {
            return StepSideEffect::Volume(level);
        }
        if let Some((message, seconds)) = parse_timer(name) {
            let id = message.to_ascii_lowercase().replace(' ', "_");
            return StepSideEffect::Timer { id, seconds, message };
        }
    }

    match name.trim() {
        "Mic Toggle" => StepSideEffect::MicToggle,
        "Deafen" => StepSideEffect::Deafen,
        _ => StepSideEffect::None,
    }
}

fn parse_volume(name: &str) -> Option<VolumeLevel> {
    match name.trim() {
        "Volume: Low" => Some(VolumeLevel::Low),
        "Volume: Medium" => Some(VolumeLevel::Medium),
        "Volume: High" => Some(VolumeLevel::High),
        _ => None,
    }
}

/// Parse `"Timer placeholder - ... 'MSG' after N seconds"`, extracting the
/// single-quoted message and the integer second count immediately before
/// "second(s)".
fn parse_timer(name: &str) -> Option<(String, u32)> {
    if !name.contains("Timer placeholder") {
        return None;
    }
    let after_open_quote = name.split_once('\'')?.1;
    let (message, after_message) = after_open_quote.split_once('\'')?;

    let before_seconds = after_message.split("second").next()?;
    let digits: String = before_seconds
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return None;
    }
    let seconds: u32 = digits.chars().rev().collect::<String>().parse().ok()?;

    Some((message.to_string(), seconds))
}

pub fn default_audio() -> Arc<dyn AudioCollaborator> {
    Arc::new(NoopAudioCollaborator)
}

pub fn default_tts() -> Arc<dyn TtsCollaborator> {
    Arc::new(NoopTtsCollaborator)
}
