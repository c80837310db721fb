//! The per-execution step loop. Runs on the thread spawned by
//! `SequenceExecutor::execute_detached`, or inline for the blocking
//! `execute` variant.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::collaborators::{classify_step, StepSideEffect};
use crate::events::ExecutionEvent;
use crate::keys::QualifiedKey;
use crate::profile::{MacroBinding, MsRange, SequenceStep};
use crate::timing::TimingRange;

use super::ExecutorContext;

/// Outcome of a single sequence run. Validation failures are rejected
/// before a run even starts (see `SequenceExecutor::reserve`), so a run
/// that starts only ever completes or is cancelled — platform errors are
/// handled best-effort in-line rather than surfacing as a third outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SequenceOutcome {
    Completed,
    Cancelled,
}

fn tier_to_range(tier: crate::timing::BufferTier) -> TimingRange {
    match tier {
        crate::timing::BufferTier::Low => TimingRange::BufferLow,
        crate::timing::BufferTier::Medium => TimingRange::BufferMedium,
        crate::timing::BufferTier::High => TimingRange::BufferHigh,
    }
}

/// A key left down at the end of a step whose `hold_through_next` applies;
/// released shortly after the next step's own key goes down.
struct HeldKey {
    key: QualifiedKey,
    release_bounds: MsRange,
}

/// Press a key with a platform-failure fallback: retry once as a
/// best-effort atomic tap; if that also fails, log and move on rather
/// than aborting the whole sequence.
fn key_down_best_effort(ctx: &ExecutorContext, key: QualifiedKey) {
    if let Err(e) = ctx.output.key_down(key) {
        log::warn!("key_down rejected for {key}, falling back to a tap: {e}");
        if let Err(e2) = ctx.output.key_tap(key) {
            log::error!("key_tap fallback also failed for {key}: {e2}; skipping this press");
        }
    }
}

fn key_up_best_effort(ctx: &ExecutorContext, key: QualifiedKey) {
    if let Err(e) = ctx.output.key_up(key) {
        log::error!("key_up failed for {key}: {e}");
    }
}

pub(super) fn run_sequence(
    ctx: &Arc<ExecutorContext>,
    binding: &Arc<MacroBinding>,
    cancel: &Arc<AtomicBool>,
) -> SequenceOutcome {
    let emit = |event: ExecutionEvent| (ctx.listener)(event);
    emit(ExecutionEvent::started(&binding.name, crate::clock::now_ms()));

    let mut held_over: Option<HeldKey> = None;
    let last_index = binding.sequence.len().saturating_sub(1);

    for (index, step) in binding.sequence.iter().enumerate() {
        if cancel.load(Ordering::Acquire) {
            emit(ExecutionEvent::cancelled(&binding.name, index, crate::clock::now_ms()));
            return SequenceOutcome::Cancelled;
        }

        emit(ExecutionEvent::step_started(
            &binding.name,
            index,
            step.name.as_deref(),
            crate::clock::now_ms(),
        ));

        let side_effect = classify_step(step);
        dispatch_side_effect(ctx, &side_effect);
        let is_last_step = index == last_index;

        // The buffer delay separates consecutive key-presses (one per echo
        // hit), not steps: it is drawn *after* a press and skipped only
        // when that press was the very last key-press of the entire
        // sequence, never before the first one.
        let last_delay = if side_effect.skips_keystroke() {
            release_held_over(ctx, &mut held_over);
            maybe_buffer_delay(ctx, step, is_last_step)
        } else if step.is_scroll() {
            run_scroll_step(ctx, step, &mut held_over);
            maybe_buffer_delay(ctx, step, is_last_step)
        } else {
            match run_key_step(ctx, binding, step, &mut held_over, cancel, is_last_step) {
                None => {
                    emit(ExecutionEvent::cancelled(&binding.name, index, crate::clock::now_ms()));
                    return SequenceOutcome::Cancelled;
                }
                Some(delay) => delay,
            }
        };

        emit(ExecutionEvent::step_completed(
            &binding.name,
            index,
            step.name.as_deref(),
            last_delay,
            crate::clock::now_ms(),
        ));
    }

    release_held_over(ctx, &mut held_over);
    emit(ExecutionEvent::completed(&binding.name, crate::clock::now_ms()));
    SequenceOutcome::Completed
}

/// Draw and sleep this step's buffer delay unless it was the last step in
/// the sequence, in which case there is nothing left to space out.
fn maybe_buffer_delay(ctx: &ExecutorContext, step: &SequenceStep, is_last_step: bool) -> u32 {
    if is_last_step {
        return 0;
    }
    let delay = draw_buffer_delay(ctx, step);
    std::thread::sleep(Duration::from_millis(delay as u64));
    delay
}

fn draw_buffer_delay(ctx: &ExecutorContext, step: &SequenceStep) -> u32 {
    match (step.buffer_tier, step.buffer_bounds()) {
        (Some(tier), _) => ctx.oracle.draw(tier_to_range(tier)),
        (None, Some((min, max))) => ctx.oracle.draw_explicit(min, max),
        (None, None) => 0,
    }
}

fn dispatch_side_effect(ctx: &ExecutorContext, effect: &StepSideEffect) {
    match effect {
        StepSideEffect::Volume(level) => ctx.audio.set_volume(*level),
        StepSideEffect::MicToggle => {
            let now_muted = !ctx.mic_muted.fetch_xor(true, Ordering::AcqRel);
            ctx.audio.set_mic_mute(now_muted);
            ctx.audio.press_hotkey("mic_toggle");
        }
        StepSideEffect::Deafen => {
            let now_muted = !ctx.mic_muted.fetch_xor(true, Ordering::AcqRel);
            ctx.audio.set_mic_mute(now_muted);
            ctx.audio.press_hotkey("deafen");
        }
        StepSideEffect::Timer { id, seconds, message } => ctx.tts.timer_start(id, *seconds, message),
        StepSideEffect::None => {}
    }
}

/// Release a key held over from the previous step ("hold-through-next"),
/// a short moment after the current step's own primary key has gone down
/// — the two presses overlap briefly, the way a human typist's fingers
/// do. Best-effort: platform errors are logged, not propagated.
fn release_held_over(ctx: &ExecutorContext, held_over: &mut Option<HeldKey>) {
    if let Some(held) = held_over.take() {
        let delay = ctx.oracle.draw_explicit(held.release_bounds.min, held.release_bounds.max);
        std::thread::sleep(Duration::from_millis(delay as u64));
        key_up_best_effort(ctx, held.key);
    }
}

fn run_scroll_step(ctx: &ExecutorContext, step: &SequenceStep, held_over: &mut Option<HeldKey>) {
    release_held_over(ctx, held_over);
    let direction = step
        .scroll_direction
        .expect("is_scroll() guarantees scroll_direction is Some");
    if let Err(e) = ctx.output.scroll(direction, step.scroll_magnitude.unwrap_or(1)) {
        log::error!("scroll failed: {e}");
    }
}

/// Runs a key step's `echo_hits` repetitions, each one an independent
/// down/up (or dual-key) press. Returns `None` if cancellation was
/// observed between echo hits, else `Some(delay)` where `delay` is the
/// buffer delay drawn after the final hit (0 if this was the very last
/// key-press of the entire sequence, in which case none is drawn).
fn run_key_step(
    ctx: &ExecutorContext,
    binding: &MacroBinding,
    step: &SequenceStep,
    held_over: &mut Option<HeldKey>,
    cancel: &Arc<AtomicBool>,
    is_last_step: bool,
) -> Option<u32> {
    let primary = step.key.as_ref().expect("validated: non-scroll steps carry a key");
    let base = primary.raw();

    let is_conundrum = ctx.compiled.lock().is_conundrum(base);
    let _crossing = if !binding.supremacy && is_conundrum {
        Some(ctx.traffic.request_crossing())
    } else {
        None
    };

    let key_down_bounds = step.key_down_bounds();
    let hits = step.echo_hits.max(1);
    let mut last_delay = 0u32;

    for hit in 0..hits {
        if cancel.load(Ordering::Acquire) {
            return None;
        }

        let dual = (hit == 0).then_some(step.dual_key.as_ref()).flatten();

        key_down_best_effort(ctx, *primary);

        // A key held over from the previous step is released right after
        // this step's primary key lands, on the first hit only — the
        // overlap is what makes hold-through-next read as human finger
        // movement rather than a hard cut.
        if hit == 0 {
            release_held_over(ctx, held_over);
        }

        let total_hold_ms = ctx.oracle.draw_explicit(key_down_bounds.min, key_down_bounds.max);

        if let Some(dual) = dual {
            // Primary goes down first; after `dual_key_offset`, the dual
            // key joins; the primary releases
            // after its *remaining* hold (total hold minus the offset
            // already elapsed); the dual key then holds for its own
            // duration (or the remainder of the primary's hold by
            // default) before releasing.
            let offset = dual
                .dual_key_offset
                .unwrap_or_else(|| ctx.oracle.draw(TimingRange::DualOffset))
                .min(total_hold_ms.max(1));
            std::thread::sleep(Duration::from_millis(offset as u64));

            key_down_best_effort(ctx, dual.key);
            let remaining_primary = total_hold_ms.saturating_sub(offset);
            std::thread::sleep(Duration::from_millis(remaining_primary as u64));

            let is_last_hit = hit + 1 == hits;
            if is_last_hit && step.hold_through_next.is_some() {
                *held_over = Some(HeldKey {
                    key: *primary,
                    release_bounds: step
                        .hold_through_next
                        .as_ref()
                        .and_then(|h| h.release_delay)
                        .unwrap_or(crate::profile::DEFAULT_RELEASE_DELAY),
                });
            } else {
                key_up_best_effort(ctx, *primary);
            }

            let dual_hold_ms = dual
                .dual_key_down_duration
                .map(|bounds| ctx.oracle.draw_explicit(bounds.min, bounds.max))
                .unwrap_or(remaining_primary);
            std::thread::sleep(Duration::from_millis(dual_hold_ms as u64));
            key_up_best_effort(ctx, dual.key);
        } else {
            std::thread::sleep(Duration::from_millis(total_hold_ms as u64));

            let is_last_hit = hit + 1 == hits;
            if is_last_hit && step.hold_through_next.is_some() {
                *held_over = Some(HeldKey {
                    key: *primary,
                    release_bounds: step
                        .hold_through_next
                        .as_ref()
                        .and_then(|h| h.release_delay)
                        .unwrap_or(crate::profile::DEFAULT_RELEASE_DELAY),
                });
            } else {
                key_up_best_effort(ctx, *primary);
            }
        }

        let is_last_hit = hit + 1 == hits;
        last_delay = maybe_buffer_delay(ctx, step, is_last_step && is_last_hit);
    }

    Some(last_delay)
}
