use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::super::SequenceExecutor;
use crate::collaborators::{self, AudioCollaborator, VolumeLevel};
use crate::events::{ExecutionEvent, ExecutionEventKind};
use crate::gesture::GestureType;
use crate::keys::{InputKey, OutputKey, QualifiedKey};
use crate::platform::OutputSink;
use crate::profile::{DualKeySpec, GestureTrigger, HoldThroughNext, MacroBinding, MsRange, SequenceStep};

#[derive(Default)]
struct RecordingSink {
    calls: Mutex<Vec<String>>,
}

impl OutputSink for RecordingSink {
    fn key_down(&self, key: QualifiedKey) -> anyhow::Result<()> {
        self.calls.lock().push(format!("down:{key}"));
        Ok(())
    }
    fn key_up(&self, key: QualifiedKey) -> anyhow::Result<()> {
        self.calls.lock().push(format!("up:{key}"));
        Ok(())
    }
    fn scroll(&self, direction: crate::profile::ScrollDirection, magnitude: u32) -> anyhow::Result<()> {
        self.calls.lock().push(format!("scroll:{direction:?}:{magnitude}"));
        Ok(())
    }
}

fn fast_step(key: OutputKey) -> SequenceStep {
    SequenceStep {
        key: Some(QualifiedKey::bare(key)),
        buffer_tier: None,
        min_delay: Some(25),
        max_delay: Some(29),
        key_down_duration: Some(MsRange::new(2, 3)),
        echo_hits: 1,
        dual_key: None,
        hold_through_next: None,
        name: None,
        scroll_direction: None,
        scroll_magnitude: None,
    }
}

fn binding(name: &str, sequence: Vec<SequenceStep>) -> Arc<MacroBinding> {
    Arc::new(MacroBinding {
        name: name.into(),
        trigger: GestureTrigger { key: InputKey::F13, gesture: GestureType::Single },
        sequence,
        enabled: true,
        supremacy: false,
    })
}

fn executor_with_listener() -> (SequenceExecutor, Arc<RecordingSink>, Receiver<ExecutionEvent>) {
    let sink = Arc::new(RecordingSink::default());
    let (tx, rx) = channel();
    let executor = SequenceExecutor::new(
        sink.clone(),
        Box::new(move |ev| {
            let _ = tx.send(ev);
        }),
    );
    (executor, sink, rx)
}

fn drain_until_completed(rx: &Receiver<ExecutionEvent>) -> Vec<ExecutionEvent> {
    let mut events = Vec::new();
    loop {
        match rx.recv_timeout(Duration::from_secs(2)) {
            Ok(ev) => {
                let done = matches!(ev.kind, ExecutionEventKind::Completed | ExecutionEventKind::Cancelled | ExecutionEventKind::Error);
                events.push(ev);
                if done {
                    break;
                }
            }
            Err(_) => break,
        }
    }
    events
}

#[test]
fn executes_steps_in_order_and_completes() {
    let (executor, sink, rx) = executor_with_listener();
    let b = binding("simple", vec![fast_step(OutputKey::A), fast_step(OutputKey::B)]);
    executor.execute_detached(b);

    let events = drain_until_completed(&rx);
    assert_eq!(events.first().unwrap().kind, ExecutionEventKind::Started);
    assert_eq!(events.last().unwrap().kind, ExecutionEventKind::Completed);

    let calls = sink.calls.lock().clone();
    assert_eq!(calls, vec!["down:A", "up:A", "down:B", "up:B"]);
}

#[test]
fn invalid_binding_emits_error_without_touching_output() {
    let (executor, sink, rx) = executor_with_listener();
    let mut bad_step = fast_step(OutputKey::A);
    bad_step.echo_hits = 0;
    let b = binding("bad", vec![bad_step]);
    executor.execute_detached(b);

    let ev = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(ev.kind, ExecutionEventKind::Error);
    assert!(sink.calls.lock().is_empty());
}

#[test]
fn disabled_binding_does_not_run() {
    let (executor, sink, rx) = executor_with_listener();
    let mut b = (*binding("disabled", vec![fast_step(OutputKey::A)])).clone();
    b.enabled = false;
    executor.execute_detached(Arc::new(b));

    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    assert!(sink.calls.lock().is_empty());
}

#[test]
fn hold_through_next_overlaps_release_with_next_keys_press() {
    let (executor, sink, rx) = executor_with_listener();
    let mut first = fast_step(OutputKey::A);
    first.hold_through_next = Some(HoldThroughNext { release_delay: Some(MsRange::new(1, 2)) });
    let second = fast_step(OutputKey::B);
    let b = binding("overlap", vec![first, second]);
    executor.execute_detached(b);

    drain_until_completed(&rx);
    let calls = sink.calls.lock().clone();
    // A goes down, then B goes down before A is released (the overlap),
    // and A's release happens before B's.
    assert_eq!(calls, vec!["down:A", "down:B", "up:A", "up:B"]);
}

/// Re-triggering a binding while it is already running is a no-op — the
/// in-flight run is left alone, and exactly one `completed` event is
/// produced, not two and not a cancellation.
#[test]
fn retriggering_a_running_binding_is_a_no_op() {
    let (executor, _sink, rx) = executor_with_listener();
    let mut slow_step = fast_step(OutputKey::A);
    slow_step.min_delay = Some(200);
    slow_step.max_delay = Some(204);
    let long_binding = binding("retrigger", vec![slow_step, fast_step(OutputKey::B)]);

    executor.execute_detached(long_binding.clone());
    std::thread::sleep(Duration::from_millis(20));
    assert!(executor.is_binding_executing("retrigger"));
    executor.execute_detached(long_binding); // should be ignored; no second thread

    let events = drain_until_completed(&rx);
    let completions = events.iter().filter(|e| e.kind == ExecutionEventKind::Completed).count();
    let starts = events.iter().filter(|e| e.kind == ExecutionEventKind::Started).count();
    assert_eq!(starts, 1, "the second trigger must not start a new run");
    assert_eq!(completions, 1, "exactly one run should complete");
    assert!(!executor.is_binding_executing("retrigger"));
}

/// The primary key goes down first; the dual key joins after
/// `dual_key_offset`; the primary releases after its remaining hold; the
/// dual key releases last, after its own hold duration.
#[test]
fn dual_key_presses_primary_first_then_dual_with_offset() {
    let (executor, sink, rx) = executor_with_listener();
    let mut step = fast_step(OutputKey::A);
    step.key_down_duration = Some(MsRange::new(20, 20));
    step.dual_key = Some(DualKeySpec {
        key: QualifiedKey::bare(OutputKey::B),
        dual_key_offset: Some(5),
        dual_key_down_duration: Some(MsRange::new(5, 5)),
    });
    let b = binding("dual", vec![step]);
    executor.execute_detached(b);

    drain_until_completed(&rx);
    let calls = sink.calls.lock().clone();
    assert_eq!(calls, vec!["down:A", "down:B", "up:A", "up:B"]);
}

#[test]
fn execute_blocks_until_completion_and_reports_success() {
    let (executor, sink, _rx) = executor_with_listener();
    let b = binding("blocking", vec![fast_step(OutputKey::A)]);
    let ok = executor.execute(b);
    assert!(ok);
    assert_eq!(sink.calls.lock().clone(), vec!["down:A", "up:A"]);
}

#[test]
fn cancel_stops_a_running_sequence_at_the_next_step() {
    let (executor, sink, rx) = executor_with_listener();
    let mut slow_step = fast_step(OutputKey::A);
    slow_step.min_delay = Some(300);
    slow_step.max_delay = Some(304);
    let b = binding("cancel-me", vec![slow_step, fast_step(OutputKey::B)]);
    executor.execute_detached(b);

    std::thread::sleep(Duration::from_millis(10));
    executor.cancel("cancel-me");

    let events = drain_until_completed(&rx);
    assert_eq!(events.last().unwrap().kind, ExecutionEventKind::Cancelled);
    // B's step never ran.
    assert!(!sink.calls.lock().iter().any(|c| c.contains('B')));
}

#[test]
fn active_bindings_and_count_reflect_in_flight_runs() {
    let (executor, _sink, rx) = executor_with_listener();
    let mut slow_step = fast_step(OutputKey::A);
    // This is the sequence's only (and therefore last) step, so no trailing
    // buffer delay follows it — hold the key down instead to keep the run
    // observably in-flight for the assertion below.
    slow_step.key_down_duration = Some(MsRange::new(150, 154));
    let b = binding("tracked", vec![slow_step]);
    executor.execute_detached(b);

    std::thread::sleep(Duration::from_millis(10));
    assert_eq!(executor.active_count(), 1);
    assert_eq!(executor.active_bindings(), vec!["tracked".to_string()]);

    drain_until_completed(&rx);
    assert_eq!(executor.active_count(), 0);
}

#[test]
fn destroy_prevents_further_executions_and_cancels_in_flight() {
    let (executor, _sink, rx) = executor_with_listener();
    let mut slow_step = fast_step(OutputKey::A);
    slow_step.min_delay = Some(300);
    slow_step.max_delay = Some(304);
    let running = binding("long-runner", vec![slow_step, fast_step(OutputKey::B)]);
    executor.execute_detached(running);

    std::thread::sleep(Duration::from_millis(10));
    executor.destroy();

    let events = drain_until_completed(&rx);
    assert_eq!(events.last().unwrap().kind, ExecutionEventKind::Cancelled);

    let fresh = binding("after-destroy", vec![fast_step(OutputKey::A)]);
    executor.execute_detached(fresh);
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
}

/// A single-step sequence with `echo_hits > 1` repeats the same key-press
/// that many times, with each repetition separated by a delay drawn from
/// the step's own buffer tier (not a fixed echo-specific range), and no
/// trailing delay after the final hit since it is the last key-press of
/// the whole sequence.
#[test]
fn echo_hits_repeat_the_press_separated_by_buffer_tier_delays() {
    let (executor, sink, rx) = executor_with_listener();
    let mut step = fast_step(OutputKey::A);
    step.min_delay = None;
    step.max_delay = None;
    step.buffer_tier = Some(crate::timing::BufferTier::Low);
    step.echo_hits = 3;
    let b = binding("echoing", vec![step]);

    let start = std::time::Instant::now();
    executor.execute_detached(b);
    let events = drain_until_completed(&rx);
    let elapsed = start.elapsed();

    assert_eq!(events.last().unwrap().kind, ExecutionEventKind::Completed);
    let calls = sink.calls.lock().clone();
    assert_eq!(calls, vec!["down:A", "up:A", "down:A", "up:A", "down:A", "up:A"]);

    // Two inter-hit gaps, each in [11, 17] (the low buffer tier), plus the
    // three presses' own near-instant key-down holds; comfortably under a
    // tight upper bound and comfortably over the two gaps' floor.
    assert!(elapsed.as_millis() >= 2 * 11, "elapsed {elapsed:?} too short for two buffer gaps");
    assert!(elapsed.as_millis() <= 300, "elapsed {elapsed:?} suspiciously long");
}

#[derive(Default)]
struct RecordingAudioCollaborator {
    calls: Mutex<Vec<String>>,
}

impl AudioCollaborator for RecordingAudioCollaborator {
    fn set_volume(&self, level: VolumeLevel) {
        self.calls.lock().push(format!("set_volume:{level:?}"));
    }
    fn set_mic_mute(&self, muted: bool) {
        self.calls.lock().push(format!("set_mic_mute:{muted}"));
    }
    fn press_hotkey(&self, name: &str) {
        self.calls.lock().push(format!("press_hotkey:{name}"));
    }
}

fn end_step(name: &str) -> SequenceStep {
    SequenceStep {
        key: Some(QualifiedKey::bare(OutputKey::End)),
        buffer_tier: None,
        min_delay: Some(1),
        max_delay: Some(2),
        key_down_duration: Some(MsRange::new(1, 2)),
        echo_hits: 1,
        dual_key: None,
        hold_through_next: None,
        name: Some(name.to_string()),
        scroll_direction: None,
        scroll_magnitude: None,
    }
}

/// Mic Toggle and Deafen steps both invoke `set_mic_mute` with the flipped
/// mute state, not just `press_hotkey` — and still press their bound key.
#[test]
fn mic_toggle_and_deafen_call_set_mic_mute_and_still_press_the_key() {
    let sink = Arc::new(RecordingSink::default());
    let audio = Arc::new(RecordingAudioCollaborator::default());
    let (tx, rx) = channel();
    let executor = SequenceExecutor::with_collaborators(
        sink.clone(),
        audio.clone(),
        collaborators::default_tts(),
        Box::new(move |ev| {
            let _ = tx.send(ev);
        }),
    );

    let b = binding("mic", vec![end_step("Mic Toggle"), end_step("Deafen")]);
    executor.execute_detached(b);
    drain_until_completed(&rx);

    assert_eq!(
        audio.calls.lock().clone(),
        vec![
            "set_mic_mute:true".to_string(),
            "press_hotkey:mic_toggle".to_string(),
            "set_mic_mute:false".to_string(),
            "press_hotkey:deafen".to_string(),
        ]
    );
    // Both steps are bound to END, and neither Mic Toggle nor Deafen skips
    // the keystroke.
    assert_eq!(sink.calls.lock().clone(), vec!["down:END", "up:END", "down:END", "up:END"]);
}
