//! Binding dispatcher: looks up which binding, if any, a
//! `(input_key, gesture_type)` pair triggers, and hands it to the
//! sequence executor. Sits between [`crate::gesture::GestureOrchestrator`]
//! and [`crate::executor::SequenceExecutor`].

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap as HashMap;

use crate::compiler::compile;
use crate::executor::SequenceExecutor;
use crate::gesture::{GestureEvent, GestureType};
use crate::keys::InputKey;
use crate::profile::{MacroBinding, MacroProfile};

pub struct BindingDispatcher {
    executor: Arc<SequenceExecutor>,
    // Multiple bindings may share a trigger (e.g. a disabled one left in
    // place while its replacement is tuned); insertion order is preserved
    // per trigger so lookup can honor "first enabled wins" (spec §4.7).
    bindings: Mutex<HashMap<(InputKey, GestureType), Vec<Arc<MacroBinding>>>>,
}

impl BindingDispatcher {
    pub fn new(executor: Arc<SequenceExecutor>) -> Self {
        Self {
            executor,
            bindings: Mutex::new(HashMap::default()),
        }
    }

    /// Compile the profile and replace the active binding table. Any
    /// in-flight executions from the previous profile keep running to
    /// completion; only future triggers see the new table.
    pub fn load_profile(&self, profile: &MacroProfile) {
        self.executor.set_compiled_profile(compile(profile));

        let mut table: HashMap<(InputKey, GestureType), Vec<Arc<MacroBinding>>> = HashMap::default();
        for binding in &profile.bindings {
            table
                .entry((binding.trigger.key, binding.trigger.gesture))
                .or_default()
                .push(Arc::new(binding.clone()));
        }
        *self.bindings.lock() = table;
    }

    /// Feed a gesture event in (typically as a [`crate::gesture::GestureListener`]
    /// registered with the orchestrator). Finds the first *enabled* binding
    /// whose trigger matches and fires it detached; no match (or every
    /// matching binding disabled) is a no-op.
    pub fn on_gesture(&self, event: GestureEvent) {
        let binding = self
            .bindings
            .lock()
            .get(&(event.input_key, event.gesture_type))
            .and_then(|candidates| candidates.iter().find(|b| b.enabled))
            .cloned();
        if let Some(binding) = binding {
            self.executor.execute_detached(binding);
        }
    }

    pub fn into_listener(self: Arc<Self>) -> crate::gesture::GestureListener {
        Box::new(move |ev| self.on_gesture(ev))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::GestureType;
    use crate::keys::{OutputKey, QualifiedKey};
    use crate::platform::OutputSink;
    use crate::profile::{GestureTrigger, SequenceStep};
    use parking_lot::Mutex as PMutex;

    struct NullSink;
    impl OutputSink for NullSink {
        fn key_down(&self, _key: QualifiedKey) -> anyhow::Result<()> {
            Ok(())
        }
        fn key_up(&self, _key: QualifiedKey) -> anyhow::Result<()> {
            Ok(())
        }
        fn scroll(&self, _d: crate::profile::ScrollDirection, _m: u32) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn test_profile() -> MacroProfile {
        MacroProfile {
            name: "p".into(),
            description: String::new(),
            gesture_timing_configuration: crate::gesture::GestureTimingConfig::default(),
            bindings: vec![MacroBinding {
                name: "greet".into(),
                trigger: GestureTrigger { key: InputKey::F13, gesture: GestureType::Single },
                sequence: vec![SequenceStep {
                    key: Some(QualifiedKey::bare(OutputKey::A)),
                    buffer_tier: None,
                    min_delay: Some(25),
                    max_delay: Some(29),
                    key_down_duration: Some(crate::profile::MsRange::new(1, 2)),
                    echo_hits: 1,
                    dual_key: None,
                    hold_through_next: None,
                    name: None,
                    scroll_direction: None,
                    scroll_magnitude: None,
                }],
                enabled: true,
                supremacy: false,
            }],
        }
    }

    #[test]
    fn unmatched_gesture_is_a_no_op() {
        let fired = Arc::new(PMutex::new(false));
        let fired_clone = fired.clone();
        let executor = Arc::new(SequenceExecutor::new(
            Arc::new(NullSink),
            Box::new(move |_| *fired_clone.lock() = true),
        ));
        let dispatcher = BindingDispatcher::new(executor);
        dispatcher.load_profile(&test_profile());

        dispatcher.on_gesture(GestureEvent {
            input_key: InputKey::F14,
            gesture_type: GestureType::Single,
            timestamp_ms: 0,
            hold_duration_ms: None,
        });
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert!(!*fired.lock());
    }

    #[test]
    fn matching_gesture_triggers_its_binding() {
        let fired = Arc::new(PMutex::new(false));
        let fired_clone = fired.clone();
        let executor = Arc::new(SequenceExecutor::new(
            Arc::new(NullSink),
            Box::new(move |_| *fired_clone.lock() = true),
        ));
        let dispatcher = BindingDispatcher::new(executor);
        dispatcher.load_profile(&test_profile());

        dispatcher.on_gesture(GestureEvent {
            input_key: InputKey::F13,
            gesture_type: GestureType::Single,
            timestamp_ms: 0,
            hold_duration_ms: None,
        });
        std::thread::sleep(std::time::Duration::from_millis(300));
        assert!(*fired.lock());
    }

    /// When two bindings share a trigger, the disabled one is skipped and
    /// the first enabled one fires, regardless of declaration order.
    #[test]
    fn first_enabled_binding_wins_on_a_shared_trigger() {
        let mut profile = test_profile();
        let mut disabled_first = profile.bindings[0].clone();
        disabled_first.name = "disabled-first".into();
        disabled_first.enabled = false;
        let mut enabled_second = profile.bindings[0].clone();
        enabled_second.name = "enabled-second".into();
        profile.bindings = vec![disabled_first, enabled_second];

        let started: Arc<PMutex<Vec<String>>> = Arc::new(PMutex::new(Vec::new()));
        let started_clone = started.clone();
        let executor = Arc::new(SequenceExecutor::new(
            Arc::new(NullSink),
            Box::new(move |ev| {
                if ev.kind == crate::events::ExecutionEventKind::Started {
                    started_clone.lock().push(ev.binding_name.clone());
                }
            }),
        ));
        let dispatcher = BindingDispatcher::new(executor);
        dispatcher.load_profile(&profile);

        dispatcher.on_gesture(GestureEvent {
            input_key: InputKey::F13,
            gesture_type: GestureType::Single,
            timestamp_ms: 0,
            hold_duration_ms: None,
        });
        std::thread::sleep(std::time::Duration::from_millis(300));
        assert_eq!(*started.lock(), vec!["enabled-second".to_string()]);
    }
}
