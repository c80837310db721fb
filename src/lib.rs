//! Gesture-driven macro engine: classifies input-key press patterns into
//! gestures and drives deterministic, human-timed synthetic keystroke
//! sequences in response.
//!
//! Pipeline (see each module's docs for its slice): a platform
//! [`platform::InputSource`] feeds raw key events into a
//! [`gesture::GestureOrchestrator`], which classifies them into
//! [`gesture::GestureEvent`]s; a [`dispatch::BindingDispatcher`] looks up
//! the matching [`profile::MacroBinding`] and hands it to a
//! [`executor::SequenceExecutor`], which plays the bound sequence back
//! through a [`platform::OutputSink`], consulting the [`timing::TimingOracle`]
//! for every delay and the [`traffic::TrafficController`] whenever a
//! "conundrum" key (per [`compiler`]) is involved.

pub mod clock;
pub mod collaborators;
pub mod compiler;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod executor;
pub mod gesture;
pub mod keys;
pub mod platform;
pub mod profile;
#[cfg(feature = "sim")]
pub mod sim;
pub mod timing;
pub mod traffic;


pub use compiler::{compile, CompiledProfile};
pub use dispatch::BindingDispatcher;
pub use error::{CompileError, ValidationError};
pub use events::{ExecutionEvent, ExecutionEventKind, StepPhase};
pub use executor::{ExecutionListener, SequenceExecutor};
pub use gesture::{GestureEvent, GestureListener, GestureOrchestrator, GestureTimingConfig, GestureType};
pub use keys::{InputKey, KeyForm, Modifier, OutputKey, QualifiedKey};
pub use platform::{InputSource, OutputSink};
pub use profile::{MacroBinding, MacroProfile, SequenceStep};
pub use traffic::TrafficController;

use std::sync::Arc;

/// Wires an orchestrator, dispatcher, and executor into one running
/// engine for a single profile. A thin convenience over constructing each
/// piece by hand; nothing here a caller couldn't do directly.
pub struct Engine {
    pub orchestrator: Arc<GestureOrchestrator>,
    pub dispatcher: Arc<BindingDispatcher>,
    pub executor: Arc<SequenceExecutor>,
}

impl Engine {
    /// `on_execution_event` receives every [`ExecutionEvent`] the executor
    /// emits as bound sequences play back.
    pub fn new(
        profile: &MacroProfile,
        output: Arc<dyn OutputSink>,
        on_execution_event: ExecutionListener,
    ) -> anyhow::Result<Self> {
        profile.gesture_timing_configuration.validate()?;
        for binding in &profile.bindings {
            binding.validate()?;
        }

        let executor = Arc::new(SequenceExecutor::new(output, on_execution_event));
        let dispatcher = Arc::new(BindingDispatcher::new(Arc::clone(&executor)));
        dispatcher.load_profile(profile);

        let listener = Arc::clone(&dispatcher).into_listener();
        let orchestrator = Arc::new(GestureOrchestrator::new(
            profile.gesture_timing_configuration,
            listener,
        ));

        Ok(Self { orchestrator, dispatcher, executor })
    }
}
