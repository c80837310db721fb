//! Concurrent sequence executor: fire-and-forget per binding, one
//! detached `std::thread` per execution, serialized only where a
//! conundrum key demands it via the [`crate::traffic::TrafficController`].

mod sequence;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap as HashMap;

use crate::collaborators::{self, AudioCollaborator, TtsCollaborator};
use crate::compiler::CompiledProfile;
use crate::events::ExecutionEvent;
use crate::platform::OutputSink;
use crate::profile::MacroBinding;
use crate::timing::TimingOracle;
use crate::traffic::TrafficController;
use sequence::SequenceOutcome;

pub type ExecutionListener = Box<dyn Fn(ExecutionEvent) + Send + Sync + 'static>;

pub(crate) struct ExecutorContext {
    pub(crate) compiled: Mutex<CompiledProfile>,
    pub(crate) traffic: Arc<TrafficController>,
    pub(crate) oracle: Arc<TimingOracle>,
    pub(crate) output: Arc<dyn OutputSink>,
    pub(crate) audio: Arc<dyn AudioCollaborator>,
    pub(crate) tts: Arc<dyn TtsCollaborator>,
    pub(crate) listener: ExecutionListener,
    /// Mirrors the external app's mic-mute state across "Mic Toggle" /
    /// "Deafen" steps, since both are toggles on a collaborator that has
    /// no query method of its own.
    pub(crate) mic_muted: AtomicBool,
    active: Mutex<HashMap<String, Arc<AtomicBool>>>,
}

/// Runs macro sequences against an [`OutputSink`], one detached thread per
/// triggered binding.
///
/// Concurrency contract: different bindings run concurrently without
/// limit; the same binding may not overlap itself — re-triggering a
/// binding that is still running is a no-op (logged) rather than
/// cancelling and restarting it.
pub struct SequenceExecutor {
    inner: Arc<ExecutorContext>,
    stopped: AtomicBool,
}

impl SequenceExecutor {
    pub fn new(output: Arc<dyn OutputSink>, listener: ExecutionListener) -> Self {
        Self::with_collaborators(
            output,
            collaborators::default_audio(),
            collaborators::default_tts(),
            listener,
        )
    }

    pub fn with_collaborators(
        output: Arc<dyn OutputSink>,
        audio: Arc<dyn AudioCollaborator>,
        tts: Arc<dyn TtsCollaborator>,
        listener: ExecutionListener,
    ) -> Self {
        Self {
            inner: Arc::new(ExecutorContext {
                compiled: Mutex::new(CompiledProfile::default()),
                traffic: TrafficController::new(),
                oracle: Arc::new(TimingOracle::default()),
                output,
                audio,
                tts,
                listener,
                mic_muted: AtomicBool::new(false),
                active: Mutex::new(HashMap::default()),
            }),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn set_compiled_profile(&self, compiled: CompiledProfile) {
        *self.inner.compiled.lock() = compiled;
    }

    pub fn oracle(&self) -> &Arc<TimingOracle> {
        &self.inner.oracle
    }

    /// Validate the binding and, unless it is disabled, already running, or
    /// the executor has been destroyed, reserve its active-run slot.
    /// Returns the fresh cancellation flag on success.
    fn reserve(&self, binding: &Arc<MacroBinding>) -> Option<Arc<AtomicBool>> {
        if self.stopped.load(Ordering::Acquire) {
            return None;
        }
        if !binding.enabled {
            return None;
        }
        if let Err(e) = binding.validate() {
            (self.inner.listener)(ExecutionEvent::error(
                &binding.name,
                e.to_string(),
                crate::clock::now_ms(),
            ));
            return None;
        }

        let mut active = self.inner.active.lock();
        if active.contains_key(&binding.name) {
            log::warn!("binding '{}' is already executing; ignoring re-trigger", binding.name);
            return None;
        }
        let cancel = Arc::new(AtomicBool::new(false));
        active.insert(binding.name.clone(), Arc::clone(&cancel));
        Some(cancel)
    }

    /// Validate and spawn a detached execution of `binding`. Returns
    /// immediately; the sequence runs on its own thread, fire and forget.
    /// A no-op, with a logged warning, if this binding name is already
    /// running.
    pub fn execute_detached(&self, binding: Arc<MacroBinding>) {
        let Some(cancel) = self.reserve(&binding) else { return };

        let ctx = Arc::clone(&self.inner);
        let name = binding.name.clone();
        std::thread::spawn(move || {
            sequence::run_sequence(&ctx, &binding, &cancel);
            ctx.active.lock().remove(&name);
        });
    }

    /// Awaitable variant: blocks the calling thread until the sequence
    /// finishes, returning
    /// `true` only if it ran to completion. A no-op returning `false` if
    /// the binding is disabled, invalid, already running, or the executor
    /// has been destroyed.
    pub fn execute(&self, binding: Arc<MacroBinding>) -> bool {
        let Some(cancel) = self.reserve(&binding) else { return false };
        let outcome = sequence::run_sequence(&self.inner, &binding, &cancel);
        self.inner.active.lock().remove(&binding.name);
        outcome == SequenceOutcome::Completed
    }

    /// Request cancellation of a binding's in-flight execution, if any.
    /// Takes effect at the next step boundary or echo hit.
    pub fn cancel(&self, binding_name: &str) {
        if let Some(flag) = self.inner.active.lock().get(binding_name) {
            flag.store(true, Ordering::Release);
        }
    }

    /// Cancel every currently-running execution.
    pub fn cancel_all(&self) {
        for flag in self.inner.active.lock().values() {
            flag.store(true, Ordering::Release);
        }
    }

    pub fn is_binding_executing(&self, binding_name: &str) -> bool {
        self.inner.active.lock().contains_key(binding_name)
    }

    pub fn active_count(&self) -> usize {
        self.inner.active.lock().len()
    }

    pub fn active_bindings(&self) -> Vec<String> {
        self.inner.active.lock().keys().cloned().collect()
    }

    /// Cancels every in-flight execution and marks the executor so that no
    /// further `execute`/`execute_detached` call starts new work. Does not
    /// block on in-flight threads finishing; it only flips their
    /// cooperative cancellation flag.
    pub fn destroy(&self) {
        self.stopped.store(true, Ordering::Release);
        self.cancel_all();
    }
}

#[cfg(test)]
#[path = "test/executor_tests.rs"]
mod executor_tests;
