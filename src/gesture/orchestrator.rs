//! Owns all per-key gesture state machines, drains the bounded ingest
//! queue in FIFO order, and runs the periodic finalization pass: one
//! `std::thread::spawn` worker draining a channel while holding a
//! `parking_lot::Mutex`-guarded shared map.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rustc_hash::FxHashMap as HashMap;

use super::{GestureEvent, GestureMachine, GestureTimingConfig, GestureType};
use crate::keys::InputKey;

const INGEST_QUEUE_CAPACITY: usize = 100;
const FINALIZE_PERIOD: Duration = Duration::from_millis(20);

pub type GestureListener = Box<dyn Fn(GestureEvent) + Send + Sync + 'static>;

struct RawEvent {
    key: InputKey,
    down: bool,
    at: Instant,
}

struct Inner {
    machines: Mutex<HashMap<InputKey, GestureMachine>>,
    central: GestureListener,
    listeners: Mutex<Vec<(u64, GestureListener)>>,
    next_listener_id: AtomicU64,
    stopped: AtomicBool,
}

impl Inner {
    fn process(&self, ev: RawEvent) {
        if self.stopped.load(Ordering::Acquire) {
            return;
        }
        let gesture = {
            let mut machines = self.machines.lock();
            let machine = match machines.get_mut(&ev.key) {
                Some(m) => m,
                // Unknown input key in the event stream: silently ignored.
                None => return,
            };
            if ev.down {
                machine.handle_key_down(ev.at);
                None
            } else {
                machine.handle_key_up(ev.at)
            }
        };
        if let Some(gesture_type) = gesture {
            self.emit(ev.key, gesture_type, ev.at);
        }
    }

    fn run_finalization_pass(&self) {
        if self.stopped.load(Ordering::Acquire) {
            return;
        }
        let now = Instant::now();
        let resolved: Vec<(InputKey, GestureType)> = {
            let mut machines = self.machines.lock();
            machines
                .iter_mut()
                .filter_map(|(key, machine)| machine.finalize(now).map(|g| (*key, g)))
                .collect()
        };
        for (key, gesture_type) in resolved {
            self.emit(key, gesture_type, now);
        }
    }

    fn emit(&self, input_key: InputKey, gesture_type: GestureType, at: Instant) {
        let event = GestureEvent {
            input_key,
            gesture_type,
            timestamp_ms: crate::clock::elapsed_ms(at),
            hold_duration_ms: None,
        };
        invoke_listener_safely(&self.central, event);
        let listeners = self.listeners.lock();
        for (_, listener) in listeners.iter() {
            invoke_listener_safely(listener, event);
        }
    }
}

fn invoke_listener_safely(listener: &GestureListener, event: GestureEvent) {
    if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
        log::error!(
            "gesture listener panicked while handling {:?} on {:?}; ignoring",
            event.gesture_type,
            event.input_key
        );
    }
}

/// Owns one gesture state machine per input key and drives the pipeline's
/// first two stages: ingest queue -> gesture core.
pub struct GestureOrchestrator {
    inner: Arc<Inner>,
    sender: Mutex<Option<SyncSender<RawEvent>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl GestureOrchestrator {
    pub fn new(config: GestureTimingConfig, central_listener: GestureListener) -> Self {
        let mut machines = HashMap::default();
        for key in InputKey::ALL {
            machines.insert(*key, GestureMachine::new(config));
        }
        let inner = Arc::new(Inner {
            machines: Mutex::new(machines),
            central: central_listener,
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
            stopped: AtomicBool::new(false),
        });

        let (tx, rx) = sync_channel::<RawEvent>(INGEST_QUEUE_CAPACITY);

        let worker_inner = inner.clone();
        let worker = std::thread::spawn(move || {
            while let Ok(ev) = rx.recv() {
                worker_inner.process(ev);
            }
        });

        let timer_inner = inner.clone();
        let timer = std::thread::spawn(move || loop {
            if timer_inner.stopped.load(Ordering::Acquire) {
                break;
            }
            std::thread::sleep(FINALIZE_PERIOD);
            timer_inner.run_finalization_pass();
        });

        Self {
            inner,
            sender: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            timer: Mutex::new(Some(timer)),
        }
    }

    fn ingest(&self, key: InputKey, down: bool) {
        if self.inner.stopped.load(Ordering::Acquire) {
            return;
        }
        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            return;
        };
        let ev = RawEvent { key, down, at: Instant::now() };
        if let Err(TrySendError::Full(_)) = sender.try_send(ev) {
            log::error!("gesture ingest queue overflowed; dropping newest event for {key:?}");
        }
    }

    pub fn handle_key_down(&self, key: InputKey) {
        self.ingest(key, true);
    }

    pub fn handle_key_up(&self, key: InputKey) {
        self.ingest(key, false);
    }

    pub fn handle_mouse_down(&self, button: InputKey) {
        debug_assert!(button.is_mouse(), "handle_mouse_down given a non-mouse key");
        self.ingest(button, true);
    }

    pub fn handle_mouse_up(&self, button: InputKey) {
        debug_assert!(button.is_mouse(), "handle_mouse_up given a non-mouse key");
        self.ingest(button, false);
    }

    /// Additional subscriber; returns an id usable with `off_gesture`.
    pub fn on_gesture(&self, listener: GestureListener) -> u64 {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.lock().push((id, listener));
        id
    }

    pub fn off_gesture(&self, id: u64) {
        self.inner.listeners.lock().retain(|(lid, _)| *lid != id);
    }

    /// Idempotent: stops ingest, turns the periodic timer into a no-op,
    /// resets every machine, and clears subscribers. No emission may occur
    /// after this returns.
    pub fn destroy(&self) {
        if self.inner.stopped.swap(true, Ordering::AcqRel) {
            return; // already destroyed
        }
        if let Some(sender) = self.sender.lock().take() {
            drop(sender);
        }
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.timer.lock().take() {
            let _ = handle.join();
        }
        for machine in self.inner.machines.lock().values_mut() {
            machine.clear();
        }
        self.inner.listeners.lock().clear();
    }
}

impl Drop for GestureOrchestrator {
    fn drop(&mut self) {
        self.destroy();
    }
}
