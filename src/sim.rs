//! Simulation harness, gated by the `sim` feature: a scripted
//! [`InputSource`] and a recording [`OutputSink`]. Used by the demo binary
//! and by integration tests that need to drive the whole pipeline without
//! a real OS hook.

use std::time::Duration;

use parking_lot::Mutex;

use crate::keys::{InputKey, QualifiedKey};
use crate::platform::{InputSource, OutputSink};
use crate::profile::ScrollDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimInstruction {
    pub after_ms: u32,
    pub key: InputKey,
    pub down: bool,
}

/// A scripted stream of input events, line-oriented: `<delay_ms>
/// <down|up> <KEY>`. Blank lines and `#` comments are ignored.
#[derive(Debug, Clone, Default)]
pub struct SimScript {
    pub instructions: Vec<SimInstruction>,
}

impl SimScript {
    pub fn new(instructions: Vec<SimInstruction>) -> Self {
        Self { instructions }
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        let mut instructions = Vec::new();
        for (lineno, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let delay: u32 = parts
                .next()
                .ok_or_else(|| anyhow::anyhow!("line {}: missing delay", lineno + 1))?
                .parse()?;
            let action = parts
                .next()
                .ok_or_else(|| anyhow::anyhow!("line {}: missing action", lineno + 1))?;
            let down = match action {
                "down" => true,
                "up" => false,
                other => anyhow::bail!("line {}: unknown action {other:?}", lineno + 1),
            };
            let key_name = parts
                .next()
                .ok_or_else(|| anyhow::anyhow!("line {}: missing key", lineno + 1))?;
            let key = InputKey::from_raw_name(key_name)
                .ok_or_else(|| anyhow::anyhow!("line {}: unknown key {key_name:?}", lineno + 1))?;
            instructions.push(SimInstruction { after_ms: delay, key, down });
        }
        Ok(Self { instructions })
    }
}

/// Feeds a [`SimScript`] to whatever calls `run`, one instruction at a
/// time, sleeping `after_ms` between each.
pub struct SimulatedInput {
    script: SimScript,
}

impl SimulatedInput {
    pub fn new(script: SimScript) -> Self {
        Self { script }
    }
}

impl InputSource for SimulatedInput {
    fn run(&mut self, on_event: &mut dyn FnMut(InputKey, bool)) -> anyhow::Result<()> {
        for instr in &self.script.instructions {
            std::thread::sleep(Duration::from_millis(instr.after_ms as u64));
            on_event(instr.key, instr.down);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimOutputEvent {
    KeyDown(QualifiedKey),
    KeyUp(QualifiedKey),
    Scroll(ScrollDirection, u32),
}

/// Records every synthesized output in arrival order with an elapsed-ms
/// timestamp, instead of touching a real OS output device.
#[derive(Default)]
pub struct SimulatedOutput {
    events: Mutex<Vec<(u64, SimOutputEvent)>>,
}

impl SimulatedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(u64, SimOutputEvent)> {
        self.events.lock().clone()
    }
}

impl OutputSink for SimulatedOutput {
    fn key_down(&self, key: QualifiedKey) -> anyhow::Result<()> {
        self.events.lock().push((crate::clock::now_ms(), SimOutputEvent::KeyDown(key)));
        Ok(())
    }

    fn key_up(&self, key: QualifiedKey) -> anyhow::Result<()> {
        self.events.lock().push((crate::clock::now_ms(), SimOutputEvent::KeyUp(key)));
        Ok(())
    }

    fn scroll(&self, direction: ScrollDirection, magnitude: u32) -> anyhow::Result<()> {
        self.events
            .lock()
            .push((crate::clock::now_ms(), SimOutputEvent::Scroll(direction, magnitude)));
        Ok(())
    }
}
