//! Platform shim contract: the crate consumes these traits rather than
//! implementing OS input hooks or keystroke synthesis itself, keeping a
//! clean seam between the core logic and any platform-specific
//! input/output device — the core never calls into a concrete OS backend,
//! only through a trait object.

use crate::keys::{InputKey, QualifiedKey};
use crate::profile::ScrollDirection;

/// Delivers raw press/release events for the keys and buttons this crate
/// cares about. A real implementation lives outside this crate (an OS
/// keyboard/mouse hook); the `sim` feature provides a scripted stand-in
/// for tests and the demo binary.
pub trait InputSource: Send {
    /// Run until the source is exhausted or told to stop, forwarding each
    /// event to `on_event`. Errors from the underlying OS hook propagate;
    /// the host decides whether to retry or give up.
    fn run(&mut self, on_event: &mut dyn FnMut(InputKey, bool)) -> anyhow::Result<()>;
}

/// Synthesizes keystrokes and scroll events toward the OS. A real
/// implementation lives outside this crate; the `sim` feature provides a
/// recording stand-in.
///
/// `key_down`/`key_up` take the full [`QualifiedKey`], not just its base —
/// a conundrum key's OS-level behavior depends on which modifiers are
/// held at the moment it's pressed, so the sink must know the modifier
/// form being synthesized, not just the bare key.
pub trait OutputSink: Send + Sync {
    fn key_down(&self, key: QualifiedKey) -> anyhow::Result<()>;
    fn key_up(&self, key: QualifiedKey) -> anyhow::Result<()>;
    fn scroll(&self, direction: ScrollDirection, magnitude: u32) -> anyhow::Result<()>;

    /// Best-effort atomic tap fallback: used by the executor when a
    /// `key_down` "toggle" call is rejected by the OS sink. The default
    /// synthesizes it from `key_down`/`key_up`; a real platform sink may
    /// override this with a genuinely atomic primitive.
    fn key_tap(&self, key: QualifiedKey) -> anyhow::Result<()> {
        self.key_down(key)?;
        self.key_up(key)
    }
}
