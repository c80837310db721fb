//! Key enumerations and the qualified-key ("MOD+MOD+BASE") string format.

use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashSet as HashSet;
use serde::{Deserialize, Serialize};

/// A physical key or pointer button the operator uses to invoke gestures.
///
/// Closed enumeration; identity only, no attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InputKey {
    CapsLock,
    Tab,
    Grave,
    ScrollLock,
    Pause,
    Insert,
    F13,
    F14,
    F15,
    F16,
    F17,
    F18,
    F19,
    F20,
    F21,
    F22,
    F23,
    F24,
    Numpad8,
    MiddleClick,
    Mouse4,
    Mouse5,
    MouseBack,
    MouseForward,
}

impl InputKey {
    pub const ALL: &'static [InputKey] = &[
        InputKey::CapsLock,
        InputKey::Tab,
        InputKey::Grave,
        InputKey::ScrollLock,
        InputKey::Pause,
        InputKey::Insert,
        InputKey::F13,
        InputKey::F14,
        InputKey::F15,
        InputKey::F16,
        InputKey::F17,
        InputKey::F18,
        InputKey::F19,
        InputKey::F20,
        InputKey::F21,
        InputKey::F22,
        InputKey::F23,
        InputKey::F24,
        InputKey::Numpad8,
        InputKey::MiddleClick,
        InputKey::Mouse4,
        InputKey::Mouse5,
        InputKey::MouseBack,
        InputKey::MouseForward,
    ];

    pub fn is_mouse(self) -> bool {
        matches!(
            self,
            InputKey::MiddleClick
                | InputKey::Mouse4
                | InputKey::Mouse5
                | InputKey::MouseBack
                | InputKey::MouseForward
        )
    }

    /// Canonicalize a raw name from the platform hook contract, e.g.
    /// "NUMPAD 8" -> "NUMPAD8", "MOUSE MIDDLE" -> "MIDDLE_CLICK".
    pub fn from_raw_name(raw: &str) -> Option<Self> {
        let canon = raw.trim().to_ascii_uppercase().replace(' ', "");
        let canon = match canon.as_str() {
            "MOUSEMIDDLE" => "MIDDLE_CLICK".to_string(),
            "MOUSEBACK" => "MOUSE_BACK".to_string(),
            "MOUSEFORWARD" => "MOUSE_FORWARD".to_string(),
            other => other.to_string(),
        };
        Self::ALL.iter().copied().find(|k| k.as_str() == canon)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InputKey::CapsLock => "CAPSLOCK",
            InputKey::Tab => "TAB",
            InputKey::Grave => "GRAVE",
            InputKey::ScrollLock => "SCROLLLOCK",
            InputKey::Pause => "PAUSE",
            InputKey::Insert => "INSERT",
            InputKey::F13 => "F13",
            InputKey::F14 => "F14",
            InputKey::F15 => "F15",
            InputKey::F16 => "F16",
            InputKey::F17 => "F17",
            InputKey::F18 => "F18",
            InputKey::F19 => "F19",
            InputKey::F20 => "F20",
            InputKey::F21 => "F21",
            InputKey::F22 => "F22",
            InputKey::F23 => "F23",
            InputKey::F24 => "F24",
            InputKey::Numpad8 => "NUMPAD8",
            InputKey::MiddleClick => "MIDDLE_CLICK",
            InputKey::Mouse4 => "MOUSE4",
            InputKey::Mouse5 => "MOUSE5",
            InputKey::MouseBack => "MOUSE_BACK",
            InputKey::MouseForward => "MOUSE_FORWARD",
        }
    }
}

impl fmt::Display for InputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A key the engine may synthesize toward the OS. Closed
/// enumeration of 37 symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum OutputKey {
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
    Up, Down, Left, Right,
    Home, End, PageUp, PageDown,
    Space, Enter, Escape,
}

impl OutputKey {
    pub const ALL: &'static [OutputKey] = &[
        OutputKey::A, OutputKey::B, OutputKey::C, OutputKey::D, OutputKey::E,
        OutputKey::F, OutputKey::G, OutputKey::H, OutputKey::I, OutputKey::J,
        OutputKey::K, OutputKey::L, OutputKey::M, OutputKey::N, OutputKey::O,
        OutputKey::P, OutputKey::Q, OutputKey::R, OutputKey::S, OutputKey::T,
        OutputKey::U, OutputKey::V, OutputKey::W, OutputKey::X, OutputKey::Y,
        OutputKey::Z, OutputKey::Up, OutputKey::Down, OutputKey::Left,
        OutputKey::Right, OutputKey::Home, OutputKey::End, OutputKey::PageUp,
        OutputKey::PageDown, OutputKey::Space, OutputKey::Enter, OutputKey::Escape,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OutputKey::A => "A", OutputKey::B => "B", OutputKey::C => "C",
            OutputKey::D => "D", OutputKey::E => "E", OutputKey::F => "F",
            OutputKey::G => "G", OutputKey::H => "H", OutputKey::I => "I",
            OutputKey::J => "J", OutputKey::K => "K", OutputKey::L => "L",
            OutputKey::M => "M", OutputKey::N => "N", OutputKey::O => "O",
            OutputKey::P => "P", OutputKey::Q => "Q", OutputKey::R => "R",
            OutputKey::S => "S", OutputKey::T => "T", OutputKey::U => "U",
            OutputKey::V => "V", OutputKey::W => "W", OutputKey::X => "X",
            OutputKey::Y => "Y", OutputKey::Z => "Z",
            OutputKey::Up => "UP", OutputKey::Down => "DOWN",
            OutputKey::Left => "LEFT", OutputKey::Right => "RIGHT",
            OutputKey::Home => "HOME", OutputKey::End => "END",
            OutputKey::PageUp => "PAGEUP", OutputKey::PageDown => "PAGEDOWN",
            OutputKey::Space => "SPACE", OutputKey::Enter => "ENTER",
            OutputKey::Escape => "ESCAPE",
        }
    }
}

impl fmt::Display for OutputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let up = s.trim().to_ascii_uppercase();
        OutputKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == up)
            .ok_or_else(|| KeyParseError::UnknownOutputKey(s.to_string()))
    }
}

/// One of {Shift, Alt, Control}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Modifier {
    Shift,
    Alt,
    Control,
}

impl Modifier {
    fn as_str(self) -> &'static str {
        match self {
            Modifier::Shift => "SHIFT",
            Modifier::Alt => "ALT",
            Modifier::Control => "CONTROL",
        }
    }
}

impl FromStr for Modifier {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SHIFT" => Ok(Modifier::Shift),
            "ALT" => Ok(Modifier::Alt),
            "CONTROL" | "CTRL" => Ok(Modifier::Control),
            other => Err(KeyParseError::UnknownModifier(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum KeyParseError {
    #[error("empty qualified key string")]
    Empty,
    #[error("unknown output key: {0}")]
    UnknownOutputKey(String),
    #[error("unknown modifier: {0}")]
    UnknownModifier(String),
}

/// An output key together with its modifier set.
///
/// External representation: uppercase `"MOD+MOD+...+BASE"`. Canonical
/// equality ignores the order modifiers were written in. Serializes as
/// that same string, not as a `{base, mods}` object, so profile JSON can
/// write `"key": "ALT+SHIFT+R"` directly.
#[derive(Debug, Clone, Copy, Eq)]
pub struct QualifiedKey {
    pub base: OutputKey,
    mods: ModSet,
}

impl Serialize for QualifiedKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical_string())
    }
}

impl<'de> Deserialize<'de> for QualifiedKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        QualifiedKey::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Small fixed-size modifier bitset; order-independent equality/hash for
/// free, unlike a `Vec<Modifier>`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
struct ModSet {
    shift: bool,
    alt: bool,
    control: bool,
}

impl ModSet {
    fn insert(&mut self, m: Modifier) {
        match m {
            Modifier::Shift => self.shift = true,
            Modifier::Alt => self.alt = true,
            Modifier::Control => self.control = true,
        }
    }

    fn iter(self) -> impl Iterator<Item = Modifier> {
        [
            (self.shift, Modifier::Shift),
            (self.alt, Modifier::Alt),
            (self.control, Modifier::Control),
        ]
        .into_iter()
        .filter_map(|(present, m)| present.then_some(m))
    }
}

impl PartialEq for QualifiedKey {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base && self.mods == other.mods
    }
}

impl std::hash::Hash for QualifiedKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.base.hash(state);
        self.mods.hash(state);
    }
}

impl QualifiedKey {
    pub fn bare(base: OutputKey) -> Self {
        Self { base, mods: ModSet::default() }
    }

    pub fn with_modifiers(base: OutputKey, mods: impl IntoIterator<Item = Modifier>) -> Self {
        let mut set = ModSet::default();
        for m in mods {
            set.insert(m);
        }
        Self { base, mods: set }
    }

    pub fn modifiers(&self) -> impl Iterator<Item = Modifier> + '_ {
        self.mods.iter()
    }

    pub fn has_modifier(&self, m: Modifier) -> bool {
        match m {
            Modifier::Shift => self.mods.shift,
            Modifier::Alt => self.mods.alt,
            Modifier::Control => self.mods.control,
        }
    }

    /// The raw projection: discards modifiers.
    pub fn raw(&self) -> OutputKey {
        self.base
    }

    pub fn to_canonical_string(&self) -> String {
        let mut parts: Vec<&str> = self.mods.iter().map(Modifier::as_str).collect();
        parts.sort_unstable();
        parts.push(self.base.as_str());
        parts.join("+")
    }
}

impl fmt::Display for QualifiedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical_string())
    }
}

impl FromStr for QualifiedKey {
    type Err = KeyParseError;

    /// Parse a `"MOD+MOD+...+BASE"` string into a typed `(base, modifiers)`
    /// record. This is done once at profile-load time; runtime parsing is
    /// for diagnostics only.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(KeyParseError::Empty);
        }
        let mut pieces: Vec<&str> = trimmed.split('+').map(str::trim).collect();
        let base_str = pieces.pop().ok_or(KeyParseError::Empty)?;
        let base = OutputKey::from_str(base_str)?;
        let mut mods = ModSet::default();
        for piece in pieces {
            mods.insert(Modifier::from_str(piece)?);
        }
        Ok(Self { base, mods })
    }
}

/// Distinct "form" a base output key can appear in within a profile, used
/// by the profile compiler to classify conundrum vs safe keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyForm {
    Bare,
    ShiftOnly,
    AltOnly,
    AltShift,
    /// Any other modifier combination (e.g. Control, or Control+something).
    /// These fall outside the four tracked axes (bare/Shift-only/Alt-only/
    /// Alt+Shift) and are ignored by the compiler's classification: a key
    /// used only in `Other` forms is never recorded as any tracked form at
    /// all, so it is classified safe rather than conundrum.
    Other,
}

impl QualifiedKey {
    pub fn form(&self) -> KeyForm {
        let shift = self.mods.shift;
        let alt = self.mods.alt;
        let control = self.mods.control;
        match (shift, alt, control) {
            (false, false, false) => KeyForm::Bare,
            (true, false, false) => KeyForm::ShiftOnly,
            (false, true, false) => KeyForm::AltOnly,
            (true, true, false) => KeyForm::AltShift,
            _ => KeyForm::Other,
        }
    }
}

pub type KeySet = HashSet<OutputKey>;
