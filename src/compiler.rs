//! Profile compiler: scans every binding's sequence once at load time and
//! partitions the output keys it touches into "conundrum" keys (those
//! whose OS-level behavior depends on which modifier form is active, so
//! concurrent use across bindings must be serialized) and "safe" keys (no
//! such ambiguity).

use rustc_hash::FxHashSet as HashSet;

use crate::keys::{KeyForm, KeySet, OutputKey, QualifiedKey};
use crate::profile::MacroProfile;

/// A base key counts as "conundrum" once it has been observed in at least
/// two of the four modifier forms {bare, Shift-only, Alt-only, Alt+Shift}
/// across the whole profile. Alt+Shift is tracked as its own distinct form
/// rather than folded into Alt-only or Shift-only, so e.g. bare `R` plus
/// `ALT+SHIFT+R` alone is already enough to mark `R` as conundrum. See
/// DESIGN.md for the rationale.
const TRACKED_FORMS: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledProfile {
    pub conundrum_keys: KeySet,
    pub safe_keys: KeySet,
}

impl CompiledProfile {
    pub fn is_conundrum(&self, key: OutputKey) -> bool {
        self.conundrum_keys.contains(&key)
    }
}

/// Compile a profile's bindings into the conundrum/safe partition.
///
/// Every `OutputKey` the profile ever addresses (primary or dual) ends up
/// in exactly one of the two sets.
pub fn compile(profile: &MacroProfile) -> CompiledProfile {
    let mut forms_seen: std::collections::HashMap<OutputKey, HashSet<KeyForm>> =
        std::collections::HashMap::new();

    let mut record = |qk: &QualifiedKey| {
        let entry = forms_seen.entry(qk.raw()).or_default();
        match qk.form() {
            KeyForm::Other => {}
            form => {
                entry.insert(form);
            }
        }
    };

    for binding in &profile.bindings {
        for step in &binding.sequence {
            if let Some(key) = &step.key {
                record(key);
            }
            if let Some(dual) = &step.dual_key {
                record(&dual.key);
            }
        }
    }

    let mut compiled = CompiledProfile::default();
    for (base, forms) in forms_seen {
        if forms.len() >= 2 {
            compiled.conundrum_keys.insert(base);
        } else {
            compiled.safe_keys.insert(base);
        }
    }
    debug_assert!(TRACKED_FORMS >= 2);
    compiled
}
