//! Symbol table builder
//!
//! Turns [`RawSymbolData`] into a frozen [`CharacterMap`]:
//! 1. every printable symbol at every level becomes a direct candidate
//! 2. every dead key contributes composed candidates (dead key, then the
//!    cheapest direct keystroke for the base letter), plus the standalone
//!    accent via dead key + space and dead key twice
//! 3. candidates are ordered by cost: fewest key presses, then fewest
//!    modifiers, then keycode and level. No candidate is discarded, so the
//!    injector can fall back to the next one if a key is unavailable.
//!
//! Pure and deterministic: the same input always produces the same map.

use crate::keymap::keysym::Keysym;
use crate::keymap::{CharacterMap, KeystrokeSpec, LayoutIdentifier, ModifierSet};
use crate::layout::RawSymbolData;
use std::collections::HashMap;

/// Characters that may be typed: printable ones plus newline and tab
fn is_typeable(c: char) -> bool {
    !c.is_control() || c == '\n' || c == '\t'
}

fn insert(entries: &mut HashMap<char, Vec<KeystrokeSpec>>, c: char, spec: KeystrokeSpec) {
    let candidates = entries.entry(c).or_default();
    if !candidates.contains(&spec) {
        candidates.push(spec);
    }
}

/// Build the character map for one layout
pub fn build(id: LayoutIdentifier, raw: &RawSymbolData) -> CharacterMap {
    let mut entries: HashMap<char, Vec<KeystrokeSpec>> = HashMap::new();

    for key in &raw.keys {
        for modifiers in ModifierSet::ALL {
            if let Keysym::Char(c) = key.symbol(modifiers) {
                if is_typeable(c) {
                    insert(&mut entries, c, KeystrokeSpec::direct(key.key, modifiers));
                }
            }
        }
    }

    // Cheapest direct keystroke per base character, before composed entries
    // are mixed in
    let direct: HashMap<char, KeystrokeSpec> = entries
        .iter()
        .filter_map(|(c, specs)| specs.iter().min_by_key(|s| s.cost()).map(|s| (*c, *s)))
        .collect();

    let mut composed_count = 0usize;
    for (prefix, dead) in raw.dead_keys() {
        let bases = dead
            .compositions()
            .chain(dead.with_space().map(|accent| (' ', accent)));

        for (base, composed) in bases {
            if let Some(base_spec) = direct.get(&base) {
                insert(
                    &mut entries,
                    composed,
                    KeystrokeSpec::composed(base_spec.key, base_spec.modifiers, prefix),
                );
                composed_count += 1;
            }
        }

        if let Some(accent) = dead.doubled() {
            insert(
                &mut entries,
                accent,
                KeystrokeSpec::composed(prefix.key, prefix.modifiers, prefix),
            );
            composed_count += 1;
        }
    }

    for candidates in entries.values_mut() {
        candidates.sort_by_key(|s| s.cost());
    }

    tracing::debug!(
        "Built character map for '{}': {} characters ({} composed routes)",
        id,
        entries.len(),
        composed_count
    );
    CharacterMap::from_entries(id, entries)
}
