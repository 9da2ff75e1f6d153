//! Keyboard data model
//!
//! Types shared by the layout source, the symbol table builder, the
//! translator and the injector:
//! - [`LayoutIdentifier`]: which layout configuration is active
//! - [`PhysicalKey`]: a key position as a Linux evdev key code
//! - [`ModifierSet`]: one of the four XKB shift levels
//! - [`KeystrokeSpec`]: how to produce one character
//! - [`CharacterMap`]: character → candidate keystrokes for one layout

pub mod compose;
pub mod keysym;

use std::collections::HashMap;
use std::fmt;

/// Names a layout configuration. Used as the character map cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayoutIdentifier {
    /// XKB layout name, e.g. "us", "fr", "de"
    pub layout: String,
    /// XKB variant, empty for the default variant
    pub variant: String,
    /// Zero-based index of this layout among the configured layouts
    pub group_index: u32,
}

impl LayoutIdentifier {
    pub fn new(layout: impl Into<String>, variant: impl Into<String>, group_index: u32) -> Self {
        Self {
            layout: layout.into(),
            variant: variant.into(),
            group_index,
        }
    }

    /// Parse a layout spec as written by GNOME ("de+nodeadkeys") or
    /// setxkbmap ("de(nodeadkeys)"). Returns None for an empty layout name.
    pub fn parse(spec: &str, group_index: u32) -> Option<Self> {
        let spec = spec.trim();
        let (layout, variant) = if let Some((layout, variant)) = spec.split_once('+') {
            (layout, variant)
        } else if let Some((layout, rest)) = spec.split_once('(') {
            (layout, rest.trim_end_matches(')'))
        } else {
            (spec, "")
        };

        let layout = layout.trim();
        if layout.is_empty() {
            return None;
        }
        Some(Self::new(layout, variant.trim(), group_index))
    }

    /// The de-facto standard layout, assumed when nothing else is known
    pub fn us() -> Self {
        Self::new("us", "", 0)
    }
}

impl Default for LayoutIdentifier {
    fn default() -> Self {
        Self::us()
    }
}

impl fmt::Display for LayoutIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.variant.is_empty() {
            write!(f, "{}", self.layout)?;
        } else {
            write!(f, "{}+{}", self.layout, self.variant)?;
        }
        if self.group_index > 0 {
            write!(f, " (group {})", self.group_index + 1)?;
        }
        Ok(())
    }
}

/// A hardware key position, as a Linux evdev key code (KEY_*).
///
/// XKB keycodes are evdev codes offset by 8; see [`PhysicalKey::from_xkb`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhysicalKey(pub u16);

impl PhysicalKey {
    pub const LEFT_SHIFT: PhysicalKey = PhysicalKey(42);
    pub const RIGHT_ALT: PhysicalKey = PhysicalKey(100);
    pub const LEFT_CTRL: PhysicalKey = PhysicalKey(29);
    pub const V: PhysicalKey = PhysicalKey(47);

    /// Convert an XKB keycode to the evdev code. Codes below 8 have no
    /// evdev counterpart.
    pub fn from_xkb(code: u32) -> Option<Self> {
        code.checked_sub(8)
            .and_then(|c| u16::try_from(c).ok())
            .map(PhysicalKey)
    }

    pub fn code(self) -> u16 {
        self.0
    }

    pub fn is_modifier(self) -> bool {
        matches!(self.0, 29 | 42 | 54 | 56 | 97 | 100 | 125 | 126)
    }
}

impl fmt::Display for PhysicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key {}", self.0)
    }
}

/// One of the four standard XKB shift levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModifierSet {
    None,
    Shift,
    AltGr,
    ShiftAltGr,
}

impl ModifierSet {
    /// All levels, in XKB level order (level 1 through level 4)
    pub const ALL: [ModifierSet; 4] = [
        ModifierSet::None,
        ModifierSet::Shift,
        ModifierSet::AltGr,
        ModifierSet::ShiftAltGr,
    ];

    /// Level for a zero-based XKB level index
    pub fn from_level(level: usize) -> Option<Self> {
        Self::ALL.get(level).copied()
    }

    pub fn level(self) -> usize {
        match self {
            ModifierSet::None => 0,
            ModifierSet::Shift => 1,
            ModifierSet::AltGr => 2,
            ModifierSet::ShiftAltGr => 3,
        }
    }

    /// Modifier keys to hold, in press order. Shift always precedes AltGr.
    pub fn keys(self) -> &'static [PhysicalKey] {
        match self {
            ModifierSet::None => &[],
            ModifierSet::Shift => &[PhysicalKey::LEFT_SHIFT],
            ModifierSet::AltGr => &[PhysicalKey::RIGHT_ALT],
            ModifierSet::ShiftAltGr => &[PhysicalKey::LEFT_SHIFT, PhysicalKey::RIGHT_ALT],
        }
    }

    pub fn count(self) -> usize {
        self.keys().len()
    }

    /// Level produced by the given held modifiers
    pub fn from_held(shift: bool, altgr: bool) -> Self {
        match (shift, altgr) {
            (false, false) => ModifierSet::None,
            (true, false) => ModifierSet::Shift,
            (false, true) => ModifierSet::AltGr,
            (true, true) => ModifierSet::ShiftAltGr,
        }
    }
}

impl fmt::Display for ModifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModifierSet::None => "none",
            ModifierSet::Shift => "Shift",
            ModifierSet::AltGr => "AltGr",
            ModifierSet::ShiftAltGr => "Shift+AltGr",
        };
        f.write_str(s)
    }
}

/// A key pressed at a given level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Keypress {
    pub key: PhysicalKey,
    pub modifiers: ModifierSet,
}

impl fmt::Display for Keypress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.modifiers {
            ModifierSet::None => write!(f, "{}", self.key),
            mods => write!(f, "{}+{}", mods, self.key),
        }
    }
}

/// How to produce one character: an optional dead-key press, then the key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeystrokeSpec {
    pub key: PhysicalKey,
    pub modifiers: ModifierSet,
    /// Dead key emitted as its own press/release pair before `key`
    pub dead_key_prefix: Option<Keypress>,
}

impl KeystrokeSpec {
    pub fn direct(key: PhysicalKey, modifiers: ModifierSet) -> Self {
        Self {
            key,
            modifiers,
            dead_key_prefix: None,
        }
    }

    pub fn composed(key: PhysicalKey, modifiers: ModifierSet, prefix: Keypress) -> Self {
        Self {
            key,
            modifiers,
            dead_key_prefix: Some(prefix),
        }
    }

    pub fn is_composed(&self) -> bool {
        self.dead_key_prefix.is_some()
    }

    /// Number of non-modifier key presses
    pub fn presses(&self) -> usize {
        1 + usize::from(self.dead_key_prefix.is_some())
    }

    /// Number of modifier presses across the whole keystroke
    pub fn modifier_presses(&self) -> usize {
        self.modifiers.count() + self.dead_key_prefix.map_or(0, |p| p.modifiers.count())
    }

    /// Sort key for candidate preference: fewest key presses, then fewest
    /// modifiers, then lowest keycode and level so ties are deterministic.
    pub fn cost(&self) -> (usize, usize, u16, usize) {
        (
            self.presses(),
            self.modifier_presses(),
            self.key.code(),
            self.modifiers.level(),
        )
    }

    pub fn main_press(&self) -> Keypress {
        Keypress {
            key: self.key,
            modifiers: self.modifiers,
        }
    }
}

impl fmt::Display for KeystrokeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = self.dead_key_prefix {
            write!(f, "{} then ", prefix)?;
        }
        write!(f, "{}", self.main_press())
    }
}

/// Character → ordered, non-empty candidate keystrokes for one layout.
///
/// Built by [`crate::symbols::build`] and never mutated afterwards; a layout
/// change produces a new map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterMap {
    identifier: LayoutIdentifier,
    entries: HashMap<char, Vec<KeystrokeSpec>>,
}

impl CharacterMap {
    /// Callers must guarantee every candidate list is non-empty and sorted
    /// by preference.
    pub(crate) fn from_entries(
        identifier: LayoutIdentifier,
        entries: HashMap<char, Vec<KeystrokeSpec>>,
    ) -> Self {
        Self {
            identifier,
            entries,
        }
    }

    pub fn identifier(&self) -> &LayoutIdentifier {
        &self.identifier
    }

    /// All candidates for a character, preferred first
    pub fn candidates(&self, ch: char) -> Option<&[KeystrokeSpec]> {
        self.entries.get(&ch).map(Vec::as_slice)
    }

    pub fn best(&self, ch: char) -> Option<&KeystrokeSpec> {
        self.candidates(ch).and_then(|c| c.first())
    }

    pub fn contains(&self, ch: char) -> bool {
        self.entries.contains_key(&ch)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.entries.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gnome_and_setxkbmap_forms() {
        let id = LayoutIdentifier::parse("de+nodeadkeys", 1).unwrap();
        assert_eq!(id, LayoutIdentifier::new("de", "nodeadkeys", 1));

        let id = LayoutIdentifier::parse("fr(azerty)", 0).unwrap();
        assert_eq!(id, LayoutIdentifier::new("fr", "azerty", 0));

        let id = LayoutIdentifier::parse(" us ", 0).unwrap();
        assert_eq!(id, LayoutIdentifier::us());

        assert!(LayoutIdentifier::parse("", 0).is_none());
    }

    #[test]
    fn test_identifier_equality_needs_all_fields() {
        let a = LayoutIdentifier::new("de", "", 0);
        assert_ne!(a, LayoutIdentifier::new("de", "", 1));
        assert_ne!(a, LayoutIdentifier::new("de", "nodeadkeys", 0));
        assert_eq!(a, LayoutIdentifier::new("de", "", 0));
    }

    #[test]
    fn test_display() {
        assert_eq!(LayoutIdentifier::us().to_string(), "us");
        assert_eq!(
            LayoutIdentifier::new("de", "nodeadkeys", 1).to_string(),
            "de+nodeadkeys (group 2)"
        );
    }

    #[test]
    fn test_xkb_keycode_offset() {
        assert_eq!(PhysicalKey::from_xkb(38), Some(PhysicalKey(30)));
        assert_eq!(PhysicalKey::from_xkb(7), None);
    }

    #[test]
    fn test_modifier_press_order() {
        assert_eq!(
            ModifierSet::ShiftAltGr.keys(),
            &[PhysicalKey::LEFT_SHIFT, PhysicalKey::RIGHT_ALT]
        );
        assert_eq!(ModifierSet::None.count(), 0);
        for (i, level) in ModifierSet::ALL.iter().enumerate() {
            assert_eq!(ModifierSet::from_level(i), Some(*level));
            assert_eq!(level.level(), i);
        }
        assert_eq!(ModifierSet::from_level(4), None);
    }

    #[test]
    fn test_cost_prefers_direct_then_fewer_modifiers() {
        let direct_shift = KeystrokeSpec::direct(PhysicalKey(40), ModifierSet::Shift);
        let direct_plain = KeystrokeSpec::direct(PhysicalKey(50), ModifierSet::None);
        let composed = KeystrokeSpec::composed(
            PhysicalKey(18),
            ModifierSet::None,
            Keypress {
                key: PhysicalKey(13),
                modifiers: ModifierSet::None,
            },
        );

        assert!(direct_plain.cost() < direct_shift.cost());
        assert!(direct_shift.cost() < composed.cost());
        assert_eq!(composed.presses(), 2);
    }
}
