//! Active layout detection and symbol table queries
//!
//! The [`LayoutSource`] trait hides how layout data is obtained. On Linux
//! the default implementation shells out to gsettings, setxkbmap and
//! xkbcomp (see [`xkb`]); other platforms can satisfy the trait via native
//! APIs without touching translation or injection.

pub mod builtin;
pub mod xkb;
pub mod xkbcomp;

use crate::config::LayoutConfig;
use crate::error::LayoutQueryError;
use crate::keymap::compose::DeadKey;
use crate::keymap::keysym::Keysym;
use crate::keymap::{Keypress, LayoutIdentifier, ModifierSet, PhysicalKey};

/// Symbols of one physical key at each of the four levels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawKey {
    pub key: PhysicalKey,
    pub levels: [Keysym; 4],
}

impl RawKey {
    pub fn new(key: PhysicalKey, levels: [Keysym; 4]) -> Self {
        Self { key, levels }
    }

    pub fn symbol(&self, modifiers: ModifierSet) -> Keysym {
        self.levels[modifiers.level()]
    }
}

/// Per-key symbol data for one layout, as reported by the OS
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSymbolData {
    pub keys: Vec<RawKey>,
}

impl RawSymbolData {
    pub fn new(keys: Vec<RawKey>) -> Self {
        Self { keys }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn key(&self, key: PhysicalKey) -> Option<&RawKey> {
        self.keys.iter().find(|k| k.key == key)
    }

    /// Keys acting as dead-key prefixes, with the accent each composes
    pub fn dead_keys(&self) -> impl Iterator<Item = (Keypress, DeadKey)> + '_ {
        self.keys.iter().flat_map(|raw| {
            ModifierSet::ALL.into_iter().filter_map(move |modifiers| {
                match raw.symbol(modifiers) {
                    Keysym::Dead(dead) => Some((
                        Keypress {
                            key: raw.key,
                            modifiers,
                        },
                        dead,
                    )),
                    _ => None,
                }
            })
        })
    }
}

/// Queries the OS input subsystem for layout information
#[async_trait::async_trait]
pub trait LayoutSource: Send + Sync {
    /// Identify the currently active layout. Called before every injection
    /// request so external layout switches are noticed.
    async fn current_identifier(&self) -> Result<LayoutIdentifier, LayoutQueryError>;

    /// Per-key symbols for the given layout
    async fn raw_symbol_table(
        &self,
        id: &LayoutIdentifier,
    ) -> Result<RawSymbolData, LayoutQueryError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Factory function that returns the layout source for this configuration
pub fn create_source(config: &LayoutConfig) -> Box<dyn LayoutSource> {
    let pinned = config.pinned_identifier();
    if let Some(ref id) = pinned {
        tracing::info!("Layout pinned to '{}' by configuration", id);
    }
    Box::new(xkb::XkbLayoutSource::new(config.source, pinned))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dead_keys_lists_every_level() {
        let data = RawSymbolData::new(vec![
            RawKey::new(
                PhysicalKey(13),
                [
                    Keysym::Dead(DeadKey::Acute),
                    Keysym::Dead(DeadKey::Grave),
                    Keysym::NoSymbol,
                    Keysym::NoSymbol,
                ],
            ),
            RawKey::new(
                PhysicalKey(30),
                [
                    Keysym::Char('a'),
                    Keysym::Char('A'),
                    Keysym::NoSymbol,
                    Keysym::NoSymbol,
                ],
            ),
        ]);

        let dead: Vec<_> = data.dead_keys().collect();
        assert_eq!(dead.len(), 2);
        assert_eq!(dead[0].0.modifiers, ModifierSet::None);
        assert_eq!(dead[0].1, DeadKey::Acute);
        assert_eq!(dead[1].0.modifiers, ModifierSet::Shift);
        assert_eq!(dead[1].1, DeadKey::Grave);
    }
}
