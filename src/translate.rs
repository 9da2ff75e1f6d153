//! Text → injection steps
//!
//! Each Unicode scalar value becomes exactly one step, in input order.
//! Characters the layout cannot type become explicit `Fallback` steps;
//! nothing is dropped.

use crate::keymap::{CharacterMap, KeystrokeSpec};
use std::fmt;

/// One character's worth of injection work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionStep {
    /// Type the character with the preferred keystroke
    Type { ch: char, stroke: KeystrokeSpec },
    /// Deliver the character through the fallback channel
    Fallback(char),
}

impl InjectionStep {
    /// The character this step produces
    pub fn ch(&self) -> char {
        match self {
            InjectionStep::Type { ch, .. } => *ch,
            InjectionStep::Fallback(ch) => *ch,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, InjectionStep::Fallback(_))
    }
}

impl fmt::Display for InjectionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InjectionStep::Type { ch, stroke } => write!(f, "{:?}: {}", ch, stroke),
            InjectionStep::Fallback(ch) => write!(f, "{:?}: fallback", ch),
        }
    }
}

/// Translate text into injection steps for the given layout. Never fails.
pub fn translate(text: &str, map: &CharacterMap) -> Vec<InjectionStep> {
    let steps: Vec<InjectionStep> = text
        .chars()
        .map(|ch| match map.best(ch) {
            Some(stroke) => InjectionStep::Type { ch, stroke: *stroke },
            None => InjectionStep::Fallback(ch),
        })
        .collect();

    let fallbacks = steps.iter().filter(|s| s.is_fallback()).count();
    if fallbacks > 0 {
        tracing::debug!(
            "{} of {} characters have no keystroke in '{}'",
            fallbacks,
            steps.len(),
            map.identifier()
        );
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::{LayoutIdentifier, ModifierSet, PhysicalKey};
    use crate::layout::builtin;
    use crate::symbols;

    fn us_map() -> CharacterMap {
        symbols::build(LayoutIdentifier::us(), &builtin::us_qwerty())
    }

    #[test]
    fn test_one_step_per_scalar_value() {
        let map = us_map();
        let text = "Hi €, naïve 👍\n";
        let steps = translate(text, &map);
        assert_eq!(steps.len(), text.chars().count());
        let back: String = steps.iter().map(InjectionStep::ch).collect();
        assert_eq!(back, text);
    }

    #[test]
    fn test_unmappable_become_fallback() {
        let map = us_map();
        let steps = translate("€5", &map);
        assert_eq!(steps[0], InjectionStep::Fallback('€'));
        assert_eq!(
            steps[1],
            InjectionStep::Type {
                ch: '5',
                stroke: KeystrokeSpec::direct(PhysicalKey(6), ModifierSet::None)
            }
        );
    }

    #[test]
    fn test_newline_and_tab_are_typed() {
        let map = us_map();
        let steps = translate("a\tb\n", &map);
        assert!(steps.iter().all(|s| !s.is_fallback()));
    }

    #[test]
    fn test_empty_text() {
        assert!(translate("", &us_map()).is_empty());
    }
}
