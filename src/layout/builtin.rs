//! Built-in US QWERTY symbol table
//!
//! Used when neither the active layout nor any previously working layout can
//! be queried. Text may be mistyped on other layouts, which is logged as a
//! warning rather than treated as fatal.

use super::{RawKey, RawSymbolData};
use crate::keymap::keysym::{self, Keysym};
use crate::keymap::PhysicalKey;

/// (evdev code, level 1, level 2)
const US_KEYS: &[(u16, &str, &str)] = &[
    (2, "1", "exclam"),
    (3, "2", "at"),
    (4, "3", "numbersign"),
    (5, "4", "dollar"),
    (6, "5", "percent"),
    (7, "6", "asciicircum"),
    (8, "7", "ampersand"),
    (9, "8", "asterisk"),
    (10, "9", "parenleft"),
    (11, "0", "parenright"),
    (12, "minus", "underscore"),
    (13, "equal", "plus"),
    (15, "Tab", ""),
    (16, "q", "Q"),
    (17, "w", "W"),
    (18, "e", "E"),
    (19, "r", "R"),
    (20, "t", "T"),
    (21, "y", "Y"),
    (22, "u", "U"),
    (23, "i", "I"),
    (24, "o", "O"),
    (25, "p", "P"),
    (26, "bracketleft", "braceleft"),
    (27, "bracketright", "braceright"),
    (28, "Return", ""),
    (30, "a", "A"),
    (31, "s", "S"),
    (32, "d", "D"),
    (33, "f", "F"),
    (34, "g", "G"),
    (35, "h", "H"),
    (36, "j", "J"),
    (37, "k", "K"),
    (38, "l", "L"),
    (39, "semicolon", "colon"),
    (40, "apostrophe", "quotedbl"),
    (41, "grave", "asciitilde"),
    (43, "backslash", "bar"),
    (44, "z", "Z"),
    (45, "x", "X"),
    (46, "c", "C"),
    (47, "v", "V"),
    (48, "b", "B"),
    (49, "n", "N"),
    (50, "m", "M"),
    (51, "comma", "less"),
    (52, "period", "greater"),
    (53, "slash", "question"),
    (57, "space", ""),
];

/// Symbol data for the US layout, independent of any OS query
pub fn us_qwerty() -> RawSymbolData {
    let keys = US_KEYS
        .iter()
        .map(|&(code, base, shifted)| {
            RawKey::new(
                PhysicalKey(code),
                [
                    keysym::parse(base),
                    keysym::parse(shifted),
                    Keysym::NoSymbol,
                    Keysym::NoSymbol,
                ],
            )
        })
        .collect();
    RawSymbolData::new(keys)
}
