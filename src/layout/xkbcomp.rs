//! Parser for compiled keymaps printed by `xkbcomp -xkb`
//!
//! Only two sections matter:
//!
//! ```text
//! xkb_keycodes "evdev+aliases(azerty)" {
//!     <AC01> = 38;
//!     alias <AC12> = <BKSL>;
//! };
//! xkb_symbols "pc+fr+inet(evdev)" {
//!     key <AE01> { [ ampersand, 1, onesuperior, exclamdown ] };
//!     key <AC01> {
//!         type= "FOUR_LEVEL_SEMIALPHABETIC",
//!         symbols[Group1]= [ q, Q, at, Greek_OMEGA ]
//!     };
//! };
//! ```

use super::{RawKey, RawSymbolData};
use crate::error::LayoutQueryError;
use crate::keymap::keysym::{self, Keysym};
use crate::keymap::PhysicalKey;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

struct Patterns {
    keycode: Regex,
    alias: Regex,
    key_block: Regex,
    group_symbols: Regex,
    bare_symbols: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        keycode: Regex::new(r"(?m)^\s*<([^>]+)>\s*=\s*(\d+)\s*;").expect("valid regex"),
        alias: Regex::new(r"alias\s+<([^>]+)>\s*=\s*<([^>]+)>\s*;").expect("valid regex"),
        key_block: Regex::new(r"(?s)\bkey\s+<([^>]+)>\s*\{(.*?)\}\s*;").expect("valid regex"),
        group_symbols: Regex::new(r"symbols\[\s*[Gg]roup(\d+)\s*\]\s*=\s*\[([^\]]*)\]")
            .expect("valid regex"),
        bare_symbols: Regex::new(r"(?:^|[{,])\s*\[([^\]]*)\]").expect("valid regex"),
    })
}

/// Text of a top-level section such as `xkb_symbols`, up to the next section
fn section<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let start = text.find(name)?;
    let rest = &text[start + name.len()..];
    let end = ["xkb_keycodes", "xkb_types", "xkb_compatibility", "xkb_compat", "xkb_symbols", "xkb_geometry"]
        .iter()
        .filter(|other| **other != name)
        .filter_map(|other| rest.find(other))
        .min()
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Key name → XKB keycode, with aliases resolved
pub fn parse_keycodes(text: &str) -> HashMap<String, u32> {
    let p = patterns();
    let mut codes: HashMap<String, u32> = p
        .keycode
        .captures_iter(text)
        .filter_map(|c| Some((c[1].to_string(), c[2].parse().ok()?)))
        .collect();

    for c in p.alias.captures_iter(text) {
        if let Some(code) = codes.get(&c[2]).copied() {
            codes.insert(c[1].to_string(), code);
        }
    }
    codes
}

/// Symbol lists per group (index 0 = Group1) in one `key <X> { ... }` body
fn parse_groups(body: &str) -> Vec<Vec<Keysym>> {
    let p = patterns();
    let split = |list: &str| -> Vec<Keysym> { list.split(',').map(keysym::parse).collect() };

    if body.contains("symbols[") {
        let mut groups: Vec<(usize, Vec<Keysym>)> = p
            .group_symbols
            .captures_iter(body)
            .filter_map(|c| Some((c[1].parse::<usize>().ok()?, split(&c[2]))))
            .collect();
        groups.sort_by_key(|(n, _)| *n);
        let count = groups.last().map_or(0, |(n, _)| *n);
        let mut out = vec![Vec::new(); count];
        for (n, syms) in groups {
            if n >= 1 {
                out[n - 1] = syms;
            }
        }
        out
    } else {
        p.bare_symbols
            .captures_iter(body)
            .map(|c| split(&c[1]))
            .collect()
    }
}

/// Parse `xkbcomp -xkb` output into per-key symbols for one group.
///
/// Keys with fewer groups than `group_index + 1` wrap around, as XKB does by
/// default. Keys without any printable or dead symbol are skipped.
pub fn parse_keymap(text: &str, group_index: u32) -> Result<RawSymbolData, LayoutQueryError> {
    let keycodes_text = section(text, "xkb_keycodes")
        .ok_or_else(|| LayoutQueryError::Malformed("missing xkb_keycodes section".to_string()))?;
    let symbols_text = section(text, "xkb_symbols")
        .ok_or_else(|| LayoutQueryError::Malformed("missing xkb_symbols section".to_string()))?;

    let codes = parse_keycodes(keycodes_text);
    if codes.is_empty() {
        return Err(LayoutQueryError::Malformed(
            "xkb_keycodes section defines no keys".to_string(),
        ));
    }

    let mut keys = Vec::new();
    for c in patterns().key_block.captures_iter(symbols_text) {
        let name = &c[1];
        let Some(key) = codes.get(name).copied().and_then(PhysicalKey::from_xkb) else {
            tracing::trace!("Skipping key <{}> with unknown keycode", name);
            continue;
        };

        let groups = parse_groups(&c[2]);
        if groups.is_empty() {
            continue;
        }
        let group = &groups[group_index as usize % groups.len()];

        let mut levels = [Keysym::NoSymbol; 4];
        for (slot, sym) in levels.iter_mut().zip(group.iter()) {
            *slot = *sym;
        }
        if levels.iter().all(|l| *l == Keysym::NoSymbol) {
            continue;
        }
        keys.push(RawKey::new(key, levels));
    }

    if keys.is_empty() {
        return Err(LayoutQueryError::Malformed(
            "xkb_symbols section maps no printable keys".to_string(),
        ));
    }

    keys.sort_by_key(|k| k.key);
    tracing::debug!("Parsed {} keys from compiled keymap", keys.len());
    Ok(RawSymbolData::new(keys))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::compose::DeadKey;

    const SAMPLE: &str = r#"
xkb_keymap {
xkb_keycodes "evdev+aliases(qwertz)" {
    minimum = 8;
    maximum = 255;
    <AE01>               = 10;
    <AE12>               = 21;
    <AD06>               = 29;
    <AC01>               = 38;
    <RALT>               = 108;
    <SPCE>               = 65;
    indicator 1 = "Caps Lock";
    alias <ALGR>         = <RALT>;
};
xkb_types "complete" {
    type "TWO_LEVEL" {
        modifiers= Shift;
        map[Shift]= Level2;
    };
};
xkb_symbols "pc+de+us:2+inet(evdev)" {
    name[group1]="German";
    key <AE01>               {	[               1,          exclam,     onesuperior,      exclamdown ], [ 1, exclam ] };
    key <AE12>               {	[      dead_acute,      dead_grave,         cedilla,          ogonek ] };
    key <AD06>               {
        type= "FOUR_LEVEL_SEMIALPHABETIC",
        symbols[Group1]= [               z,               Z,       leftarrow,             yen ],
        symbols[Group2]= [               y,               Y ]
    };
    key <AC01>               {
        type[Group1]= "ALPHABETIC",
        symbols[Group1]= [               a,               A ]
    };
    key <ALGR>               {
        type= "TWO_LEVEL",
        symbols[Group1]= [ ISO_Level3_Shift, Multi_key ]
    };
    key <SPCE>               {	[           space ] };
    modifier_map Shift { <LFSH>, <RTSH> };
};
};
"#;

    #[test]
    fn test_parse_keycodes_with_alias() {
        let codes = parse_keycodes(SAMPLE);
        assert_eq!(codes.get("AC01"), Some(&38));
        assert_eq!(codes.get("ALGR"), Some(&108));
    }

    #[test]
    fn test_parse_bare_and_grouped_symbols() {
        let data = parse_keymap(SAMPLE, 0).unwrap();

        let one = data.key(PhysicalKey(2)).unwrap();
        assert_eq!(one.levels[0], Keysym::Char('1'));
        assert_eq!(one.levels[3], Keysym::Char('¡'));

        let z = data.key(PhysicalKey(21)).unwrap();
        assert_eq!(z.levels[0], Keysym::Char('z'));
        assert_eq!(z.levels[2], Keysym::Char('←'));

        let a = data.key(PhysicalKey(30)).unwrap();
        assert_eq!(a.levels[1], Keysym::Char('A'));
        assert_eq!(a.levels[2], Keysym::NoSymbol);

        let dead = data.key(PhysicalKey(13)).unwrap();
        assert_eq!(dead.levels[0], Keysym::Dead(DeadKey::Acute));
        assert_eq!(dead.levels[1], Keysym::Dead(DeadKey::Grave));

        let space = data.key(PhysicalKey(57)).unwrap();
        assert_eq!(space.levels[0], Keysym::Char(' '));
    }

    #[test]
    fn test_modifier_only_keys_are_skipped() {
        let data = parse_keymap(SAMPLE, 0).unwrap();
        assert!(data.key(PhysicalKey(100)).is_none());
    }

    #[test]
    fn test_second_group_and_wrapping() {
        let data = parse_keymap(SAMPLE, 1).unwrap();

        let z = data.key(PhysicalKey(21)).unwrap();
        assert_eq!(z.levels[0], Keysym::Char('y'));

        // <AC01> only has one group and wraps back to it
        let a = data.key(PhysicalKey(30)).unwrap();
        assert_eq!(a.levels[0], Keysym::Char('a'));
    }

    #[test]
    fn test_missing_sections() {
        assert!(matches!(
            parse_keymap("xkb_keymap { };", 0),
            Err(LayoutQueryError::Malformed(_))
        ));
    }
}
