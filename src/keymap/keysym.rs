//! Keysym name → character conversion
//!
//! Handles the forms xkbcomp prints: single characters, quoted strings,
//! named keysyms (`exclam`, `eacute`, `Cyrillic_ya`), Unicode keysyms
//! (`U20AC`) and raw hex keysyms (`0x10020ac`). Dead keys are recognised
//! separately; keypad, ISO and function keysyms produce no character.

use super::compose::DeadKey;

/// What a key produces at one level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Keysym {
    #[default]
    NoSymbol,
    Char(char),
    Dead(DeadKey),
}

impl Keysym {
    pub fn as_char(self) -> Option<char> {
        match self {
            Keysym::Char(c) => Some(c),
            _ => None,
        }
    }
}

/// Parse one keysym as printed in an xkb_symbols section
pub fn parse(sym: &str) -> Keysym {
    let sym = sym.trim();
    if sym.is_empty() {
        return Keysym::NoSymbol;
    }

    if let Some(dead) = DeadKey::from_keysym(sym) {
        return Keysym::Dead(dead);
    }

    to_char(sym).map_or(Keysym::NoSymbol, Keysym::Char)
}

/// Convert a keysym name to the character it types
pub fn to_char(sym: &str) -> Option<char> {
    let sym = sym.trim();

    for quote in ['"', '\''] {
        if sym.len() >= 2 && sym.starts_with(quote) && sym.ends_with(quote) {
            let inner = &sym[1..sym.len() - 1];
            let mut chars = inner.chars();
            return match (chars.next(), chars.next()) {
                (Some(c), None) => Some(c),
                _ => None,
            };
        }
    }

    let mut chars = sym.chars();
    if let (Some(c), None) = (chars.next(), chars.clone().next()) {
        return (!c.is_control()).then_some(c);
    }

    if sym.starts_with("KP_") || sym.starts_with("ISO_") || sym.starts_with("dead_") {
        return None;
    }

    if let Some(hex) = sym.strip_prefix('U') {
        if hex.len() >= 4 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return u32::from_str_radix(hex, 16)
                .ok()
                .and_then(char::from_u32)
                .filter(|c| !c.is_control());
        }
    }

    if let Some(hex) = sym.strip_prefix("0x") {
        let value = u32::from_str_radix(hex, 16).ok()?;
        return match value {
            0x0100_0000..=0x0110_ffff => char::from_u32(value - 0x0100_0000),
            0x20..=0x7e | 0xa0..=0xff => char::from_u32(value),
            _ => None,
        }
        .filter(|c| !c.is_control());
    }

    named(sym)
        .or_else(|| latin1(sym))
        .or_else(|| greek(sym))
        .or_else(|| cyrillic(sym))
        .or_else(|| hebrew(sym))
}

/// Whitespace, ASCII punctuation and assorted named symbols
fn named(sym: &str) -> Option<char> {
    Some(match sym {
        "space" => ' ',
        "Return" => '\n',
        "Tab" => '\t',
        "exclam" => '!',
        "quotedbl" => '"',
        "numbersign" => '#',
        "dollar" => '$',
        "percent" => '%',
        "ampersand" => '&',
        "apostrophe" | "quoteright" => '\'',
        "parenleft" => '(',
        "parenright" => ')',
        "asterisk" => '*',
        "plus" => '+',
        "comma" => ',',
        "minus" => '-',
        "period" => '.',
        "slash" => '/',
        "colon" => ':',
        "semicolon" => ';',
        "less" => '<',
        "equal" => '=',
        "greater" => '>',
        "question" => '?',
        "at" => '@',
        "bracketleft" => '[',
        "backslash" => '\\',
        "bracketright" => ']',
        "asciicircum" => '^',
        "underscore" => '_',
        "grave" | "quoteleft" => '`',
        "braceleft" => '{',
        "bar" => '|',
        "braceright" => '}',
        "asciitilde" => '~',
        "guillemetleft" => '«',
        "guillemetright" => '»',
        "ordmasculine" => 'º',
        "EuroSign" => '€',
        "Aogonek" => 'Ą',
        "aogonek" => 'ą',
        "Abreve" => 'Ă',
        "abreve" => 'ă',
        "Cacute" => 'Ć',
        "cacute" => 'ć',
        "Ccaron" => 'Č',
        "ccaron" => 'č',
        "Dcaron" => 'Ď',
        "dcaron" => 'ď',
        "Dstroke" => 'Đ',
        "dstroke" => 'đ',
        "Eogonek" => 'Ę',
        "eogonek" => 'ę',
        "Ecaron" => 'Ě',
        "ecaron" => 'ě',
        "Gbreve" => 'Ğ',
        "gbreve" => 'ğ',
        "Iabovedot" => 'İ',
        "idotless" => 'ı',
        "Lacute" => 'Ĺ',
        "lacute" => 'ĺ',
        "Lstroke" => 'Ł',
        "lstroke" => 'ł',
        "Nacute" => 'Ń',
        "nacute" => 'ń',
        "Ncaron" => 'Ň',
        "ncaron" => 'ň',
        "Odoubleacute" => 'Ő',
        "odoubleacute" => 'ő',
        "OE" => 'Œ',
        "oe" => 'œ',
        "Racute" => 'Ŕ',
        "racute" => 'ŕ',
        "Rcaron" => 'Ř',
        "rcaron" => 'ř',
        "Sacute" => 'Ś',
        "sacute" => 'ś',
        "Scaron" => 'Š',
        "scaron" => 'š',
        "Scedilla" => 'Ş',
        "scedilla" => 'ş',
        "Tcaron" => 'Ť',
        "tcaron" => 'ť',
        "Uring" => 'Ů',
        "uring" => 'ů',
        "Udoubleacute" => 'Ű',
        "udoubleacute" => 'ű',
        "Ydiaeresis" => 'Ÿ',
        "Zacute" => 'Ź',
        "zacute" => 'ź',
        "Zcaron" => 'Ž',
        "zcaron" => 'ž',
        "Zabovedot" => 'Ż',
        "zabovedot" => 'ż',
        "endash" => '–',
        "emdash" => '—',
        "ellipsis" => '…',
        "leftsinglequotemark" => '‘',
        "rightsinglequotemark" => '’',
        "singlelowquotemark" => '‚',
        "leftdoublequotemark" => '“',
        "rightdoublequotemark" => '”',
        "doublelowquotemark" => '„',
        "dagger" => '†',
        "doubledagger" => '‡',
        "enfilledcircbullet" => '•',
        "trademark" => '™',
        "numerosign" => '№',
        "leftarrow" => '←',
        "uparrow" => '↑',
        "rightarrow" => '→',
        "downarrow" => '↓',
        "notequal" => '≠',
        "lessthanequal" => '≤',
        "greaterthanequal" => '≥',
        "infinity" => '∞',
        _ => return None,
    })
}

/// Keysyms 0xa0..=0xff, named in code point order
const LATIN1_NAMES: [&str; 96] = [
    "nobreakspace", "exclamdown", "cent", "sterling", "currency", "yen", "brokenbar", "section",
    "diaeresis", "copyright", "ordfeminine", "guillemotleft", "notsign", "hyphen", "registered",
    "macron", "degree", "plusminus", "twosuperior", "threesuperior", "acute", "mu", "paragraph",
    "periodcentered", "cedilla", "onesuperior", "masculine", "guillemotright", "onequarter",
    "onehalf", "threequarters", "questiondown", "Agrave", "Aacute", "Acircumflex", "Atilde",
    "Adiaeresis", "Aring", "AE", "Ccedilla", "Egrave", "Eacute", "Ecircumflex", "Ediaeresis",
    "Igrave", "Iacute", "Icircumflex", "Idiaeresis", "ETH", "Ntilde", "Ograve", "Oacute",
    "Ocircumflex", "Otilde", "Odiaeresis", "multiply", "Oslash", "Ugrave", "Uacute",
    "Ucircumflex", "Udiaeresis", "Yacute", "THORN", "ssharp", "agrave", "aacute", "acircumflex",
    "atilde", "adiaeresis", "aring", "ae", "ccedilla", "egrave", "eacute", "ecircumflex",
    "ediaeresis", "igrave", "iacute", "icircumflex", "idiaeresis", "eth", "ntilde", "ograve",
    "oacute", "ocircumflex", "otilde", "odiaeresis", "division", "oslash", "ugrave", "uacute",
    "ucircumflex", "udiaeresis", "yacute", "thorn", "ydiaeresis",
];

fn latin1(sym: &str) -> Option<char> {
    let sym = match sym {
        "Eth" => "ETH",
        "Thorn" => "THORN",
        "Ooblique" => "Oslash",
        "ooblique" => "oslash",
        other => other,
    };
    let index = LATIN1_NAMES.iter().position(|name| *name == sym)?;
    char::from_u32(0xa0 + index as u32)
}

const GREEK_LETTERS: [&str; 24] = [
    "alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta", "theta", "iota", "kappa",
    "lamda", "mu", "nu", "xi", "omicron", "pi", "rho", "sigma", "tau", "upsilon", "phi", "chi",
    "psi", "omega",
];

fn greek(sym: &str) -> Option<char> {
    let name = sym.strip_prefix("Greek_")?;
    if name == "finalsmallsigma" {
        return Some('ς');
    }
    let lower = name.to_ascii_lowercase().replace("lambda", "lamda");
    let index = GREEK_LETTERS.iter().position(|l| *l == lower)? as u32;
    // No capital final sigma: letters after rho skip one code point
    let offset = if index < 17 { index } else { index + 1 };
    let base = if name.chars().all(|c| c.is_ascii_uppercase()) {
        0x391
    } else {
        0x3b1
    };
    char::from_u32(base + offset)
}

/// Basic Russian alphabet, а..я in code point order
const CYRILLIC_LETTERS: [&str; 32] = [
    "a", "be", "ve", "ghe", "de", "ie", "zhe", "ze", "i", "shorti", "ka", "el", "em", "en", "o",
    "pe", "er", "es", "te", "u", "ef", "ha", "tse", "che", "sha", "shcha", "hardsign", "yeru",
    "softsign", "e", "yu", "ya",
];

fn cyrillic(sym: &str) -> Option<char> {
    let (name, lower_cp, upper_cp) = if let Some(name) = sym.strip_prefix("Cyrillic_") {
        match name.to_ascii_lowercase().as_str() {
            "io" => (name, 0x451, 0x401),
            letter => {
                let index = CYRILLIC_LETTERS.iter().position(|l| *l == letter)? as u32;
                (name, 0x430 + index, 0x410 + index)
            }
        }
    } else if let Some(name) = sym.strip_prefix("Ukrainian_") {
        match name.to_ascii_lowercase().as_str() {
            "ie" => (name, 0x454, 0x404),
            "i" => (name, 0x456, 0x406),
            "yi" => (name, 0x457, 0x407),
            "ghe_with_upturn" => (name, 0x491, 0x490),
            _ => return None,
        }
    } else if let Some(name) = sym.strip_prefix("Byelorussian_") {
        match name.to_ascii_lowercase().as_str() {
            "shortu" => (name, 0x45e, 0x40e),
            _ => return None,
        }
    } else {
        return None;
    };

    let upper = name
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .all(|c| c.is_ascii_uppercase());
    char::from_u32(if upper { upper_cp } else { lower_cp })
}

/// Hebrew letters, א..ת in code point order
const HEBREW_LETTERS: [&str; 27] = [
    "aleph", "bet", "gimel", "dalet", "he", "waw", "zain", "chet", "tet", "yod", "finalkaph",
    "kaph", "lamed", "finalmem", "mem", "finalnun", "nun", "samech", "ayin", "finalpe", "pe",
    "finalzade", "zade", "qoph", "resh", "shin", "taw",
];

fn hebrew(sym: &str) -> Option<char> {
    let name = sym.strip_prefix("hebrew_")?;
    let name = match name {
        "beth" => "bet",
        "gimmel" => "gimel",
        "daleth" => "dalet",
        "zayin" => "zain",
        "het" => "chet",
        "teth" => "tet",
        "samekh" => "samech",
        "finalzadi" => "finalzade",
        "zadi" => "zade",
        "kuf" => "qoph",
        "taf" => "taw",
        other => other,
    };
    let index = HEBREW_LETTERS.iter().position(|l| *l == name)? as u32;
    char::from_u32(0x5d0 + index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_characters() {
        assert_eq!(to_char("a"), Some('a'));
        assert_eq!(to_char("Q"), Some('Q'));
        assert_eq!(to_char("7"), Some('7'));
    }

    #[test]
    fn test_quoted() {
        assert_eq!(to_char("\"x\""), Some('x'));
        assert_eq!(to_char("'é'"), Some('é'));
    }

    #[test]
    fn test_named_ascii() {
        assert_eq!(to_char("exclam"), Some('!'));
        assert_eq!(to_char("bracketleft"), Some('['));
        assert_eq!(to_char("space"), Some(' '));
        assert_eq!(to_char("Return"), Some('\n'));
        assert_eq!(to_char("Tab"), Some('\t'));
    }

    #[test]
    fn test_latin1() {
        assert_eq!(to_char("eacute"), Some('é'));
        assert_eq!(to_char("Udiaeresis"), Some('Ü'));
        assert_eq!(to_char("ssharp"), Some('ß'));
        assert_eq!(to_char("section"), Some('§'));
        assert_eq!(to_char("ydiaeresis"), Some('ÿ'));
        assert_eq!(to_char("mu"), Some('µ'));
    }

    #[test]
    fn test_unicode_and_hex_forms() {
        assert_eq!(to_char("U20AC"), Some('€'));
        assert_eq!(to_char("0x10020ac"), Some('€'));
        assert_eq!(to_char("0xe9"), Some('é'));
        assert_eq!(to_char("0xff08"), None);
    }

    #[test]
    fn test_scripts() {
        assert_eq!(to_char("Greek_alpha"), Some('α'));
        assert_eq!(to_char("Greek_OMEGA"), Some('Ω'));
        assert_eq!(to_char("Greek_sigma"), Some('σ'));
        assert_eq!(to_char("Greek_finalsmallsigma"), Some('ς'));
        assert_eq!(to_char("Cyrillic_ya"), Some('я'));
        assert_eq!(to_char("Cyrillic_SHCHA"), Some('Щ'));
        assert_eq!(to_char("Cyrillic_io"), Some('ё'));
        assert_eq!(to_char("Cyrillic_e"), Some('э'));
        assert_eq!(to_char("Cyrillic_E"), Some('Э'));
        assert_eq!(to_char("Ukrainian_yi"), Some('ї'));
        assert_eq!(to_char("hebrew_shin"), Some('ש'));
        assert_eq!(to_char("hebrew_aleph"), Some('א'));
    }

    #[test]
    fn test_non_printing() {
        assert_eq!(to_char("KP_5"), None);
        assert_eq!(to_char("ISO_Level3_Shift"), None);
        assert_eq!(to_char("Shift_L"), None);
        assert_eq!(to_char("F1"), None);
        assert_eq!(to_char("NoSymbol"), None);
        assert_eq!(to_char("BackSpace"), None);
    }

    #[test]
    fn test_parse_dead_keys() {
        assert_eq!(parse("dead_acute"), Keysym::Dead(DeadKey::Acute));
        assert_eq!(parse("a"), Keysym::Char('a'));
        assert_eq!(parse("NoSymbol"), Keysym::NoSymbol);
    }
}
