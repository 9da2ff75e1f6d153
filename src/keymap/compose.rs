//! Dead-key composition tables
//!
//! Each dead key composes with a set of Latin base letters. The tables
//! follow the xkb Compose sequences for `<dead_X> <base>`; pressing a dead
//! key followed by space yields the standalone accent.

/// Accent produced by a dead key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeadKey {
    Grave,
    Acute,
    Circumflex,
    Tilde,
    Diaeresis,
    Cedilla,
    Caron,
    AboveRing,
    DoubleAcute,
    Ogonek,
    AboveDot,
    Breve,
    Macron,
    Stroke,
}

impl DeadKey {
    pub const ALL: [DeadKey; 14] = [
        DeadKey::Grave,
        DeadKey::Acute,
        DeadKey::Circumflex,
        DeadKey::Tilde,
        DeadKey::Diaeresis,
        DeadKey::Cedilla,
        DeadKey::Caron,
        DeadKey::AboveRing,
        DeadKey::DoubleAcute,
        DeadKey::Ogonek,
        DeadKey::AboveDot,
        DeadKey::Breve,
        DeadKey::Macron,
        DeadKey::Stroke,
    ];

    /// Recognise a `dead_*` keysym name
    pub fn from_keysym(name: &str) -> Option<Self> {
        let accent = name.strip_prefix("dead_")?;
        Some(match accent {
            "grave" => DeadKey::Grave,
            "acute" => DeadKey::Acute,
            "circumflex" => DeadKey::Circumflex,
            "tilde" | "perispomeni" => DeadKey::Tilde,
            "diaeresis" => DeadKey::Diaeresis,
            "cedilla" => DeadKey::Cedilla,
            "caron" => DeadKey::Caron,
            "abovering" => DeadKey::AboveRing,
            "doubleacute" => DeadKey::DoubleAcute,
            "ogonek" => DeadKey::Ogonek,
            "abovedot" => DeadKey::AboveDot,
            "breve" => DeadKey::Breve,
            "macron" => DeadKey::Macron,
            "stroke" => DeadKey::Stroke,
            _ => return None,
        })
    }

    /// Character produced by the dead key followed by space
    pub fn with_space(self) -> Option<char> {
        Some(match self {
            DeadKey::Grave => '`',
            DeadKey::Acute => '\'',
            DeadKey::Circumflex => '^',
            DeadKey::Tilde => '~',
            DeadKey::Diaeresis => '"',
            DeadKey::Cedilla => '¸',
            DeadKey::Caron => 'ˇ',
            DeadKey::AboveRing => '°',
            DeadKey::DoubleAcute => '˝',
            DeadKey::Ogonek => '˛',
            DeadKey::AboveDot => '˙',
            DeadKey::Breve => '˘',
            DeadKey::Macron => '¯',
            DeadKey::Stroke => return None,
        })
    }

    /// Character produced by pressing the dead key twice
    pub fn doubled(self) -> Option<char> {
        Some(match self {
            DeadKey::Grave => '`',
            DeadKey::Acute => '´',
            DeadKey::Circumflex => '^',
            DeadKey::Tilde => '~',
            DeadKey::Diaeresis => '¨',
            DeadKey::Cedilla => '¸',
            DeadKey::Caron => 'ˇ',
            DeadKey::AboveRing => '°',
            DeadKey::DoubleAcute => '˝',
            DeadKey::Ogonek => '˛',
            DeadKey::AboveDot => '˙',
            DeadKey::Breve => '˘',
            DeadKey::Macron => '¯',
            DeadKey::Stroke => return None,
        })
    }

    /// Base letters and the characters they compose to, pairwise
    fn table(self) -> (&'static str, &'static str) {
        match self {
            DeadKey::Grave => ("aeiouAEIOUnN", "àèìòùÀÈÌÒÙǹǸ"),
            DeadKey::Acute => (
                "aeiouyAEIOUYcCnNsSzZlLrR",
                "áéíóúýÁÉÍÓÚÝćĆńŃśŚźŹĺĹŕŔ",
            ),
            DeadKey::Circumflex => (
                "aeiouAEIOUcCgGhHjJsSwWyY",
                "âêîôûÂÊÎÔÛĉĈĝĜĥĤĵĴŝŜŵŴŷŶ",
            ),
            DeadKey::Tilde => ("anoANOiIuU", "ãñõÃÑÕĩĨũŨ"),
            DeadKey::Diaeresis => ("aeiouyAEIOUY", "äëïöüÿÄËÏÖÜŸ"),
            DeadKey::Cedilla => ("cCsStTgGkKlLnNrR", "çÇşŞţŢģĢķĶļĻņŅŗŖ"),
            DeadKey::Caron => ("cCdDeEnNrRsStTzZ", "čČďĎěĚňŇřŘšŠťŤžŽ"),
            DeadKey::AboveRing => ("aAuU", "åÅůŮ"),
            DeadKey::DoubleAcute => ("oOuU", "őŐűŰ"),
            DeadKey::Ogonek => ("aAeEiIuU", "ąĄęĘįĮųŲ"),
            DeadKey::AboveDot => ("zZeEcCgGI", "żŻėĖċĊġĠİ"),
            DeadKey::Breve => ("aAgGuU", "ăĂğĞŭŬ"),
            DeadKey::Macron => ("aAeEiIoOuU", "āĀēĒīĪōŌūŪ"),
            DeadKey::Stroke => ("dDlLoOhH", "đĐłŁøØħĦ"),
        }
    }

    /// Every (base, composed) pair this dead key supports
    pub fn compositions(self) -> impl Iterator<Item = (char, char)> {
        let (bases, composed) = self.table();
        bases.chars().zip(composed.chars())
    }

    /// Compose this dead key with a base character
    pub fn compose(self, base: char) -> Option<char> {
        if base == ' ' {
            return self.with_space();
        }
        self.compositions()
            .find(|(b, _)| *b == base)
            .map(|(_, composed)| composed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_are_pairwise() {
        for dead in DeadKey::ALL {
            let (bases, composed) = dead.table();
            assert_eq!(
                bases.chars().count(),
                composed.chars().count(),
                "table for {:?} is misaligned",
                dead
            );
        }
    }

    #[test]
    fn test_compose_common_accents() {
        assert_eq!(DeadKey::Acute.compose('e'), Some('é'));
        assert_eq!(DeadKey::Grave.compose('a'), Some('à'));
        assert_eq!(DeadKey::Circumflex.compose('o'), Some('ô'));
        assert_eq!(DeadKey::Diaeresis.compose('U'), Some('Ü'));
        assert_eq!(DeadKey::Caron.compose('s'), Some('š'));
        assert_eq!(DeadKey::Acute.compose('q'), None);
    }

    #[test]
    fn test_space_yields_standalone_accent() {
        assert_eq!(DeadKey::Circumflex.compose(' '), Some('^'));
        assert_eq!(DeadKey::Acute.compose(' '), Some('\''));
        assert_eq!(DeadKey::Stroke.compose(' '), None);
    }

    #[test]
    fn test_from_keysym() {
        assert_eq!(DeadKey::from_keysym("dead_acute"), Some(DeadKey::Acute));
        assert_eq!(DeadKey::from_keysym("dead_perispomeni"), Some(DeadKey::Tilde));
        assert_eq!(DeadKey::from_keysym("dead_belowdot"), None);
        assert_eq!(DeadKey::from_keysym("acute"), None);
    }
}
