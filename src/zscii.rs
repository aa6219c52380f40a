//! ZSCII character tables.
//!
//! The three 26-entry alphabets used by packed strings, plus the Unicode
//! translation table covering ZSCII codes 155 and up. Stories may install a
//! custom translation table; the defaults follow the standard (S 3.5.3 and
//! S 3.8.5.3).

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::Arc;

/// Alphabet 0: lower case letters.
pub const ALPHABET_A0: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";
/// Alphabet 1: upper case letters.
pub const ALPHABET_A1: &[u8; 26] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
/// Alphabet 2: newline, digits, punctuation. Index 0 is the ZSCII escape
/// slot and never produces a character.
pub const ALPHABET_A2: &[u8; 26] = b" \n0123456789.,!?_#'\"/\\-:()";

/// First ZSCII code covered by the translation table.
pub const EXTRA_BASE: u16 = 155;

// Default Unicode translations for ZSCII 155-223 (S 3.8.5.3).
const DEFAULT_EXTRA: [char; 69] = [
    'ä', 'ö', 'ü', 'Ä', 'Ö', 'Ü', 'ß', '»', '«', 'ë', // 155
    'ï', 'ÿ', 'Ë', 'Ï', 'á', 'é', 'í', 'ó', 'ú', 'ý', // 165
    'Á', 'É', 'Í', 'Ó', 'Ú', 'Ý', 'à', 'è', 'ì', 'ò', // 175
    'ù', 'À', 'È', 'Ì', 'Ò', 'Ù', 'â', 'ê', 'î', 'ô', // 185
    'û', 'Â', 'Ê', 'Î', 'Ô', 'Û', 'å', 'Å', 'ø', 'Ø', // 195
    'ã', 'ñ', 'õ', 'Ã', 'Ñ', 'Õ', 'æ', 'Æ', 'ç', 'Ç', // 205
    'þ', 'ð', 'Þ', 'Ð', '£', 'œ', 'Œ', '¡', '¿', // 215
];

/// One of the three character sets selected during decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alphabet {
    Lower,
    Upper,
    Punct,
}

const ALPHABETS: [Alphabet; 3] = [Alphabet::Lower, Alphabet::Upper, Alphabet::Punct];

/// The character tables one interpreter instance decodes and encodes with.
///
/// Immutable once built. [`DEFAULT_TABLES`] is the process-wide default;
/// stories with a custom translation table get their own instance.
#[derive(Clone)]
pub struct CharTables {
    alphabets: [[char; 26]; 3],
    extra: Vec<char>,
    // char -> (alphabet, index) for the dictionary encoder
    positions: HashMap<char, (Alphabet, u8)>,
}

impl CharTables {
    pub fn new(alphabets: [[char; 26]; 3], extra: Vec<char>) -> Self {
        let mut positions = HashMap::new();
        for (a, table) in alphabets.iter().enumerate() {
            for (i, &ch) in table.iter().enumerate() {
                if a == 2 && i == 0 {
                    continue; // escape slot
                }
                positions.entry(ch).or_insert((ALPHABETS[a], i as u8));
            }
        }
        CharTables {
            alphabets,
            extra,
            positions,
        }
    }

    /// Default alphabets with a story-supplied translation table.
    pub fn with_extra_chars(extra: Vec<char>) -> Self {
        CharTables::new(default_alphabets(), extra)
    }

    /// Character at `index` (0-25) of the given alphabet.
    pub fn alphabet_char(&self, alphabet: Alphabet, index: u8) -> char {
        self.alphabets[alphabet as usize][index as usize]
    }

    /// Where `ch` lives in the compiled alphabets, if anywhere.
    pub fn lookup(&self, ch: char) -> Option<(Alphabet, u8)> {
        self.positions.get(&ch).copied()
    }

    /// ZSCII code to printable character. Code 13 is newline; codes covered
    /// by the translation table map through it; everything else passes
    /// through as-is.
    pub fn char_from_zscii(&self, zc: u16) -> char {
        match zc {
            13 => '\n',
            _ if zc >= EXTRA_BASE && ((zc - EXTRA_BASE) as usize) < self.extra.len() => {
                self.extra[(zc - EXTRA_BASE) as usize]
            }
            _ => char::from_u32(zc as u32).unwrap_or('?'),
        }
    }

    /// Printable character to ZSCII code, the inverse of `char_from_zscii`.
    pub fn zscii_from_char(&self, ch: char) -> u16 {
        match ch {
            '\n' => 13,
            _ => match self.extra.iter().position(|&c| c == ch) {
                Some(i) => EXTRA_BASE + i as u16,
                None => ch as u16,
            },
        }
    }
}

impl Default for CharTables {
    fn default() -> Self {
        CharTables::new(default_alphabets(), DEFAULT_EXTRA.to_vec())
    }
}

fn default_alphabets() -> [[char; 26]; 3] {
    [chars26(ALPHABET_A0), chars26(ALPHABET_A1), chars26(ALPHABET_A2)]
}

fn chars26(bytes: &[u8; 26]) -> [char; 26] {
    std::array::from_fn(|i| bytes[i] as char)
}

lazy_static! {
    /// Process-wide default tables, initialized once, immutable.
    pub static ref DEFAULT_TABLES: Arc<CharTables> = Arc::new(CharTables::default());
}
