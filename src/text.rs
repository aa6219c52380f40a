//! Packed-string decoding and dictionary-word encoding.
//!
//! Z-machine strings pack three 5-bit z-characters per 16-bit word; bit 15
//! of the final word terminates the string. Decoding runs a small state
//! machine over the z-characters (shifts, abbreviations, ZSCII escapes).
//! Encoding is only needed for dictionary lookups, so it truncates or pads
//! to the fixed dictionary resolution and never emits abbreviations.

use crate::error::TextError;
use crate::mem::StoryMemory;
use crate::zscii::{Alphabet, CharTables};
use log::trace;
use std::sync::Arc;

/// Where abbreviation strings live. The codec asks the collaborator for the
/// byte address of abbreviation `index` and decodes the string found there.
pub trait AbbrevSource {
    fn abbreviation(&self, mem: &StoryMemory, index: u8) -> Result<u32, TextError>;
}

/// The standard abbreviation table: 96 word-address entries starting at
/// `base`.
pub struct AbbrevTable {
    base: u16,
}

impl AbbrevTable {
    pub fn new(base: u16) -> Self {
        AbbrevTable { base }
    }
}

impl AbbrevSource for AbbrevTable {
    fn abbreviation(&self, mem: &StoryMemory, index: u8) -> Result<u32, TextError> {
        let entry = self.base as u32 + 2 * index as u32;
        let word_addr = mem.read_word(entry)?;
        Ok(word_addr as u32 * 2) // word address, not byte address!
    }
}

/// Decode-loop state. One value per in-flight decode.
///
/// Historically this was a pair of mutable `alphabet`/`abbrev_mode` ints
/// threaded through the loop; the enum makes the illegal combinations
/// unrepresentable (a pending ZSCII escape cannot coexist with a pending
/// abbreviation selector).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    Alpha(Alphabet),
    /// Next z-char selects an abbreviation from `bank` (1-3). The alphabet
    /// in effect is restored once the abbreviation has been appended.
    Abbrev { bank: u8, alpha: Alphabet },
    /// Next z-char is the high 5 bits of a 10-bit ZSCII escape.
    ZsciiHigh,
    /// Next z-char is the low 5 bits.
    ZsciiLow { high: u8 },
}

/// The text codec for one interpreter instance.
pub struct ZText {
    tables: Arc<CharTables>,
    dict_zchars: usize,
}

impl ZText {
    /// `version` selects the dictionary resolution: 6 z-chars for V1-3,
    /// 9 for V4 and up.
    pub fn new(tables: Arc<CharTables>, version: u8) -> Self {
        ZText {
            tables,
            dict_zchars: if version >= 4 { 9 } else { 6 },
        }
    }

    pub fn tables(&self) -> &Arc<CharTables> {
        &self.tables
    }

    /// Decode the packed string at `addr`.
    ///
    /// Returns the text and the number of bytes consumed (two per word,
    /// terminator word included). Fails with `MalformedString` if no
    /// terminator is found before the end of the memory image.
    pub fn decode_string(
        &self,
        mem: &StoryMemory,
        addr: u32,
        abbrevs: &dyn AbbrevSource,
    ) -> Result<(String, usize), TextError> {
        self.decode_inner(mem, addr, Some(abbrevs))
    }

    // `abbrevs` is None while decoding an abbreviation's own text:
    // abbreviations may not nest, so selector z-chars become inert and the
    // z-chars that follow them decode as literal alphabet characters.
    fn decode_inner(
        &self,
        mem: &StoryMemory,
        addr: u32,
        abbrevs: Option<&dyn AbbrevSource>,
    ) -> Result<(String, usize), TextError> {
        let mut out = String::new();
        let mut state = DecodeState::Alpha(Alphabet::Lower);
        let mut offset = addr;

        loop {
            let word = mem
                .read_word(offset)
                .map_err(|_| TextError::MalformedString(addr))?;
            offset += 2;

            for shift in [10u16, 5, 0] {
                let zc = ((word >> shift) & 0x1f) as u8;
                state = self.decode_zchar(mem, abbrevs, zc, state, &mut out)?;
            }

            if word & 0x8000 != 0 {
                break;
            }
        }

        Ok((out, (offset - addr) as usize))
    }

    fn decode_zchar(
        &self,
        mem: &StoryMemory,
        abbrevs: Option<&dyn AbbrevSource>,
        zc: u8,
        state: DecodeState,
        out: &mut String,
    ) -> Result<DecodeState, TextError> {
        use DecodeState::*;

        match state {
            Abbrev { bank, alpha } => {
                let index = 32 * (bank - 1) + zc;
                // Abbrev is only entered when a source is present.
                if let Some(src) = abbrevs {
                    let abbrev_addr = src.abbreviation(mem, index)?;
                    trace!("abbreviation {} at {:#06x}", index, abbrev_addr);
                    let (text, _) = self.decode_inner(mem, abbrev_addr, None)?;
                    out.push_str(&text);
                }
                Ok(Alpha(alpha))
            }

            ZsciiHigh => Ok(ZsciiLow { high: zc }),

            ZsciiLow { high } => {
                let code = ((high as u16) << 5) | zc as u16;
                out.push(self.tables.char_from_zscii(code));
                Ok(Alpha(Alphabet::Lower))
            }

            Alpha(alpha) => match zc {
                0 => {
                    out.push(' ');
                    Ok(Alpha(alpha))
                }
                1..=3 => {
                    if abbrevs.is_some() {
                        Ok(Abbrev { bank: zc, alpha })
                    } else {
                        // inside an abbreviation: selector is inert
                        trace!("abbreviation selector {} ignored inside abbreviation", zc);
                        Ok(Alpha(alpha))
                    }
                }
                4 => Ok(Alpha(Alphabet::Upper)),
                5 => Ok(Alpha(Alphabet::Punct)),
                _ => {
                    let index = zc - 6;
                    match alpha {
                        Alphabet::Lower => {
                            out.push(self.tables.alphabet_char(alpha, index));
                            Ok(Alpha(Alphabet::Lower))
                        }
                        // shifts are single-shot: one character, then back to A0
                        Alphabet::Upper => {
                            out.push(self.tables.alphabet_char(alpha, index));
                            Ok(Alpha(Alphabet::Lower))
                        }
                        Alphabet::Punct => {
                            if index == 0 {
                                Ok(ZsciiHigh)
                            } else {
                                out.push(self.tables.alphabet_char(alpha, index));
                                Ok(Alpha(Alphabet::Lower))
                            }
                        }
                    }
                }
            },
        }
    }

    /// Encode `word` for dictionary matching: truncated or padded to the
    /// fixed z-char resolution, terminator bit set on the final word.
    ///
    /// Characters outside the compiled alphabets are emitted as 4-z-char
    /// ZSCII escapes.
    pub fn encode_dict_word(&self, word: &str) -> Vec<u8> {
        let mut zchars: Vec<u8> = Vec::with_capacity(self.dict_zchars + 3);
        for ch in word.chars() {
            if zchars.len() >= self.dict_zchars {
                break;
            }
            self.encode_char(ch, &mut zchars);
        }
        zchars.truncate(self.dict_zchars);
        while zchars.len() < self.dict_zchars {
            zchars.push(5); // pad (S 3.7)
        }

        let words = zchars.len() / 3;
        let mut bytes = Vec::with_capacity(words * 2);
        for (i, triple) in zchars.chunks(3).enumerate() {
            let mut w =
                ((triple[0] as u16) << 10) | ((triple[1] as u16) << 5) | triple[2] as u16;
            if i == words - 1 {
                w |= 0x8000;
            }
            bytes.push((w >> 8) as u8);
            bytes.push((w & 0xff) as u8);
        }
        bytes
    }

    fn encode_char(&self, ch: char, zchars: &mut Vec<u8>) {
        if ch == ' ' {
            zchars.push(0);
            return;
        }
        if let Some((alpha, index)) = self.tables.lookup(ch) {
            match alpha {
                Alphabet::Lower => {}
                Alphabet::Upper => zchars.push(4),
                Alphabet::Punct => zchars.push(5),
            }
            zchars.push(index + 6);
        } else {
            // raw ZSCII escape: shift to A2, escape slot, then the 10-bit code
            let code = self.tables.zscii_from_char(ch);
            let code = if code > 0x3ff { b'?' as u16 } else { code };
            zchars.push(5);
            zchars.push(6);
            zchars.push(((code >> 5) & 0x1f) as u8);
            zchars.push((code & 0x1f) as u8);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zscii::DEFAULT_TABLES;
    use test_log::test;

    /// No abbreviations defined; any lookup is a test bug.
    struct NoAbbrevs;

    impl AbbrevSource for NoAbbrevs {
        fn abbreviation(&self, _mem: &StoryMemory, index: u8) -> Result<u32, TextError> {
            panic!("unexpected abbreviation lookup: {}", index);
        }
    }

    fn codec() -> ZText {
        ZText::new(Arc::clone(&DEFAULT_TABLES), 3)
    }

    /// Pack z-chars three per word and write them at `addr`, setting the
    /// terminator bit on the last word.
    fn store_zchars(mem: &mut StoryMemory, addr: u32, zchars: &[u8]) {
        assert!(zchars.len() % 3 == 0);
        let words = zchars.len() / 3;
        for (i, triple) in zchars.chunks(3).enumerate() {
            let mut w =
                ((triple[0] as u16) << 10) | ((triple[1] as u16) << 5) | triple[2] as u16;
            if i == words - 1 {
                w |= 0x8000;
            }
            mem.write_word(addr + 2 * i as u32, w).unwrap();
        }
    }

    fn memory() -> StoryMemory {
        StoryMemory::new(vec![0u8; 1024], 1024)
    }

    #[test]
    fn decode_simple_string() {
        let mut mem = memory();
        // "hello": h=13, e=10, l=17, l=17, o=20 (z-char = index + 6)
        store_zchars(&mut mem, 10, &[13, 10, 17, 17, 20, 5]);

        let (text, len) = codec().decode_string(&mem, 10, &NoAbbrevs).unwrap();
        assert_eq!(text, "hello");
        assert_eq!(len, 4);
    }

    #[test]
    fn decode_string_with_space() {
        let mut mem = memory();
        // "a b": a=6, space=0, b=7
        store_zchars(&mut mem, 20, &[6, 0, 7]);

        let (text, len) = codec().decode_string(&mem, 20, &NoAbbrevs).unwrap();
        assert_eq!(text, "a b");
        assert_eq!(len, 2);
    }

    #[test]
    fn shifts_are_single_shot() {
        let mut mem = memory();
        // shift-A1 'H', then 'i' back in A0; shift-A2 '1'
        store_zchars(&mut mem, 30, &[4, 13, 14, 5, 9, 5]);

        let (text, _) = codec().decode_string(&mem, 30, &NoAbbrevs).unwrap();
        assert_eq!(text, "Hi1");
    }

    #[test]
    fn zscii_escape_decodes_through_translation_table() {
        let mut mem = memory();
        // shift-A2, escape, high, low for ZSCII 155 (0b00100_11011) = 'ä'
        store_zchars(&mut mem, 40, &[5, 6, 4, 27, 5, 5]);

        let (text, _) = codec().decode_string(&mem, 40, &NoAbbrevs).unwrap();
        assert_eq!(text, "ä");
    }

    #[test]
    fn abbreviation_expands_once() {
        let mut mem = memory();
        // abbreviation 0 stores "the"
        store_zchars(&mut mem, 100, &[25, 13, 10]); // t=25, h=13, e=10
        // table entry 0 -> word address 50 (byte 100)
        mem.write_word(200, 50).unwrap();
        // main string: abbrev bank 1 selector, index 0, then "y"
        store_zchars(&mut mem, 300, &[1, 0, 30]);

        let codec = codec();
        let abbrevs = AbbrevTable::new(200);
        let (text, _) = codec.decode_string(&mem, 300, &abbrevs).unwrap();
        assert_eq!(text, "they");
    }

    #[test]
    fn abbreviation_does_not_recurse() {
        let mut mem = memory();
        // abbreviation 0 contains a selector z-char followed by "h": the
        // selector must be inert, and 13 must decode as the letter.
        store_zchars(&mut mem, 100, &[1, 13, 5]);
        mem.write_word(200, 50).unwrap();
        store_zchars(&mut mem, 300, &[1, 0, 5]);

        let abbrevs = AbbrevTable::new(200);
        let (text, _) = codec().decode_string(&mem, 300, &abbrevs).unwrap();
        assert_eq!(text, "h");
    }

    #[test]
    fn alphabet_survives_abbreviation() {
        let mut mem = memory();
        // abbreviation 0 = "a"
        store_zchars(&mut mem, 100, &[6, 5, 5]);
        mem.write_word(200, 50).unwrap();
        // shift-A1, abbrev selector, index 0, then z-char 6: the pending
        // shift applies to the character after the abbreviation
        store_zchars(&mut mem, 300, &[4, 1, 0, 6, 5, 5]);

        let abbrevs = AbbrevTable::new(200);
        let (text, _) = codec().decode_string(&mem, 300, &abbrevs).unwrap();
        assert_eq!(text, "aA");
    }

    #[test]
    fn missing_terminator_is_malformed() {
        // every word readable, none with bit 15 set
        let mem = StoryMemory::new(vec![0u8; 16], 16);
        let err = codec().decode_string(&mem, 0, &NoAbbrevs).unwrap_err();
        assert_eq!(err, TextError::MalformedString(0));
    }

    #[test]
    fn encode_pads_to_resolution() {
        let bytes = codec().encode_dict_word("go");
        // g=12, o=20, pad 5 x4; two words, terminator on the last
        assert_eq!(bytes.len(), 4);
        let w0 = ((bytes[0] as u16) << 8) | bytes[1] as u16;
        let w1 = ((bytes[2] as u16) << 8) | bytes[3] as u16;
        assert_eq!(w0, (12 << 10) | (20 << 5) | 5);
        assert_eq!(w1, 0x8000 | (5 << 10) | (5 << 5) | 5);
    }

    #[test]
    fn encode_truncates_long_words() {
        let mut mem = memory();
        let bytes = codec().encode_dict_word("weatherbeaten");
        assert_eq!(bytes.len(), 4); // 6 z-chars in V3

        // round trip through decode recovers the truncated prefix
        for (i, b) in bytes.iter().enumerate() {
            mem.write_byte(500 + i as u32, *b).unwrap();
        }
        let (text, _) = codec().decode_string(&mem, 500, &NoAbbrevs).unwrap();
        assert_eq!(text, "weathe");
    }

    #[test]
    fn encode_resolution_is_nine_zchars_in_v4() {
        let codec = ZText::new(Arc::clone(&DEFAULT_TABLES), 5);
        assert_eq!(codec.encode_dict_word("weatherbeaten").len(), 6);
    }

    #[test]
    fn extra_char_encode_decode_round_trip() {
        let mut mem = memory();
        let codec = ZText::new(Arc::clone(&DEFAULT_TABLES), 5);
        let bytes = codec.encode_dict_word("naïve");
        for (i, b) in bytes.iter().enumerate() {
            mem.write_byte(600 + i as u32, *b).unwrap();
        }
        let (text, _) = codec.decode_string(&mem, 600, &NoAbbrevs).unwrap();
        assert_eq!(text, "naïve");
    }
}
