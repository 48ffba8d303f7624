//! Converts DAB label byte strings into `String`s according to their charset id.
//!
//! DOC: ETSI EN 300 401 Clause 5.2, Annex C. Unmappable bytes are replaced with
//! `U+FFFD` rather than erroring, matching the "never poisons the updater"
//! policy applied everywhere else in the FIG/label pipeline.

const CHARSET_EBU_LATIN: u8 = 0;
const CHARSET_UTF8: u8 = 0b1111;
const CHARSET_UCS2_BE: u8 = 0b0110;
const CHARSET_ISO_8859_1: u8 = 0b0001;

/// A conservative subset of the EBU Latin (EN 300 401 Annex C) table: ASCII
/// passes through unchanged; bytes 0xA0..=0xFF outside ASCII that do not map to
/// a known EBU Latin code point become the replacement character.
fn ebu_latin_to_char(byte: u8) -> char {
    if byte < 0x80 {
        byte as char
    } else {
        match byte {
            0xC0 => 'à', 0xC1 => 'á', 0xC8 => 'è', 0xC9 => 'é',
            0xCC => 'ì', 0xCD => 'í', 0xD2 => 'ò', 0xD3 => 'ó',
            0xD9 => 'ù', 0xDA => 'ú', 0xE8 => 'À', 0xE9 => 'Á',
            _ => '\u{FFFD}',
        }
    }
}

/// Converts a raw DAB label byte string into a `String`, replacing any byte (or
/// byte pair, for UCS-2) that cannot be mapped with `U+FFFD`.
pub fn convert_charset_to_utf8(bytes: &[u8], charset_id: u8) -> String {
    match charset_id {
        CHARSET_UTF8 => String::from_utf8_lossy(bytes).into_owned(),
        CHARSET_ISO_8859_1 => bytes.iter().map(|&b| b as char).collect(),
        CHARSET_UCS2_BE => bytes
            .chunks(2)
            .map(|chunk| {
                if chunk.len() == 2 {
                    char::from_u32(u16::from_be_bytes([chunk[0], chunk[1]]) as u32).unwrap_or('\u{FFFD}')
                } else {
                    '\u{FFFD}'
                }
            })
            .collect(),
        CHARSET_EBU_LATIN => bytes.iter().map(|&b| ebu_latin_to_char(b)).collect(),
        _ => bytes.iter().map(|&b| ebu_latin_to_char(b)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_passes_through_every_charset() {
        let label = b"Radio 1";
        assert_eq!(convert_charset_to_utf8(label, CHARSET_EBU_LATIN), "Radio 1");
        assert_eq!(convert_charset_to_utf8(label, CHARSET_UTF8), "Radio 1");
        assert_eq!(convert_charset_to_utf8(label, CHARSET_ISO_8859_1), "Radio 1");
    }

    #[test]
    fn unmappable_bytes_become_replacement_character() {
        let out = convert_charset_to_utf8(&[0x81], CHARSET_EBU_LATIN);
        assert_eq!(out, "\u{FFFD}");
    }

    #[test]
    fn ucs2_decodes_big_endian_pairs() {
        let out = convert_charset_to_utf8(&[0x00, 0x41, 0x00, 0x42], CHARSET_UCS2_BE);
        assert_eq!(out, "AB");
    }
}
