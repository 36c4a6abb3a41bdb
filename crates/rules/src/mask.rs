//! The "Aa0" mask policy.
//!
//! Every Latin letter becomes `A` or `a` by case, every digit becomes `0`, and
//! everything else is kept, so masked text keeps its shape (`$3000.00` becomes
//! `$0000.00`) without keeping its content. Accented letters are reduced to
//! their base letter first; ligatures without a canonical decomposition
//! (such as `œ`) are still letters and mask the same way.
//!
//! The mapping is one character in, one character out. OCR spans count
//! characters, so masked text must never change length.

use unicode_normalization::char::{decompose_canonical, is_combining_mark};

/// Masks `text` character by character.
pub fn mask(text: &str) -> String {
    text.chars().map(mask_char).collect()
}

/// Masks one character. Non-alphanumeric characters are returned unchanged.
pub fn mask_char(c: char) -> char {
    let base = base_char(c);
    if is_latin_letter(base) {
        if base.is_uppercase() || is_titlecase(base) {
            'A'
        } else {
            'a'
        }
    } else if is_decimal_digit(base) {
        '0'
    } else {
        c
    }
}

/// First non-combining character of the canonical decomposition.
fn base_char(c: char) -> char {
    if is_combining_mark(c) {
        return c;
    }
    let mut base = None;
    decompose_canonical(c, |d| {
        if base.is_none() && !is_combining_mark(d) {
            base = Some(d);
        }
    });
    base.unwrap_or(c)
}

fn is_latin_letter(c: char) -> bool {
    let latin_block = matches!(
        c as u32,
        0x0041..=0x005A
            | 0x0061..=0x007A
            | 0x00AA
            | 0x00BA
            | 0x00C0..=0x00D6
            | 0x00D8..=0x00F6
            | 0x00F8..=0x02AF
            | 0x1D00..=0x1D7F
            | 0x1E00..=0x1EFF
            | 0x2C60..=0x2C7F
            | 0xA720..=0xA7FF
            | 0xAB30..=0xAB6F
            | 0xFB00..=0xFB06
            | 0xFF21..=0xFF3A
            | 0xFF41..=0xFF5A
    );
    latin_block && c.is_alphabetic()
}

// Digraphs such as U+01C5 are neither upper nor lower case.
fn is_titlecase(c: char) -> bool {
    matches!(c, '\u{01C5}' | '\u{01C8}' | '\u{01CB}' | '\u{01F2}')
}

fn is_decimal_digit(c: char) -> bool {
    c.is_ascii_digit() || ('\u{FF10}'..='\u{FF19}').contains(&c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mask_empty() {
        assert_eq!(mask(""), "");
    }

    #[test]
    fn test_mask_apple() {
        assert_eq!(mask("Apple"), "Aaaaa");
    }

    #[test]
    fn test_mask_date() {
        assert_eq!(mask("1900/01/01"), "0000/00/00");
    }

    #[test]
    fn test_mask_price() {
        assert_eq!(mask("$3000.00"), "$0000.00");
    }

    #[test]
    fn test_mask_diacritics() {
        assert_eq!(mask("José Ñúñez"), "Aaaa Aaaaa");
        assert_eq!(mask("Ærøskøbing"), "Aaaaaaaaaa");
    }

    #[test]
    fn test_mask_ligatures() {
        assert_eq!(mask("Œuvre cœur"), "Aaaaa aaaa");
        assert_eq!(mask("Straße"), "Aaaaaa");
    }

    #[test]
    fn test_mask_keeps_other_scripts() {
        assert_eq!(mask("東京 Tokyo 2024"), "東京 Aaaaa 0000");
        assert_eq!(mask("Иван"), "Иван");
    }

    #[test]
    fn test_mask_fullwidth() {
        assert_eq!(mask("ＡＢｃ１２"), "AAa00");
    }

    #[test]
    fn test_standalone_combining_mark_kept() {
        // "e" followed by a combining acute accent.
        assert_eq!(mask("e\u{0301}"), "a\u{0301}");
    }

    proptest! {
        #[test]
        fn prop_mask_is_idempotent(text in "\\PC*") {
            let once = mask(&text);
            prop_assert_eq!(mask(&once), once);
        }

        #[test]
        fn prop_mask_preserves_length(text in "\\PC*") {
            prop_assert_eq!(mask(&text).chars().count(), text.chars().count());
        }

        #[test]
        fn prop_non_alphanumerics_are_fixed(text in "[ !-/:-@\\[-`{-~]*") {
            prop_assert_eq!(mask(&text), text);
        }

        #[test]
        fn prop_output_alphabet(text in "[A-Za-z0-9]*") {
            prop_assert!(mask(&text).chars().all(|c| c == 'A' || c == 'a' || c == '0'));
        }
    }
}
