//! Masking parts of OCR strings.

use fott_core::Span;
use fott_rules::mask_char;

/// Masks the characters of `text` covered by `span`. Offsets count
/// characters; a span reaching past the end is clamped.
pub fn mask_span(text: &str, span: Span) -> String {
    let start = span.offset;
    let end = span.end();
    text.chars()
        .enumerate()
        .map(|(i, c)| if i >= start && i < end { mask_char(c) } else { c })
        .collect()
}

/// Masks the `index`-th token of `text` split on single spaces. Returns
/// `None` when there is no such token.
pub fn mask_token(text: &str, index: usize) -> Option<String> {
    let mut tokens: Vec<String> = text.split(' ').map(str::to_string).collect();
    let token = tokens.get_mut(index)?;
    *token = fott_rules::mask(token);
    Some(tokens.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_span() {
        assert_eq!(mask_span("Name: John Smith", Span::new(6, 4)), "Name: Aaaa Smith");
        assert_eq!(mask_span("abc", Span::new(0, 0)), "abc");
    }

    #[test]
    fn test_mask_span_counts_chars() {
        assert_eq!(mask_span("Né à Zoë 12", Span::new(5, 3)), "Né à Aaa 12");
    }

    #[test]
    fn test_mask_span_clamped() {
        assert_eq!(mask_span("ab 12", Span::new(3, 10)), "ab 00");
        assert_eq!(mask_span("ab", Span::new(5, 1)), "ab");
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("Total $3000.00", 1).as_deref(), Some("Total $0000.00"));
        assert_eq!(mask_token("Total $3000.00", 2), None);
        // Double spaces produce an empty token at that index.
        assert_eq!(mask_token("a  B", 2).as_deref(), Some("a  A"));
    }
}
