//! `sanitize_for_prompt`: brace-escaping, invisible-character stripping,
//! NFKC normalization.

use unicode_normalization::UnicodeNormalization;

/// The 20 invisible/format Unicode characters that must never reach a
/// prompt template unescaped: zero-width spaces, BOM, directional marks,
/// and related format controls.
pub const INVISIBLE_CHARS: [char; 20] = [
    '\u{200B}', // zero width space
    '\u{200C}', // zero width non-joiner
    '\u{200D}', // zero width joiner
    '\u{200E}', // left-to-right mark
    '\u{200F}', // right-to-left mark
    '\u{202A}', // left-to-right embedding
    '\u{202B}', // right-to-left embedding
    '\u{202C}', // pop directional formatting
    '\u{202D}', // left-to-right override
    '\u{202E}', // right-to-left override
    '\u{2060}', // word joiner
    '\u{2061}', // function application
    '\u{2062}', // invisible times
    '\u{2063}', // invisible separator
    '\u{2064}', // invisible plus
    '\u{FEFF}', // byte order mark
    '\u{00AD}', // soft hyphen
    '\u{180E}', // mongolian vowel separator
    '\u{2066}', // left-to-right isolate
    '\u{2069}', // pop directional isolate
];

/// Escapes `{`/`}` for safe use inside a `{name}`-style template, strips
/// the invisible-character set, and NFKC-normalizes the result.
///
/// Returns the sanitized text and whether anything was changed.
pub fn sanitize_for_prompt(text: &str) -> (String, bool) {
    let mut modified = false;

    let escaped: String = text
        .chars()
        .flat_map(|c| {
            modified |= c == '{' || c == '}';
            match c {
                '{' => vec!['{', '{'],
                '}' => vec!['}', '}'],
                other => vec![other],
            }
        })
        .collect();

    let stripped: String = escaped
        .chars()
        .filter(|c| {
            let keep = !INVISIBLE_CHARS.contains(c);
            modified |= !keep;
            keep
        })
        .collect();

    let before_len = stripped.chars().count();
    let normalized: String = stripped.nfkc().collect();
    if normalized.chars().count() != before_len || normalized != stripped {
        modified = true;
    }

    (normalized, modified)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_braces() {
        let (out, modified) = sanitize_for_prompt("value {x} end");
        assert_eq!(out, "value {{x}} end");
        assert!(modified);
    }

    #[test]
    fn strips_invisible_characters() {
        let input = format!("hello{}world", '\u{200B}');
        let (out, modified) = sanitize_for_prompt(&input);
        assert_eq!(out, "helloworld");
        assert!(modified);
    }

    #[test]
    fn leaves_plain_text_unmodified() {
        let (out, modified) = sanitize_for_prompt("Diagnose: Morbus Parkinson");
        assert_eq!(out, "Diagnose: Morbus Parkinson");
        assert!(!modified);
    }

    #[test]
    fn contains_no_unescaped_brace_or_invisible_char() {
        let input = "{a}\u{200B}{{b}}\u{FEFF}";
        let (out, _) = sanitize_for_prompt(input);
        for c in INVISIBLE_CHARS {
            assert!(!out.contains(c));
        }
        // every `{` is part of a doubled pair
        let mut chars = out.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '{' {
                assert_eq!(chars.peek(), Some(&'{'));
                chars.next();
            }
        }
    }

    fn assert_no_unescaped_brace_or_invisible(out: &str) {
        for c in INVISIBLE_CHARS {
            assert!(!out.contains(c));
        }
        let mut chars = out.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '{' {
                assert_eq!(chars.peek(), Some(&'{'));
                chars.next();
            }
        }
    }

    proptest::proptest! {
        #[test]
        fn sanitize_for_prompt_never_leaves_unescaped_brace_or_invisible_char(
            s in "[a-zA-Z0-9 {}\u{200B}\u{FEFF}.,:-]{0,80}"
        ) {
            let (out, _) = sanitize_for_prompt(&s);
            assert_no_unescaped_brace_or_invisible(&out);
        }
    }
}
