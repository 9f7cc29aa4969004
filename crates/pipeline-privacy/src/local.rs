//! Local regex-only PII filter, used as the degraded fallback when the
//! remote privacy filter is unreachable after retries.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::placeholders::is_placeholder;

struct Rule {
    placeholder: &'static str,
    regex: &'static str,
}

/// German-document-oriented patterns. Order matters: more specific formats
/// (IBAN, email) run before looser ones (generic name/date) so a later,
/// broader rule can't eat an already-classified span.
static RULES: &[Rule] = &[
    Rule { placeholder: "[EMAIL]", regex: r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}" },
    Rule { placeholder: "[IBAN]", regex: r"(?i)\bDE\d{2}\s?(\d{4}\s?){4}\d{2}\b" },
    Rule { placeholder: "[URL]", regex: r"(?i)\bhttps?://[^\s]+" },
    Rule { placeholder: "[IP_ADDRESS]", regex: r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b" },
    Rule { placeholder: "[FAX]", regex: r"(?i)\bfax[:\s]+[+0-9()\s/-]{6,}" },
    Rule { placeholder: "[PHONE]", regex: r"(?i)\b(?:tel\.?|telefon)[:\s]+[+0-9()\s/-]{6,}|\+49[0-9()\s/-]{6,}" },
    Rule { placeholder: "[BIRTHDATE]", regex: r"(?i)(geb\.?|geboren am)\s*\d{1,2}\.\d{1,2}\.\d{2,4}" },
    Rule { placeholder: "[DATE]", regex: r"\b\d{1,2}\.\d{1,2}\.\d{2,4}\b" },
    Rule { placeholder: "[TIME]", regex: r"\b\d{1,2}:\d{2}(:\d{2})?\s?(Uhr)?\b" },
    Rule { placeholder: "[PLZ_CITY]", regex: r"\b\d{5}\s+[A-ZÄÖÜ][a-zäöüß]+(-[A-ZÄÖÜ][a-zäöüß]+)?\b" },
    Rule { placeholder: "[TAX_ID]", regex: r"(?i)steuer(-?id(entifikationsnummer)?)?[:\s]+\d{11}" },
    Rule { placeholder: "[SOCIAL_SECURITY]", regex: r"\b\d{2}\s?\d{6}\s?[A-Z]\s?\d{3}\b" },
    Rule { placeholder: "[INSURANCE_ID]", regex: r"(?i)versicherten(nummer|id)[:\s]+[A-Z]\d{9}" },
    Rule { placeholder: "[CREDIT_CARD]", regex: r"\b(?:\d[ -]*?){13,16}\b" },
];

static COMPILED: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    RULES
        .iter()
        .map(|r| (r.placeholder, Regex::new(r.regex).expect("static PII pattern must compile")))
        .collect()
});

/// Replaces detected PII spans with their fixed placeholder, skipping any
/// text that is one of `protected_terms` (masked out before matching and
/// restored afterwards) and never re-matching a placeholder it already
/// produced — the property that makes this idempotent.
pub fn remove_pii_local(text: &str, protected_terms: &[String]) -> String {
    let mut masked = text.to_string();
    let mut restore = Vec::new();
    for (i, term) in protected_terms.iter().enumerate() {
        if term.is_empty() {
            continue;
        }
        let sentinel = format!("\u{E000}PROTECTED{i}\u{E000}");
        if masked.contains(term.as_str()) {
            masked = masked.replace(term.as_str(), &sentinel);
            restore.push((sentinel, term.clone()));
        }
    }

    if is_placeholder(masked.trim()) {
        return text.to_string();
    }

    let mut out = masked;
    for (placeholder, re) in COMPILED.iter() {
        out = re.replace_all(&out, *placeholder).into_owned();
    }

    for (sentinel, original) in restore {
        out = out.replace(&sentinel, &original);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_email_with_placeholder() {
        let out = remove_pii_local("Kontakt: max.mustermann@klinik.de", &[]);
        assert!(out.contains("[EMAIL]"));
        assert!(!out.contains("max.mustermann@klinik.de"));
    }

    #[test]
    fn preserves_protected_terms() {
        let out = remove_pii_local(
            "Diagnose: Morbus Parkinson, Kontakt: a@b.de",
            &["Morbus Parkinson".to_string()],
        );
        assert!(out.contains("Morbus Parkinson"));
        assert!(out.contains("[EMAIL]"));
    }

    #[test]
    fn is_idempotent() {
        let input = "Geboren am 01.02.1980, Tel. 030 1234567, a@b.de";
        let once = remove_pii_local(input, &[]);
        let twice = remove_pii_local(&once, &[]);
        assert_eq!(once, twice);
    }

    #[test]
    fn cleaned_length_never_exceeds_original() {
        let input = "max.mustermann@klinik.de am 01.02.1980";
        let out = remove_pii_local(input, &[]);
        assert!(out.len() <= input.len());
    }

    proptest::proptest! {
        #[test]
        fn remove_pii_local_is_idempotent(s in "[a-zA-Z0-9 .@:/+-]{0,80}") {
            let once = remove_pii_local(&s, &[]);
            let twice = remove_pii_local(&once, &[]);
            proptest::prop_assert_eq!(once, twice);
        }
    }
}
