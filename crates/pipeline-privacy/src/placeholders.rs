//! The fixed placeholder vocabulary `remove_pii` must use in place of
//! detected PII.

pub const PLACEHOLDERS: &[&str] = &[
    "[NAME]",
    "[DOCTOR_NAME]",
    "[PATIENT_NAME]",
    "[BIRTHDATE]",
    "[DATE]",
    "[PHONE]",
    "[FAX]",
    "[EMAIL]",
    "[ADDRESS]",
    "[PLZ_CITY]",
    "[TAX_ID]",
    "[SOCIAL_SECURITY]",
    "[INSURANCE_ID]",
    "[PATIENT_ID]",
    "[REFERENCE_ID]",
    "[IBAN]",
    "[CREDIT_CARD]",
    "[IP_ADDRESS]",
    "[URL]",
    "[LOCATION]",
    "[ORGANIZATION]",
    "[TIME]",
];

/// True for any string already in the placeholder vocabulary — used by the
/// local fallback to short-circuit re-scanning text it has already
/// replaced, which is what makes a second pass idempotent.
pub fn is_placeholder(s: &str) -> bool {
    PLACEHOLDERS.contains(&s)
}
