//! Python-`str.format`-style `{name}` placeholder substitution (§4.H step
//! 3). A referenced placeholder missing from the context fails the step
//! unless it's one of [`crate::types::KNOWN_OPTIONAL_KEYS`], in which case
//! it's replaced with the empty string.

use crate::error::ExecutorError;
use crate::types::{ExecutionContext, KNOWN_OPTIONAL_KEYS};

/// Substitutes every `{name}` in `template` from `context`. Literal braces
/// must already be escaped (`{{`/`}}`) by the caller via
/// `pipeline_guard::sanitize_for_prompt` before this runs.
pub fn substitute(template: &str, context: &ExecutionContext) -> Result<String, ExecutorError> {
    let mut out = String::with_capacity(template.len());
    let bytes = template.as_bytes();

    let mut i = 0;
    while i < bytes.len() {
        let c = template[i..].chars().next().unwrap();
        if c == '{' {
            if template[i..].starts_with("{{") {
                out.push('{');
                i += 2;
                continue;
            }
            if let Some(end) = template[i..].find('}') {
                let name = &template[i + 1..i + end];
                if name.is_empty() || name.contains(' ') {
                    // Not a placeholder (e.g. a stray `{`); pass through literally.
                    out.push('{');
                    i += 1;
                    continue;
                }
                match context.get(name) {
                    Some(value) => out.push_str(value),
                    None if KNOWN_OPTIONAL_KEYS.contains(&name) => {}
                    None => return Err(ExecutorError::UndefinedPlaceholder(name.to_string())),
                }
                i += end + 1;
                continue;
            }
            out.push('{');
            i += 1;
            continue;
        }
        if c == '}' && template[i..].starts_with("}}") {
            out.push('}');
            i += 2;
            continue;
        }
        out.push(c);
        i += c.len_utf8();
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_key() {
        let ctx = ExecutionContext::seeded("hello world", None);
        let out = substitute("Text: {input_text}", &{
            let mut c = ctx.clone();
            c.set("input_text", "hello world");
            c
        })
        .unwrap();
        assert_eq!(out, "Text: hello world");
    }

    #[test]
    fn missing_optional_key_becomes_empty() {
        let ctx = ExecutionContext::seeded("x", None);
        let out = substitute("lang={target_language}", &ctx).unwrap();
        assert_eq!(out, "lang=");
    }

    #[test]
    fn missing_required_key_errors() {
        let ctx = ExecutionContext::seeded("x", None);
        let err = substitute("value={totally_unknown}", &ctx).unwrap_err();
        assert!(matches!(err, ExecutorError::UndefinedPlaceholder(name) if name == "totally_unknown"));
    }

    #[test]
    fn escaped_braces_pass_through_literally() {
        let ctx = ExecutionContext::seeded("x", None);
        let out = substitute("json: {{\"a\": 1}}", &ctx).unwrap();
        assert_eq!(out, "json: {\"a\": 1}");
    }
}
