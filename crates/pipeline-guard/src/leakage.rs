//! `detect_prompt_leakage`: checks whether model output verbatim-quotes a
//! window of the trusted system prompt.

/// True iff any 4-word window of `system_prompt` (only checked when it has
/// at least 5 words) appears verbatim in `output`.
pub fn detect_prompt_leakage(output: &str, system_prompt: Option<&str>) -> bool {
    let Some(system_prompt) = system_prompt else {
        return false;
    };

    let words: Vec<&str> = system_prompt.split_whitespace().collect();
    if words.len() < 5 {
        return false;
    }

    words
        .windows(4)
        .any(|window| output.contains(&window.join(" ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_system_prompt_never_leaks() {
        assert!(!detect_prompt_leakage("anything", None));
    }

    #[test]
    fn short_system_prompt_is_exempt() {
        assert!(!detect_prompt_leakage(
            "You are a translator",
            Some("You are a translator")
        ));
    }

    #[test]
    fn verbatim_window_is_detected() {
        let system = "You are a careful medical document translator assistant";
        let output = "Sure, here: a careful medical document translator is what I am.";
        assert!(detect_prompt_leakage(output, Some(system)));
    }

    #[test]
    fn paraphrase_is_not_detected() {
        let system = "You are a careful medical document translator assistant";
        let output = "I translate medical texts carefully.";
        assert!(!detect_prompt_leakage(output, Some(system)));
    }
}
