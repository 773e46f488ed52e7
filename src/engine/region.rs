/// If the prompt text ended with a newline, the replacement gets one too.
/// Keeps paragraph spacing stable regardless of how the model terminates
/// its output.
pub fn adjust_result(result: &str, prompt_had_trailing_newline: bool) -> String {
    if prompt_had_trailing_newline {
        format!("{}\n", result)
    } else {
        result.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_newline_prompt_gets_newline_back() {
        assert_eq!(adjust_result("fixed", true), "fixed\n");
    }

    #[test]
    fn prompt_without_trailing_newline_is_untouched() {
        assert_eq!(adjust_result("fixed", false), "fixed");
    }

    #[test]
    fn result_newlines_are_not_deduplicated() {
        // The rule appends unconditionally; normalizing model output is not
        // this layer's job.
        assert_eq!(adjust_result("fixed\n", true), "fixed\n\n");
    }
}
