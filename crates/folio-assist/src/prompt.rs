//! Prompt text for each assist action.

use folio_core::{AssistAction, AssistRequest, Tone};

const PLAIN_ONLY: &str = "Provide ONLY the resulting text without any explanations, \
introductions, or additional commentary. Do not use quotation marks around the text.";

const ISSUES_FORMAT: &str = "Respond with a JSON array only. Each element must be an object \
with the string fields \"type\" (for example spelling, grammar or punctuation), \"original\" \
(the exact text as it appears), \"suggestion\" (the replacement) and \"description\" (a short \
explanation). Respond with [] when there are no issues.";

pub fn build(request: &AssistRequest) -> String {
    let mut prompt = match request.action {
        AssistAction::Rewrite => format!(
            "You are a writing assistant. Rewrite the following text with a {} tone",
            request.tone.unwrap_or(Tone::Professional)
        ),
        AssistAction::Proofread => "You are a proofreading assistant. Proofread and correct the \
            following text, fixing any grammar, spelling, and punctuation errors"
            .to_owned(),
        AssistAction::ProofreadChapter => "You are a proofreading assistant. Find the grammar, \
            spelling, and punctuation errors in the following chapter"
            .to_owned(),
    };
    if let Some(instructions) = request.instructions.as_deref().map(str::trim) {
        if !instructions.is_empty() {
            prompt.push_str(". Additional instructions: ");
            prompt.push_str(instructions);
        }
    }
    prompt.push_str(". ");
    match request.action {
        AssistAction::ProofreadChapter => {
            prompt.push_str(ISSUES_FORMAT);
            prompt.push_str("\n\nChapter to proofread: ");
        }
        AssistAction::Rewrite => {
            prompt.push_str(PLAIN_ONLY);
            prompt.push_str("\n\nText to rewrite: ");
        }
        AssistAction::Proofread => {
            prompt.push_str(PLAIN_ONLY);
            prompt.push_str("\n\nText to proofread: ");
        }
    }
    prompt.push_str(&request.text);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_prompt() {
        let mut request = AssistRequest::new(AssistAction::Rewrite, "hello there");
        request.tone = Some(Tone::Excited);
        request.instructions = Some("keep it short".into());
        let prompt = build(&request);
        assert!(prompt.contains("with a excited tone. Additional instructions: keep it short."));
        assert!(prompt.ends_with("Text to rewrite: hello there"));
    }

    #[test]
    fn test_blank_instructions_are_skipped() {
        let mut request = AssistRequest::new(AssistAction::Proofread, "teh cat");
        request.instructions = Some("   ".into());
        let prompt = build(&request);
        assert!(!prompt.contains("Additional instructions"));
        assert!(prompt.ends_with("Text to proofread: teh cat"));
    }

    #[test]
    fn test_chapter_prompt_asks_for_json() {
        let prompt = build(&AssistRequest::new(AssistAction::ProofreadChapter, "Body."));
        assert!(prompt.contains("JSON array"));
        assert!(prompt.contains("\"description\""));
    }
}
