//! Wire format of the `v1beta` `generateContent` call.
//!
//! Answers are read strictly: the text is the concatenation of the first
//! candidate's parts, a top-level `error` object wins over everything else,
//! and chapter proofreading must come back as a JSON array of issues.

use folio_core::{AssistAction, AssistOutput, ProofreadIssue};
use serde::{Deserialize, Serialize};

use crate::error::TransformError;

pub const API_VERSION: &str = "v1beta";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl GenerationConfig {
    pub fn for_action(action: AssistAction) -> Self {
        Self {
            temperature: match action {
                AssistAction::Rewrite => 0.7,
                AssistAction::Proofread | AssistAction::ProofreadChapter => 0.2,
            },
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
        }
    }
}

impl GenerateRequest {
    pub fn new(prompt: String, action: AssistAction) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part { text: Some(prompt) }],
            }],
            generation_config: GenerationConfig::for_action(action),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    #[serde(default)]
    message: Option<String>,
}

/// Pull the generated text out of a response body.
pub fn extract_text(body: &str) -> Result<String, TransformError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| TransformError::Envelope {
            reason: e.to_string(),
        })?;
    if let Some(error) = envelope.error {
        return Err(TransformError::Provider {
            message: error
                .message
                .unwrap_or_else(|| "Error processing text".to_owned()),
        });
    }
    let content = envelope
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .ok_or_else(|| TransformError::Envelope {
            reason: "no candidates in response".to_owned(),
        })?;
    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
    if text.trim().is_empty() {
        return Err(TransformError::Envelope {
            reason: "candidate has no text".to_owned(),
        });
    }
    Ok(text)
}

/// Remove a surrounding markdown code fence, with or without a language tag.
pub fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string line ("json", "text", ...).
    match body.split_once('\n') {
        Some((info, inner)) if !info.trim().contains(' ') => inner.trim(),
        _ => body.trim(),
    }
}

/// Parse a chapter proofreading answer.
///
/// Anything but a JSON array of issue objects yields no issues.
pub fn parse_issues(text: &str) -> Vec<ProofreadIssue> {
    match serde_json::from_str::<Vec<ProofreadIssue>>(strip_fences(text)) {
        Ok(issues) => issues
            .into_iter()
            .filter(|i| !i.original.is_empty())
            .collect(),
        Err(err) => {
            tracing::warn!(%err, "proofreading answer is not an issue list; ignoring it");
            Vec::new()
        }
    }
}

/// Interpret generated text for `action`.
pub fn into_output(action: AssistAction, text: &str) -> AssistOutput {
    match action {
        AssistAction::ProofreadChapter => AssistOutput::Issues(parse_issues(text)),
        AssistAction::Rewrite | AssistAction::Proofread => {
            AssistOutput::Replacement(strip_fences(text).to_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() {
        let body = serde_json::to_value(GenerateRequest::new(
            "prompt".into(),
            AssistAction::Rewrite,
        ))
        .unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "prompt");
        let config = &body["generationConfig"];
        assert_eq!(config["topK"], 40);
        assert_eq!(config["maxOutputTokens"], 1024);
        assert!((config["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert_eq!(
            GenerationConfig::for_action(AssistAction::ProofreadChapter).temperature,
            0.2
        );
    }

    #[test]
    fn test_extract_joins_parts() {
        let body =
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello, "},{"text":"world."}]}}]}"#;
        assert_eq!(extract_text(body).unwrap(), "Hello, world.");
    }

    #[test]
    fn test_extract_provider_error() {
        let body = r#"{"error":{"code":400,"message":"API key not valid"}}"#;
        match extract_text(body) {
            Err(TransformError::Provider { message }) => assert_eq!(message, "API key not valid"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_extract_rejects_bad_envelopes() {
        for body in [
            "not json",
            r#"{"candidates":[]}"#,
            r#"{"candidates":[{"content":{"parts":[]}}]}"#,
        ] {
            assert!(matches!(
                extract_text(body),
                Err(TransformError::Envelope { .. })
            ));
        }
    }

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_fences("```json\n[1, 2]\n```"), "[1, 2]");
        assert_eq!(strip_fences("```\nplain\n```"), "plain");
        assert_eq!(strip_fences("  no fence  "), "no fence");
        assert_eq!(strip_fences("```unterminated"), "```unterminated");
    }

    #[test]
    fn test_parse_issues() {
        let text = r#"```json
[{"type":"spelling","original":"teh","suggestion":"the","description":"typo"},
 {"type":"grammar","text":"they was","suggestion":"they were","explanation":"agreement"}]
```"#;
        let issues = parse_issues(text);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].kind, "spelling");
        assert_eq!(issues[0].explanation, "typo");
        assert_eq!(issues[1].original, "they was");
        assert_eq!(issues[1].explanation, "agreement");
    }

    #[test]
    fn test_parse_issues_fails_closed() {
        assert!(parse_issues("Issue 1: teh Suggestion: the").is_empty());
        assert!(parse_issues(r#"{"original":"a","suggestion":"b"}"#).is_empty());
        assert!(parse_issues(r#"[{"suggestion":"b"}]"#).is_empty());
    }

    #[test]
    fn test_into_output() {
        assert_eq!(
            into_output(AssistAction::Rewrite, "```\nBetter text\n```"),
            AssistOutput::Replacement("Better text".into())
        );
        assert_eq!(
            into_output(AssistAction::ProofreadChapter, "[]"),
            AssistOutput::Issues(vec![])
        );
    }
}
