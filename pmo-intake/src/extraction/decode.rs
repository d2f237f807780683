//! Decoding of free-form model output.
//!
//! Two explicit stages: [`strict`] parses the fence-stripped text as a whole,
//! [`recover`] parses the first object literal found inside it. [`decode`]
//! tries them in that order. Neither stage touches the network.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{IntakeError, Result};

/// Reply shape requested from the model.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ModelReply {
    #[serde(default)]
    pub extracted_data: Option<Map<String, Value>>,
    #[serde(default)]
    pub next_question: Option<String>,
}

impl ModelReply {
    pub fn into_parts(self) -> (Map<String, Value>, Option<String>) {
        let question = self
            .next_question
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty());
        (self.extracted_data.unwrap_or_default(), question)
    }
}

pub fn decode(raw: &str) -> Result<ModelReply> {
    strict(raw).or_else(|strict_err| {
        recover(raw).map_err(|recover_err| {
            IntakeError::DecodeError(format!("{strict_err}; recovery: {recover_err}"))
        })
    })
}

/// Parses the whole reply after removing a surrounding code fence.
pub fn strict(raw: &str) -> Result<ModelReply> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(IntakeError::DecodeError("empty reply".to_string()));
    }
    serde_json::from_str(body).map_err(|e| IntakeError::DecodeError(e.to_string()))
}

/// Parses the first object literal embedded in the reply.
pub fn recover(raw: &str) -> Result<ModelReply> {
    let candidate = first_object(raw)
        .ok_or_else(|| IntakeError::DecodeError("no object literal in reply".to_string()))?;
    serde_json::from_str(candidate).map_err(|e| IntakeError::DecodeError(e.to_string()))
}

/// Removes a leading ```` ``` ```` marker (with optional language tag) and a
/// trailing one.
pub fn strip_code_fence(raw: &str) -> &str {
    let mut body = raw.trim();
    if let Some(rest) = body.strip_prefix("```") {
        body = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    }
    if let Some(rest) = body.trim_end().strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

/// Finds the first balanced top-level `{...}` span, ignoring braces inside
/// string literals. When the braces never balance, falls back to the span
/// from the first `{` to the last `}`.
pub fn first_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strict_plain_json() {
        let reply = strict(r#"{"extracted_data": {"program_name": "Apollo"}, "next_question": "Who runs it?"}"#)
            .unwrap();
        let (data, question) = reply.into_parts();
        assert_eq!(data.get("program_name"), Some(&json!("Apollo")));
        assert_eq!(question.as_deref(), Some("Who runs it?"));
    }

    #[test]
    fn test_strict_strips_fences() {
        let fenced = "```json\n{\"extracted_data\": {}, \"next_question\": \"Budget?\"}\n```";
        assert!(strict(fenced).is_ok());

        let bare_fence = "```\n{\"next_question\": \"Budget?\"}\n```";
        assert_eq!(
            strict(bare_fence).unwrap().next_question.as_deref(),
            Some("Budget?")
        );
    }

    #[test]
    fn test_strict_rejects_prose() {
        assert!(strict("Sure! Here you go: {\"next_question\": \"x\"}").is_err());
        assert!(strict("   ").is_err());
        assert!(strict("```json\n```").is_err());
    }

    #[test]
    fn test_recover_from_surrounding_prose() {
        let raw = "Sure! Here is the data:\n{\"extracted_data\": {\"sponsor_name\": \"Mike\"}, \"next_question\": \"Budget?\"}\nLet me know!";
        let reply = recover(raw).unwrap();
        assert_eq!(
            reply.extracted_data.unwrap().get("sponsor_name"),
            Some(&json!("Mike"))
        );
    }

    #[test]
    fn test_first_object_ignores_braces_in_strings() {
        let raw = r#"x {"next_question": "Use {curly} braces?", "extracted_data": {}} trailing {"a": 1}"#;
        assert_eq!(
            first_object(raw),
            Some(r#"{"next_question": "Use {curly} braces?", "extracted_data": {}}"#)
        );
    }

    #[test]
    fn test_first_object_handles_escaped_quotes() {
        let raw = r#"{"next_question": "Say \"hi\" {", "extracted_data": {}}"#;
        assert_eq!(first_object(raw), Some(raw));
    }

    #[test]
    fn test_first_object_greedy_fallback_when_unbalanced() {
        let raw = "{ {\"next_question\": \"q\"} ";
        assert_eq!(first_object(raw), Some("{ {\"next_question\": \"q\"}"));
        assert_eq!(first_object("no braces here"), None);
        assert_eq!(first_object("} backwards {"), None);
    }

    #[test]
    fn test_decode_falls_through_both_stages() {
        assert!(decode("I could not understand that.").is_err());
        assert!(decode("prefix {\"next_question\": \"q\"} suffix").is_ok());
    }

    #[test]
    fn test_null_extracted_data_is_empty() {
        let (data, question) = strict(r#"{"extracted_data": null, "next_question": "  "}"#)
            .unwrap()
            .into_parts();
        assert!(data.is_empty());
        assert!(question.is_none());
    }
}
