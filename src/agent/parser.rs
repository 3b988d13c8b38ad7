use serde::Deserialize;
use serde_json::Value;

use super::transcript::FINAL_ANSWER;

/// One decision taken by the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Tool { tool: String, input: String },
    Final(String),
}

/// A parsed generator reply: optional free-text reasoning plus the action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    pub thought: Option<String>,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("no JSON action blob found")]
    NoJson,

    #[error("more than one JSON action blob found")]
    MultipleActions,

    #[error("invalid JSON action: {0}")]
    InvalidJson(String),

    #[error("unknown action '{0}'")]
    UnknownAction(String),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAction {
    action: String,
    action_input: String,
}

/// Parse a reply that must contain exactly one `{"action": ..., "action_input": ...}` object.
///
/// The object may sit in a fenced code block or be bare. Each `{` is tried in
/// turn and the first one that starts a well-formed action wins, so braces in
/// the reasoning or backticks inside `action_input` do not confuse it. Text
/// before the object is taken as the thought. `action` must be one of
/// `tool_names` or `"Final Answer"`.
pub fn parse_reply(text: &str, tool_names: &[&str]) -> Result<ParsedReply, ParseError> {
    let mut first_error = None;
    for (start, _) in text.match_indices('{') {
        let (raw, end) = match action_at(text, start) {
            Ok(found) => found,
            Err(e) => {
                first_error.get_or_insert(e);
                continue;
            }
        };
        if text[end..].match_indices('{').any(|(next, _)| action_at(&text[end..], next).is_ok()) {
            return Err(ParseError::MultipleActions);
        }

        let action = if raw.action == FINAL_ANSWER {
            Action::Final(raw.action_input)
        } else if tool_names.contains(&raw.action.as_str()) {
            Action::Tool { tool: raw.action, input: raw.action_input }
        } else {
            return Err(ParseError::UnknownAction(raw.action));
        };
        return Ok(ParsedReply { thought: extract_thought(&text[..start]), action });
    }
    Err(first_error.unwrap_or(ParseError::NoJson))
}

/// Deserialize an action object starting at byte `start`; returns it with the byte offset just past it.
fn action_at(text: &str, start: usize) -> Result<(RawAction, usize), ParseError> {
    let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
    let value = match values.next() {
        Some(Ok(value)) => value,
        Some(Err(e)) => return Err(ParseError::InvalidJson(e.to_string())),
        None => return Err(ParseError::NoJson),
    };
    let end = start + values.byte_offset();
    let raw = serde_json::from_value(value).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    Ok((raw, end))
}

fn extract_thought(prefix: &str) -> Option<String> {
    let mut thought = prefix.trim();
    // opening fence of the action block, with or without a language tag
    if let Some((head, last_line)) = thought.rsplit_once('\n') {
        if last_line.trim_start().starts_with("```") {
            thought = head.trim_end();
        }
    } else if thought.starts_with("```") {
        thought = "";
    }
    if let Some(stripped) = thought.strip_suffix("Action:") {
        thought = stripped.trim_end();
    }
    if let Some(stripped) = thought.strip_prefix("Thought:") {
        thought = stripped.trim_start();
    }
    if thought.is_empty() {
        None
    } else {
        Some(thought.to_string())
    }
}
