//! Prompt templates with named `{placeholders}`.
//!
//! `{{` and `}}` render as literal braces, so JSON examples can live inside a
//! template.

use std::collections::HashMap;

use crate::message::Message;

pub const TOOLS: &str = "tools";
pub const TOOL_NAMES: &str = "tool_names";
pub const CURRENT_DATE: &str = "current_date";
pub const INPUT: &str = "input";
pub const SCRATCHPAD: &str = "scratchpad";

/// Every placeholder the agent fills in.
pub const AGENT_VARIABLES: [&str; 5] = [TOOLS, TOOL_NAMES, CURRENT_DATE, INPUT, SCRATCHPAD];

pub const DEFAULT_SYSTEM_TEMPLATE: &str = r#"Respond to the human as helpfully and accurately as possible. Today's date is {current_date}. You have access to the following tools:

{tools}

Always try the VectorStoreSearch tool first. Only use WebSearch if VectorStoreSearch does not provide the information needed.

Use a json blob to specify a tool by providing an "action" key (tool name) and an "action_input" key (tool input, always a string).

Valid "action" values: "Final Answer" or {tool_names}

Provide only ONE action per $JSON_BLOB, as shown:

```
{{
  "action": $TOOL_NAME,
  "action_input": $INPUT
}}
```

Follow this format:

Question: input question to answer
Thought: consider previous and subsequent steps
Action:
```
$JSON_BLOB
```
Observation: action result
... (repeat Thought/Action/Observation N times)
Thought: I know what to respond
Action:
```
{{
  "action": "Final Answer",
  "action_input": "Final response to human"
}}
```

Begin! Reminder to ALWAYS respond with a valid json blob of a single action. Use tools if necessary. Respond directly if appropriate. Format is Action:```$JSON_BLOB```then Observation"#;

pub const DEFAULT_HUMAN_TEMPLATE: &str = "Question: {input}

{scratchpad}
(reminder to respond in a JSON blob no matter what)";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Unbalanced brace at byte {0}")]
    UnbalancedBrace(usize),

    #[error("Invalid placeholder name '{0}'")]
    InvalidPlaceholder(String),

    #[error("Missing value for placeholder '{0}'")]
    MissingVariable(String),

    #[error("Unknown placeholder '{0}'")]
    UnknownPlaceholder(String),

    #[error("Template must use placeholder '{0}'")]
    RequiredPlaceholder(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Var(String),
}

/// Parsed template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut chars = template.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    text.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    text.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(TemplateError::UnbalancedBrace(pos));
                    }
                    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                        return Err(TemplateError::InvalidPlaceholder(name));
                    }
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(Segment::Var(name));
                }
                '}' => return Err(TemplateError::UnbalancedBrace(pos)),
                c => text.push(c),
            }
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }
        Ok(Self { segments })
    }

    /// Placeholder names in order of first use.
    pub fn variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if let Segment::Var(name) = segment {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    pub fn format(&self, values: &HashMap<&str, String>) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Var(name) => {
                    let value = values
                        .get(name.as_str())
                        .ok_or_else(|| TemplateError::MissingVariable(name.clone()))?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

/// System plus human template, rendered into a two-message conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPrompt {
    pub system: PromptTemplate,
    pub human: PromptTemplate,
}

impl ChatPrompt {
    pub fn new(system: &str, human: &str) -> Result<Self, TemplateError> {
        Ok(Self {
            system: PromptTemplate::parse(system)?,
            human: PromptTemplate::parse(human)?,
        })
    }

    /// Check the templates only use agent placeholders and include `input` and `scratchpad`.
    pub fn validate_for_agent(&self) -> Result<(), TemplateError> {
        let used: Vec<&str> = self
            .system
            .variables()
            .into_iter()
            .chain(self.human.variables())
            .collect();
        if let Some(unknown) = used.iter().find(|v| !AGENT_VARIABLES.contains(*v)) {
            return Err(TemplateError::UnknownPlaceholder(unknown.to_string()));
        }
        for required in [INPUT, SCRATCHPAD] {
            if !used.contains(&required) {
                return Err(TemplateError::RequiredPlaceholder(required.to_string()));
            }
        }
        Ok(())
    }

    pub fn format_messages(&self, values: &HashMap<&str, String>) -> Result<Vec<Message>, TemplateError> {
        Ok(vec![
            Message::system(self.system.format(values)?),
            Message::user(self.human.format(values)?),
        ])
    }
}

impl Default for ChatPrompt {
    fn default() -> Self {
        // the built-in templates are covered by `default_prompt_is_valid`
        match Self::new(DEFAULT_SYSTEM_TEMPLATE, DEFAULT_HUMAN_TEMPLATE) {
            Ok(prompt) => prompt,
            Err(e) => unreachable!("built-in prompt failed to parse: {}", e),
        }
    }
}
