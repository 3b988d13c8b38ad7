use serde::{Serialize, Deserialize};
use serde_json::json;

/// Tool name recorded for a generator output that could not be parsed.
/// Never dispatched.
pub const INVALID_ACTION: &str = "_Exception";

/// Action name that ends the run.
pub const FINAL_ANSWER: &str = "Final Answer";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Step {
    Thought { text: String },
    Action { tool: String, input: String },
    Observation { text: String },
}

/// Append-only record of one agent run.
///
/// Observations only ever follow an Action, so a step sequence never has two
/// Observations without an Action between them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    input: String,
    steps: Vec<Step>,
}

impl Transcript {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            steps: Vec::new(),
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn push_thought(&mut self, text: impl Into<String>) {
        self.steps.push(Step::Thought { text: text.into() });
    }

    pub fn push_action(&mut self, tool: impl Into<String>, input: impl Into<String>) {
        self.steps.push(Step::Action { tool: tool.into(), input: input.into() });
    }

    pub fn push_observation(&mut self, text: impl Into<String>) {
        debug_assert!(
            matches!(self.steps.last(), Some(Step::Action { .. })),
            "an observation must directly follow an action"
        );
        self.steps.push(Step::Observation { text: text.into() });
    }

    /// `(tool, input)` of every action, including rejected and final ones.
    pub fn actions(&self) -> impl Iterator<Item = (&str, &str)> {
        self.steps.iter().filter_map(|step| match step {
            Step::Action { tool, input } => Some((tool.as_str(), input.as_str())),
            _ => None,
        })
    }

    /// Tools actually dispatched, in order.
    pub fn tool_calls(&self) -> Vec<&str> {
        self.actions()
            .map(|(tool, _)| tool)
            .filter(|tool| *tool != FINAL_ANSWER && *tool != INVALID_ACTION)
            .collect()
    }

    pub fn observations(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().filter_map(|step| match step {
            Step::Observation { text } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.steps.last(), Some(Step::Action { tool, .. }) if tool == FINAL_ANSWER)
    }

    /// Plain-text rendering of the steps so far, for the `{scratchpad}` placeholder.
    pub fn render_scratchpad(&self) -> String {
        let mut out = String::new();
        for step in &self.steps {
            match step {
                Step::Thought { text } => {
                    out.push_str("Thought: ");
                    out.push_str(text);
                    out.push('\n');
                }
                Step::Action { tool, input } => {
                    let blob = json!({ "action": tool, "action_input": input });
                    out.push_str("Action:\n```\n");
                    out.push_str(&blob.to_string());
                    out.push_str("\n```\n");
                }
                Step::Observation { text } => {
                    out.push_str("Observation: ");
                    out.push_str(text);
                    out.push('\n');
                }
            }
        }
        if !out.is_empty() {
            out.push_str("Thought:");
        }
        out
    }
}
