use crate::llm::error::LLMError;
use crate::prompt::TemplateError;
use super::transcript::Transcript;

/// Fatal outcomes of a run. Each carries the transcript accumulated so far.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Agent stalled: {failures} consecutive malformed actions")]
    Stalled {
        failures: usize,
        transcript: Transcript,
    },

    #[error("Maximum iterations exceeded: {max_iterations}")]
    LoopBudgetExceeded {
        max_iterations: usize,
        transcript: Transcript,
    },

    #[error("LLM error: {source}")]
    Generator {
        #[source]
        source: LLMError,
        transcript: Transcript,
    },

    #[error("Prompt error: {source}")]
    Prompt {
        #[source]
        source: TemplateError,
        transcript: Transcript,
    },

    #[error("Run cancelled after exceeding its time limit")]
    Cancelled {
        transcript: Transcript,
    },
}

impl AgentError {
    pub fn transcript(&self) -> &Transcript {
        match self {
            AgentError::Stalled { transcript, .. }
            | AgentError::LoopBudgetExceeded { transcript, .. }
            | AgentError::Generator { transcript, .. }
            | AgentError::Prompt { transcript, .. }
            | AgentError::Cancelled { transcript } => transcript,
        }
    }

    pub fn into_transcript(self) -> Transcript {
        match self {
            AgentError::Stalled { transcript, .. }
            | AgentError::LoopBudgetExceeded { transcript, .. }
            | AgentError::Generator { transcript, .. }
            | AgentError::Prompt { transcript, .. }
            | AgentError::Cancelled { transcript } => transcript,
        }
    }
}
