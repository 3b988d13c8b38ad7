use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::llm::tokens::TokenUsage;
use crate::llm::traits::LLM;
use crate::message::Message;
use crate::prompt::{self, ChatPrompt, TemplateError};
use crate::tools::{
    error::ToolError,
    registry::ToolRegistry,
    traits::Tool,
};


pub mod types;
pub mod error;
pub mod traits;
pub mod transcript;
pub mod parser;

use traits::AgentRunner;
use types::{Agent, AgentResult, AgentExecuteResult, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_PARSE_RETRIES};
use error::AgentError;
use parser::{parse_reply, Action, ParsedReply};
use transcript::{Transcript, FINAL_ANSWER, INVALID_ACTION};

pub const DEFAULT_CURRENT_DATE: &str = "not specified";


impl Agent {
    /// Create a new Agent with the provided name and LLM. Tools start empty.
    pub fn new(name: impl Into<String>, llm: Arc<dyn LLM>, max_iterations: Option<usize>) -> Self {
        Self {
            name: name.into(),
            llm,
            tools: ToolRegistry::new(),
            prompt: ChatPrompt::default(),
            current_date: DEFAULT_CURRENT_DATE.to_string(),
            max_iterations: max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
            max_parse_retries: DEFAULT_MAX_PARSE_RETRIES,
            timeout: None,
        }
    }

    /// Register a tool under its own name. Returns &mut Self for chaining.
    pub fn register_tool(&mut self, tool: Arc<dyn Tool>) -> &mut Self {
        self.tools.register(tool);
        self
    }

    /// Replace the whole tool set.
    pub fn set_tools(&mut self, tools: ToolRegistry) {
        self.tools = tools;
    }

    /// Change the maximum iterations for the agent's decision process.
    pub fn change_max_iterations(&mut self, max_iterations: usize) {
        self.max_iterations = max_iterations;
    }

    pub fn set_max_parse_retries(&mut self, max_parse_retries: usize) {
        self.max_parse_retries = max_parse_retries;
    }

    pub fn set_current_date(&mut self, date: impl Into<String>) {
        self.current_date = date.into();
    }

    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Look up a tool by name.
    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Set or replace the prompt templates.
    pub fn set_prompt(&mut self, prompt: ChatPrompt) -> Result<(), TemplateError> {
        prompt.validate_for_agent()?;
        self.prompt = prompt;
        Ok(())
    }

    /// Messages for the next generator turn.
    pub fn render_messages(&self, transcript: &Transcript) -> Result<Vec<Message>, TemplateError> {
        let values = HashMap::from([
            (prompt::TOOLS, self.tools.render()),
            (prompt::TOOL_NAMES, self.tools.render_names()),
            (prompt::CURRENT_DATE, self.current_date.clone()),
            (prompt::INPUT, transcript.input().to_string()),
            (prompt::SCRATCHPAD, transcript.render_scratchpad()),
        ]);
        self.prompt.format_messages(&values)
    }

    fn correction(&self, reason: &dyn std::fmt::Display) -> String {
        format!(
            "Invalid or incomplete response ({}). Your last output was not a valid single JSON action; \
             respond with exactly one JSON blob with an \"action\" key (one of: {}, {}) and a string \"action_input\" key.",
            reason,
            self.tools.render_names(),
            FINAL_ANSWER
        )
    }
}

/// Await `fut` unless the run deadline passes first.
async fn within<F: Future>(deadline: Option<Instant>, fut: F) -> Option<F::Output> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut).await.ok(),
        None => Some(fut.await),
    }
}


#[async_trait::async_trait]
impl AgentRunner for Agent {
    async fn run(&self, input: &str) -> AgentExecuteResult {
        let deadline = self.timeout.map(|t| Instant::now() + t);
        let tool_names = self.tools.names();
        let mut transcript = Transcript::new(input);
        let mut tokens = TokenUsage::default();
        let mut failures: usize = 0;
        info!(agent = %self.name, tools = ?tool_names, "starting run");

        // Main loop: render prompt, ask the LLM for one action, execute it, repeat.
        for iteration in 1..=self.max_iterations {
            let messages = match self.render_messages(&transcript) {
                Ok(messages) => messages,
                Err(source) => return Err(AgentError::Prompt { source, transcript }),
            };

            let reply = match within(deadline, self.llm.generate(&messages)).await {
                Some(Ok(reply)) => reply,
                Some(Err(source)) => return Err(AgentError::Generator { source, transcript }),
                None => return Err(AgentError::Cancelled { transcript }),
            };
            tokens.add(&reply.tokens);
            debug!(iteration, reply = %reply.generation, "generator replied");

            let ParsedReply { thought, action } = match parse_reply(&reply.generation, &tool_names) {
                Ok(parsed) => parsed,
                Err(e) => {
                    failures += 1;
                    warn!(iteration, failures, error = %e, "malformed action");
                    transcript.push_action(INVALID_ACTION, reply.generation.trim());
                    transcript.push_observation(self.correction(&e));
                    if failures > self.max_parse_retries {
                        return Err(AgentError::Stalled { failures, transcript });
                    }
                    continue;
                }
            };
            failures = 0;
            if let Some(thought) = thought {
                transcript.push_thought(thought);
            }

            let (tool, tool_input) = match action {
                Action::Final(output) => {
                    transcript.push_action(FINAL_ANSWER, output.clone());
                    info!(agent = %self.name, iterations = iteration, "final answer");
                    return Ok(AgentResult { tokens, output, transcript });
                }
                Action::Tool { tool, input } => (tool, input),
            };

            transcript.push_action(tool.clone(), tool_input.clone());
            debug!(iteration, tool = %tool, input = %tool_input, "dispatching tool");
            let observation = match within(deadline, self.tools.dispatch(&tool, &tool_input)).await {
                Some(Ok(output)) => output,
                Some(Err(e)) => {
                    debug_assert!(
                        !matches!(e, ToolError::UnknownTool(_)),
                        "parse_reply only admits registered tools"
                    );
                    let reason = match e {
                        ToolError::ExecutionError { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    warn!(iteration, tool = %tool, error = %reason, "tool failed");
                    format!("Tool {} failed: {}", tool, reason)
                }
                None => return Err(AgentError::Cancelled { transcript }),
            };
            transcript.push_observation(observation);
        }

        warn!(agent = %self.name, max_iterations = self.max_iterations, "iteration budget exhausted");
        Err(AgentError::LoopBudgetExceeded {
            max_iterations: self.max_iterations,
            transcript,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use futures::{FutureExt, future::BoxFuture};
    use serde_json::json;
    use crate::llm::{GenerateResult, LLMResult, error::LLMError};
    use crate::retrieval::{Document, InMemoryVectorStore, VectorStore};
    use crate::retrieval::memory::tests::KeywordEmbedder;
    use crate::search::{SearchError, SearchHit, SearchProvider};
    use crate::tools::schema::ArgSchema;
    use crate::tools::{VectorStoreSearch, WebSearch};
    use super::transcript::Step;

    fn tool_reply(thought: &str, tool: &str, input: &str) -> String {
        format!(
            "Thought: {}\nAction:\n```\n{}\n```",
            thought,
            json!({ "action": tool, "action_input": input })
        )
    }

    fn final_reply(answer: &str) -> String {
        tool_reply("I know what to respond", "Final Answer", answer)
    }

    /// Replays canned replies in order, repeating the last one when exhausted.
    struct ScriptedLlm {
        replies: Vec<String>,
        calls: AtomicUsize,
        prompts: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedLlm {
        fn new(replies: Vec<String>) -> Arc<Self> {
            Arc::new(Self { replies, calls: AtomicUsize::new(0), prompts: Mutex::new(Vec::new()) })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl LLM for ScriptedLlm {
        fn generate<'a>(&'a self, messages: &'a [Message]) -> BoxFuture<'a, LLMResult<GenerateResult>> {
            async move {
                let n = self.calls.fetch_add(1, Ordering::SeqCst);
                self.prompts.lock().unwrap().push(messages.to_vec());
                let reply = self.replies.get(n).or(self.replies.last()).cloned().unwrap_or_default();
                Ok(GenerateResult { tokens: TokenUsage::new(10, 5), generation: reply })
            }
            .boxed()
        }
    }

    struct FailingLlm;

    impl LLM for FailingLlm {
        fn generate<'a>(&'a self, _messages: &'a [Message]) -> BoxFuture<'a, LLMResult<GenerateResult>> {
            async { Err(LLMError::InvalidResponse("503 from upstream".into())) }.boxed()
        }
    }

    struct SlowLlm;

    impl LLM for SlowLlm {
        fn generate<'a>(&'a self, _messages: &'a [Message]) -> BoxFuture<'a, LLMResult<GenerateResult>> {
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(GenerateResult::new(final_reply("too late")))
            }
            .boxed()
        }
    }

    /// Searches the documents first, answers once an observation is present.
    struct RoutingLlm;

    impl LLM for RoutingLlm {
        fn generate<'a>(&'a self, messages: &'a [Message]) -> BoxFuture<'a, LLMResult<GenerateResult>> {
            async move {
                let human = &messages[1].content;
                let question = human
                    .lines()
                    .next()
                    .and_then(|l| l.strip_prefix("Question: "))
                    .unwrap_or_default()
                    .to_string();
                let reply = match human.split("Observation: ").nth(1) {
                    Some(rest) => final_reply(rest.lines().next().unwrap_or_default()),
                    None => tool_reply("Check the documents", "VectorStoreSearch", &question),
                };
                Ok(GenerateResult::new(reply))
            }
            .boxed()
        }
    }

    #[crate::tool(name = "VectorStoreSearch", description = "Answers from the indexed reports", input = "question")]
    fn reports_with_q3(question: String) -> String {
        format!("According to the Q3 report ({}): total revenue was $88.3 billion.", question)
    }

    #[crate::tool(name = "VectorStoreSearch", description = "Answers from the indexed reports", input = "question")]
    fn reports_empty(_question: String) -> String {
        "no data found".to_string()
    }

    #[crate::tool(name = "WebSearch", description = "Searches the web", input = "query")]
    fn web_results(query: String) -> String {
        format!("{{\"url\":\"https://example.com/earnings\",\"content\":\"{} was $94.9 billion\"}}", query)
    }

    #[crate::tool(name = "WebSearch", description = "Searches the web", input = "query")]
    async fn web_down(_query: String) -> Result<String, String> {
        Err("503 Service Unavailable".to_string())
    }

    /// Counts how often it is dispatched.
    struct CountingTool {
        name: &'static str,
        calls: AtomicUsize,
        inputs: Mutex<Vec<String>>,
    }

    impl CountingTool {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self { name, calls: AtomicUsize::new(0), inputs: Mutex::new(Vec::new()) })
        }
    }

    #[async_trait::async_trait]
    impl Tool for CountingTool {
        fn name(&self) -> &str { self.name }
        fn description(&self) -> &str { "counts calls" }
        fn args(&self) -> Vec<ArgSchema> { vec![ArgSchema::string("query", "anything")] }
        async fn run(&self, input: &str) -> Result<String, ToolError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.inputs.lock().unwrap().push(input.to_string());
            Ok(format!("result #{}", n))
        }
    }

    fn agent(llm: Arc<dyn LLM>, tools: Vec<Arc<dyn Tool>>) -> Agent {
        let mut agent = Agent::new("test", llm, Some(5));
        agent.set_current_date("2024-08-01");
        for tool in tools {
            agent.register_tool(tool);
        }
        agent
    }

    fn count_kind(transcript: &Transcript, pred: fn(&Step) -> bool) -> usize {
        transcript.steps().iter().filter(|s| pred(s)).count()
    }

    #[tokio::test]
    async fn scenario_answer_from_knowledge_store() {
        let llm = ScriptedLlm::new(vec![
            tool_reply("The reports should have this", "VectorStoreSearch", "Q3 revenue"),
            final_reply("Q3 revenue was $88.3 billion."),
        ]);
        let agent = agent(llm.clone(), vec![Arc::new(ReportsWithQ3Tool), Arc::new(WebResultsTool)]);

        let result = agent.run("Q3 revenue").await.unwrap();
        assert!(result.output.contains("$88.3 billion"));
        assert_eq!(result.transcript.tool_calls(), vec!["VectorStoreSearch"]);
        assert_eq!(count_kind(&result.transcript, |s| matches!(s, Step::Observation { .. })), 1);
        assert!(result.transcript.is_finished());
        assert_eq!(
            result.transcript.steps()[1],
            Step::Action { tool: "VectorStoreSearch".into(), input: "Q3 revenue".into() }
        );
        assert_eq!(llm.calls(), 2);
        assert_eq!(result.tokens, TokenUsage { prompt_tokens: 20, completion_tokens: 10, total_tokens: 30 });
    }

    #[tokio::test]
    async fn scenario_falls_through_to_web_search() {
        let llm = ScriptedLlm::new(vec![
            tool_reply("Try the reports first", "VectorStoreSearch", "latest quarter revenue"),
            tool_reply("The reports lack it; search the web", "WebSearch", "latest quarter revenue"),
            final_reply("Latest quarter revenue was $94.9 billion."),
        ]);
        let agent = agent(llm, vec![Arc::new(ReportsEmptyTool), Arc::new(WebResultsTool)]);

        let result = agent.run("latest quarter revenue").await.unwrap();
        assert_eq!(result.transcript.tool_calls(), vec!["VectorStoreSearch", "WebSearch"]);
        let observations: Vec<&str> = result.transcript.observations().collect();
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0], "no data found");
        assert!(observations[1].contains("$94.9 billion"));
        assert_eq!(result.output, "Latest quarter revenue was $94.9 billion.");
    }

    #[tokio::test]
    async fn scenario_tool_failure_becomes_observation() {
        let llm = ScriptedLlm::new(vec![
            tool_reply("Search the web", "WebSearch", "latest quarter revenue"),
            final_reply("I could not reach web search; no answer available."),
        ]);
        let agent = agent(llm, vec![Arc::new(ReportsEmptyTool), Arc::new(WebDownTool)]);

        let result = agent.run("latest quarter revenue").await.unwrap();
        let observations: Vec<&str> = result.transcript.observations().collect();
        assert_eq!(observations, vec!["Tool WebSearch failed: 503 Service Unavailable"]);
        assert!(result.transcript.is_finished());
    }

    #[tokio::test]
    async fn generator_may_skip_the_knowledge_store() {
        let llm = ScriptedLlm::new(vec![
            tool_reply("This needs fresh data", "WebSearch", "today's stock price"),
            final_reply("done"),
        ]);
        let knowledge = CountingTool::new("VectorStoreSearch");
        let web = CountingTool::new("WebSearch");
        let agent = agent(llm, vec![knowledge.clone(), web.clone()]);

        let result = agent.run("today's stock price").await.unwrap();
        assert_eq!(result.transcript.tool_calls(), vec!["WebSearch"]);
        assert_eq!(knowledge.calls.load(Ordering::SeqCst), 0);
        assert_eq!(web.inputs.lock().unwrap().as_slice(), &["today's stock price".to_string()]);
    }

    #[tokio::test]
    async fn malformed_reply_is_corrected_without_dispatch() {
        let llm = ScriptedLlm::new(vec![
            "The revenue is probably in the reports.".to_string(),
            r#"{"action": "Calculator", "action_input": "2+2"}"#.to_string(),
            tool_reply("Use the reports", "VectorStoreSearch", "Q3 revenue"),
            final_reply("done"),
        ]);
        let knowledge = CountingTool::new("VectorStoreSearch");
        let agent = agent(llm.clone(), vec![knowledge.clone()]);

        let result = agent.run("Q3 revenue").await.unwrap();
        assert_eq!(knowledge.calls.load(Ordering::SeqCst), 1);
        let actions: Vec<&str> = result.transcript.actions().map(|(tool, _)| tool).collect();
        assert_eq!(actions, vec![INVALID_ACTION, INVALID_ACTION, "VectorStoreSearch", FINAL_ANSWER]);
        let observations: Vec<&str> = result.transcript.observations().collect();
        assert!(observations[0].contains("not a valid single JSON action"));
        assert!(observations[1].contains("unknown action 'Calculator'"));

        // the correction is visible to the generator on the next turn
        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[1][1].content.contains("not a valid single JSON action"));
    }

    #[tokio::test]
    async fn observations_never_follow_each_other() {
        let llm = ScriptedLlm::new(vec![
            "garbage".to_string(),
            "more garbage".to_string(),
            tool_reply("ok", "VectorStoreSearch", "q"),
            final_reply("done"),
        ]);
        let agent = agent(llm, vec![CountingTool::new("VectorStoreSearch")]);
        let result = agent.run("q").await.unwrap();
        let steps = result.transcript.steps();
        for pair in steps.windows(2) {
            assert!(!matches!(pair, [Step::Observation { .. }, Step::Observation { .. }]));
        }
    }

    #[tokio::test]
    async fn stalls_after_too_many_malformed_replies() {
        let llm = ScriptedLlm::new(vec!["I refuse to use JSON".to_string()]);
        let knowledge = CountingTool::new("VectorStoreSearch");
        let mut agent = agent(llm.clone(), vec![knowledge.clone()]);
        agent.set_max_parse_retries(2);

        let err = agent.run("Q3 revenue").await.unwrap_err();
        assert!(matches!(err, AgentError::Stalled { failures: 3, .. }));
        assert_eq!(llm.calls(), 3);
        assert_eq!(knowledge.calls.load(Ordering::SeqCst), 0);
        assert_eq!(err.transcript().actions().count(), 3);
    }

    #[tokio::test]
    async fn valid_action_resets_the_retry_counter() {
        let llm = ScriptedLlm::new(vec![
            "bad".to_string(),
            tool_reply("ok", "VectorStoreSearch", "q"),
            "bad again".to_string(),
            final_reply("done"),
        ]);
        let mut agent = agent(llm, vec![CountingTool::new("VectorStoreSearch")]);
        agent.set_max_parse_retries(1);
        assert_eq!(agent.run("q").await.unwrap().output, "done");
    }

    #[tokio::test]
    async fn loop_budget_is_enforced_exactly() {
        let llm = ScriptedLlm::new(vec![tool_reply("again", "VectorStoreSearch", "Q3 revenue")]);
        let knowledge = CountingTool::new("VectorStoreSearch");
        let mut agent = agent(llm.clone(), vec![knowledge.clone()]);
        agent.change_max_iterations(4);

        let err = agent.run("Q3 revenue").await.unwrap_err();
        assert!(matches!(err, AgentError::LoopBudgetExceeded { max_iterations: 4, .. }));
        assert_eq!(llm.calls(), 4);
        assert_eq!(knowledge.calls.load(Ordering::SeqCst), 4);
        assert_eq!(err.transcript().tool_calls().len(), 4);
        assert!(!err.transcript().is_finished());
    }

    #[tokio::test]
    async fn final_answer_on_the_last_allowed_turn_succeeds() {
        let llm = ScriptedLlm::new(vec![
            tool_reply("a", "VectorStoreSearch", "q"),
            tool_reply("b", "VectorStoreSearch", "q"),
            final_reply("made it"),
        ]);
        let mut agent = agent(llm, vec![CountingTool::new("VectorStoreSearch")]);
        agent.change_max_iterations(3);
        assert_eq!(agent.run("q").await.unwrap().output, "made it");
    }

    #[tokio::test]
    async fn runs_are_reproducible() {
        let script = vec![
            tool_reply("Try the reports", "VectorStoreSearch", "latest quarter revenue"),
            tool_reply("Search the web", "WebSearch", "latest quarter revenue"),
            final_reply("$94.9 billion"),
        ];
        let first = agent(ScriptedLlm::new(script.clone()), vec![Arc::new(ReportsEmptyTool), Arc::new(WebResultsTool)])
            .run("latest quarter revenue")
            .await
            .unwrap();
        let second = agent(ScriptedLlm::new(script), vec![Arc::new(ReportsEmptyTool), Arc::new(WebResultsTool)])
            .run("latest quarter revenue")
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn prompt_lists_tools_and_carries_the_scratchpad() {
        let llm = ScriptedLlm::new(vec![
            tool_reply("Check the reports", "VectorStoreSearch", "Q3 revenue"),
            final_reply("done"),
        ]);
        let agent = agent(llm.clone(), vec![Arc::new(ReportsWithQ3Tool), Arc::new(WebResultsTool)]);
        agent.run("Q3 revenue").await.unwrap();

        let prompts = llm.prompts.lock().unwrap();
        let system = &prompts[0][0].content;
        assert!(system.contains("Today's date is 2024-08-01"));
        assert!(system.contains("Valid \"action\" values: \"Final Answer\" or VectorStoreSearch, WebSearch"));
        let knowledge_line = system.find("VectorStoreSearch: Answers from the indexed reports").unwrap();
        let web_line = system.find("WebSearch: Searches the web").unwrap();
        assert!(knowledge_line < web_line);

        assert!(prompts[0][1].content.starts_with("Question: Q3 revenue"));
        assert!(!prompts[0][1].content.contains("Observation:"));
        assert!(prompts[1][1].content.contains("Thought: Check the reports"));
        assert!(prompts[1][1].content.contains("Observation: According to the Q3 report"));
    }

    #[tokio::test]
    async fn generator_failure_is_fatal_with_transcript() {
        let agent = agent(Arc::new(FailingLlm), vec![]);
        let err = agent.run("Q3 revenue").await.unwrap_err();
        assert!(matches!(err, AgentError::Generator { .. }));
        assert_eq!(err.transcript().input(), "Q3 revenue");
        assert!(err.transcript().is_empty());
    }

    #[tokio::test]
    async fn timeout_cancels_at_the_next_call() {
        let mut agent = agent(Arc::new(SlowLlm), vec![]);
        agent.set_timeout(Some(Duration::from_millis(20)));
        let err = agent.run("Q3 revenue").await.unwrap_err();
        assert!(matches!(err, AgentError::Cancelled { .. }));
    }

    /// Sleeps far past any test deadline.
    struct SlowTool;

    #[async_trait::async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str { "WebSearch" }
        fn description(&self) -> &str { "hangs" }
        fn args(&self) -> Vec<ArgSchema> { vec![ArgSchema::string("query", "anything")] }
        async fn run(&self, _input: &str) -> Result<String, ToolError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("too late".to_string())
        }
    }

    #[tokio::test]
    async fn timeout_cancels_a_slow_tool() {
        let llm = ScriptedLlm::new(vec![tool_reply("Search the web", "WebSearch", "latest quarter revenue")]);
        let mut agent = agent(llm.clone(), vec![Arc::new(SlowTool)]);
        agent.set_timeout(Some(Duration::from_millis(50)));

        let err = agent.run("latest quarter revenue").await.unwrap_err();
        assert!(matches!(err, AgentError::Cancelled { .. }));
        assert_eq!(llm.calls(), 1);
        assert_eq!(
            err.transcript().steps().last(),
            Some(&Step::Action { tool: "WebSearch".into(), input: "latest quarter revenue".into() })
        );
        assert_eq!(err.transcript().observations().count(), 0);
    }

    #[tokio::test]
    async fn prompt_render_failure_returns_the_transcript() {
        let llm = ScriptedLlm::new(vec![final_reply("unused")]);
        let mut agent = agent(llm.clone(), vec![]);
        // bypasses set_prompt validation
        agent.prompt = ChatPrompt::new("{tools} {history}", "{input} {scratchpad}").unwrap();

        let err = agent.run("Q3 revenue").await.unwrap_err();
        assert!(matches!(
            err,
            AgentError::Prompt { source: TemplateError::MissingVariable(ref name), .. } if name == "history"
        ));
        assert_eq!(err.transcript().input(), "Q3 revenue");
        assert!(err.transcript().is_empty());
        assert_eq!(llm.calls(), 0);
    }

    #[test]
    fn rejects_prompts_without_scratchpad() {
        let mut agent = agent(Arc::new(FailingLlm), vec![]);
        let prompt = ChatPrompt::new("{tools}", "{input}").unwrap();
        assert!(agent.set_prompt(prompt).is_err());
        let prompt = ChatPrompt::new("Tools: {tools}", "{input}\n{scratchpad}").unwrap();
        assert!(agent.set_prompt(prompt).is_ok());
    }

    struct StaticSearch;

    #[async_trait::async_trait]
    impl SearchProvider for StaticSearch {
        async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchHit>, SearchError> {
            Ok(vec![SearchHit { url: "https://example.com".into(), content: "unused".into() }])
        }
    }

    /// Answers with the context it was handed, so the retrieval path is visible.
    struct ContextEchoLlm;

    impl LLM for ContextEchoLlm {
        fn generate<'a>(&'a self, messages: &'a [Message]) -> BoxFuture<'a, LLMResult<GenerateResult>> {
            async move {
                let context = messages[0].content.lines().last().unwrap_or_default().to_string();
                Ok(GenerateResult::new(context))
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn concurrent_runs_with_real_adapters() {
        let store = Arc::new(InMemoryVectorStore::new(Arc::new(KeywordEmbedder)));
        store
            .add_documents(vec![
                Document::new("1", "Q3 revenue was $88.3 billion"),
                Document::new("2", "iPhone units shipped"),
            ])
            .await
            .unwrap();

        let mut agent = Agent::new("concurrent", Arc::new(RoutingLlm), None);
        agent.register_tool(Arc::new(VectorStoreSearch::new(store, Arc::new(ContextEchoLlm)).with_top_k(1)));
        agent.register_tool(Arc::new(WebSearch::new(Arc::new(StaticSearch))));
        let agent = Arc::new(agent);

        let a = tokio::spawn({
            let agent = agent.clone();
            async move { agent.run("Q3 revenue").await }
        });
        let b = tokio::spawn({
            let agent = agent.clone();
            async move { agent.run("iPhone units").await }
        });
        let (a, b) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());
        assert_eq!(a.output, "Q3 revenue was $88.3 billion");
        assert_eq!(b.output, "iPhone units shipped");
        assert_eq!(a.transcript.input(), "Q3 revenue");
        assert_eq!(b.transcript.tool_calls(), vec!["VectorStoreSearch"]);
    }
}
