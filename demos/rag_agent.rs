//! Load a config, index a text file and ask one question.
//!
//! ```sh
//! cargo run --example rag_agent -- ragent.toml reports/q3.txt "What was Q3 revenue?"
//! ```

use anyhow::Context;
use ragent::agent::traits::AgentRunner;
use ragent::agent::transcript::Step;
use ragent::config::AppConfig;
use ragent::setup::Runtime;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| "ragent.toml".to_string());
    let document = args.next().context("usage: rag_agent <config> <document> <question>")?;
    let question = args.next().context("usage: rag_agent <config> <document> <question>")?;

    let config = AppConfig::load(&config_path)?;
    let runtime = Runtime::from_config(&config)?;

    let text = std::fs::read_to_string(&document).with_context(|| format!("reading {}", document))?;
    let chunks = runtime.ingest_text(&document, &text).await?;
    println!("indexed {} chunks from {}", chunks, document);

    match runtime.agent.run(&question).await {
        Ok(result) => {
            for step in result.transcript.steps() {
                match step {
                    Step::Thought { text } => println!("Thought: {}", text),
                    Step::Action { tool, input } => println!("Action: {} <- {}", tool, input),
                    Step::Observation { text } => println!("Observation: {}", text),
                }
            }
            println!("\nAnswer: {}", result.output);
            println!("tokens used: {}", result.tokens.total_tokens);
        }
        Err(e) => {
            eprintln!("agent failed after {} steps: {}", e.transcript().len(), e);
        }
    }
    Ok(())
}
