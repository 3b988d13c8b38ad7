use ragent::llm::ollama::Ollama;
use ragent::llm::traits::{Embedder, LLM};
use ragent::message::Message;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // Adjust model names to ones pulled on your Ollama server.
    let ollama = Ollama::default()
        .with_model("qwen3:8b")
        .with_embedding_model("nomic-embed-text");

    let messages = vec![
        Message::system("Answer in one short paragraph."),
        Message::user("Why is the sky blue?"),
    ];

    let res = ollama.generate(&messages).await?;
    println!("generation: {}", res.generation);
    let tokens = res.tokens;
    println!(
        "tokens: prompt={} completion={} total={}",
        tokens.prompt_tokens, tokens.completion_tokens, tokens.total_tokens
    );

    let vectors = ollama.embed(&[res.generation]).await?;
    println!("embedding dimension: {}", vectors.first().map_or(0, Vec::len));

    Ok(())
}
