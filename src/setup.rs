//! Assemble a ready-to-run agent from an [`AppConfig`].

use std::sync::Arc;
use tracing::info;

use crate::agent::types::Agent;
use crate::config::{AppConfig, LlmProvider, VectorStoreProvider};
use crate::error::Result;
use crate::llm::{
    ollama::{ModelOptions, Ollama},
    openai::{CompletionOptions, OpenAI, OpenAIConfig},
    traits::{Embedder, LLM},
};
use crate::prompt::{ChatPrompt, DEFAULT_HUMAN_TEMPLATE, DEFAULT_SYSTEM_TEMPLATE};
use crate::retrieval::{InMemoryVectorStore, PineconeStore, TextSplitter, VectorStore};
use crate::search::TavilyClient;
use crate::tools::{VectorStoreSearch, WebSearch};

/// The agent plus the handles needed to load documents into its knowledge store.
pub struct Runtime {
    pub agent: Agent,
    pub store: Arc<dyn VectorStore>,
    pub splitter: TextSplitter,
}

impl Runtime {
    /// Validate `config` and build every collaborator. No network calls are made.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate()?;

        let (llm, embedder) = build_models(config);
        let store = build_store(config, embedder);
        let splitter = TextSplitter::new(config.ingest.chunk_size, config.ingest.chunk_overlap)?;

        let search = TavilyClient::new(config.web_search.api_key.clone().unwrap_or_default())
            .with_base_url(config.web_search.base_url.clone())
            .with_search_depth(config.web_search.search_depth.clone());

        let mut agent = Agent::new(config.agent.name.clone(), llm.clone(), Some(config.agent.max_iterations));
        agent.register_tool(Arc::new(
            VectorStoreSearch::new(store.clone(), llm).with_top_k(config.vector_store.top_k),
        ));
        agent.register_tool(Arc::new(
            WebSearch::new(Arc::new(search)).with_max_results(config.web_search.max_results),
        ));
        agent.set_current_date(config.agent.current_date.clone());
        agent.set_max_parse_retries(config.agent.max_parse_retries);
        agent.set_timeout(config.agent.timeout());

        if config.agent.system_template.is_some() || config.agent.human_template.is_some() {
            let prompt = ChatPrompt::new(
                config.agent.system_template.as_deref().unwrap_or(DEFAULT_SYSTEM_TEMPLATE),
                config.agent.human_template.as_deref().unwrap_or(DEFAULT_HUMAN_TEMPLATE),
            )?;
            agent.set_prompt(prompt)?;
        }

        info!(
            agent = %agent.name,
            llm = ?config.llm.provider,
            store = ?config.vector_store.provider,
            "runtime assembled"
        );
        Ok(Self { agent, store, splitter })
    }

    /// Chunk `text` and index it under `source`.
    pub async fn ingest_text(&self, source: &str, text: &str) -> Result<usize> {
        ingest_text(self.store.as_ref(), &self.splitter, source, text).await
    }
}

/// Chunk `text` with `splitter` and add the chunks to `store`.
pub async fn ingest_text(
    store: &dyn VectorStore,
    splitter: &TextSplitter,
    source: &str,
    text: &str,
) -> Result<usize> {
    let documents = splitter.split_documents(source, text);
    let count = store.add_documents(documents).await?;
    info!(source, chunks = count, "ingested text");
    Ok(count)
}

fn build_models(config: &AppConfig) -> (Arc<dyn LLM>, Arc<dyn Embedder>) {
    match config.llm.provider {
        LlmProvider::Ollama => {
            let mut ollama = Ollama::connect(config.llm.host.clone(), config.llm.port);
            if let Some(model) = &config.llm.model {
                ollama = ollama.with_model(model.clone());
            }
            if let Some(model) = &config.embedding.model {
                ollama = ollama.with_embedding_model(model.clone());
            }
            if let Some(temperature) = config.llm.temperature {
                ollama = ollama.with_options(ModelOptions::default().temperature(temperature));
            }
            let ollama = Arc::new(ollama);
            let llm: Arc<dyn LLM> = ollama.clone();
            let embedder: Arc<dyn Embedder> = ollama;
            (llm, embedder)
        }
        LlmProvider::OpenAI => {
            let mut client_config = OpenAIConfig::new().with_api_key(config.llm.api_key.clone().unwrap_or_default());
            if let Some(base_url) = &config.llm.base_url {
                client_config = client_config.with_api_base(base_url.clone());
            }
            let mut options = CompletionOptions {
                temperature: config.llm.temperature,
                ..CompletionOptions::default()
            };
            if let Some(model) = &config.llm.model {
                options.model = model.clone();
            }
            let mut openai = OpenAI::with_config(client_config).with_options(options);
            if let Some(model) = &config.embedding.model {
                openai = openai.with_embedding_model(model.clone());
            }
            let openai = Arc::new(openai);
            let llm: Arc<dyn LLM> = openai.clone();
            let embedder: Arc<dyn Embedder> = openai;
            (llm, embedder)
        }
    }
}

fn build_store(config: &AppConfig, embedder: Arc<dyn Embedder>) -> Arc<dyn VectorStore> {
    match config.vector_store.provider {
        VectorStoreProvider::Memory => Arc::new(InMemoryVectorStore::new(embedder)),
        VectorStoreProvider::Pinecone => {
            let mut store = PineconeStore::new(
                config.vector_store.host.clone().unwrap_or_default(),
                config.vector_store.api_key.clone().unwrap_or_default(),
                embedder,
            );
            if let Some(namespace) = &config.vector_store.namespace {
                store = store.with_namespace(namespace.clone());
            }
            Arc::new(store)
        }
    }
}
