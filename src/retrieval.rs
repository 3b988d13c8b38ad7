//! Knowledge store: chunked documents searchable by semantic similarity.
//!
//! The store itself is an external collaborator; this module only defines the
//! [`store::VectorStore`] seam plus two backends (an in-process index and a
//! Pinecone REST client) and the splitter used to chunk text before indexing.

pub mod error;
pub mod store;
pub mod memory;
pub mod pinecone;
pub mod splitter;

pub use error::RetrievalError;
pub use memory::InMemoryVectorStore;
pub use pinecone::PineconeStore;
pub use splitter::TextSplitter;
pub use store::{Document, ScoredPassage, VectorStore};
