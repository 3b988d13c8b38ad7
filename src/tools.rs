pub mod traits;
pub mod schema;
pub mod error;
pub mod registry;
pub mod vector_store_search;
pub mod web_search;

pub use registry::ToolRegistry;
pub use vector_store_search::VectorStoreSearch;
pub use web_search::WebSearch;
