pub mod llm;
pub mod tools;
pub mod agent;
pub mod message;
pub mod prompt;
pub mod retrieval;
pub mod search;
pub mod config;
pub mod setup;
pub mod error;
pub mod prelude;

// re-export the proc-macro attribute for convenient use: `use ragent::tool;` or `#[ragent::tool(...)]`
#[allow(unused_imports)]
pub use ragent_macros::tool;

// paths referenced by code generated from `#[tool]`
#[doc(hidden)]
pub use async_trait;
