//! tweetsmith adapters crate
//!
//! Infrastructure adapters implementing the domain ports:
//! - `store`: SQLite and in-memory tweet stores
//! - `examples`: Filesystem loader for the curated example pool
//! - `llm`: LLM generator adapters (OpenAI, stub)
//! - `x`: X (Twitter) publishing adapter

pub mod examples_fs;
pub mod llm;
pub mod store_memory;
pub mod store_sqlite;
pub mod x_api;

pub use examples_fs::{ExamplesError, load_static_pool};
pub use llm::{GeneratorConfig, OpenAiGenerator, StubGenerator};
pub use store_memory::InMemoryTweetStore;
pub use store_sqlite::SqliteTweetStore;
pub use x_api::XPublisher;
