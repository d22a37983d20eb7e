//! Application use cases / business logic

pub mod dispatch;
pub mod generate;
pub mod sanitize;
pub mod select_examples;

pub use dispatch::{DispatchConfig, Dispatcher};
pub use generate::{GenerationConfig, GenerationPipeline};
pub use sanitize::{SanitizeRule, Sanitizer};
pub use select_examples::{render_examples, select_examples, StaticPool};
