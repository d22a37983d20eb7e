//! Stub generator for testing and offline mode

use async_trait::async_trait;
use tweetsmith_domain::{GenerateError, Generator};

/// Stub generator producing a deterministic tweet without any API call
#[derive(Default)]
pub struct StubGenerator;

impl StubGenerator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Generator for StubGenerator {
    async fn generate(&self, context: &str, _examples: &str) -> Result<String, GenerateError> {
        Ok(format!("thinking about {} again. we are so early", context))
    }
}
