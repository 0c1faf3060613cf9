use async_trait::async_trait;
use crate::Result;

#[async_trait]
pub trait InferenceModel: Send + Sync {
    /// Model identifier, used in logs
    fn name(&self) -> &str;

    /// Send a single prompt and return the model's text reply
    async fn generate(&self, prompt: &str) -> Result<String>;
}
