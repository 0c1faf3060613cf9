use std::env;
use std::fmt;
use std::sync::Arc;
use acc_core::{Error, InferenceModel, Result};

pub mod analyzer;
pub mod models;
pub mod prompts;
pub mod reply;
pub mod throttle;

use models::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use models::GeminiModel;
use throttle::{RetryPolicy, ThrottledModel};

#[derive(Clone)]
pub struct InferenceConfig {
    pub api_key: Option<String>,
    pub model_name: String,
    pub base_url: String,
    pub retry: RetryPolicy,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model_name: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

impl fmt::Debug for InferenceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InferenceConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model_name", &self.model_name)
            .field("base_url", &self.base_url)
            .field("retry", &self.retry)
            .finish()
    }
}

impl InferenceConfig {
    /// Reads `GOOGLE_API_KEY` and `GOOGLE_MODEL`. Call after the `.env` file
    /// has been loaded.
    pub fn from_env() -> Self {
        let non_empty = |key: &str| env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            api_key: non_empty("GOOGLE_API_KEY"),
            model_name: non_empty("GOOGLE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = model_name.into();
        self
    }
}

/// Builds the throttled Gemini client every crawl decision goes through.
pub fn create_model(config: &InferenceConfig) -> Result<Arc<dyn InferenceModel>> {
    let api_key = config.api_key.as_deref().ok_or_else(|| {
        Error::Config("Google API key not found. Please set GOOGLE_API_KEY in .env file".to_string())
    })?;
    let gemini = GeminiModel::new(api_key, &config.model_name)?.with_base_url(&config.base_url);
    Ok(Arc::new(ThrottledModel::new(Arc::new(gemini), config.retry.clone())))
}

pub mod prelude {
    pub use super::analyzer::{ContentAnalyzer, RelevanceVerdict};
    pub use super::throttle::{RetryPolicy, ThrottledModel};
    pub use super::{create_model, InferenceConfig};
    pub use acc_core::{Error, InferenceModel, Result};
}

pub use analyzer::{ContentAnalyzer, RelevanceVerdict};
