use std::fmt;
use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use acc_core::{Error, InferenceModel, Result};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

/// Google Gemini over the public `generateContent` REST endpoint.
pub struct GeminiModel {
    client: Client,
    api_key: String,
    model_name: String,
    base_url: String,
}

impl GeminiModel {
    pub fn new(api_key: impl Into<String>, model_name: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::Config("Gemini API key is required".to_string()));
        }
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            model_name: model_name.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model_name)
    }
}

impl fmt::Debug for GeminiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("model_name", &self.model_name)
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Map a non-success response to an error, separating quota exhaustion
/// (retried with backoff) from everything else.
fn classify_failure(status: u16, body: &str) -> Error {
    let lowered = body.to_lowercase();
    if status == 429
        || lowered.contains("exceeded your current quota")
        || lowered.contains("resource_exhausted")
    {
        Error::RateLimited(format!("Gemini API returned {}: {}", status, body.trim()))
    } else {
        Error::Inference(format!("Gemini API returned {}: {}", status, body.trim()))
    }
}

fn reply_text(response: GenerateResponse) -> Result<String> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::Inference("Gemini returned no candidates".to_string()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(Error::Inference(format!(
            "Gemini returned an empty reply (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }
    Ok(text)
}

#[async_trait]
impl InferenceModel for GeminiModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status.as_u16(), &body));
        }

        reply_text(response.json::<GenerateResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_requires_api_key() {
        let result = GeminiModel::new("  ", DEFAULT_MODEL);
        assert!(matches!(result, Err(Error::Config(_))));

        let model = GeminiModel::new("test-key", DEFAULT_MODEL).unwrap();
        assert_eq!(model.name(), "gemini-2.0-flash");
        assert!(!format!("{:?}", model).contains("test-key"));
    }

    #[test]
    fn test_endpoint() {
        let model = GeminiModel::new("k", "gemini-1.5-pro")
            .unwrap()
            .with_base_url("http://localhost:8080/v1beta/");
        assert_eq!(
            model.endpoint(),
            "http://localhost:8080/v1beta/models/gemini-1.5-pro:generateContent"
        );
    }

    #[test]
    fn test_reply_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"YES, "},{"text":"it is."}]},"finishReason":"STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(reply_text(response).unwrap(), "YES, it is.");
    }

    #[test]
    fn test_reply_text_empty_is_error() {
        let response: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        let err = reply_text(response).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));

        let response: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(reply_text(response).is_err());
    }

    #[test]
    fn test_classify_failure() {
        assert!(classify_failure(429, "slow down").is_rate_limited());
        assert!(classify_failure(403, "You exceeded your current quota").is_rate_limited());
        assert!(classify_failure(400, r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#).is_rate_limited());
        assert!(!classify_failure(500, "internal").is_rate_limited());
    }
}
