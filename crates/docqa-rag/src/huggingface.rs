//! Hugging Face inference API text-generation backend.

use async_trait::async_trait;
use docqa_core::GenerateError;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::generation::{Generator, ResponseShape};

pub const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";
pub const DEFAULT_MODEL: &str = "google/flan-t5-base";

/// Connection and sampling settings for [`HuggingFaceGenerator`].
#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

impl HuggingFaceConfig {
    /// Default endpoint and sampling settings for the given key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_new_tokens: 200,
            temperature: 0.7,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: GenerationParameters,
}

#[derive(Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
    temperature: f32,
    do_sample: bool,
}

/// Text generation through the Hugging Face inference API.
///
/// Responses keep the API's sequence shape
/// (`[{"generated_text": ...}]`) with any echoed prompt removed.
pub struct HuggingFaceGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    max_new_tokens: u32,
    temperature: f32,
}

impl HuggingFaceGenerator {
    pub fn new(config: HuggingFaceConfig) -> Result<Self, GenerateError> {
        if config.api_key.trim().is_empty() {
            return Err(GenerateError::Unavailable(
                "missing Hugging Face API key".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", config.api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|e| GenerateError::Request(format!("invalid API key: {e}")))?,
        );
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| GenerateError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/models/{}",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
            model: config.model,
            max_new_tokens: config.max_new_tokens,
            temperature: config.temperature,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Remove the prompt from every `generated_text` in a sequence response.
fn strip_echoed_prompt(mut value: Value, prompt: &str) -> Value {
    if let Value::Array(items) = &mut value {
        for item in items {
            if let Some(Value::String(text)) = item.get_mut("generated_text") {
                *text = text.replace(prompt, "").trim().to_string();
            }
        }
    }
    value
}

#[async_trait]
impl Generator for HuggingFaceGenerator {
    fn name(&self) -> &str {
        &self.model
    }

    fn response_shape(&self) -> ResponseShape {
        ResponseShape::Sequence
    }

    async fn generate(&self, prompt: &str) -> Result<Value, GenerateError> {
        let request = GenerationRequest {
            inputs: prompt,
            parameters: GenerationParameters {
                max_new_tokens: self.max_new_tokens,
                temperature: self.temperature,
                do_sample: true,
            },
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerateError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(GenerateError::Request(format!(
                "generation request failed ({status}): {body}"
            )));
        }

        let value: Value = resp
            .json()
            .await
            .map_err(|e| GenerateError::Request(format!("failed to parse response: {e}")))?;
        debug!("Received generation response from {}", self.model);
        Ok(strip_echoed_prompt(value, prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_and_shape() {
        let generator = HuggingFaceGenerator::new(HuggingFaceConfig::new("hf_test")).unwrap();
        assert_eq!(
            generator.endpoint(),
            "https://api-inference.huggingface.co/models/google/flan-t5-base"
        );
        assert_eq!(generator.response_shape(), ResponseShape::Sequence);
        assert_eq!(generator.name(), DEFAULT_MODEL);
    }

    #[test]
    fn test_missing_key_is_unavailable() {
        assert!(matches!(
            HuggingFaceGenerator::new(HuggingFaceConfig::new(" ")),
            Err(GenerateError::Unavailable(_))
        ));
    }

    #[test]
    fn test_strip_echoed_prompt() {
        let value = json!([{"generated_text": "Question? The answer is 4."}]);
        let stripped = strip_echoed_prompt(value, "Question?");
        assert_eq!(
            ResponseShape::Sequence.normalize(stripped).unwrap(),
            "The answer is 4."
        );
    }

    #[test]
    fn test_request_body() {
        let request = GenerationRequest {
            inputs: "hi",
            parameters: GenerationParameters {
                max_new_tokens: 200,
                temperature: 0.5,
                do_sample: true,
            },
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["inputs"], "hi");
        assert_eq!(body["parameters"]["max_new_tokens"], 200);
        assert_eq!(body["parameters"]["do_sample"], true);
    }
}
