//! Generation providers and response-shape normalization.
//!
//! Language-model backends answer in different JSON shapes: a bare string,
//! an object carrying the text under a known key, or a list of such values.
//! Each backend declares its [`ResponseShape`] once; [`GenerationProvider`]
//! captures it at construction and normalizes every response through it.

use async_trait::async_trait;
use docqa_core::GenerateError;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Keys that carry generated text in keyed payloads, in lookup order.
const TEXT_KEYS: [&str; 3] = ["text", "generated_text", "response"];

/// The JSON shape a generator responds with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `"answer"`
    PlainText,
    /// `{"text": "answer"}`, or `generated_text` / `response`
    KeyedPayload,
    /// `[{"generated_text": "answer"}]` or `["answer"]`
    Sequence,
}

impl ResponseShape {
    /// Reduce a raw response to its text.
    pub fn normalize(self, value: Value) -> Result<String, GenerateError> {
        match self {
            Self::PlainText => normalize_plain(value),
            Self::KeyedPayload => normalize_keyed(value),
            Self::Sequence => normalize_sequence(value),
        }
    }
}

fn normalize_plain(value: Value) -> Result<String, GenerateError> {
    match value {
        Value::String(text) => Ok(text),
        other => Err(unrecognized("plain text", &other)),
    }
}

fn normalize_keyed(value: Value) -> Result<String, GenerateError> {
    match value {
        Value::Object(mut map) => TEXT_KEYS
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::String(text)) => Some(text),
                _ => None,
            })
            .ok_or_else(|| {
                GenerateError::UnrecognizedShape(format!(
                    "payload has none of the keys {}",
                    TEXT_KEYS.join(", ")
                ))
            }),
        other => Err(unrecognized("keyed payload", &other)),
    }
}

fn normalize_sequence(value: Value) -> Result<String, GenerateError> {
    let Value::Array(items) = value else {
        return Err(unrecognized("sequence", &value));
    };
    match items.into_iter().next() {
        Some(Value::String(text)) => Ok(text),
        Some(first @ Value::Object(_)) => normalize_keyed(first),
        Some(first) => Ok(first.to_string()),
        None => Err(GenerateError::UnrecognizedShape(
            "empty response sequence".to_string(),
        )),
    }
}

fn unrecognized(expected: &str, value: &Value) -> GenerateError {
    let kind = match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    GenerateError::UnrecognizedShape(format!("expected {expected}, got {kind}"))
}

/// A language-model backend.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    /// Shape of the values returned by [`generate`](Self::generate).
    fn response_shape(&self) -> ResponseShape;

    /// Run the prompt and return the raw response.
    async fn generate(&self, prompt: &str) -> Result<Value, GenerateError>;
}

type GenerateFn = dyn Fn(&str) -> Result<Value, GenerateError> + Send + Sync;

/// Generator backed by a plain function.
pub struct FnGenerator {
    name: String,
    shape: ResponseShape,
    func: Box<GenerateFn>,
}

impl FnGenerator {
    pub fn new<F>(name: impl Into<String>, shape: ResponseShape, func: F) -> Self
    where
        F: Fn(&str) -> Result<Value, GenerateError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            shape,
            func: Box::new(func),
        }
    }
}

#[async_trait]
impl Generator for FnGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn response_shape(&self) -> ResponseShape {
        self.shape
    }

    async fn generate(&self, prompt: &str) -> Result<Value, GenerateError> {
        (self.func)(prompt)
    }
}

/// A generator with its response shape resolved and a call timeout.
#[derive(Clone)]
pub struct GenerationProvider {
    generator: Arc<dyn Generator>,
    shape: ResponseShape,
    timeout: Duration,
}

impl std::fmt::Debug for GenerationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationProvider")
            .field("name", &self.generator.name())
            .field("shape", &self.shape)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GenerationProvider {
    #[must_use]
    pub fn new(generator: Arc<dyn Generator>, timeout: Duration) -> Self {
        let shape = generator.response_shape();
        Self {
            generator,
            shape,
            timeout,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.generator.name()
    }

    #[must_use]
    pub fn shape(&self) -> ResponseShape {
        self.shape
    }

    /// Generate and normalize a response, bounded by the provider timeout.
    pub async fn generate_text(&self, prompt: &str) -> Result<String, GenerateError> {
        debug!(
            "Generating with {} ({} prompt chars)",
            self.name(),
            prompt.chars().count()
        );
        let value = match tokio::time::timeout(self.timeout, self.generator.generate(prompt)).await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!("Generator {} timed out after {:?}", self.name(), self.timeout);
                return Err(GenerateError::Timeout(self.timeout));
            }
        };
        self.shape.normalize(value)
    }
}
