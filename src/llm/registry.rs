//! Model registry: resolves `provider/model` specs into provider services

use super::{AnthropicService, LlmError, LlmService, LoggingService, OpenAIService};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Configuration for LLM providers
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    /// Alternate OpenAI-compatible endpoint
    pub openai_base_url: Option<String>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            anthropic_api_key: non_empty_var("ANTHROPIC_API_KEY"),
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            openai_base_url: non_empty_var("OPENAI_BASE_URL"),
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.anthropic_api_key.is_some() || self.openai_api_key.is_some()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Anthropic,
    OpenAI,
}

impl Provider {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "anthropic" => Some(Provider::Anthropic),
            "openai" => Some(Provider::OpenAI),
            _ => None,
        }
    }

    /// Guess the provider from a bare model name
    pub fn infer(model: &str) -> Option<Self> {
        if model.starts_with("claude") {
            Some(Provider::Anthropic)
        } else if ["gpt", "o1", "o3", "o4"]
            .iter()
            .any(|prefix| model.starts_with(prefix))
        {
            Some(Provider::OpenAI)
        } else {
            None
        }
    }
}

/// A parsed `"provider/model"` string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    /// Explicit provider name, if the spec contained a `/`
    pub provider: Option<String>,
    pub model: String,
}

impl ModelSpec {
    /// Split at the first `/`; everything after it is the model name.
    pub fn parse(spec: &str) -> Self {
        match spec.split_once('/') {
            Some((provider, model)) => Self {
                provider: Some(provider.to_string()),
                model: model.to_string(),
            },
            None => Self {
                provider: None,
                model: spec.to_string(),
            },
        }
    }

    /// Provider to use, explicit or inferred
    pub fn resolve_provider(&self) -> Result<Provider, LlmError> {
        match &self.provider {
            Some(name) => Provider::from_name(name)
                .ok_or_else(|| LlmError::invalid_request(format!("Unknown model provider: {name}"))),
            None => Provider::infer(&self.model).ok_or_else(|| {
                LlmError::invalid_request(format!(
                    "Cannot infer provider for model '{}'; use provider/model",
                    self.model
                ))
            }),
        }
    }
}

/// Lazily constructed, cached provider services keyed by model spec
pub struct ModelRegistry {
    config: LlmConfig,
    services: Mutex<HashMap<String, Arc<dyn LlmService>>>,
}

impl ModelRegistry {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            config: config.clone(),
            services: Mutex::new(HashMap::new()),
        }
    }

    /// Registry without credentials; every load fails with an auth error
    #[cfg(test)]
    pub fn new_empty() -> Self {
        Self::new(&LlmConfig::default())
    }

    /// Pre-register a service under a spec, bypassing construction
    #[cfg(test)]
    pub fn insert(&self, spec: &str, service: Arc<dyn LlmService>) {
        if let Ok(mut services) = self.services.lock() {
            services.insert(spec.to_string(), service);
        }
    }

    /// Resolve a spec into a ready-to-use service
    pub fn load(&self, spec: &str) -> Result<Arc<dyn LlmService>, LlmError> {
        if let Some(service) = self
            .services
            .lock()
            .ok()
            .and_then(|services| services.get(spec).cloned())
        {
            return Ok(service);
        }

        let parsed = ModelSpec::parse(spec);
        if parsed.model.is_empty() {
            return Err(LlmError::invalid_request(format!("Missing model name in '{spec}'")));
        }

        let inner: Arc<dyn LlmService> = match parsed.resolve_provider()? {
            Provider::Anthropic => {
                let key = self
                    .config
                    .anthropic_api_key
                    .as_ref()
                    .ok_or_else(|| LlmError::auth("ANTHROPIC_API_KEY is not set"))?;
                Arc::new(AnthropicService::new(key, &parsed.model))
            }
            Provider::OpenAI => {
                let key = self
                    .config
                    .openai_api_key
                    .as_ref()
                    .ok_or_else(|| LlmError::auth("OPENAI_API_KEY is not set"))?;
                Arc::new(OpenAIService::new(
                    key,
                    &parsed.model,
                    self.config.openai_base_url.as_deref(),
                ))
            }
        };

        let service: Arc<dyn LlmService> = Arc::new(LoggingService::new(inner));
        if let Ok(mut services) = self.services.lock() {
            services.insert(spec.to_string(), service.clone());
        }
        tracing::info!(spec = %spec, model = %parsed.model, "Loaded model service");
        Ok(service)
    }
}
