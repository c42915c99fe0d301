//! Per-conversation and process configuration

use crate::graph::ToolRouting;
use crate::system_prompt::SYSTEM_PROMPT_TEMPLATE;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Model used when neither the conversation nor the environment names one
pub const DEFAULT_MODEL: &str = "claude-3-7-sonnet-latest";

const DEFAULT_PORT: u16 = 8031;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
}

/// Settings that shape a single conversation's agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub system_prompt_template: String,
    pub model: String,
    #[serde(default)]
    pub tool_routing: ToolRouting,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            system_prompt_template: SYSTEM_PROMPT_TEMPLATE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            tool_routing: ToolRouting::default(),
        }
    }
}

impl Configuration {
    /// Build from a `configurable` object, falling back to defaults.
    ///
    /// Missing or `null` fields keep their default; unknown keys are ignored.
    pub fn from_configurable(configurable: Option<&Value>) -> Result<Self, ConfigError> {
        Self::from_configurable_with_model(configurable, DEFAULT_MODEL)
    }

    /// Same as [`Configuration::from_configurable`] with a different default model
    pub fn from_configurable_with_model(
        configurable: Option<&Value>,
        default_model: &str,
    ) -> Result<Self, ConfigError> {
        let mut config = Self {
            model: default_model.to_string(),
            ..Self::default()
        };
        let Some(object) = configurable.and_then(Value::as_object) else {
            return Ok(config);
        };

        if let Some(template) = string_field(object, "systemPromptTemplate")? {
            config.system_prompt_template = template;
        }
        if let Some(model) = string_field(object, "model")? {
            config.model = model;
        }
        if let Some(routing) = object.get("toolRouting").filter(|v| !v.is_null()) {
            config.tool_routing = serde_json::from_value(routing.clone()).map_err(|e| {
                ConfigError::InvalidValue {
                    key: "toolRouting",
                    message: e.to_string(),
                }
            })?;
        }

        Ok(config)
    }
}

fn string_field(
    object: &serde_json::Map<String, Value>,
    key: &'static str,
) -> Result<Option<String>, ConfigError> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ConfigError::InvalidValue {
            key,
            message: format!("expected a string, got {other}"),
        }),
    }
}

/// Process-wide settings read from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: String,
    pub port: u16,
    pub default_model: String,
    pub tavily_api_key: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let db_path = std::env::var("AGENT_DB_PATH").unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            format!("{home}/.react-agent.db")
        });

        let port = std::env::var("AGENT_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let default_model =
            std::env::var("AGENT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Self {
            db_path,
            port,
            default_model,
            tavily_api_key: std::env::var("TAVILY_API_KEY").ok().filter(|k| !k.is_empty()),
        }
    }
}
