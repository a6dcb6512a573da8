//! Environment-driven configuration.

use crate::error::{KgError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Anthropic,
    Gateway,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub graph_uri: String,
    pub graph_username: String,
    pub graph_password: String,
    pub graph_database: String,

    pub llm_backend: LlmBackend,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub gateway_endpoint: Option<String>,
    pub gateway_api_key: Option<String>,
    pub gateway_use_case: String,

    pub warehouse_endpoint: Option<String>,
    pub warehouse_token: Option<String>,
    pub data_project_id: String,
    pub dataset_id: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let llm_backend = match std::env::var("LLM_BACKEND").as_deref() {
            Ok("gateway") => LlmBackend::Gateway,
            Ok("anthropic") | Err(_) => LlmBackend::Anthropic,
            Ok(other) => {
                return Err(KgError::Config(format!(
                    "LLM_BACKEND must be 'anthropic' or 'gateway', got '{}'",
                    other
                )))
            }
        };

        let config = Self {
            graph_uri: required("GRAPH_URI")?,
            graph_username: required("GRAPH_USERNAME")?,
            graph_password: required("GRAPH_PASSWORD")?,
            graph_database: optional("GRAPH_DATABASE").unwrap_or_else(|| "neo4j".to_string()),
            llm_backend,
            anthropic_api_key: optional("ANTHROPIC_API_KEY"),
            anthropic_model: optional("ANTHROPIC_MODEL")
                .unwrap_or_else(|| "claude-sonnet-4-5".to_string()),
            gateway_endpoint: optional("GATEWAY_ENDPOINT"),
            gateway_api_key: optional("GATEWAY_API_KEY"),
            gateway_use_case: optional("GATEWAY_USE_CASE")
                .unwrap_or_else(|| "warehouse_chat".to_string()),
            warehouse_endpoint: optional("WAREHOUSE_ENDPOINT"),
            warehouse_token: optional("WAREHOUSE_TOKEN"),
            data_project_id: optional("DATA_PROJECT_ID").unwrap_or_default(),
            dataset_id: optional("DATASET_ID").unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        match self.llm_backend {
            LlmBackend::Anthropic if self.anthropic_api_key.is_none() => Err(KgError::Config(
                "ANTHROPIC_API_KEY is required for the anthropic backend".to_string(),
            )),
            LlmBackend::Gateway
                if self.gateway_endpoint.is_none() || self.gateway_api_key.is_none() =>
            {
                Err(KgError::Config(
                    "GATEWAY_ENDPOINT and GATEWAY_API_KEY are required for the gateway backend"
                        .to_string(),
                ))
            }
            _ => Ok(()),
        }
    }
}

fn required(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| KgError::Config(format!("{} is not set", name)))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
