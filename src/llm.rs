//! Model transport.
//!
//! One fixed contract for every model call in the pipeline: a context id,
//! a variable map, temperature, and a token cap. Two interchangeable
//! backends sit behind it — the direct Anthropic Messages API (prompt
//! templates rendered locally) and a managed prompt gateway (templates
//! hosted server-side, only id + variables cross the wire).

use crate::config::{Config, LlmBackend};
use crate::error::{KgError, Result};
use crate::prompts::PromptLibrary;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(
        &self,
        context_id: &str,
        variables: &HashMap<String, String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String>;
}

/// Build the configured backend.
pub fn from_config(config: &Config) -> Result<Arc<dyn LanguageModel>> {
    match config.llm_backend {
        LlmBackend::Anthropic => {
            let api_key = config
                .anthropic_api_key
                .clone()
                .ok_or_else(|| KgError::Config("ANTHROPIC_API_KEY is not set".to_string()))?;
            Ok(Arc::new(AnthropicModel::new(
                api_key,
                config.anthropic_model.clone(),
            )))
        }
        LlmBackend::Gateway => {
            let endpoint = config
                .gateway_endpoint
                .clone()
                .ok_or_else(|| KgError::Config("GATEWAY_ENDPOINT is not set".to_string()))?;
            let api_key = config
                .gateway_api_key
                .clone()
                .ok_or_else(|| KgError::Config("GATEWAY_API_KEY is not set".to_string()))?;
            Ok(Arc::new(GatewayModel::new(
                endpoint,
                api_key,
                config.gateway_use_case.clone(),
            )))
        }
    }
}

/// Direct Anthropic Messages API backend.
pub struct AnthropicModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    prompts: PromptLibrary,
}

impl AnthropicModel {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: "https://api.anthropic.com/v1".to_string(),
            prompts: PromptLibrary::builtin(),
        }
    }
}

#[async_trait]
impl LanguageModel for AnthropicModel {
    async fn generate(
        &self,
        context_id: &str,
        variables: &HashMap<String, String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String> {
        let prompt = self.prompts.render(context_id, variables)?;
        debug!(context_id, prompt_chars = prompt.len(), "Calling model");

        let body = json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "temperature": temperature,
            "messages": [
                {"role": "user", "content": prompt}
            ],
        });

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| KgError::Llm(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(KgError::Llm(format!(
                "LLM API error ({}): {}",
                status, error_text
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| KgError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        let content = payload
            .pointer("/content/0/text")
            .and_then(Value::as_str)
            .ok_or_else(|| KgError::Llm("No content in LLM response".to_string()))?;

        if content.is_empty() {
            return Err(KgError::Llm("Empty content in LLM response".to_string()));
        }
        Ok(content.to_string())
    }
}

/// Managed prompt-gateway backend. The gateway owns the templates; this
/// client ships the context id and variables and returns the prediction.
pub struct GatewayModel {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    use_case: String,
}

impl GatewayModel {
    pub fn new(endpoint: String, api_key: String, use_case: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            use_case,
        }
    }
}

#[async_trait]
impl LanguageModel for GatewayModel {
    async fn generate(
        &self,
        context_id: &str,
        variables: &HashMap<String, String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String> {
        debug!(context_id, use_case = %self.use_case, "Calling gateway model");

        let body = json!({
            "use_case": self.use_case,
            "context_id": context_id,
            "parameters": variables,
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| KgError::Llm(format!("Gateway call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(KgError::Llm(format!(
                "Gateway error ({}): {}",
                status, error_text
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| KgError::Llm(format!("Failed to parse gateway response: {}", e)))?;

        let prediction = payload
            .get("prediction")
            .or_else(|| payload.get("output"))
            .and_then(Value::as_str)
            .ok_or_else(|| KgError::Llm("No prediction in gateway response".to_string()))?;

        Ok(prediction.to_string())
    }
}
