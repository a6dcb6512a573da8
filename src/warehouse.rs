//! Warehouse execution client.
//!
//! The warehouse is a black box to this crate: SQL in, rows out. The
//! default implementation posts statements to an HTTP SQL endpoint;
//! deployments with a vendor SDK supply their own `Warehouse` impl.

use crate::error::{KgError, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

pub type SqlRow = Map<String, Value>;

#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Execute one SQL statement and return its rows. Zero rows is a
    /// valid, successful result.
    async fn run_sql(&self, sql: &str) -> Result<Vec<SqlRow>>;
}

/// Generic HTTP SQL endpoint client: POST a JSON body with the query,
/// expect a JSON array of row objects back.
pub struct HttpWarehouse {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpWarehouse {
    pub fn new(endpoint: String, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            token,
        }
    }
}

#[async_trait]
impl Warehouse for HttpWarehouse {
    async fn run_sql(&self, sql: &str) -> Result<Vec<SqlRow>> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&json!({ "query": sql }));
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| KgError::Warehouse(format!("Warehouse request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(KgError::Warehouse(format!(
                "Warehouse error ({}): {}",
                status, error_text
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| KgError::Warehouse(format!("Failed to parse warehouse response: {}", e)))?;

        // Accept either a bare array or an object with a "rows" field.
        let rows_value = match &payload {
            Value::Array(_) => &payload,
            Value::Object(object) => object
                .get("rows")
                .ok_or_else(|| KgError::Warehouse("Warehouse response missing rows".to_string()))?,
            _ => {
                return Err(KgError::Warehouse(
                    "Unexpected warehouse response shape".to_string(),
                ))
            }
        };

        let rows = rows_value
            .as_array()
            .ok_or_else(|| KgError::Warehouse("Warehouse rows is not an array".to_string()))?
            .iter()
            .filter_map(|row| row.as_object().cloned())
            .collect();
        Ok(rows)
    }
}
