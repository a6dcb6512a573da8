//! Graph store client.
//!
//! The metadata catalog lives in an external graph database. The core only
//! needs one operation from it: run a query, get rows back. `GraphStore` is
//! the seam; `HttpGraphStore` speaks the Neo4j HTTP transaction-commit API.

use crate::error::{KgError, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

/// One row of a graph query result, keyed by the query's return aliases.
#[derive(Debug, Clone, Default)]
pub struct GraphRow(Map<String, Value>);

impl GraphRow {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String field; `null` and non-strings read as absent.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    pub fn get_list(&self, key: &str) -> Option<&Vec<Value>> {
        self.0.get(key).and_then(Value::as_array)
    }
}

#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Run one query against the store and return its rows.
    async fn run(&self, query: &str, params: Value) -> Result<Vec<GraphRow>>;
}

/// Neo4j HTTP transaction-commit client.
pub struct HttpGraphStore {
    client: reqwest::Client,
    endpoint: String,
    username: String,
    password: String,
}

impl HttpGraphStore {
    pub fn new(uri: &str, database: &str, username: &str, password: &str) -> Self {
        let endpoint = format!("{}/db/{}/tx/commit", uri.trim_end_matches('/'), database);
        Self {
            client: reqwest::Client::new(),
            endpoint,
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

#[async_trait]
impl GraphStore for HttpGraphStore {
    async fn run(&self, query: &str, params: Value) -> Result<Vec<GraphRow>> {
        let body = json!({
            "statements": [{
                "statement": query,
                "parameters": params,
            }]
        });

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.username, Some(&self.password))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| KgError::Graph(format!("Graph store request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(KgError::Graph(format!(
                "Graph store error ({}): {}",
                status, error_text
            )));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| KgError::Graph(format!("Failed to parse graph response: {}", e)))?;

        // The transaction endpoint reports query errors with HTTP 200.
        if let Some(errors) = payload.get("errors").and_then(Value::as_array) {
            if let Some(first) = errors.first() {
                let message = first
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown graph error");
                return Err(KgError::Graph(format!(
                    "Graph query failed: {}",
                    message
                )));
            }
        }

        let result = payload
            .get("results")
            .and_then(Value::as_array)
            .and_then(|r| r.first())
            .ok_or_else(|| KgError::Graph("Graph response missing results".to_string()))?;

        let columns: Vec<String> = result
            .get("columns")
            .and_then(Value::as_array)
            .map(|cols| {
                cols.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let mut rows = Vec::new();
        if let Some(data) = result.get("data").and_then(Value::as_array) {
            for entry in data {
                let Some(values) = entry.get("row").and_then(Value::as_array) else {
                    continue;
                };
                let mut fields = Map::new();
                for (column, value) in columns.iter().zip(values.iter()) {
                    fields.insert(column.clone(), value.clone());
                }
                rows.push(GraphRow::new(fields));
            }
        }
        Ok(rows)
    }
}
