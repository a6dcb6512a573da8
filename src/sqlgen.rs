//! SQL generation against the compacted metadata.
//!
//! Thin collaborator over the model transport: compact the retrieval
//! result, render the join hints, call the model once, and pull SQL out of
//! whatever the model wrapped it in.

use crate::compactor;
use crate::error::{KgError, Result};
use crate::llm::LanguageModel;
use crate::metadata::RetrievalResult;
use crate::prompts;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

lazy_static! {
    static ref SQL_FENCE: Regex = Regex::new(r"(?is)```sql\n(.*?)\n```").unwrap();
}

const SQL_KEYWORDS: [&str; 4] = ["SELECT", "WITH", "INSERT", "UPDATE"];
const VALID_SQL_STARTS: [&str; 7] =
    ["SELECT", "WITH", "INSERT", "UPDATE", "DELETE", "CREATE", "--"];

/// Phrases that mark a SQL-less response as a refusal rather than SQL in
/// an unusual format.
const ERROR_INDICATORS: [&str; 10] = [
    "too large",
    "too broad",
    "too much context",
    "narrow your question",
    "more specific",
    "missing:",
    "not available",
    "no data available",
    "cannot generate",
    "unable to",
];

pub struct SqlGenerator {
    model: Arc<dyn LanguageModel>,
    data_project_id: String,
    dataset_id: String,
}

impl SqlGenerator {
    pub fn new(model: Arc<dyn LanguageModel>, data_project_id: String, dataset_id: String) -> Self {
        Self {
            model,
            data_project_id,
            dataset_id,
        }
    }

    pub async fn generate_sql(&self, question: &str, metadata: &RetrievalResult) -> Result<String> {
        let compacted = compactor::compact(metadata, compactor::DEFAULT_MAX_COLUMNS_PER_TABLE);
        let joins_block = compactor::render_join_hints(&compacted.joins);
        let metadata_str = serde_json::to_string_pretty(&compacted)?;

        debug!(
            "SQL generation payload: metadata={} chars, joins={} chars",
            metadata_str.len(),
            joins_block.len()
        );

        let mut variables = HashMap::new();
        variables.insert("user_question".to_string(), question.to_string());
        variables.insert("metadata".to_string(), metadata_str);
        variables.insert("joins".to_string(), joins_block);
        variables.insert("data_project_id".to_string(), self.data_project_id.clone());
        variables.insert("dataset_id".to_string(), self.dataset_id.clone());

        let response = self
            .model
            .generate(prompts::SQL_GENERATOR, &variables, 0.0, 3000)
            .await
            .map_err(map_payload_rejection)?;

        extract_sql(&response)
    }
}

/// An oversized prompt comes back as a transport-level rejection; turn it
/// into guidance the user can act on.
fn map_payload_rejection(error: KgError) -> KgError {
    let message = error.to_string();
    if message.contains("413")
        || message.contains("Payload Too Large")
        || message.contains("PAYLOAD_TOO_LARGE")
    {
        KgError::SqlGeneration(
            "The query context is too large for the system to process. \
             Try narrowing to a specific time period or metric."
                .to_string(),
        )
    } else {
        error
    }
}

/// Extract the SQL statement from a free-form model response.
///
/// Preference order: a ```sql fence, then any bare fence, then raw text
/// that already starts with a SQL keyword. A response with no SQL that
/// reads as a refusal or error becomes `SqlGeneration`; anything else is
/// returned as-is for execution-time validation to catch.
pub fn extract_sql(response: &str) -> Result<String> {
    let response = response.trim();
    let mut extracted: Option<String> = None;

    if response.to_lowercase().contains("```sql") {
        if let Some(captures) = SQL_FENCE.captures(response) {
            extracted = Some(captures[1].trim().to_string());
        }
    } else if response.contains("```") {
        let mut in_code_block = false;
        let mut sql_lines = Vec::new();
        for line in response.lines() {
            if line.trim().starts_with("```") {
                in_code_block = !in_code_block;
                continue;
            }
            if in_code_block {
                sql_lines.push(line);
            }
        }
        if !sql_lines.is_empty() {
            extracted = Some(sql_lines.join("\n").trim().to_string());
        }
    } else {
        let upper = response.to_uppercase();
        if SQL_KEYWORDS.iter().any(|kw| upper.starts_with(kw)) {
            extracted = Some(response.to_string());
        }
    }

    if let Some(sql) = extracted {
        return Ok(sql);
    }

    let lower = response.to_lowercase();
    if lower.contains("cannot answer") {
        return Err(KgError::SqlGeneration(response.to_string()));
    }
    if ERROR_INDICATORS.iter().any(|marker| lower.contains(marker)) {
        return Err(KgError::SqlGeneration(response.to_string()));
    }

    // No SQL and no clear refusal: pass through and let execution validate.
    Ok(response.to_string())
}

/// Cheap shape check before shipping a statement to the warehouse.
pub fn looks_like_sql(sql: &str) -> bool {
    let upper = sql.trim().to_uppercase();
    VALID_SQL_STARTS.iter().any(|start| upper.starts_with(start))
}
