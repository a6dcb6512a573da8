use crate::llm::LanguageModel;
use crate::metadata::RetrievalResult;
use crate::prompts;
use crate::warehouse::SqlRow;
use itertools::Itertools;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

const MAX_SAMPLE_ROWS: usize = 10;

pub struct SummaryAgent {
    model: Arc<dyn LanguageModel>,
}

impl SummaryAgent {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn summarize(
        &self,
        question: &str,
        rows: &[SqlRow],
        sql: Option<&str>,
        metadata: Option<&RetrievalResult>,
    ) -> String {
        let mut variables = HashMap::new();
        variables.insert("user_question".to_string(), question.to_string());
        variables.insert("query_results".to_string(), format_results(rows));
        variables.insert(
            "metadata_context".to_string(),
            metadata
                .map(format_metadata_context)
                .unwrap_or_else(|| "No metadata available".to_string()),
        );
        variables.insert(
            "sql_query".to_string(),
            sql.unwrap_or("SQL not provided").to_string(),
        );
        variables.insert("row_count".to_string(), rows.len().to_string());

        match self
            .model
            .generate(prompts::SUMMARY, &variables, 0.3, 500)
            .await
        {
            Ok(summary) => summary.trim().to_string(),
            Err(e) => {
                warn!("Could not generate summary: {}", e);
                fallback_summary(rows.len())
            }
        }
    }
}

fn format_results(rows: &[SqlRow]) -> String {
    if rows.is_empty() {
        return "No data returned (0 rows)".to_string();
    }
    let sample: Vec<&SqlRow> = rows.iter().take(MAX_SAMPLE_ROWS).collect();
    let rendered = serde_json::to_string_pretty(&sample)
        .unwrap_or_else(|_| "results could not be rendered".to_string());
    format!("First {} of {} rows:\n{}", sample.len(), rows.len(), rendered)
}

fn format_metadata_context(metadata: &RetrievalResult) -> String {
    let tables = metadata
        .tables
        .iter()
        .map(|t| format!("- {} ({}): {}", t.name, t.kind, t.description))
        .join("\n");
    format!(
        "Tables used:\n{}\nJoin paths available: {}",
        tables,
        metadata.joins.len()
    )
}

pub fn fallback_summary(row_count: usize) -> String {
    if row_count == 0 {
        "Query returned no data matching your criteria.".to_string()
    } else {
        format!(
            "Query returned {} rows successfully. See the data table for details.",
            row_count
        )
    }
}

/// Canned explanation for a successful query that matched nothing.
pub fn zero_row_summary() -> String {
    "The query executed successfully but returned no data. This could mean:\n\
     - No records match the specified criteria\n\
     - The time period specified has no data\n\
     - The filters exclude all available data\n\n\
     Try adjusting your filters or expanding the time range."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{KgError, Result};
    use async_trait::async_trait;
    use serde_json::{Map, Value};

    struct UnreachableModel;

    #[async_trait]
    impl LanguageModel for UnreachableModel {
        async fn generate(
            &self,
            _context_id: &str,
            _variables: &HashMap<String, String>,
            _temperature: f32,
            _max_tokens: u32,
        ) -> Result<String> {
            Err(KgError::Llm("timeout".to_string()))
        }
    }

    fn sample_row(key: &str, value: Value) -> SqlRow {
        let mut row = Map::new();
        row.insert(key.to_string(), value);
        row
    }

    #[tokio::test]
    async fn test_model_failure_degrades_to_fallback() {
        let agent = SummaryAgent::new(Arc::new(UnreachableModel));
        let rows = vec![sample_row("total", Value::from(42))];
        let summary = agent.summarize("q", &rows, None, None).await;
        assert_eq!(
            summary,
            "Query returned 1 rows successfully. See the data table for details."
        );
    }

    #[test]
    fn test_format_results_empty() {
        assert_eq!(format_results(&[]), "No data returned (0 rows)");
    }

    #[test]
    fn test_format_results_samples_first_ten() {
        let rows: Vec<SqlRow> = (0..25)
            .map(|i| sample_row("n", Value::from(i)))
            .collect();
        let rendered = format_results(&rows);
        assert!(rendered.starts_with("First 10 of 25 rows:"));
    }

    #[test]
    fn test_fallback_summary_zero_rows() {
        assert_eq!(
            fallback_summary(0),
            "Query returned no data matching your criteria."
        );
    }
}
