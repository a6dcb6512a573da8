//! Per-question orchestration: metadata retrieval → SQL generation →
//! optional execution → optional summary.
//!
//! All state is carried in the per-request `QuestionOutcome`; nothing is
//! shared between questions except the read-only concept index and the
//! pooled transport clients inside the collaborators.

use crate::error::KgError;
use crate::metadata::RetrievalResult;
use crate::retrieval::MetadataRetrievalAgent;
use crate::session::{SessionEntry, SessionStore};
use crate::sqlgen::{self, SqlGenerator};
use crate::summary::{self, SummaryAgent};
use crate::warehouse::{SqlRow, Warehouse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub const NO_TABLES_MESSAGE: &str = "No relevant tables found for your question. \
     Please try rephrasing or asking about different metrics.";

const NOT_SQL_MESSAGE: &str = "The system couldn't generate valid SQL for your question. \
     This usually means the question is outside the scope of available data. \
     Please try asking about relevant metrics and data in your dataset.";

#[derive(Debug, Clone, Copy)]
pub struct ProcessOptions {
    /// Generate SQL without running it when false.
    pub execute: bool,
    pub include_summary: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            execute: true,
            include_summary: true,
        }
    }
}

/// Everything produced while answering one question.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionOutcome {
    pub request_id: Uuid,
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RetrievalResult>,
    pub sql: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<SqlRow>>,
    pub row_count: usize,
    pub summary: Option<String>,
    pub error: Option<String>,
    pub success: bool,
    pub answered_at: DateTime<Utc>,
}

impl QuestionOutcome {
    fn started(question: &str) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            question: question.to_string(),
            metadata: None,
            sql: None,
            rows: None,
            row_count: 0,
            summary: None,
            error: None,
            success: false,
            answered_at: Utc::now(),
        }
    }

    fn fail(mut self, message: String) -> Self {
        warn!("Question failed: {}", message);
        self.error = Some(message);
        self.success = false;
        self
    }
}

pub struct Orchestrator {
    retrieval: MetadataRetrievalAgent,
    sqlgen: SqlGenerator,
    summarizer: SummaryAgent,
    warehouse: Option<Arc<dyn Warehouse>>,
    sessions: Arc<dyn SessionStore>,
}

impl Orchestrator {
    pub fn new(
        retrieval: MetadataRetrievalAgent,
        sqlgen: SqlGenerator,
        summarizer: SummaryAgent,
        warehouse: Option<Arc<dyn Warehouse>>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            retrieval,
            sqlgen,
            summarizer,
            warehouse,
            sessions,
        }
    }

    pub async fn process_question(
        &self,
        session_id: Option<&str>,
        question: &str,
        options: ProcessOptions,
    ) -> QuestionOutcome {
        let mut outcome = QuestionOutcome::started(question);
        info!(request_id = %outcome.request_id, "Processing question: {}", question);

        let metadata = match self.retrieval.retrieve(question).await {
            Ok(metadata) => metadata,
            Err(e) => return self.record(session_id, outcome.fail(e.to_string())),
        };

        if metadata.is_empty() {
            outcome.metadata = Some(metadata);
            return self.record(session_id, outcome.fail(NO_TABLES_MESSAGE.to_string()));
        }
        info!("Retrieved {} relevant tables", metadata.tables.len());

        let sql = match self.sqlgen.generate_sql(question, &metadata).await {
            Ok(sql) => sql,
            Err(e) => {
                outcome.metadata = Some(metadata);
                return self.record(session_id, outcome.fail(e.to_string()));
            }
        };
        outcome.sql = Some(sql.clone());
        outcome.metadata = Some(metadata);

        if !options.execute {
            info!("Dry run mode - SQL generated but not executed");
            outcome.success = true;
            return self.record(session_id, outcome);
        }

        let Some(warehouse) = &self.warehouse else {
            let e = KgError::Config(
                "No warehouse client configured; re-run in dry-run mode".to_string(),
            );
            return self.record(session_id, outcome.fail(e.to_string()));
        };

        if !sqlgen::looks_like_sql(&sql) {
            return self.record(session_id, outcome.fail(NOT_SQL_MESSAGE.to_string()));
        }

        let rows = match warehouse.run_sql(&sql).await {
            Ok(rows) => rows,
            Err(e) => return self.record(session_id, outcome.fail(e.to_string())),
        };
        outcome.row_count = rows.len();

        if outcome.row_count == 0 {
            info!("Query executed successfully, no rows matched the criteria");
        } else {
            info!("Query executed successfully, retrieved {} rows", outcome.row_count);
        }

        if options.include_summary {
            outcome.summary = Some(if rows.is_empty() {
                summary::zero_row_summary()
            } else {
                self.summarizer
                    .summarize(
                        question,
                        &rows,
                        outcome.sql.as_deref(),
                        outcome.metadata.as_ref(),
                    )
                    .await
            });
        }

        outcome.rows = Some(rows);
        outcome.success = true;
        self.record(session_id, outcome)
    }

    fn record(&self, session_id: Option<&str>, outcome: QuestionOutcome) -> QuestionOutcome {
        if let Some(session_id) = session_id {
            self.sessions.append(
                session_id,
                SessionEntry::new(
                    &outcome.question,
                    outcome.sql.clone(),
                    outcome.summary.clone(),
                ),
            );
        }
        outcome
    }
}
