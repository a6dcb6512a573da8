//! Graph-query synthesis.
//!
//! One model call turns the question, the narrowed-schema hint, and any
//! selected concepts into a graph query that retrieves tables, columns,
//! and join edges in a single pass. Transport or model failure here is
//! fatal for the current question and propagates to the caller.

use crate::error::Result;
use crate::extract;
use crate::llm::LanguageModel;
use crate::metadata::Concept;
use crate::prompts;
use itertools::Itertools;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub struct QuerySynthesizer {
    model: Arc<dyn LanguageModel>,
}

impl QuerySynthesizer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn synthesize(
        &self,
        question: &str,
        schema_hint: &str,
        concepts: &[Concept],
    ) -> Result<String> {
        let concept_hint = if concepts.is_empty() {
            String::new()
        } else {
            let names = concepts.iter().map(|c| c.name.as_str()).join(", ");
            format!(
                "\n**RELEVANT CONCEPTS:** {}\nPrioritize tables and columns related to these concepts.\n",
                names
            )
        };

        let mut variables = HashMap::new();
        variables.insert("user_question".to_string(), question.to_string());
        variables.insert("schema_context".to_string(), schema_hint.to_string());
        variables.insert("concept_hint".to_string(), concept_hint);

        let raw = self
            .model
            .generate(prompts::METADATA_GENERATOR, &variables, 0.0, 2000)
            .await?;

        let query = extract::strip_code_fence(&raw);
        debug!("Synthesized graph query:\n{}", query);
        Ok(query)
    }
}
