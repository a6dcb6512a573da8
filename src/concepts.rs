//! Concept selection: map a free-text question to relevant business
//! concepts.
//!
//! The model path asks for a JSON array of concept names; any failure along
//! that path (transport, malformed output, wrong shape) degrades to a
//! deterministic keyword score, so selection never fails outward.

use crate::error::{KgError, Result};
use crate::extract;
use crate::llm::LanguageModel;
use crate::metadata::Concept;
use crate::prompts;
use itertools::Itertools;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

const NAME_WORD_SCORE: i64 = 10;
const NAME_PHRASE_SCORE: i64 = 15;
const DESCRIPTION_WORD_SCORE: i64 = 2;
const MIN_SCORE: i64 = 5;
const MAX_FALLBACK_CONCEPTS: usize = 5;

pub struct ConceptSelector {
    model: Arc<dyn LanguageModel>,
}

impl ConceptSelector {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Select the concepts relevant to `question`, in catalog order.
    pub async fn select(&self, question: &str, catalog: &[Concept]) -> Vec<Concept> {
        if catalog.is_empty() {
            return Vec::new();
        }

        match self.ask_model(question, catalog).await {
            Ok(selected) => {
                info!(
                    "Model identified {} concepts: {:?}",
                    selected.len(),
                    selected.iter().map(|c| &c.name).collect::<Vec<_>>()
                );
                selected
            }
            Err(e) => {
                warn!("Concept identification failed ({}), falling back to keyword matching", e);
                let selected = fallback_by_keywords(question, catalog);
                info!(
                    "Fallback identified {} concepts: {:?}",
                    selected.len(),
                    selected.iter().map(|c| &c.name).collect::<Vec<_>>()
                );
                selected
            }
        }
    }

    async fn ask_model(&self, question: &str, catalog: &[Concept]) -> Result<Vec<Concept>> {
        let listing = catalog
            .iter()
            .map(|c| format!("- {}: {}", c.name, c.description))
            .join("\n");

        let mut variables = HashMap::new();
        variables.insert("prompt".to_string(), question.to_string());
        variables.insert("concepts_list".to_string(), listing);

        let response = self
            .model
            .generate(prompts::CONCEPT_IDENTIFIER, &variables, 0.0, 500)
            .await?;

        let names = extract::parse_string_array(&response)
            .map_err(|e| KgError::Llm(e.to_string()))?;
        let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();

        // Unknown names are dropped; catalog order is preserved.
        Ok(catalog
            .iter()
            .filter(|c| wanted.contains(c.name.as_str()))
            .cloned()
            .collect())
    }
}

/// Deterministic keyword scoring, used when the model path fails.
///
/// Per concept: +10 per word shared between question and concept name,
/// +15 when the full name appears in the question, +2 per word shared with
/// the description. Concepts scoring above 5 survive; top 5 by descending
/// score, catalog order on ties.
pub fn fallback_by_keywords(question: &str, catalog: &[Concept]) -> Vec<Concept> {
    let question_lower = question.to_lowercase();
    let question_words: HashSet<&str> = question_lower.split_whitespace().collect();

    let mut scored: Vec<(i64, &Concept)> = Vec::new();
    for concept in catalog {
        let mut score = 0;

        let name_lower = concept.name.to_lowercase();
        let name_words: HashSet<&str> = name_lower.split_whitespace().collect();
        score += NAME_WORD_SCORE * question_words.intersection(&name_words).count() as i64;

        if question_lower.contains(&name_lower) {
            score += NAME_PHRASE_SCORE;
        }

        if !concept.description.is_empty() {
            let desc_lower = concept.description.to_lowercase();
            let desc_words: HashSet<&str> = desc_lower.split_whitespace().collect();
            score += DESCRIPTION_WORD_SCORE
                * question_words.intersection(&desc_words).count() as i64;
        }

        if score > MIN_SCORE {
            scored.push((score, concept));
        }
    }

    // Stable sort keeps catalog order among equal scores.
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored
        .into_iter()
        .take(MAX_FALLBACK_CONCEPTS)
        .map(|(_, c)| c.clone())
        .collect()
}
