//! The metadata retrieval pipeline.
//!
//! question → concept selection → schema narrowing → query synthesis →
//! graph execution/merge → join prioritization. Selection and
//! prioritization are best-effort; synthesis and execution fail the
//! question. Empty results are valid results.

use crate::catalog::ConceptIndex;
use crate::concepts::ConceptSelector;
use crate::error::Result;
use crate::executor;
use crate::graph_store::GraphStore;
use crate::llm::LanguageModel;
use crate::metadata::RetrievalResult;
use crate::narrower;
use crate::prioritizer;
use crate::synthesizer::QuerySynthesizer;
use std::sync::Arc;
use tracing::{debug, info};

pub struct MetadataRetrievalAgent {
    store: Arc<dyn GraphStore>,
    index: Arc<ConceptIndex>,
    selector: ConceptSelector,
    synthesizer: QuerySynthesizer,
}

impl MetadataRetrievalAgent {
    pub fn new(
        store: Arc<dyn GraphStore>,
        model: Arc<dyn LanguageModel>,
        index: Arc<ConceptIndex>,
    ) -> Self {
        Self {
            store,
            index,
            selector: ConceptSelector::new(model.clone()),
            synthesizer: QuerySynthesizer::new(model),
        }
    }

    pub async fn retrieve(&self, question: &str) -> Result<RetrievalResult> {
        info!("Searching metadata for: '{}'", question);

        let concepts = self.selector.select(question, self.index.concepts()).await;

        let candidates = narrower::narrow(self.store.as_ref(), &concepts).await?;
        let schema_hint = narrower::render_schema_hint(&candidates);

        let query = self
            .synthesizer
            .synthesize(question, &schema_hint, &concepts)
            .await?;
        debug!("Generated graph query:\n{}", query);

        let mut result = executor::execute(self.store.as_ref(), &query).await?;
        result.concepts = concepts;

        if !result.joins.is_empty() {
            let joins = std::mem::take(&mut result.joins);
            result.joins = prioritizer::prioritize(joins, question);
        }

        Ok(result)
    }
}
