//! Concept index: the top layer of the metadata graph.
//!
//! Loaded once per session and read-only afterwards; concurrent questions
//! share it without synchronization.

use crate::error::Result;
use crate::graph_store::GraphStore;
use crate::metadata::Concept;
use serde_json::json;
use tracing::info;

const CONCEPT_CONTEXT_QUERY: &str = "
MATCH (c:Concept)
OPTIONAL MATCH (c)-[:RELATES_TO]->(t:Table)
WITH c, count(t) AS table_count
RETURN c.name AS name,
       c.definition AS description,
       table_count
ORDER BY c.name
";

/// All business concepts known to the catalog, in catalog order.
#[derive(Debug, Clone, Default)]
pub struct ConceptIndex {
    concepts: Vec<Concept>,
}

impl ConceptIndex {
    pub async fn load(store: &dyn GraphStore) -> Result<Self> {
        let rows = store.run(CONCEPT_CONTEXT_QUERY, json!({})).await?;

        let concepts: Vec<Concept> = rows
            .iter()
            .filter_map(|row| {
                let name = row.get_str("name")?;
                Some(Concept {
                    name: name.to_string(),
                    description: row.get_str("description").unwrap_or_default().to_string(),
                    related_table_count: row.get_i64("table_count").unwrap_or(0),
                })
            })
            .collect();

        info!("Loaded {} business concepts", concepts.len());
        Ok(Self { concepts })
    }

    pub fn from_concepts(concepts: Vec<Concept>) -> Self {
        Self { concepts }
    }

    pub fn concepts(&self) -> &[Concept] {
        &self.concepts
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Concept> {
        self.concepts.iter().find(|c| c.name == name)
    }
}
