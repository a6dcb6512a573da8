//! Schema narrowing: bound the table universe before query synthesis.
//!
//! Produces a short candidate listing (not the final table set) that is
//! injected into the synthesis prompt as schema hinting. Final table
//! membership is decided by the synthesized graph query.

use crate::error::Result;
use crate::graph_store::{GraphRow, GraphStore};
use crate::metadata::Concept;
use itertools::Itertools;
use serde_json::json;
use tracing::debug;

/// Upper bound on candidate rows; concept filtering usually lands well
/// under it.
pub const NARROW_LIMIT: usize = 60;

/// Tables linked to the selected concepts, most confident mappings first.
const CONCEPT_TABLES_QUERY: &str = "
MATCH (c:Concept)-[r:RELATES_TO]->(t:Table)
WHERE c.name IN $concept_names
RETURN DISTINCT t.name AS name,
       t.business_description AS description,
       c.name AS concept,
       r.confidence AS confidence
ORDER BY
    CASE r.confidence
        WHEN 'high' THEN 1
        WHEN 'medium' THEN 2
        ELSE 3
    END,
    c.name
LIMIT 60
";

/// Whole-catalog listing for questions with no identified concepts.
const ALL_TABLES_QUERY: &str = "
MATCH (t:Table)
OPTIONAL MATCH (c:Concept)-[:RELATES_TO]->(t)
RETURN t.name AS name,
       t.business_description AS description,
       c.name AS concept,
       null AS confidence
LIMIT 60
";

#[derive(Debug, Clone)]
pub struct CandidateTable {
    pub name: String,
    pub description: Option<String>,
    pub concept_name: Option<String>,
    pub confidence: Option<String>,
}

pub async fn narrow(
    store: &dyn GraphStore,
    concepts: &[Concept],
) -> Result<Vec<CandidateTable>> {
    let rows = if concepts.is_empty() {
        store.run(ALL_TABLES_QUERY, json!({})).await?
    } else {
        let names: Vec<&str> = concepts.iter().map(|c| c.name.as_str()).collect();
        store
            .run(CONCEPT_TABLES_QUERY, json!({ "concept_names": names }))
            .await?
    };

    let candidates: Vec<CandidateTable> = rows.iter().filter_map(row_to_candidate).collect();
    debug!("Narrowed schema to {} candidate tables", candidates.len());
    Ok(candidates)
}

fn row_to_candidate(row: &GraphRow) -> Option<CandidateTable> {
    Some(CandidateTable {
        name: row.get_str("name")?.to_string(),
        description: row.get_str("description").map(str::to_string),
        concept_name: row.get_str("concept").map(str::to_string),
        confidence: row.get_str("confidence").map(str::to_string),
    })
}

/// Render the candidate listing as the prompt's schema hint block.
pub fn render_schema_hint(candidates: &[CandidateTable]) -> String {
    candidates
        .iter()
        .map(|table| {
            let concept = table.concept_name.as_deref().unwrap_or("Uncategorized");
            let confidence_tag = table
                .confidence
                .as_deref()
                .map(|c| format!(" [{}]", c))
                .unwrap_or_default();
            format!(
                "- [{}]{} {}: {}",
                concept,
                confidence_tag,
                table.name,
                table.description.as_deref().unwrap_or("N/A")
            )
        })
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(
        name: &str,
        description: Option<&str>,
        concept: Option<&str>,
        confidence: Option<&str>,
    ) -> CandidateTable {
        CandidateTable {
            name: name.to_string(),
            description: description.map(str::to_string),
            concept_name: concept.map(str::to_string),
            confidence: confidence.map(str::to_string),
        }
    }

    #[test]
    fn test_render_with_concept_and_confidence() {
        let hint = render_schema_hint(&[candidate(
            "agent_scorecard",
            Some("Monthly agent KPIs"),
            Some("Agent Performance"),
            Some("high"),
        )]);
        assert_eq!(
            hint,
            "- [Agent Performance] [high] agent_scorecard: Monthly agent KPIs"
        );
    }

    #[test]
    fn test_render_uncategorized_without_confidence() {
        let hint = render_schema_hint(&[candidate("misc_staging", None, None, None)]);
        assert_eq!(hint, "- [Uncategorized] misc_staging: N/A");
    }

    #[test]
    fn test_render_multiple_lines() {
        let hint = render_schema_hint(&[
            candidate("a", Some("first"), Some("X"), Some("high")),
            candidate("b", Some("second"), Some("Y"), None),
        ]);
        let lines: Vec<&str> = hint.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("- [Y] b:"));
    }

    #[test]
    fn test_row_without_name_is_skipped() {
        let row = GraphRow::new(serde_json::Map::new());
        assert!(row_to_candidate(&row).is_none());
    }
}
