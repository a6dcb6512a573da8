//! Metadata compaction for the SQL-generation boundary.
//!
//! The retrieval result crosses into a size-constrained model prompt, so
//! tables are width-bounded and joins capped at ten. Nothing is dropped
//! below the caps: columns keep their original order and every enrichment
//! field present at the source survives, with the long text fields
//! re-truncated here in case an unbounded value slipped through the
//! catalog.

use crate::metadata::{Column, JoinEdge, RetrievalResult};
use itertools::Itertools;
use serde::Serialize;

pub const DEFAULT_MAX_COLUMNS_PER_TABLE: usize = 200;
pub const MAX_JOINS: usize = 10;
const MAX_DEFINITION_CHARS: usize = 100;
const MAX_USAGE_NOTE_CHARS: usize = 150;
const MAX_SAMPLE_VALUES: usize = 3;

/// The structure handed to the SQL-generation collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct CompactResult {
    pub tables: Vec<CompactTable>,
    pub joins: Vec<JoinEdge>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompactTable {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub business_description: String,
    pub columns: Vec<CompactColumn>,
}

/// Required name/type plus whatever enrichments the catalog had. Absent
/// fields are omitted from the serialized form entirely.
#[derive(Debug, Clone, Serialize)]
pub struct CompactColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_term: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_definition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_quality_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

pub fn compact(result: &RetrievalResult, max_columns_per_table: usize) -> CompactResult {
    let tables = result
        .tables
        .iter()
        .map(|table| CompactTable {
            name: table.name.clone(),
            kind: table.kind.clone(),
            business_description: table.description.clone(),
            columns: table
                .columns
                .iter()
                .take(max_columns_per_table)
                .map(compact_column)
                .collect(),
        })
        .collect();

    CompactResult {
        tables,
        joins: result.joins.iter().take(MAX_JOINS).cloned().collect(),
    }
}

fn compact_column(column: &Column) -> CompactColumn {
    CompactColumn {
        name: column.name.clone(),
        data_type: column.data_type.clone(),
        semantic_type: column.semantic_type.clone(),
        sample_values: column
            .sample_values
            .as_ref()
            .map(|values| values.iter().take(MAX_SAMPLE_VALUES).cloned().collect()),
        business_term: column.business_term.clone(),
        business_definition: column
            .business_definition
            .as_ref()
            .map(|text| truncate_chars(text, MAX_DEFINITION_CHARS)),
        usage_notes: column
            .usage_notes
            .as_ref()
            .map(|text| truncate_chars(text, MAX_USAGE_NOTE_CHARS)),
        data_quality_note: column.data_quality_note.clone(),
        unit: column.unit.clone(),
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Render the human-readable join-hint block that accompanies the compact
/// metadata across the SQL-generation boundary.
pub fn render_join_hints(joins: &[JoinEdge]) -> String {
    if joins.is_empty() {
        return "NO JOINS AVAILABLE - Query single table only.\n".to_string();
    }

    let mut block = String::from("AVAILABLE JOINS (use EXACT syntax below):\n\n");
    for (i, join) in joins.iter().enumerate() {
        let from_alias = table_alias(&join.from_table);
        let to_alias = table_alias(&join.to_table);
        let on_clause = join
            .on_field
            .iter()
            .map(|field| format!("{}.{} = {}.{}", from_alias, field, to_alias, field))
            .join(" AND ");

        block.push_str(&format!("{}. {} -> {}\n", i + 1, join.from_table, join.to_table));
        block.push_str(&format!(
            "   USE THIS SQL: JOIN {} {} ON {}\n\n",
            join.to_table, to_alias, on_clause
        ));
    }
    block.push_str("If the join you need is NOT listed above, query a SINGLE table only.\n");
    block.push_str("DO NOT invent joins. Use the EXACT columns shown above.\n");
    block
}

/// Single-character alias: first letter of the first underscore-separated
/// word of the table name.
fn table_alias(table: &str) -> String {
    table
        .split('_')
        .next()
        .and_then(|word| word.chars().next())
        .map(|c| c.to_string())
        .unwrap_or_else(|| "t".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Table;

    fn column(name: &str) -> Column {
        Column {
            name: name.to_string(),
            data_type: "STRING".to_string(),
            semantic_type: None,
            sample_values: None,
            business_term: None,
            business_definition: None,
            usage_notes: None,
            data_quality_note: None,
            unit: None,
        }
    }

    fn join(from: &str, to: &str, fields: &[&str]) -> JoinEdge {
        JoinEdge {
            from_table: from.to_string(),
            to_table: to.to_string(),
            on_field: fields.iter().map(|f| f.to_string()).collect(),
            join_type: "many_to_one".to_string(),
            priority_score: None,
        }
    }

    #[test]
    fn test_column_cap_keeps_first_in_order() {
        let table = Table {
            name: "wide".to_string(),
            kind: "fact".to_string(),
            description: String::new(),
            columns: (0..250).map(|i| column(&format!("col_{:03}", i))).collect(),
        };
        let result = RetrievalResult {
            tables: vec![table],
            joins: Vec::new(),
            concepts: Vec::new(),
        };

        let compacted = compact(&result, 200);
        let columns = &compacted.tables[0].columns;
        assert_eq!(columns.len(), 200);
        assert_eq!(columns[0].name, "col_000");
        assert_eq!(columns[199].name, "col_199");
    }

    #[test]
    fn test_enrichments_survive_with_truncation() {
        let mut enriched = column("revenue");
        enriched.business_definition = Some("x".repeat(180));
        enriched.usage_notes = Some("y".repeat(400));
        enriched.sample_values = Some(vec![
            "a".to_string(),
            "b".to_string(),
            "c".to_string(),
            "d".to_string(),
        ]);
        enriched.unit = Some("USD".to_string());

        let result = RetrievalResult {
            tables: vec![Table {
                name: "billing".to_string(),
                kind: "fact".to_string(),
                description: String::new(),
                columns: vec![enriched],
            }],
            joins: Vec::new(),
            concepts: Vec::new(),
        };

        let compacted = compact(&result, DEFAULT_MAX_COLUMNS_PER_TABLE);
        let col = &compacted.tables[0].columns[0];
        assert_eq!(col.business_definition.as_ref().unwrap().len(), 100);
        assert_eq!(col.usage_notes.as_ref().unwrap().len(), 150);
        assert_eq!(col.sample_values.as_ref().unwrap().len(), 3);
        assert_eq!(col.unit.as_deref(), Some("USD"));
        assert!(col.semantic_type.is_none());
    }

    #[test]
    fn test_absent_enrichments_are_omitted_from_json() {
        let result = RetrievalResult {
            tables: vec![Table {
                name: "t".to_string(),
                kind: "table".to_string(),
                description: String::new(),
                columns: vec![column("plain")],
            }],
            joins: Vec::new(),
            concepts: Vec::new(),
        };

        let compacted = compact(&result, DEFAULT_MAX_COLUMNS_PER_TABLE);
        let json = serde_json::to_value(&compacted.tables[0].columns[0]).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert!(object.contains_key("name"));
        assert!(object.contains_key("type"));
    }

    #[test]
    fn test_joins_capped_at_ten() {
        let joins: Vec<JoinEdge> = (0..14)
            .map(|i| join("calls", &format!("dim_{}", i), &["key"]))
            .collect();
        let result = RetrievalResult {
            tables: Vec::new(),
            joins,
            concepts: Vec::new(),
        };

        let compacted = compact(&result, DEFAULT_MAX_COLUMNS_PER_TABLE);
        assert_eq!(compacted.joins.len(), 10);
        assert_eq!(compacted.joins[0].to_table, "dim_0");
        assert_eq!(compacted.joins[9].to_table, "dim_9");
    }

    #[test]
    fn test_join_hints_single_field() {
        let hints = render_join_hints(&[join("call_records", "agents", &["agent_id"])]);
        assert!(hints.contains("1. call_records -> agents"));
        assert!(hints.contains("JOIN agents a ON c.agent_id = a.agent_id"));
    }

    #[test]
    fn test_join_hints_multi_field_joined_with_and() {
        let hints = render_join_hints(&[join("calls", "agents", &["agent_id", "center_id"])]);
        assert!(hints.contains("ON c.agent_id = a.agent_id AND c.center_id = a.center_id"));
    }

    #[test]
    fn test_join_hints_empty_notice() {
        assert_eq!(
            render_join_hints(&[]),
            "NO JOINS AVAILABLE - Query single table only.\n"
        );
    }
}
