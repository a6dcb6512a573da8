//! Graph execution and result merging.
//!
//! The synthesized query may surface the same table in several rows (once
//! per matched column group, once per join edge). Merging keeps one entry
//! per table name with the union of its columns, and one join edge per
//! ordered table pair with the union of its join fields. A store failure
//! surfaces as `KgError::Graph`; malformed join descriptors are dropped
//! silently.

use crate::error::Result;
use crate::graph_store::{GraphRow, GraphStore};
use crate::metadata::{Column, JoinEdge, RetrievalResult, Table, DEFAULT_JOIN_TYPE};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, info};

pub async fn execute(store: &dyn GraphStore, query: &str) -> Result<RetrievalResult> {
    let rows = store.run(query, json!({})).await?;
    let result = merge_records(&rows);

    info!("Retrieved {} relevant tables", result.tables.len());
    if !result.joins.is_empty() {
        info!("Found {} join relationships", result.joins.len());
        for join in &result.joins {
            if join.on_field.len() > 1 {
                debug!(
                    "Consolidated join {} -> {} via {:?}",
                    join.from_table, join.to_table, join.on_field
                );
            }
        }
    }
    Ok(result)
}

/// Merge raw graph rows into deduplicated tables and consolidated joins.
pub fn merge_records(rows: &[GraphRow]) -> RetrievalResult {
    let mut tables: Vec<Table> = Vec::new();
    let mut table_index: HashMap<String, usize> = HashMap::new();
    let mut joins: Vec<JoinEdge> = Vec::new();
    let mut join_index: HashMap<(String, String), usize> = HashMap::new();

    for row in rows {
        let Some(table_name) = row.get_str("table_name") else {
            continue;
        };

        let columns: Vec<Column> = row
            .get_list("columns_list")
            .map(|items| items.iter().filter_map(column_from_value).collect())
            .unwrap_or_default();

        match table_index.get(table_name).copied() {
            None => {
                table_index.insert(table_name.to_string(), tables.len());
                tables.push(Table {
                    name: table_name.to_string(),
                    kind: row.get_str("table_type").unwrap_or("table").to_string(),
                    description: row.get_str("table_description").unwrap_or_default().to_string(),
                    columns,
                });
            }
            Some(idx) => {
                // Repeat sighting: append only unseen columns, first
                // occurrence wins on conflicting payload.
                let table = &mut tables[idx];
                for column in columns {
                    if !table.columns.iter().any(|c| c.name == column.name) {
                        table.columns.push(column);
                    }
                }
            }
        }

        let Some(join_items) = row.get_list("joins_list") else {
            continue;
        };
        for item in join_items {
            let Some((to_table, fields, join_type)) = join_from_value(item) else {
                continue;
            };
            let key = (table_name.to_string(), to_table.clone());
            match join_index.get(&key).copied() {
                None => {
                    join_index.insert(key, joins.len());
                    joins.push(JoinEdge {
                        from_table: table_name.to_string(),
                        to_table,
                        on_field: fields,
                        join_type,
                        priority_score: None,
                    });
                }
                Some(idx) => {
                    let edge = &mut joins[idx];
                    for field in fields {
                        if !edge.on_field.contains(&field) {
                            edge.on_field.push(field);
                        }
                    }
                }
            }
        }
    }

    RetrievalResult {
        tables,
        joins,
        concepts: Vec::new(),
    }
}

fn column_from_value(value: &Value) -> Option<Column> {
    match value {
        // Some queries collect bare column names.
        Value::String(name) => Some(Column {
            name: name.clone(),
            data_type: "unknown".to_string(),
            semantic_type: None,
            sample_values: None,
            business_term: None,
            business_definition: None,
            usage_notes: None,
            data_quality_note: None,
            unit: None,
        }),
        Value::Object(_) => serde_json::from_value(value.clone()).ok(),
        _ => None,
    }
}

/// Pull `(to_table, on_field, join_type)` out of a join descriptor.
/// Descriptors missing `to_table` or `via_field` are malformed and yield
/// `None`; `via_field` is normalized string-or-list to a list.
fn join_from_value(value: &Value) -> Option<(String, Vec<String>, String)> {
    let descriptor = value.as_object()?;

    let to_table = descriptor.get("to_table")?.as_str()?;
    if to_table.is_empty() {
        return None;
    }

    let fields: Vec<String> = match descriptor.get("via_field")? {
        Value::String(field) if !field.is_empty() => vec![field.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };
    if fields.is_empty() {
        return None;
    }

    let join_type = descriptor
        .get("relationship_type")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_JOIN_TYPE)
        .to_string();

    Some((to_table.to_string(), fields, join_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KgError;
    use async_trait::async_trait;
    use serde_json::Map;

    fn row(value: Value) -> GraphRow {
        match value {
            Value::Object(map) => GraphRow::new(map),
            _ => GraphRow::new(Map::new()),
        }
    }

    #[test]
    fn test_merge_unions_disjoint_column_sets() {
        let rows = vec![
            row(json!({
                "table_name": "calls",
                "table_type": "fact",
                "table_description": "Call detail records",
                "columns_list": [
                    {"name": "call_id", "data_type": "STRING"},
                    {"name": "agent_id", "data_type": "STRING"},
                ],
            })),
            row(json!({
                "table_name": "calls",
                "columns_list": [
                    {"name": "duration_sec", "data_type": "INT64"},
                ],
            })),
        ];

        let result = merge_records(&rows);
        assert_eq!(result.tables.len(), 1);
        let names: Vec<&str> = result.tables[0]
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["call_id", "agent_id", "duration_sec"]);
    }

    #[test]
    fn test_merge_first_sighting_wins_on_conflict() {
        let rows = vec![
            row(json!({
                "table_name": "calls",
                "columns_list": [{"name": "call_id", "data_type": "STRING"}],
            })),
            row(json!({
                "table_name": "calls",
                "table_type": "dim",
                "columns_list": [{"name": "call_id", "data_type": "INT64"}],
            })),
        ];

        let result = merge_records(&rows);
        assert_eq!(result.tables.len(), 1);
        assert_eq!(result.tables[0].kind, "table");
        assert_eq!(result.tables[0].columns.len(), 1);
        assert_eq!(result.tables[0].columns[0].data_type, "STRING");
    }

    #[test]
    fn test_join_consolidation_preserves_order_and_dedups() {
        let rows = vec![
            row(json!({
                "table_name": "calls",
                "columns_list": [],
                "joins_list": [
                    {"to_table": "agents", "via_field": "a", "relationship_type": "many_to_one"},
                ],
            })),
            row(json!({
                "table_name": "calls",
                "columns_list": [],
                "joins_list": [
                    {"to_table": "agents", "via_field": ["b", "a"]},
                ],
            })),
        ];

        let result = merge_records(&rows);
        assert_eq!(result.joins.len(), 1);
        let edge = &result.joins[0];
        assert_eq!(edge.on_field, vec!["a", "b"]);
        assert_eq!(edge.join_type, "many_to_one");
    }

    #[test]
    fn test_two_row_scenario_consolidates_to_one_edge() {
        let rows = vec![
            row(json!({
                "table_name": "calls",
                "columns_list": [],
                "joins_list": [
                    {"to_table": "agents", "via_field": "agent_id", "relationship_type": "many_to_one"},
                ],
            })),
            row(json!({
                "table_name": "calls",
                "columns_list": [],
                "joins_list": [
                    {"to_table": "agents", "via_field": "center_id"},
                ],
            })),
        ];

        let result = merge_records(&rows);
        assert_eq!(result.joins.len(), 1);
        let edge = &result.joins[0];
        assert_eq!(edge.from_table, "calls");
        assert_eq!(edge.to_table, "agents");
        assert_eq!(edge.on_field, vec!["agent_id", "center_id"]);
        assert_eq!(edge.join_type, "many_to_one");
    }

    #[test]
    fn test_distinct_table_pairs_stay_separate() {
        let rows = vec![row(json!({
            "table_name": "calls",
            "columns_list": [],
            "joins_list": [
                {"to_table": "agents", "via_field": "agent_id"},
                {"to_table": "centers", "via_field": "center_id"},
            ],
        }))];

        let result = merge_records(&rows);
        assert_eq!(result.joins.len(), 2);
    }

    #[test]
    fn test_malformed_join_descriptors_are_discarded() {
        let rows = vec![row(json!({
            "table_name": "calls",
            "columns_list": [],
            "joins_list": [
                {"via_field": "agent_id"},
                {"to_table": "agents"},
                {"to_table": "agents", "via_field": ""},
                {"to_table": "agents", "via_field": []},
                {"to_table": "", "via_field": "agent_id"},
                null,
            ],
        }))];

        let result = merge_records(&rows);
        assert!(result.joins.is_empty());
        assert_eq!(result.tables.len(), 1);
    }

    #[test]
    fn test_bare_string_columns_are_accepted() {
        let rows = vec![row(json!({
            "table_name": "calls",
            "columns_list": ["call_id", "agent_id"],
        }))];

        let result = merge_records(&rows);
        let columns = &result.tables[0].columns;
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].data_type, "unknown");
    }

    #[test]
    fn test_rows_without_table_name_are_skipped() {
        let rows = vec![row(json!({"columns_list": [{"name": "x"}]}))];
        let result = merge_records(&rows);
        assert!(result.tables.is_empty());
    }

    struct FailingStore;

    #[async_trait]
    impl GraphStore for FailingStore {
        async fn run(&self, _query: &str, _params: Value) -> Result<Vec<GraphRow>> {
            Err(KgError::Graph("syntax error near RETURN".to_string()))
        }
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_graph_error() {
        let err = execute(&FailingStore, "MATCH (t) RETURN t").await.unwrap_err();
        assert!(matches!(err, KgError::Graph(_)));
        assert!(err.to_string().contains("syntax error"));
    }
}
