use serde::{Deserialize, Serialize};

/// A named business-level grouping spanning one or more physical tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub related_table_count: i64,
}

/// A physical warehouse table with its merged column set. Built fresh per
/// question; a table name appears at most once per retrieval result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    /// fact, dim, table, ... — open set, kept as the catalog stores it.
    #[serde(default = "default_table_kind", alias = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub columns: Vec<Column>,
}

fn default_table_kind() -> String {
    "table".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(default, alias = "type")]
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_term: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_quality_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// A potential SQL join path between two tables.
///
/// At most one edge exists per ordered `(from_table, to_table)` pair in a
/// retrieval result; multiple join fields between the same pair are
/// consolidated into `on_field`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinEdge {
    pub from_table: String,
    pub to_table: String,
    pub on_field: Vec<String>,
    pub join_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority_score: Option<i64>,
}

pub const DEFAULT_JOIN_TYPE: &str = "many_to_one";

/// The unit handed to the SQL-generation stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub tables: Vec<Table>,
    pub joins: Vec<JoinEdge>,
    pub concepts: Vec<Concept>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
