//! Prompt templates, keyed by context id.
//!
//! The direct-API backend renders these locally; the gateway backend hosts
//! its own templates server-side and only receives the context id plus
//! variables. Template placeholders use single-brace `{name}` syntax.

use crate::error::{KgError, Result};
use std::collections::HashMap;

pub const CONCEPT_IDENTIFIER: &str = "concept_identifier";
pub const METADATA_GENERATOR: &str = "metadata_generator";
pub const SQL_GENERATOR: &str = "sql_generator";
pub const SUMMARY: &str = "summary";

const CONCEPT_IDENTIFIER_TEMPLATE: &str = r#"You are selecting business concepts relevant to a data question.

Question: {prompt}

Available concepts:
{concepts_list}

Return a JSON array containing only the names of the relevant concepts,
copied exactly from the list above. If none apply, return an empty array.
Return the JSON array and nothing else."#;

const METADATA_GENERATOR_TEMPLATE: &str = r#"You are writing a Cypher query against a metadata graph to collect the
tables, columns, and join paths needed to answer a question.

Graph shape:
- (t:Table) nodes with properties name, type, business_description
- (c:Column) nodes with properties name, data_type, semantic_type,
  sample_values, business_term, business_definition, usage_notes,
  data_quality_note, unit
- (t:Table)-[:HAS_COLUMN]->(c:Column)
- (t:Table)-[j:JOINS_WITH]->(other:Table) where j carries via_field and
  relationship_type

Question: {user_question}

Candidate tables:
{schema_context}
{concept_hint}
Write ONE Cypher query that:
- matches the tables relevant to the question, preferring the candidates above
- returns per table: t.name AS table_name, t.type AS table_type,
  t.business_description AS table_description
- returns a collect(...) of that table's column properties AS columns_list
- returns a collect(...) of its outgoing JOINS_WITH edges AS joins_list,
  each entry carrying to_table, via_field, relationship_type

Return only the Cypher query, with no commentary."#;

const SQL_GENERATOR_TEMPLATE: &str = r#"You are writing one analytical SQL query for a columnar warehouse.

Question: {user_question}

Qualify every table as {data_project_id}.{dataset_id}.table_name.

Table and column metadata (JSON):
{metadata}

{joins}

Rules:
- Use only tables and columns present in the metadata above.
- Use joins exactly as listed; never invent join conditions.
- If the question cannot be answered from this metadata, reply with
  "Cannot answer" followed by a one-sentence reason.

Return only the SQL query."#;

const SUMMARY_TEMPLATE: &str = r#"Summarize the result of a warehouse query for a business user.

Question: {user_question}
Rows returned: {row_count}

SQL:
{sql_query}

Metadata context:
{metadata_context}

Results (sample):
{query_results}

Write 3-5 sentences: answer the question directly, then call out the most
notable values or trends. Do not mention SQL or table names."#;

#[derive(Debug, Clone)]
pub struct PromptLibrary {
    templates: HashMap<&'static str, &'static str>,
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PromptLibrary {
    pub fn builtin() -> Self {
        let mut templates = HashMap::new();
        templates.insert(CONCEPT_IDENTIFIER, CONCEPT_IDENTIFIER_TEMPLATE);
        templates.insert(METADATA_GENERATOR, METADATA_GENERATOR_TEMPLATE);
        templates.insert(SQL_GENERATOR, SQL_GENERATOR_TEMPLATE);
        templates.insert(SUMMARY, SUMMARY_TEMPLATE);
        Self { templates }
    }

    pub fn render(&self, context_id: &str, variables: &HashMap<String, String>) -> Result<String> {
        let template = self
            .templates
            .get(context_id)
            .ok_or_else(|| KgError::Llm(format!("Unknown prompt context: {}", context_id)))?;

        let mut rendered = template.to_string();
        for (name, value) in variables {
            rendered = rendered.replace(&format!("{{{}}}", name), value);
        }
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_variables() {
        let library = PromptLibrary::builtin();
        let mut vars = HashMap::new();
        vars.insert("prompt".to_string(), "agent performance".to_string());
        vars.insert("concepts_list".to_string(), "- Agent Performance: KPIs".to_string());

        let rendered = library.render(CONCEPT_IDENTIFIER, &vars).unwrap();
        assert!(rendered.contains("Question: agent performance"));
        assert!(rendered.contains("- Agent Performance: KPIs"));
        assert!(!rendered.contains("{prompt}"));
    }

    #[test]
    fn test_unknown_context_is_an_error() {
        let library = PromptLibrary::builtin();
        let err = library.render("visualizer", &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("Unknown prompt context"));
    }
}
