//! Join prioritization.
//!
//! Orders join edges by relevance to the question so the compactor's
//! 10-edge budget keeps the paths the SQL generator is most likely to
//! need. The lexicons are plain data, kept out of the scoring loop so
//! they can grow without touching the algorithm.

use crate::metadata::JoinEdge;
use lazy_static::lazy_static;

lazy_static! {
    /// Dimension categories, checked in order. Each entry pairs the
    /// canonical token expected inside a join-field name with the question
    /// keywords that activate it. The first category matching a field wins;
    /// later categories are not checked for that field.
    pub static ref DIMENSION_LEXICON: Vec<(&'static str, Vec<&'static str>)> = vec![
        ("agent", vec!["agent", "representative", "rep"]),
        ("customer", vec!["customer", "cust", "subscriber"]),
        ("call", vec!["call", "interaction", "contact"]),
        ("center", vec!["center", "location"]),
        ("device", vec!["device", "phone", "equipment"]),
    ];

    /// Join keys common enough to deserve a small boost regardless of the
    /// question wording.
    pub static ref COMMON_JOIN_KEYS: Vec<&'static str> = vec![
        "customer_id",
        "cust_id",
        "agent_id",
        "mtn",
        "recoverykey",
        "call_id",
    ];
}

const DIMENSION_MATCH_SCORE: i64 = 5;
const COMMON_KEY_SCORE: i64 = 2;
const MULTI_FIELD_BONUS: i64 = 1;
const MANY_TO_ONE_BONUS: i64 = 1;

/// Score and order joins by relevance to the question.
///
/// Descending score; ties broken by the debug form of `on_field` so the
/// output order is deterministic. Never fails.
pub fn prioritize(joins: Vec<JoinEdge>, question: &str) -> Vec<JoinEdge> {
    if joins.is_empty() {
        return joins;
    }

    let question_lower = question.to_lowercase();

    let mut scored: Vec<JoinEdge> = joins
        .into_iter()
        .map(|mut edge| {
            edge.priority_score = Some(score_edge(&edge, &question_lower));
            edge
        })
        .collect();

    scored.sort_by(|a, b| {
        b.priority_score
            .cmp(&a.priority_score)
            .then_with(|| format!("{:?}", a.on_field).cmp(&format!("{:?}", b.on_field)))
    });
    scored
}

fn score_edge(edge: &JoinEdge, question_lower: &str) -> i64 {
    let mut score = 0;

    for field in &edge.on_field {
        let field_lower = field.to_lowercase();

        for (canonical, keywords) in DIMENSION_LEXICON.iter() {
            if keywords.iter().any(|kw| question_lower.contains(kw))
                && field_lower.contains(canonical)
            {
                score += DIMENSION_MATCH_SCORE;
                break;
            }
        }

        if COMMON_JOIN_KEYS.contains(&field_lower.as_str()) {
            score += COMMON_KEY_SCORE;
        }
    }

    if edge.on_field.len() > 1 {
        score += MULTI_FIELD_BONUS;
    }
    if edge.join_type == "many_to_one" {
        score += MANY_TO_ONE_BONUS;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(from: &str, to: &str, fields: &[&str], join_type: &str) -> JoinEdge {
        JoinEdge {
            from_table: from.to_string(),
            to_table: to.to_string(),
            on_field: fields.iter().map(|f| f.to_string()).collect(),
            join_type: join_type.to_string(),
            priority_score: None,
        }
    }

    #[test]
    fn test_dimension_keyword_scores_matching_field() {
        let joins = vec![edge("calls", "agents", &["agent_id"], "many_to_one")];
        let prioritized = prioritize(joins, "agent performance by call center");
        // agent dimension (+5), common key (+2), many_to_one (+1).
        assert_eq!(prioritized[0].priority_score, Some(8));
    }

    #[test]
    fn test_only_first_matching_category_counts_per_field() {
        // "agent_call_id" contains both the agent and call canonical tokens;
        // a question mentioning both still scores the field once.
        let joins = vec![edge("calls", "agents", &["agent_call_id"], "one_to_one")];
        let prioritized = prioritize(joins, "agent call volume");
        assert_eq!(prioritized[0].priority_score, Some(5));
    }

    #[test]
    fn test_common_key_scores_without_question_match() {
        let joins = vec![edge("lines", "subscribers", &["mtn"], "one_to_one")];
        let prioritized = prioritize(joins, "billing totals by month");
        assert_eq!(prioritized[0].priority_score, Some(2));
    }

    #[test]
    fn test_multi_field_and_join_type_bonuses_apply_once() {
        let joins = vec![edge("a", "b", &["x_key", "y_key"], "many_to_one")];
        let prioritized = prioritize(joins, "nothing relevant");
        // No dimension or common-key hits: +1 multi-field, +1 many_to_one.
        assert_eq!(prioritized[0].priority_score, Some(2));
    }

    #[test]
    fn test_descending_order_by_score() {
        let joins = vec![
            edge("calls", "centers", &["center_code"], "one_to_one"),
            edge("calls", "agents", &["agent_id"], "many_to_one"),
        ];
        let prioritized = prioritize(joins, "agent activity by center");
        assert_eq!(prioritized[0].to_table, "agents");
        assert!(prioritized[0].priority_score >= prioritized[1].priority_score);
    }

    #[test]
    fn test_ties_break_on_stringified_fields() {
        let joins = vec![
            edge("t", "b", &["zeta_key"], "one_to_one"),
            edge("t", "a", &["alpha_key"], "one_to_one"),
        ];
        let prioritized = prioritize(joins, "unrelated question");
        assert_eq!(prioritized[0].priority_score, prioritized[1].priority_score);
        assert_eq!(prioritized[0].on_field, vec!["alpha_key"]);
        assert_eq!(prioritized[1].on_field, vec!["zeta_key"]);
    }

    #[test]
    fn test_empty_input_passes_through() {
        assert!(prioritize(Vec::new(), "anything").is_empty());
    }

    #[test]
    fn test_every_edge_gets_a_score() {
        let joins = vec![
            edge("a", "b", &["k1"], "one_to_one"),
            edge("a", "c", &["k2"], "many_to_one"),
        ];
        let prioritized = prioritize(joins, "q");
        assert!(prioritized.iter().all(|j| j.priority_score.is_some()));
    }
}
