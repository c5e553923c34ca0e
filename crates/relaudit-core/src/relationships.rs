use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Percentage a candidate must strictly exceed to be reported.
pub const MATCH_THRESHOLD: f64 = 80.0;

/// Undeclared foreign-key relationship inferred from value overlap.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelationshipCandidate {
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
    pub match_percentage: f64,
}

/// Distinct non-null values of one column, in text form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueSet {
    pub table: String,
    pub column: String,
    pub values: BTreeSet<String>,
}

/// Share of `source` values that also appear in `target`, in percent.
///
/// Returns `None` for an empty source so callers never report a spurious
/// 0% or 100% match.
pub fn match_percentage(source: &BTreeSet<String>, target: &BTreeSet<String>) -> Option<f64> {
    if source.is_empty() {
        return None;
    }

    let (small, large) = if source.len() <= target.len() {
        (source, target)
    } else {
        (target, source)
    };
    let shared = small.iter().filter(|value| large.contains(*value)).count();

    Some(100.0 * shared as f64 / source.len() as f64)
}

/// Compare every source column against every target column and keep the
/// pairs above [`MATCH_THRESHOLD`], best match first.
pub fn rank_candidates(sources: &[ValueSet], targets: &[ValueSet]) -> Vec<RelationshipCandidate> {
    let mut candidates = Vec::new();

    for source in sources {
        for target in targets {
            if target.table == source.table {
                continue;
            }
            let Some(percentage) = match_percentage(&source.values, &target.values) else {
                continue;
            };
            if percentage > MATCH_THRESHOLD {
                candidates.push(RelationshipCandidate {
                    source_column: source.column.clone(),
                    target_table: target.table.clone(),
                    target_column: target.column.clone(),
                    match_percentage: percentage,
                });
            }
        }
    }

    candidates.sort_by(|left, right| {
        right
            .match_percentage
            .partial_cmp(&left.match_percentage)
            .unwrap_or(Ordering::Equal)
            .then_with(|| left.source_column.cmp(&right.source_column))
            .then_with(|| left.target_table.cmp(&right.target_table))
            .then_with(|| left.target_column.cmp(&right.target_column))
    });
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(table: &str, column: &str, values: &[&str]) -> ValueSet {
        ValueSet {
            table: table.to_string(),
            column: column.to_string(),
            values: values.iter().map(|value| value.to_string()).collect(),
        }
    }

    #[test]
    fn empty_source_has_no_percentage() {
        let target: BTreeSet<String> = ["1".to_string()].into_iter().collect();
        assert_eq!(match_percentage(&BTreeSet::new(), &target), None);
    }

    #[test]
    fn percentage_is_relative_to_source() {
        let source = set("orders", "customer_id", &["1", "2", "3", "4"]);
        let target = set("customers", "id", &["1", "2", "3", "5", "6", "7"]);
        assert_eq!(match_percentage(&source.values, &target.values), Some(75.0));
    }

    #[test]
    fn exactly_eighty_percent_is_rejected() {
        let source = set("orders", "customer_id", &["1", "2", "3", "4", "5"]);
        let target = set("customers", "id", &["1", "2", "3", "4"]);
        assert!(rank_candidates(&[source], &[target]).is_empty());
    }

    #[test]
    fn ranks_by_percentage_and_skips_same_table() {
        let sources = vec![
            set("orders", "customer_id", &["1", "2", "3", "4", "5", "6", "7", "8", "9", "10"]),
            set("orders", "id", &["1", "2"]),
        ];
        let targets = vec![
            set("customers", "id", &["1", "2", "3", "4", "5", "6", "7", "8", "9"]),
            set("legacy_customers", "id", &["1", "2", "3", "4", "5", "6", "7", "8", "9", "10"]),
            set("orders", "customer_id", &["1", "2"]),
        ];

        let ranked = rank_candidates(&sources, &targets);

        assert!(ranked.iter().all(|item| item.target_table != "orders"));
        assert!(ranked.iter().all(|item| item.match_percentage > MATCH_THRESHOLD));
        assert_eq!(ranked[0].match_percentage, 100.0);
        assert_eq!(ranked.last().map(|item| item.match_percentage), Some(90.0));
        assert_eq!(ranked.len(), 4);
    }
}
