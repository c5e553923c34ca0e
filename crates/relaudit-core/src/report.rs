use serde::{Deserialize, Serialize};

use crate::constraints::TriggerSummary;
use crate::defaults::{DefaultSuggestion, suggest_default};
use crate::findings::TableFailure;
use crate::relationships::RelationshipCandidate;
use crate::schema::TableDescription;
use crate::suggestions::{ConstraintSuggestion, SuggestionKind};
use crate::uniqueness::{UniquenessReport, Verdict};

/// Default suggested for one column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnDefault {
    pub column: String,
    pub declared_type: String,
    pub current_default: Option<String>,
    pub suggestion: DefaultSuggestion,
}

/// Derive default suggestions for every column of a table.
pub fn column_defaults(description: &TableDescription) -> Vec<ColumnDefault> {
    description
        .columns
        .iter()
        .map(|column| ColumnDefault {
            column: column.name.clone(),
            declared_type: column.declared_type.clone(),
            current_default: column.default_expr.clone(),
            suggestion: suggest_default(&column.declared_type),
        })
        .collect()
}

/// Merged per-table analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableReport {
    pub schema: String,
    pub table: String,
    pub column_count: usize,
    pub trigger_summary: TriggerSummary,
    pub uniqueness: UniquenessReport,
    pub relationships: Vec<RelationshipCandidate>,
    pub defaults: Vec<ColumnDefault>,
    pub suggestions: Vec<ConstraintSuggestion>,
    pub diagnostics: Vec<TableFailure>,
}

/// One titled block of the text report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSection {
    pub title: &'static str,
    pub lines: Vec<String>,
}

impl TableReport {
    /// Sections in their fixed order: header, uniqueness, relationships,
    /// defaults, then suggestions and diagnostics.
    pub fn sections(&self) -> Vec<ReportSection> {
        let mut sections = vec![
            self.header_section(),
            self.uniqueness_section(),
            self.relationships_section(),
            self.defaults_section(),
            self.suggestions_section(),
        ];
        if !self.diagnostics.is_empty() {
            sections.push(self.diagnostics_section());
        }
        sections
    }

    /// Render the report as deterministic plain text.
    pub fn render_text(&self) -> String {
        let mut lines = Vec::new();
        for section in self.sections() {
            lines.push(format!("== {} ==", section.title));
            lines.extend(section.lines);
            lines.push(String::new());
        }
        lines.join("\n")
    }

    fn header_section(&self) -> ReportSection {
        let trigger = match &self.trigger_summary {
            TriggerSummary::None => "none".to_string(),
            TriggerSummary::Exactly(name) => name.clone(),
            TriggerSummary::AmbiguousPickedArbitrarily(name) => {
                format!("{name} (one of several triggers)")
            }
        };

        let mut lines = vec![
            format!("table: {}.{}", self.schema, self.table),
            format!("columns: {}", self.column_count),
            format!("trigger: {trigger}"),
        ];
        if self.column_count == 0 {
            lines.push("table not found or has no columns".to_string());
        }

        ReportSection {
            title: "Table",
            lines,
        }
    }

    fn uniqueness_section(&self) -> ReportSection {
        let lines = if self.uniqueness.recommendations.is_empty() {
            vec!["no columns analyzed".to_string()]
        } else {
            self.uniqueness
                .recommendations
                .iter()
                .map(|item| {
                    let verdict = match item.verdict {
                        Verdict::Strong => "recommend UNIQUE",
                        Verdict::Moderate => "nearly unique, not recommended",
                        Verdict::None => "not recommended",
                    };
                    let enforced = if item.already_enforced {
                        " (already enforced)"
                    } else {
                        ""
                    };
                    format!(
                        "- {}: ratio {:.4}, {verdict}{enforced}",
                        item.column, item.distinct_ratio
                    )
                })
                .collect()
        };

        ReportSection {
            title: "Uniqueness",
            lines,
        }
    }

    fn relationships_section(&self) -> ReportSection {
        let lines = if self.relationships.is_empty() {
            vec!["no candidates above threshold".to_string()]
        } else {
            self.relationships
                .iter()
                .map(|item| {
                    format!(
                        "- {} -> {}.{}: {:.2}% match",
                        item.source_column,
                        item.target_table,
                        item.target_column,
                        item.match_percentage
                    )
                })
                .collect()
        };

        ReportSection {
            title: "Relationships",
            lines,
        }
    }

    fn defaults_section(&self) -> ReportSection {
        let lines = if self.defaults.is_empty() {
            vec!["no columns analyzed".to_string()]
        } else {
            self.defaults
                .iter()
                .map(|item| {
                    let current = item.current_default.as_deref().unwrap_or("none");
                    format!(
                        "- {} ({}): suggested {}, current {current}",
                        item.column, item.declared_type, item.suggestion
                    )
                })
                .collect()
        };

        ReportSection {
            title: "Defaults",
            lines,
        }
    }

    fn suggestions_section(&self) -> ReportSection {
        let lines = if self.suggestions.is_empty() {
            vec!["none".to_string()]
        } else {
            self.suggestions
                .iter()
                .map(|item| {
                    let kind = match item.kind {
                        SuggestionKind::MissingIndex => "missing index",
                        SuggestionKind::NotNull => "not null",
                        SuggestionKind::EmailFormatCheck => "email check",
                        SuggestionKind::DateRangeCheck => "date check",
                        SuggestionKind::LifecycleColumn => "lifecycle column",
                    };
                    format!("- {} [{kind}]: {}", item.column, item.sql)
                })
                .collect()
        };

        ReportSection {
            title: "Constraint suggestions",
            lines,
        }
    }

    fn diagnostics_section(&self) -> ReportSection {
        let lines = self
            .diagnostics
            .iter()
            .map(|item| match &item.column {
                Some(column) => format!("- {}.{column}: {}", item.table, item.message),
                None => format!("- {}: {}", item.table, item.message),
            })
            .collect();

        ReportSection {
            title: "Diagnostics",
            lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnDescriptor;
    use crate::uniqueness::Recommendation;

    fn report() -> TableReport {
        let mut description = TableDescription::empty("public", "users");
        description.columns = vec![
            ColumnDescriptor {
                ordinal: 1,
                name: "active".to_string(),
                declared_type: "boolean".to_string(),
                nullable: true,
                default_expr: None,
                key_constraints: Vec::new(),
            },
            ColumnDescriptor {
                ordinal: 2,
                name: "balance".to_string(),
                declared_type: "money".to_string(),
                nullable: true,
                default_expr: Some("0".to_string()),
                key_constraints: Vec::new(),
            },
        ];

        TableReport {
            schema: "public".to_string(),
            table: "users".to_string(),
            column_count: 2,
            trigger_summary: TriggerSummary::AmbiguousPickedArbitrarily("a_trigger".to_string()),
            uniqueness: UniquenessReport {
                recommendations: vec![Recommendation {
                    column: "active".to_string(),
                    distinct_ratio: 0.0002,
                    verdict: Verdict::None,
                    already_enforced: false,
                }],
                diagnostics: Vec::new(),
            },
            relationships: vec![RelationshipCandidate {
                source_column: "active".to_string(),
                target_table: "flags".to_string(),
                target_column: "value".to_string(),
                match_percentage: 100.0,
            }],
            defaults: column_defaults(&description),
            suggestions: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn sections_follow_fixed_order() {
        let titles: Vec<&str> = report().sections().iter().map(|s| s.title).collect();
        assert_eq!(
            titles,
            vec![
                "Table",
                "Uniqueness",
                "Relationships",
                "Defaults",
                "Constraint suggestions"
            ]
        );
    }

    #[test]
    fn renders_deterministic_text() {
        let text = report().render_text();
        assert_eq!(text, report().render_text());
        assert!(text.starts_with("== Table ==\ntable: public.users\ncolumns: 2\n"));
        assert!(text.contains("trigger: a_trigger (one of several triggers)"));
        assert!(text.contains("- active: ratio 0.0002, not recommended"));
        assert!(text.contains("- active -> flags.value: 100.00% match"));
        assert!(text.contains("- active (boolean): suggested false, current none"));
        assert!(text.contains("- balance (money): suggested no suggestion, current 0"));

        let uniqueness = text.find("== Uniqueness ==").unwrap();
        let relationships = text.find("== Relationships ==").unwrap();
        let defaults = text.find("== Defaults ==").unwrap();
        assert!(uniqueness < relationships && relationships < defaults);
    }
}
